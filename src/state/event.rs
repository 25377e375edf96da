use super::model::PainterState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PainterEvent {
    Bind,
    PointerDown,
    PointerMove,
    PointerUp,
    ConfigureBrush,
    RemoveClass,
    RecolorClass,
    Export,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: Option<PainterState>,
    pub event: PainterEvent,
    pub to: PainterState,
}

impl StateTransition {
    pub const fn new(from: Option<PainterState>, event: PainterEvent, to: PainterState) -> Self {
        Self { from, event, to }
    }
}
