use super::error::{StateError, StateResult};
use super::{event::StateTransition, PainterEvent, PainterState};

#[derive(Debug)]
pub struct StateMachine {
    state: PainterState,
    transition_history: Vec<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: PainterState::default(),
            transition_history: Vec::new(),
        }
    }

    pub fn state(&self) -> PainterState {
        self.state
    }

    pub fn can_transition(&self, event: PainterEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: PainterEvent) -> Option<PainterState> {
        use PainterEvent::*;
        match (self.state, event) {
            (PainterState::Uninitialized, Bind) => Some(PainterState::Ready),
            (PainterState::Ready | PainterState::Painting, PointerDown) => {
                Some(PainterState::Painting)
            }
            (PainterState::Ready, PointerMove) => Some(PainterState::Ready),
            (PainterState::Painting, PointerMove) => Some(PainterState::Painting),
            (PainterState::Ready | PainterState::Painting, PointerUp) => Some(PainterState::Ready),
            (state @ (PainterState::Ready | PainterState::Painting), ConfigureBrush) => Some(state),
            (PainterState::Ready, RemoveClass | RecolorClass) => Some(PainterState::Ready),
            (state @ (PainterState::Ready | PainterState::Painting), Export) => Some(state),
            (PainterState::Ready | PainterState::Painting, Close) => Some(PainterState::Closed),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: PainterEvent) -> StateResult<PainterState> {
        tracing::trace!(from = ?self.state, event = ?event, "request state transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid state transition requested");
            StateError::InvalidStateTransition { from, event }
        })?;

        // Pointer moves arrive per input event; only lifecycle changes are kept.
        if next != self.state {
            tracing::debug!(from = ?self.state, to = ?next, event = ?event, "state changed");
            self.transition_history
                .push(StateTransition::new(Some(self.state), event, next));
        }
        self.state = next;

        Ok(self.state)
    }
}

impl StateMachine {
    pub fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PainterState::{:?}", self.state)
    }
}
