/// Lifecycle of a painter session bound to one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PainterState {
    #[default]
    Uninitialized,
    Ready,
    Painting,
    Closed,
}

impl PainterState {
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Ready | Self::Painting)
    }

    pub const fn is_painting(self) -> bool {
        matches!(self, Self::Painting)
    }
}
