//! Pixel-accurate label painting: mask raster, brush rasterizer, and the session that drives them.

pub mod brush;
pub mod buffer;
pub mod dialog;
pub mod session;

use image::ImageError;
use thiserror::Error;

use crate::geometry::ImageBounds;
use crate::labels::LabelError;
use crate::state::StateError;

pub use brush::{stroke, BrushMode, StrokeSegment, DEFAULT_BRUSH_WIDTH};
pub use buffer::{source_dimensions, MaskBuffer, SweepReport};
pub use dialog::PaintDialog;
pub use session::{DirtyListener, PainterSession};

#[derive(Debug, Error)]
pub enum PainterError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] ImageError),
    #[error("mask is {actual:?} but the source image is {expected:?}")]
    DimensionMismatch {
        expected: ImageBounds,
        actual: ImageBounds,
    },
    #[error("failed to encode mask: {0}")]
    Encode(#[source] ImageError),
    #[error(transparent)]
    InvalidState(#[from] StateError),
    #[error(transparent)]
    Label(#[from] LabelError),
}

pub type PainterResult<T> = std::result::Result<T, PainterError>;

impl PainterError {
    /// Decode failures leave the buffer as it was; the caller may retry or start empty.
    pub const fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::DimensionMismatch { .. })
    }
}
