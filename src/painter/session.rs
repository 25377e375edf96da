use super::brush::{self, BrushMode, StrokeSegment, DEFAULT_BRUSH_WIDTH};
use super::buffer::{source_dimensions, MaskBuffer, SweepReport};
use super::PainterResult;
use crate::geometry::{PixelPoint, Rgb};
use crate::input::{CoordinateMapper, PointerEvent, ScrollOffset};
use crate::state::{PainterEvent, PainterState, StateError, StateMachine};

/// Told whenever the session's unsaved-changes flag flips.
pub trait DirtyListener {
    fn on_dirty_changed(&mut self, dirty: bool);
}

impl<F> DirtyListener for F
where
    F: FnMut(bool),
{
    fn on_dirty_changed(&mut self, dirty: bool) {
        self(dirty)
    }
}

/// One editing session over one image's mask.
///
/// All mutation happens synchronously inside the input call that caused it, so a
/// segment is always fully rasterized before the next pointer sample is mapped.
pub struct PainterSession {
    machine: StateMachine,
    mapper: CoordinateMapper,
    buffer: Option<MaskBuffer>,
    brush_mode: BrushMode,
    brush_width: u32,
    active_color: Option<Rgb>,
    last_pixel: Option<PixelPoint>,
    dirty: bool,
    dirty_listener: Option<Box<dyn DirtyListener>>,
}

impl std::fmt::Debug for PainterSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PainterSession")
            .field("state", &self.machine.state())
            .field("bounds", &self.buffer.as_ref().map(MaskBuffer::bounds))
            .field("brush_mode", &self.brush_mode)
            .field("brush_width", &self.brush_width)
            .field("active_color", &self.active_color)
            .field("last_pixel", &self.last_pixel)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl PainterSession {
    pub fn new(mapper: CoordinateMapper) -> Self {
        Self {
            machine: StateMachine::new(),
            mapper,
            buffer: None,
            brush_mode: BrushMode::default(),
            brush_width: DEFAULT_BRUSH_WIDTH,
            active_color: None,
            last_pixel: None,
            dirty: false,
            dirty_listener: None,
        }
    }

    /// Creates a session and binds it to `source_image`, seeding from `existing_mask`.
    pub fn init(
        mapper: CoordinateMapper,
        source_image: &[u8],
        existing_mask: Option<&[u8]>,
    ) -> PainterResult<Self> {
        let mut session = Self::new(mapper);
        session.bind(source_image, existing_mask)?;
        Ok(session)
    }

    pub fn with_brush_width(mut self, width: u32) -> Self {
        self.brush_width = width.max(1);
        self
    }

    pub fn with_dirty_listener(mut self, listener: impl DirtyListener + 'static) -> Self {
        self.dirty_listener = Some(Box::new(listener));
        self
    }

    pub fn set_dirty_listener(&mut self, listener: impl DirtyListener + 'static) {
        self.dirty_listener = Some(Box::new(listener));
    }

    /// Sizes the buffer to the source image's natural dimensions and loads the
    /// existing mask if there is one. Fails as a whole: on error the session
    /// stays uninitialized and may be bound again.
    pub fn bind(&mut self, source_image: &[u8], existing_mask: Option<&[u8]>) -> PainterResult<()> {
        if !self.machine.can_transition(PainterEvent::Bind) {
            return Err(StateError::InvalidStateTransition {
                from: self.state(),
                event: PainterEvent::Bind,
            }
            .into());
        }

        let bounds = source_dimensions(source_image)?;
        let mut buffer = MaskBuffer::new(bounds);
        if let Some(mask) = existing_mask {
            buffer.load(mask)?;
        }

        self.machine.transition(PainterEvent::Bind)?;
        tracing::info!(
            width = bounds.width,
            height = bounds.height,
            existing_mask = existing_mask.is_some(),
            "painter session ready"
        );
        self.buffer = Some(buffer);
        Ok(())
    }

    pub fn state(&self) -> PainterState {
        self.machine.state()
    }

    pub fn can(&self, event: PainterEvent) -> bool {
        self.machine.can_transition(event)
    }

    pub fn is_painting(&self) -> bool {
        self.state().is_painting()
    }

    pub fn last_pixel(&self) -> Option<PixelPoint> {
        self.last_pixel
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn brush_mode(&self) -> BrushMode {
        self.brush_mode
    }

    pub fn brush_width(&self) -> u32 {
        self.brush_width
    }

    pub fn active_color(&self) -> Option<Rgb> {
        self.active_color
    }

    pub fn mapper(&self) -> CoordinateMapper {
        self.mapper
    }

    pub fn buffer(&self) -> Option<&MaskBuffer> {
        self.buffer.as_ref()
    }

    pub fn set_brush_mode(&mut self, mode: BrushMode) -> PainterResult<()> {
        self.machine.transition(PainterEvent::ConfigureBrush)?;
        tracing::debug!(%mode, "brush mode changed");
        self.brush_mode = mode;
        Ok(())
    }

    pub fn set_active_color(&mut self, color: Rgb) -> PainterResult<()> {
        self.machine.transition(PainterEvent::ConfigureBrush)?;
        tracing::debug!(%color, "active color changed");
        self.active_color = Some(color);
        Ok(())
    }

    /// With no active color, draw-mode input is tracked but paints nothing.
    pub fn clear_active_color(&mut self) -> PainterResult<()> {
        self.machine.transition(PainterEvent::ConfigureBrush)?;
        self.active_color = None;
        Ok(())
    }

    pub fn pointer_down(
        &mut self,
        event: &PointerEvent,
        scroll: ScrollOffset,
    ) -> PainterResult<()> {
        match self.mapper.to_pixel(event, scroll) {
            Some(pixel) => self.begin_stroke(pixel),
            None => Ok(()),
        }
    }

    pub fn pointer_move(
        &mut self,
        event: &PointerEvent,
        scroll: ScrollOffset,
    ) -> PainterResult<()> {
        match self.mapper.to_pixel(event, scroll) {
            Some(pixel) => self.continue_stroke(pixel),
            None => Ok(()),
        }
    }

    pub fn pointer_up(&mut self) -> PainterResult<()> {
        self.end_stroke()
    }

    /// Leaving the surface ends the stroke the same way releasing does.
    pub fn pointer_leave(&mut self) -> PainterResult<()> {
        self.end_stroke()
    }

    /// Starts a stroke at `pixel` and marks that single pixel.
    pub fn begin_stroke(&mut self, pixel: PixelPoint) -> PainterResult<()> {
        self.machine.transition(PainterEvent::PointerDown)?;
        if self.paint(StrokeSegment::dot(pixel)) {
            self.set_dirty(true);
        }
        self.last_pixel = Some(pixel);
        Ok(())
    }

    /// Extends the current stroke to `pixel`; ignored when no stroke is in progress.
    pub fn continue_stroke(&mut self, pixel: PixelPoint) -> PainterResult<()> {
        self.machine.transition(PainterEvent::PointerMove)?;
        if !self.is_painting() {
            return Ok(());
        }

        let from = self.last_pixel.unwrap_or(pixel);
        if self.paint(StrokeSegment::new(from, pixel)) {
            self.set_dirty(true);
        }
        self.last_pixel = Some(pixel);
        Ok(())
    }

    /// Finishes the stroke; everything painted so far stays.
    pub fn end_stroke(&mut self) -> PainterResult<()> {
        self.machine.transition(PainterEvent::PointerUp)?;
        self.last_pixel = None;
        Ok(())
    }

    /// Deletes `removed` from the mask and normalizes every other pixel to `keep`.
    /// Rejected while a stroke is in progress.
    pub fn remove_class_pixels(
        &mut self,
        removed: Rgb,
        keep: &[Rgb],
    ) -> PainterResult<SweepReport> {
        self.machine.transition(PainterEvent::RemoveClass)?;
        let Some(buffer) = self.buffer.as_mut() else {
            return Ok(SweepReport::default());
        };

        let report = buffer.sweep_remove_class(removed, keep);
        tracing::info!(
            removed = %removed,
            cleared = report.cleared(),
            "removed class pixels"
        );
        self.set_dirty(true);
        Ok(report)
    }

    /// Moves every pixel of one class to a new color. Rejected while painting.
    pub fn recolor_class_pixels(&mut self, from: Rgb, to: Rgb) -> PainterResult<u64> {
        self.machine.transition(PainterEvent::RecolorClass)?;
        let Some(buffer) = self.buffer.as_mut() else {
            return Ok(0);
        };

        let changed = buffer.recolor_class(from, to);
        if changed > 0 {
            tracing::info!(%from, %to, changed, "recolored class pixels");
            self.set_dirty(true);
        }
        Ok(changed)
    }

    /// Encodes the current mask without ending the session.
    pub fn export_mask(&mut self) -> PainterResult<Vec<u8>> {
        self.machine.transition(PainterEvent::Export)?;
        match self.buffer.as_ref() {
            Some(buffer) => buffer.export(),
            None => Ok(Vec::new()),
        }
    }

    /// Exports the mask and discards the buffer. An in-progress stroke is simply
    /// ended. If encoding fails the session stays open so the caller can retry.
    pub fn close(&mut self) -> PainterResult<Vec<u8>> {
        let encoded = self.export_mask()?;
        self.machine.transition(PainterEvent::Close)?;
        self.buffer = None;
        self.last_pixel = None;
        tracing::info!(bytes = encoded.len(), dirty = self.dirty, "painter session closed");
        Ok(encoded)
    }

    /// Call once the exported mask has been persisted. Saving mid-stroke is
    /// allowed; the next painted segment raises the flag again.
    pub fn mark_saved(&mut self) {
        self.set_dirty(false);
    }

    /// Returns whether the segment touched any pixel of the buffer.
    fn paint(&mut self, segment: StrokeSegment) -> bool {
        let Some(buffer) = self.buffer.as_mut() else {
            return false;
        };
        // Mode and color are sampled per segment, so mid-stroke changes apply forward only.
        let color = match (self.brush_mode, self.active_color) {
            (BrushMode::Draw, Some(color)) => color,
            (BrushMode::Draw, None) => {
                tracing::debug!("no active color; skipping draw segment");
                return false;
            }
            (BrushMode::Erase, color) => color.unwrap_or_default(),
        };
        brush::stroke(buffer, segment, self.brush_mode, color, self.brush_width) > 0
    }

    fn set_dirty(&mut self, dirty: bool) {
        if self.dirty == dirty {
            return;
        }
        self.dirty = dirty;
        if let Some(listener) = self.dirty_listener.as_mut() {
            listener.on_dirty_changed(dirty);
        }
    }
}
