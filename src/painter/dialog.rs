use super::brush::BrushMode;
use super::buffer::SweepReport;
use super::session::PainterSession;
use super::PainterResult;
use crate::geometry::Rgb;
use crate::labels::{LabelError, LabelSet, VOID_LABEL_ID};
use crate::state::{PainterEvent, StateError};

/// First paintable label, selected when the dialog opens or a segment is removed.
const FIRST_SEGMENT: usize = 1;

/// Segment list plus painter session for one image, kept in sync with each other.
#[derive(Debug)]
pub struct PaintDialog {
    labels: LabelSet,
    active_segment: Option<usize>,
    session: PainterSession,
}

impl PaintDialog {
    pub fn new(labels: LabelSet, session: PainterSession) -> PainterResult<Self> {
        let mut dialog = Self {
            labels,
            active_segment: None,
            session,
        };
        dialog.select_first_segment()?;
        Ok(dialog)
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn active_segment(&self) -> Option<usize> {
        self.active_segment
    }

    pub fn session(&self) -> &PainterSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PainterSession {
        &mut self.session
    }

    pub fn set_brush_mode(&mut self, mode: BrushMode) -> PainterResult<()> {
        self.session.set_brush_mode(mode)
    }

    pub fn set_active_segment(&mut self, index: usize) -> PainterResult<()> {
        if index == VOID_LABEL_ID {
            return Err(LabelError::ReservedLabel { index }.into());
        }
        let color = self
            .labels
            .get(index)
            .map(|label| label.color)
            .ok_or(LabelError::IndexOutOfRange {
                index,
                len: self.labels.len(),
            })?;

        self.session.set_active_color(color)?;
        self.active_segment = Some(index);
        Ok(())
    }

    /// Adds a segment and makes it the one being painted.
    pub fn add_segment(&mut self, name: impl Into<String>, color: Rgb) -> PainterResult<usize> {
        self.ensure_session_allows(PainterEvent::ConfigureBrush)?;
        let index = self.labels.add(name, color)?;
        self.set_active_segment(index)?;
        Ok(index)
    }

    /// Renames or recolors a segment; a recolor carries its painted pixels along.
    pub fn update_segment(
        &mut self,
        index: usize,
        name: impl Into<String>,
        color: Rgb,
    ) -> PainterResult<()> {
        self.ensure_session_allows(PainterEvent::RecolorClass)?;
        let previous = self.labels.update(index, name, color)?;
        if previous != color {
            self.session.recolor_class_pixels(previous, color)?;
            if self.active_segment == Some(index) {
                self.session.set_active_color(color)?;
            }
        }
        Ok(())
    }

    /// Removes a segment and its pixels, and normalizes the mask to the remaining
    /// segments. Not allowed while a stroke is in progress.
    pub fn remove_segment(&mut self, index: usize) -> PainterResult<SweepReport> {
        self.ensure_session_allows(PainterEvent::RemoveClass)?;
        let removed = self.labels.remove(index)?;
        let keep = self.labels.colors();

        let report = self.session.remove_class_pixels(removed.color, &keep)?;
        self.select_first_segment()?;
        Ok(report)
    }

    /// Exports the final mask and closes the session.
    pub fn close(&mut self) -> PainterResult<Vec<u8>> {
        self.session.close()
    }

    fn select_first_segment(&mut self) -> PainterResult<()> {
        if self.labels.len() > FIRST_SEGMENT {
            self.set_active_segment(FIRST_SEGMENT)
        } else {
            self.active_segment = None;
            if self.session.can(PainterEvent::ConfigureBrush) {
                self.session.clear_active_color()?;
            }
            Ok(())
        }
    }

    fn ensure_session_allows(&self, event: PainterEvent) -> PainterResult<()> {
        if self.session.can(event) {
            Ok(())
        } else {
            Err(StateError::InvalidStateTransition {
                from: self.session.state(),
                event,
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ImageBounds, PixelPoint};
    use crate::input::CoordinateMapper;
    use crate::painter::{MaskBuffer, PainterError};
    use crate::state::PainterState;

    const LEAF: Rgb = Rgb::new(0, 255, 0);
    const LESION: Rgb = Rgb::new(255, 0, 0);
    const SHADOW: Rgb = Rgb::new(0, 0, 255);

    fn dialog() -> PaintDialog {
        let mut labels = LabelSet::new();
        labels.add("leaf", LEAF).expect("add leaf");
        labels.add("lesion", LESION).expect("add lesion");
        labels.add("shadow", SHADOW).expect("add shadow");

        let source = MaskBuffer::new(ImageBounds::new(16, 16))
            .export()
            .expect("export source");
        let session =
            PainterSession::init(CoordinateMapper::default(), &source, None).expect("bind");
        PaintDialog::new(labels, session).expect("dialog should open")
    }

    fn click(dialog: &mut PaintDialog, segment: usize, x: i32, y: i32) {
        dialog.set_active_segment(segment).expect("select segment");
        let session = dialog.session_mut();
        session.begin_stroke(PixelPoint::new(x, y)).expect("down");
        session.end_stroke().expect("up");
    }

    fn pixel(dialog: &PaintDialog, x: i32, y: i32) -> Option<[u8; 4]> {
        dialog
            .session()
            .buffer()
            .and_then(|buffer| buffer.pixel(PixelPoint::new(x, y)))
    }

    #[test]
    fn opens_with_first_segment_active() {
        let dialog = dialog();
        assert_eq!(dialog.active_segment(), Some(1));
        assert_eq!(dialog.session().active_color(), Some(LEAF));
    }

    #[test]
    fn remove_segment_clears_its_pixels_and_resets_selection() {
        let mut dialog = dialog();
        click(&mut dialog, 1, 1, 1);
        click(&mut dialog, 2, 2, 2);
        click(&mut dialog, 3, 3, 3);

        let report = dialog.remove_segment(2).expect("remove lesion");

        assert_eq!(report.cleared_removed, 1);
        assert_eq!(pixel(&dialog, 1, 1), Some(LEAF.to_rgba()));
        assert_eq!(pixel(&dialog, 2, 2), Some([0, 0, 0, 0]));
        assert_eq!(pixel(&dialog, 3, 3), Some(SHADOW.to_rgba()));
        assert_eq!(dialog.labels().len(), 3);
        assert_eq!(dialog.active_segment(), Some(1));
        assert_eq!(dialog.session().active_color(), Some(LEAF));
    }

    #[test]
    fn removing_last_segment_leaves_no_active_color() {
        let mut dialog = dialog();
        dialog.remove_segment(3).expect("remove shadow");
        dialog.remove_segment(2).expect("remove lesion");
        dialog.remove_segment(1).expect("remove leaf");

        assert_eq!(dialog.active_segment(), None);
        assert_eq!(dialog.session().active_color(), None);
        assert!(dialog
            .session()
            .buffer()
            .is_some_and(MaskBuffer::is_blank));
    }

    #[test]
    fn remove_segment_mid_stroke_keeps_labels_intact() {
        let mut dialog = dialog();
        dialog
            .session_mut()
            .begin_stroke(PixelPoint::new(5, 5))
            .expect("down");

        let err = dialog
            .remove_segment(1)
            .expect_err("removal while painting should fail");
        assert!(matches!(err, PainterError::InvalidState(_)));
        assert_eq!(dialog.labels().len(), 4);
        assert_eq!(dialog.session().state(), PainterState::Painting);
    }

    #[test]
    fn update_segment_recolors_painted_pixels() {
        let mut dialog = dialog();
        click(&mut dialog, 2, 4, 4);
        let recolored = Rgb::new(250, 146, 0);

        dialog
            .update_segment(2, "necrosis", recolored)
            .expect("recolor lesion");

        assert_eq!(pixel(&dialog, 4, 4), Some(recolored.to_rgba()));
        assert_eq!(dialog.session().active_color(), Some(recolored));
        assert_eq!(
            dialog.labels().get(2).map(|label| label.name.as_str()),
            Some("necrosis")
        );
    }

    #[test]
    fn add_segment_activates_it() {
        let mut dialog = dialog();
        let color = Rgb::new(22, 165, 165);
        let index = dialog.add_segment("stem", color).expect("add stem");

        assert_eq!(index, 4);
        assert_eq!(dialog.active_segment(), Some(4));
        assert_eq!(dialog.session().active_color(), Some(color));
    }

    #[test]
    fn void_segment_cannot_be_selected() {
        let mut dialog = dialog();
        assert!(matches!(
            dialog.set_active_segment(0),
            Err(PainterError::Label(LabelError::ReservedLabel { index: 0 }))
        ));
        assert_eq!(dialog.active_segment(), Some(1));
    }
}
