//! Wires a paint dialog to its collaborators: configuration, label set, and mask storage.

use std::path::PathBuf;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::input::CoordinateMapper;
use crate::labels::LabelSet;
use crate::painter::{PaintDialog, PainterError, PainterSession};
use crate::storage::MaskStorage;

/// A freshly opened dialog. `mask_error` is set when a stored mask existed but
/// could not be loaded; the dialog then starts from an empty mask.
#[derive(Debug)]
pub struct OpenedDialog {
    pub dialog: PaintDialog,
    pub mask_error: Option<PainterError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedMask {
    pub mask_path: PathBuf,
    pub class_codes_path: PathBuf,
}

#[derive(Debug)]
pub struct App<S> {
    config: AppConfig,
    storage: S,
}

impl<S: MaskStorage> App<S> {
    pub fn new(config: AppConfig, storage: S) -> Self {
        Self { config, storage }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn new_session(&self) -> PainterSession {
        PainterSession::new(CoordinateMapper::new(self.config.origin_offset()))
            .with_brush_width(self.config.brush_width)
    }

    pub fn open(&self, image_name: &str, labels: LabelSet) -> AppResult<OpenedDialog> {
        let source = self.storage.load_source_image(image_name)?;
        let existing = self.storage.load_existing_mask(image_name)?;

        let mut session = self.new_session();
        let mask_error = match session.bind(&source, existing.as_deref()) {
            Ok(()) => None,
            Err(err) if err.is_decode_error() && existing.is_some() => {
                tracing::warn!(image_name, %err, "stored mask unusable; starting empty");
                session.bind(&source, None)?;
                Some(err)
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(image_name, labels = labels.len(), "opened paint dialog");
        let dialog = PaintDialog::new(labels, session)?;
        Ok(OpenedDialog { dialog, mask_error })
    }

    /// Closes the dialog and persists both the color mask and its class codes.
    /// If anything fails before the mask is written, the dialog stays open.
    pub fn save_and_close(
        &self,
        image_name: &str,
        dialog: &mut PaintDialog,
    ) -> AppResult<SavedMask> {
        let codes = dialog
            .session()
            .buffer()
            .map(|buffer| buffer.to_class_codes(dialog.labels()));
        let encoded = dialog.session_mut().export_mask()?;

        let mask_path = self.storage.save_mask(image_name, &encoded)?;
        let class_codes_path = match codes {
            Some(codes) => self.storage.save_class_codes(image_name, &codes)?,
            None => mask_path.clone(),
        };

        dialog.close()?;
        dialog.session_mut().mark_saved();
        Ok(SavedMask {
            mask_path,
            class_codes_path,
        })
    }
}
