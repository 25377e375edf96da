//! Segment label definitions: the ordered, color-exclusive class list a mask is painted with.

mod palette;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Rgb;

pub use palette::{default_new_segment_color, SEGMENT_COLOR_PALETTE};

pub const VOID_LABEL_ID: usize = 0;
pub const VOID_LABEL_NAME: &str = "__void__";
pub const VOID_LABEL_COLOR: Rgb = Rgb::new(0, 0, 0);
/// Class codes are stored as single bytes in raw masks.
pub const MAX_LABELS: usize = 256;

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("label {index} is reserved for unlabeled pixels")]
    ReservedLabel { index: usize },
    #[error("label index {index} is out of range (labels: {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("color {color} is reserved for unlabeled pixels")]
    ReservedColor { color: Rgb },
    #[error("color {color} is already used by label {existing}")]
    DuplicateColor { color: Rgb, existing: usize },
    #[error("label set is full ({} labels)", MAX_LABELS)]
    TooManyLabels,
    #[error("invalid labels document: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type LabelResult<T> = std::result::Result<T, LabelError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    #[serde(skip)]
    pub id: usize,
    #[serde(rename = "label")]
    pub name: String,
    #[serde(rename = "rgb")]
    pub color: Rgb,
}

impl Label {
    pub fn new(id: usize, name: impl Into<String>, color: Rgb) -> Self {
        Self {
            id,
            name: name.into(),
            color,
        }
    }

    pub const fn is_void(&self) -> bool {
        self.id == VOID_LABEL_ID
    }
}

/// Ordered label list; a label's id is its position, and id 0 is the void label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelSet {
    pub fn new() -> Self {
        Self {
            labels: vec![Label::new(VOID_LABEL_ID, VOID_LABEL_NAME, VOID_LABEL_COLOR)],
        }
    }

    pub fn from_labels(labels: Vec<Label>) -> LabelResult<Self> {
        let mut set = Self::new();
        let mut entries = labels.into_iter();
        if let Some(void) = entries.next() {
            set.labels[VOID_LABEL_ID] = Label::new(VOID_LABEL_ID, void.name, void.color);
        }
        for label in entries {
            set.add(label.name, label.color)?;
        }
        Ok(set)
    }

    /// Parses the `[{"label": ..., "rgb": [r, g, b]}, ...]` document owned by the model.
    pub fn from_json(json: &str) -> LabelResult<Self> {
        let labels: Vec<Label> = serde_json::from_str(json)?;
        Self::from_labels(labels)
    }

    pub fn to_json(&self) -> LabelResult<String> {
        Ok(serde_json::to_string(&self.labels)?)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }

    pub fn void(&self) -> &Label {
        &self.labels[VOID_LABEL_ID]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    /// Labels a user can paint with, i.e. everything except the void label.
    pub fn user_labels(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter().skip(1)
    }

    pub fn colors(&self) -> Vec<Rgb> {
        self.labels.iter().map(|label| label.color).collect()
    }

    pub fn find_by_color(&self, color: Rgb) -> Option<usize> {
        self.labels
            .iter()
            .position(|label| label.color == color)
    }

    pub fn add(&mut self, name: impl Into<String>, color: Rgb) -> LabelResult<usize> {
        if self.labels.len() >= MAX_LABELS {
            return Err(LabelError::TooManyLabels);
        }
        self.validate_color(color, None)?;

        let id = self.labels.len();
        let label = Label::new(id, name, color);
        tracing::debug!(id, name = %label.name, color = %color, "add label");
        self.labels.push(label);
        Ok(id)
    }

    /// Renames and recolors a user label, returning the color it had before.
    pub fn update(
        &mut self,
        index: usize,
        name: impl Into<String>,
        color: Rgb,
    ) -> LabelResult<Rgb> {
        self.check_user_index(index)?;
        self.validate_color(color, Some(index))?;

        let label = &mut self.labels[index];
        let previous = label.color;
        label.name = name.into();
        label.color = color;
        tracing::debug!(
            id = index,
            name = %label.name,
            from = %previous,
            to = %color,
            "update label"
        );
        Ok(previous)
    }

    /// Removes a user label; labels after it shift down by one id.
    pub fn remove(&mut self, index: usize) -> LabelResult<Label> {
        self.check_user_index(index)?;

        let removed = self.labels.remove(index);
        for (id, label) in self.labels.iter_mut().enumerate().skip(index) {
            label.id = id;
        }
        tracing::debug!(id = index, name = %removed.name, color = %removed.color, "remove label");
        Ok(removed)
    }

    fn check_user_index(&self, index: usize) -> LabelResult<()> {
        if index == VOID_LABEL_ID {
            return Err(LabelError::ReservedLabel { index });
        }
        if index >= self.labels.len() {
            return Err(LabelError::IndexOutOfRange {
                index,
                len: self.labels.len(),
            });
        }
        Ok(())
    }

    fn validate_color(&self, color: Rgb, ignore: Option<usize>) -> LabelResult<()> {
        if color == self.void().color {
            return Err(LabelError::ReservedColor { color });
        }
        match self.find_by_color(color) {
            Some(existing) if Some(existing) != ignore => {
                Err(LabelError::DuplicateColor { color, existing })
            }
            _ => Ok(()),
        }
    }
}
