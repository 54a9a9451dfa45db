//! Passages: the labeled texts participants classify.

use super::classification::{derive_ground_truth, GroundTruth};

/// A labeled text from the corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    /// Identifier from the corpus `id` column
    pub id: String,

    /// Body text shown to the participant (never blank)
    pub text: String,

    /// Provenance tag, e.g. "Humanos" or "IA_Boost_v2"
    pub label: String,
}

impl Passage {
    /// Build a passage, rejecting blank text
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        label: impl Into<String>,
    ) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }

        Some(Self {
            id: id.into(),
            text,
            label: label.into(),
        })
    }

    pub fn ground_truth(&self) -> GroundTruth {
        derive_ground_truth(&self.label)
    }
}
