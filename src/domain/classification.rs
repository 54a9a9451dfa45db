//! Classification vocabulary shared by answers and ground truth.
//!
//! The labels written to the response store are the Spanish option texts
//! the participants see, so stored rows stay comparable across variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label of a passage written by a person (compared case-insensitively)
pub const HUMAN_LABEL: &str = "humanos";

/// Substring marking a watermarked generation (compared case-sensitively)
pub const WATERMARK_MARKER: &str = "Boost";

/// One of the classifications a passage can receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Human,
    Ai,
    AiWithWatermark,
    AiWithoutWatermark,
}

impl Classification {
    /// Option text shown to participants and stored in response rows
    pub fn label(&self) -> &'static str {
        match self {
            Self::Human => "Escrito por humano",
            Self::Ai => "Escrito por IA",
            Self::AiWithWatermark => "Escrito por IA con marca de agua",
            Self::AiWithoutWatermark => "Escrito por IA sin marca de agua",
        }
    }

    /// Parse a stored option text back into a classification
    pub fn from_label(label: &str) -> Option<Self> {
        [
            Self::Human,
            Self::Ai,
            Self::AiWithWatermark,
            Self::AiWithoutWatermark,
        ]
        .into_iter()
        .find(|c| c.label() == label.trim())
    }

    /// Collapse to the human/AI dimension
    pub fn provenance(&self) -> Self {
        match self {
            Self::Human => Self::Human,
            _ => Self::Ai,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Answer to the refinement question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkChoice {
    WithWatermark,
    WithoutWatermark,
}

impl WatermarkChoice {
    pub fn classification(&self) -> Classification {
        match self {
            Self::WithWatermark => Classification::AiWithWatermark,
            Self::WithoutWatermark => Classification::AiWithoutWatermark,
        }
    }
}

/// Set of questions asked for each passage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionMode {
    /// One question: human or AI
    Binary,
    /// One question: human, AI, or AI with watermark
    Ternary,
    /// Human or AI, then a watermark question when the first answer is AI
    #[default]
    TwoStep,
}

impl QuestionMode {
    /// Options offered by the first question
    pub fn primary_options(&self) -> &'static [Classification] {
        match self {
            Self::Binary | Self::TwoStep => &[Classification::Human, Classification::Ai],
            Self::Ternary => &[
                Classification::Human,
                Classification::Ai,
                Classification::AiWithWatermark,
            ],
        }
    }

    /// Whether a watermark question follows an AI answer
    pub fn has_secondary(&self) -> bool {
        matches!(self, Self::TwoStep)
    }
}

impl FromStr for QuestionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "binary" => Ok(Self::Binary),
            "ternary" => Ok(Self::Ternary),
            "two_step" => Ok(Self::TwoStep),
            other => Err(format!("Unknown question mode: {}", other)),
        }
    }
}

/// Provenance of a passage as recorded in the corpus label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundTruth {
    Human,
    AiWithWatermark,
    AiWithoutWatermark,
}

impl GroundTruth {
    /// Ground truth at the granularity a question mode asks about
    pub fn classification(&self, mode: QuestionMode) -> Classification {
        match (self, mode) {
            (Self::Human, _) => Classification::Human,
            (_, QuestionMode::Binary) => Classification::Ai,
            (Self::AiWithWatermark, _) => Classification::AiWithWatermark,
            (Self::AiWithoutWatermark, QuestionMode::Ternary) => Classification::Ai,
            (Self::AiWithoutWatermark, QuestionMode::TwoStep) => {
                Classification::AiWithoutWatermark
            }
        }
    }

    /// Human/AI dimension only
    pub fn provenance(&self) -> Classification {
        match self {
            Self::Human => Classification::Human,
            _ => Classification::Ai,
        }
    }

    /// Watermark dimension, `None` for human passages
    pub fn watermark(&self) -> Option<Classification> {
        match self {
            Self::Human => None,
            Self::AiWithWatermark => Some(Classification::AiWithWatermark),
            Self::AiWithoutWatermark => Some(Classification::AiWithoutWatermark),
        }
    }
}

/// Derive the ground truth of a passage from its corpus label.
///
/// The human sentinel is matched after trimming and ignoring case; the
/// watermark marker must appear with its exact case.
pub fn derive_ground_truth(label: &str) -> GroundTruth {
    if label.trim().to_lowercase() == HUMAN_LABEL {
        GroundTruth::Human
    } else if label.contains(WATERMARK_MARKER) {
        GroundTruth::AiWithWatermark
    } else {
        GroundTruth::AiWithoutWatermark
    }
}
