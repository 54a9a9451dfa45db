//! Participant answers, response records and the stored row layouts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classification::{Classification, GroundTruth, QuestionMode, WatermarkChoice};

/// A participant's answer for one passage.
///
/// The watermark refinement only exists under an `Ai` answer, so a
/// secondary answer without an AI primary cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Human,
    Ai { watermark: Option<WatermarkChoice> },
    AiWithWatermark,
}

impl Answer {
    /// Answer for a first-question choice
    pub fn from_primary(choice: Classification) -> Option<Self> {
        match choice {
            Classification::Human => Some(Self::Human),
            Classification::Ai => Some(Self::Ai { watermark: None }),
            Classification::AiWithWatermark => Some(Self::AiWithWatermark),
            Classification::AiWithoutWatermark => None,
        }
    }

    /// The first-question choice
    pub fn primary(&self) -> Classification {
        match self {
            Self::Human => Classification::Human,
            Self::Ai { .. } => Classification::Ai,
            Self::AiWithWatermark => Classification::AiWithWatermark,
        }
    }

    /// The refinement answer, if one was given
    pub fn secondary(&self) -> Option<WatermarkChoice> {
        match self {
            Self::Ai { watermark } => *watermark,
            _ => None,
        }
    }

    /// Answer on the watermark dimension, `None` when not stated
    pub fn watermark(&self) -> Option<Classification> {
        match self {
            Self::AiWithWatermark => Some(Classification::AiWithWatermark),
            Self::Ai { watermark } => watermark.map(|w| w.classification()),
            Self::Human => None,
        }
    }

    /// Effective answer under a question mode.
    ///
    /// `None` means the answer is still incomplete: an AI primary without
    /// its refinement in the two-step mode.
    pub fn effective(&self, mode: QuestionMode) -> Option<Classification> {
        match self {
            Self::Ai { watermark: None } if mode.has_secondary() => None,
            Self::Ai { watermark: Some(w) } => Some(w.classification()),
            other => Some(other.primary()),
        }
    }
}

/// One participant response for one passage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Session the response belongs to
    pub session_id: Uuid,

    /// When the answer was last recorded
    pub timestamp: DateTime<Utc>,

    /// Corpus id of the passage
    pub passage_id: String,

    /// Passage text, copied so rows stand on their own
    pub text: String,

    /// What the participant chose
    pub answer: Answer,

    /// What the corpus label says
    pub truth: GroundTruth,
}

/// Column layout of stored response rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSchema {
    /// Six columns, one answer/truth pair
    Compact,
    /// Compact plus an empty trailing column, aligned with `Split` sheets
    Padded,
    /// Eight columns, separate AI and watermark pairs
    Split,
}

const COMPACT_HEADER: &[&str] = &[
    "session_id",
    "timestamp",
    "texto_id",
    "texto",
    "clasificacion_usuario",
    "clasificacion_real",
];

const PADDED_HEADER: &[&str] = &[
    "session_id",
    "timestamp",
    "texto_id",
    "texto",
    "clasificacion_usuario",
    "clasificacion_real",
    "clasificacion_usuario_watermark",
];

const SPLIT_HEADER: &[&str] = &[
    "session_id",
    "timestamp",
    "texto_id",
    "texto",
    "clasificacion_usuario_ia",
    "clasificacion_real_ia",
    "clasificacion_usuario_watermark",
    "clasificacion_real_watermark",
];

impl RowSchema {
    /// Default layout for a question mode
    pub fn for_mode(mode: QuestionMode) -> Self {
        match mode {
            QuestionMode::Binary => Self::Compact,
            QuestionMode::Ternary => Self::Padded,
            QuestionMode::TwoStep => Self::Split,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Padded => "padded",
            Self::Split => "split",
        }
    }

    pub fn header(&self) -> &'static [&'static str] {
        match self {
            Self::Compact => COMPACT_HEADER,
            Self::Padded => PADDED_HEADER,
            Self::Split => SPLIT_HEADER,
        }
    }

    /// Recognize a layout from a stored header row
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Option<Self> {
        [Self::Compact, Self::Padded, Self::Split]
            .into_iter()
            .find(|schema| {
                let expected = schema.header();
                expected.len() == header.len()
                    && expected.iter().zip(header).all(|(e, h)| *e == h.as_ref().trim())
            })
    }

    /// Render one response as a row of cells
    pub fn row(&self, response: &Response, mode: QuestionMode) -> Vec<String> {
        let mut cells = vec![
            response.session_id.to_string(),
            response.timestamp.to_rfc3339(),
            response.passage_id.clone(),
            response.text.clone(),
        ];

        match self {
            Self::Compact | Self::Padded => {
                cells.push(label_or_empty(response.answer.effective(mode)));
                cells.push(response.truth.classification(mode).label().to_string());
                if *self == Self::Padded {
                    cells.push(String::new());
                }
            }
            Self::Split => {
                cells.push(response.answer.primary().provenance().label().to_string());
                cells.push(response.truth.provenance().label().to_string());
                cells.push(label_or_empty(response.answer.watermark()));
                cells.push(label_or_empty(response.truth.watermark()));
            }
        }

        cells
    }
}

fn label_or_empty(classification: Option<Classification>) -> String {
    classification
        .map(|c| c.label().to_string())
        .unwrap_or_default()
}

/// The responses of one submission, handed to a sink in a single append
#[derive(Debug, Clone)]
pub struct Batch {
    pub mode: QuestionMode,
    pub schema: RowSchema,
    pub responses: Vec<Response>,
}

impl Batch {
    pub fn header(&self) -> &'static [&'static str] {
        self.schema.header()
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.responses
            .iter()
            .map(|r| self.schema.row(r, self.mode))
            .collect()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.responses.first().map(|r| r.session_id)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}
