//! Survey session: the per-participant response collector.
//!
//! A session samples its passages at start, then collects one answer per
//! passage until it is submitted. Submission is the only state transition
//! and it is terminal:
//!
//! ```text
//! Collecting --submit (complete, append ok)--> Submitted
//! ```
//!
//! Once submitted, recording answers and submitting again are no-ops.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::ResponseSink;
use crate::corpus::Corpus;
use crate::domain::{
    Answer, Batch, Classification, Passage, QuestionMode, Response, RowSchema, WatermarkChoice,
};

use super::sampler::Sampler;

/// Errors raised by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not enough valid passages: found {available}, need at least {required}")]
    CorpusTooSmall { available: usize, required: usize },

    #[error("Submission is incomplete; unanswered passages: {}", positions(.unanswered))]
    IncompleteSubmission { unanswered: Vec<usize> },

    #[error("Failed to save responses: {0:#}")]
    Persistence(anyhow::Error),

    #[error("No passage at position {index} (session has {len})")]
    UnknownSlot { index: usize, len: usize },

    #[error("'{choice}' is not an option in {mode:?} mode")]
    InvalidChoice {
        choice: Classification,
        mode: QuestionMode,
    },

    #[error("{0:?} mode has no watermark question")]
    NoSecondaryQuestion(QuestionMode),

    #[error("Passage {index} needs an AI answer before the watermark question")]
    SecondaryNotApplicable { index: usize },
}

/// 1-based, comma-separated passage numbers for messages
fn positions(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| (i + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Question mode, sample size and stored row layout of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub mode: QuestionMode,
    pub sample_size: usize,
    pub schema: RowSchema,
}

impl Variant {
    /// Variant with the default row layout for `mode`
    pub fn new(mode: QuestionMode, sample_size: usize) -> Self {
        Self {
            mode,
            sample_size,
            schema: RowSchema::for_mode(mode),
        }
    }

    pub fn with_schema(mut self, schema: RowSchema) -> Self {
        self.schema = schema;
        self
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self::new(QuestionMode::TwoStep, 2)
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SessionState {
    /// Answers may still change
    Collecting,

    /// Responses were stored; terminal
    Submitted { at: DateTime<Utc> },
}

/// Result of a submit call that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The batch was appended to the sink
    Submitted { rows: usize },

    /// The session had already been submitted; nothing was appended
    AlreadySubmitted,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    answer: Answer,
    recorded_at: DateTime<Utc>,
}

/// One participant's survey
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    variant: Variant,
    started_at: DateTime<Utc>,
    passages: Vec<Passage>,
    slots: Vec<Option<Slot>>,
    state: SessionState,
}

impl Session {
    /// Start a session, sampling passages with the thread RNG
    pub fn start(corpus: &Corpus, variant: Variant) -> Result<Self, SessionError> {
        Self::start_with_rng(corpus, variant, &mut rand::thread_rng())
    }

    /// Start a session with an explicit random source
    pub fn start_with_rng<R: Rng + ?Sized>(
        corpus: &Corpus,
        variant: Variant,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        let mut sampler = Sampler::new();
        sampler.draw(corpus, variant.sample_size, rng)?;
        let passages = sampler.into_drawn().unwrap_or_default();

        let id = Uuid::new_v4();
        info!(session_id = %id, mode = ?variant.mode, passages = passages.len(), "Session started");

        Ok(Self {
            id,
            variant,
            started_at: Utc::now(),
            slots: vec![None; passages.len()],
            passages,
            state: SessionState::Collecting,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Sampled passages in display order
    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.state, SessionState::Submitted { .. })
    }

    /// Current answer for a passage
    pub fn answer(&self, index: usize) -> Option<Answer> {
        self.slots.get(index).copied().flatten().map(|s| s.answer)
    }

    /// Record the first-question answer for a passage.
    ///
    /// Replaces any earlier answer. In two-step mode, answering AI again
    /// keeps a watermark answer already given.
    pub fn record_primary(
        &mut self,
        index: usize,
        choice: Classification,
    ) -> Result<(), SessionError> {
        if self.is_submitted() {
            debug!(session_id = %self.id, index, "Ignoring answer for submitted session");
            return Ok(());
        }

        let mode = self.variant.mode;
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(SessionError::UnknownSlot { index, len })?;

        if !mode.primary_options().contains(&choice) {
            return Err(SessionError::InvalidChoice { choice, mode });
        }
        let mut answer =
            Answer::from_primary(choice).ok_or(SessionError::InvalidChoice { choice, mode })?;

        if let (Answer::Ai { watermark }, Some(previous)) = (&mut answer, slot.as_ref()) {
            *watermark = previous.answer.secondary();
        }

        *slot = Some(Slot {
            answer,
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    /// Record the watermark answer for a passage answered as AI
    pub fn record_secondary(
        &mut self,
        index: usize,
        choice: WatermarkChoice,
    ) -> Result<(), SessionError> {
        if self.is_submitted() {
            debug!(session_id = %self.id, index, "Ignoring answer for submitted session");
            return Ok(());
        }

        let mode = self.variant.mode;
        if !mode.has_secondary() {
            return Err(SessionError::NoSecondaryQuestion(mode));
        }

        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(SessionError::UnknownSlot { index, len })?;

        match slot {
            Some(Slot {
                answer: Answer::Ai { watermark },
                recorded_at,
            }) => {
                *watermark = Some(choice);
                *recorded_at = Utc::now();
                Ok(())
            }
            _ => Err(SessionError::SecondaryNotApplicable { index }),
        }
    }

    /// Indices of passages without an effective answer
    pub fn unanswered(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                slot.map_or(true, |s| s.answer.effective(self.variant.mode).is_none())
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether every passage has an effective answer
    pub fn is_complete(&self) -> bool {
        self.unanswered().is_empty()
    }

    /// Response records for the passages answered so far
    pub fn responses(&self) -> Vec<Response> {
        self.passages
            .iter()
            .zip(&self.slots)
            .filter_map(|(passage, slot)| {
                slot.map(|s| Response {
                    session_id: self.id,
                    timestamp: s.recorded_at,
                    passage_id: passage.id.clone(),
                    text: passage.text.clone(),
                    answer: s.answer,
                    truth: passage.ground_truth(),
                })
            })
            .collect()
    }

    /// Submit the responses to a sink.
    ///
    /// The session becomes submitted only after the sink accepted the whole
    /// batch; on failure it stays collecting so the call can be retried.
    #[instrument(skip(self, sink), fields(session_id = %self.id, sink = sink.name()))]
    pub async fn submit(&mut self, sink: &dyn ResponseSink) -> Result<SubmitOutcome, SessionError> {
        if self.is_submitted() {
            info!("Session already submitted, skipping append");
            return Ok(SubmitOutcome::AlreadySubmitted);
        }

        let unanswered = self.unanswered();
        if !unanswered.is_empty() {
            debug!(?unanswered, "Submission rejected: incomplete");
            return Err(SessionError::IncompleteSubmission { unanswered });
        }

        let batch = Batch {
            mode: self.variant.mode,
            schema: self.variant.schema,
            responses: self.responses(),
        };

        if let Err(e) = sink.append(&batch).await {
            warn!(error = %e, "Failed to store responses");
            return Err(SessionError::Persistence(e));
        }

        self.state = SessionState::Submitted { at: Utc::now() };
        info!(
            rows = batch.len(),
            elapsed_secs = (Utc::now() - self.started_at).num_seconds(),
            "Session submitted"
        );

        Ok(SubmitOutcome::Submitted { rows: batch.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn corpus() -> Corpus {
        [
            ("1", "Humanos"),
            ("2", "IA_Boost_v2"),
            ("3", "IA_plain"),
            ("4", "Humanos"),
        ]
        .into_iter()
        .filter_map(|(id, label)| Passage::new(id, format!("texto {}", id), label))
        .collect()
    }

    fn session(mode: QuestionMode) -> Session {
        let mut rng = StdRng::seed_from_u64(42);
        Session::start_with_rng(&corpus(), Variant::new(mode, 2), &mut rng).unwrap()
    }

    #[test]
    fn test_start_creates_empty_slots() {
        let s = session(QuestionMode::TwoStep);
        assert_eq!(s.passages().len(), 2);
        assert_eq!(s.unanswered(), vec![0, 1]);
        assert_eq!(s.state(), SessionState::Collecting);
    }

    #[test]
    fn test_start_fails_on_small_corpus() {
        let small: Corpus = corpus().passages()[..2].iter().cloned().collect();
        let err = Session::start(&small, Variant::default()).unwrap_err();
        assert!(matches!(err, SessionError::CorpusTooSmall { available: 2, required: 3 }));
    }

    #[test]
    fn test_primary_overwrites_and_restamps() {
        let mut s = session(QuestionMode::Binary);
        s.record_primary(0, Classification::Human).unwrap();
        let first = s.responses()[0].timestamp;

        s.record_primary(0, Classification::Ai).unwrap();
        assert_eq!(s.answer(0), Some(Answer::Ai { watermark: None }));
        assert!(s.responses()[0].timestamp >= first);
    }

    #[test]
    fn test_invalid_choice_for_mode() {
        let mut s = session(QuestionMode::Binary);
        let err = s.record_primary(0, Classification::AiWithWatermark).unwrap_err();
        assert!(matches!(err, SessionError::InvalidChoice { .. }));

        let mut t = session(QuestionMode::Ternary);
        assert!(t.record_primary(0, Classification::AiWithWatermark).is_ok());
        let err = t.record_primary(0, Classification::AiWithoutWatermark).unwrap_err();
        assert!(matches!(err, SessionError::InvalidChoice { .. }));
    }

    #[test]
    fn test_unknown_slot() {
        let mut s = session(QuestionMode::Binary);
        let err = s.record_primary(5, Classification::Human).unwrap_err();
        assert!(matches!(err, SessionError::UnknownSlot { index: 5, len: 2 }));
    }

    #[test]
    fn test_secondary_requires_ai_primary() {
        let mut s = session(QuestionMode::TwoStep);
        let err = s
            .record_secondary(0, WatermarkChoice::WithWatermark)
            .unwrap_err();
        assert!(matches!(err, SessionError::SecondaryNotApplicable { index: 0 }));

        s.record_primary(0, Classification::Human).unwrap();
        assert!(s.record_secondary(0, WatermarkChoice::WithWatermark).is_err());
    }

    #[test]
    fn test_secondary_only_in_two_step() {
        let mut s = session(QuestionMode::Ternary);
        s.record_primary(0, Classification::Ai).unwrap();
        let err = s
            .record_secondary(0, WatermarkChoice::WithWatermark)
            .unwrap_err();
        assert!(matches!(err, SessionError::NoSecondaryQuestion(QuestionMode::Ternary)));
    }

    #[test]
    fn test_two_step_completeness() {
        let mut s = session(QuestionMode::TwoStep);
        s.record_primary(0, Classification::Human).unwrap();
        s.record_primary(1, Classification::Ai).unwrap();
        assert_eq!(s.unanswered(), vec![1]);

        s.record_secondary(1, WatermarkChoice::WithoutWatermark).unwrap();
        assert!(s.is_complete());
    }

    #[test]
    fn test_reanswering_ai_keeps_secondary() {
        let mut s = session(QuestionMode::TwoStep);
        s.record_primary(0, Classification::Ai).unwrap();
        s.record_secondary(0, WatermarkChoice::WithWatermark).unwrap();

        s.record_primary(0, Classification::Ai).unwrap();
        assert_eq!(s.answer(0).and_then(|a| a.secondary()), Some(WatermarkChoice::WithWatermark));

        s.record_primary(0, Classification::Human).unwrap();
        assert_eq!(s.answer(0), Some(Answer::Human));

        s.record_primary(0, Classification::Ai).unwrap();
        assert_eq!(s.answer(0), Some(Answer::Ai { watermark: None }));
    }

    #[test]
    fn test_incomplete_error_lists_positions() {
        let err = SessionError::IncompleteSubmission {
            unanswered: vec![0, 2],
        };
        assert!(err.to_string().ends_with("1, 3"));
    }
}
