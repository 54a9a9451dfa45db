//! watermark-survey - Human vs. AI vs. watermarked-AI text survey
//!
//! Shows a participant a small random sample of labeled passages, asks
//! who wrote each one, and appends the answers next to the ground truth
//! derived from the passage labels.
//!
//! # Architecture
//!
//! The system is built around an explicit session object:
//! - The corpus is loaded once and shared read-only
//! - Each session samples its passages once at start
//! - Answers can change until the session is submitted
//! - Submission appends the whole batch to a sink, then the session is final
//!
//! # Modules
//!
//! - `adapters`: Storage backends (CSV file, Google Sheets)
//! - `core`: Sampling, sessions, result tally
//! - `corpus`: Corpus loading and caching
//! - `domain`: Data structures (Passage, Answer, Response)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Take the survey
//! wmsurvey take
//!
//! # Check the corpus
//! wmsurvey check --corpus Textos.csv
//!
//! # Summarize stored answers
//! wmsurvey tally
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod corpus;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{FlatFileSink, ResponseSink, SheetsSink};
pub use crate::core::{Session, SessionError, SessionState, SubmitOutcome, Variant};
pub use corpus::Corpus;
pub use domain::{derive_ground_truth, Answer, Classification, GroundTruth, Passage, QuestionMode};
