//! Core survey logic.
//!
//! This module contains:
//! - Sampler: once-per-session random passage selection
//! - Session: answer collection and the submit state machine
//! - Tally: accuracy summary over stored responses

pub mod sampler;
pub mod session;
pub mod tally;

// Re-export commonly used types
pub use sampler::{Sampler, MIN_CORPUS_SIZE};
pub use session::{Session, SessionError, SessionState, SubmitOutcome, Variant};
pub use tally::{tally_file, tally_reader, Score, Tally};
