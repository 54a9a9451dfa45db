//! Domain types for the survey.
//!
//! This module contains the core data structures:
//! - Passage: labeled corpus texts
//! - Classification: answer options and ground truth
//! - Response: per-passage records and their stored row layouts

pub mod classification;
pub mod passage;
pub mod response;

// Re-export commonly used types
pub use classification::{
    derive_ground_truth, Classification, GroundTruth, QuestionMode, WatermarkChoice,
};
pub use passage::Passage;
pub use response::{Answer, Batch, Response, RowSchema};
