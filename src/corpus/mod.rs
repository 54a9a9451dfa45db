//! Passage corpus.
//!
//! The corpus is read once per process and shared read-only by every
//! session afterwards.

pub mod loader;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Result;

pub use loader::{load_corpus, read_corpus, CorpusError};

use crate::domain::{GroundTruth, Passage};

/// Process-wide corpus (stores Result to handle load errors)
static CORPUS: OnceLock<Result<Corpus, String>> = OnceLock::new();

/// Valid passages available for sampling
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    passages: Vec<Passage>,

    /// Rows dropped because their text was blank
    discarded: usize,
}

impl Corpus {
    pub fn new(passages: Vec<Passage>, discarded: usize) -> Self {
        Self {
            passages,
            discarded,
        }
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Number of passages per raw label
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for passage in &self.passages {
            *counts.entry(passage.label.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Number of passages per derived ground truth
    pub fn truth_counts(&self) -> (usize, usize, usize) {
        self.passages
            .iter()
            .fold((0, 0, 0), |(h, w, p), passage| match passage.ground_truth() {
                GroundTruth::Human => (h + 1, w, p),
                GroundTruth::AiWithWatermark => (h, w + 1, p),
                GroundTruth::AiWithoutWatermark => (h, w, p + 1),
            })
    }
}

impl FromIterator<Passage> for Corpus {
    fn from_iter<I: IntoIterator<Item = Passage>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect(), 0)
    }
}

/// Get the shared corpus, loading it on first use.
///
/// The first caller's path and delimiter win for the rest of the process.
pub fn shared(path: &Path, delimiter: u8) -> Result<&'static Corpus> {
    let result = CORPUS.get_or_init(|| load_corpus(path, delimiter).map_err(|e| e.to_string()));

    match result {
        Ok(corpus) => Ok(corpus),
        Err(e) => anyhow::bail!("{}", e),
    }
}
