//! Delimited corpus reader.
//!
//! The corpus is a headered file with at least `id`, `text` and `label`
//! columns. Fields may be quoted to embed the delimiter. Rows whose text is
//! blank are dropped and counted.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::Passage;

use super::Corpus;

/// Errors raised while reading a corpus
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Failed to open corpus {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed corpus data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Corpus is missing required column '{0}'")]
    MissingColumn(&'static str),
}

const REQUIRED_COLUMNS: [&str; 3] = ["id", "text", "label"];

/// Load a corpus file
pub fn load_corpus(path: &Path, delimiter: u8) -> Result<Corpus, CorpusError> {
    let file = File::open(path).map_err(|source| CorpusError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let corpus = read_corpus(file, delimiter)?;
    info!(
        path = %path.display(),
        passages = corpus.len(),
        discarded = corpus.discarded(),
        "Loaded corpus"
    );

    Ok(corpus)
}

/// Read a corpus from any reader
pub fn read_corpus<R: Read>(reader: R, delimiter: u8) -> Result<Corpus, CorpusError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut indices = [0usize; 3];
    for (slot, column) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or(CorpusError::MissingColumn(column))?;
    }
    let [id_idx, text_idx, label_idx] = indices;

    let mut passages = Vec::new();
    let mut discarded = 0;

    for record in rdr.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or("").to_string();

        match Passage::new(field(id_idx).trim(), field(text_idx), field(label_idx)) {
            Some(passage) => passages.push(passage),
            None => {
                debug!(line = ?record.position().map(|p| p.line()), "Discarding row with blank text");
                discarded += 1;
            }
        }
    }

    Ok(Corpus::new(passages, discarded))
}
