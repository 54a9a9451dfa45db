//! Local append-only CSV file backend.
//!
//! The header row is written when the file is new or empty; later batches
//! only append rows, and only under a header of the same layout. Each batch
//! is serialized in memory and written with a single call while holding an
//! exclusive lock, so concurrent writers never interleave rows. A failed
//! write is truncated back to the previous length. Rows already stored for
//! the same session and passage are not written again.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use fs2::FileExt;
use tracing::{debug, info, warn};

use crate::domain::{Batch, Response, RowSchema};

use super::ResponseSink;

/// CSV file sink
pub struct FlatFileSink {
    path: PathBuf,
}

impl FlatFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResponseSink for FlatFileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(&self, batch: &Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let path = self.path.clone();
        let batch = batch.clone();
        let rows = tokio::task::spawn_blocking(move || append_locked(&path, &batch))
            .await
            .context("Response writer task failed")??;

        if rows > 0 {
            info!(path = %self.path.display(), rows, "Appended responses");
        }
        Ok(())
    }
}

/// Append a batch under an exclusive lock. Returns the number of rows written.
fn append_locked(path: &Path, batch: &Batch) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open responses file: {}", path.display()))?;

    file.lock_exclusive()
        .with_context(|| format!("Failed to acquire lock on {}", path.display()))?;

    let existing_len = file
        .metadata()
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();

    let stored = if existing_len > 0 {
        stored_passages(&mut file, path, batch)?
    } else {
        HashSet::new()
    };

    let pending: Vec<&Response> = batch
        .responses
        .iter()
        .filter(|r| !stored.contains(&r.passage_id))
        .collect();
    if pending.is_empty() {
        warn!(session_id = ?batch.session_id(), "Responses for this session already stored, skipping");
        return Ok(0);
    }
    if !stored.is_empty() {
        warn!(
            session_id = ?batch.session_id(),
            stored = stored.len(),
            missing = pending.len(),
            "Completing partially stored session"
        );
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    if existing_len == 0 {
        wtr.write_record(batch.header())
            .context("Failed to serialize header")?;
    }
    for response in &pending {
        wtr.write_record(batch.schema.row(response, batch.mode))
            .context("Failed to serialize row")?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to serialize rows")?;

    if let Err(e) = file.write_all(&bytes).and_then(|_| file.flush()) {
        if let Err(truncate) = file.set_len(existing_len) {
            warn!(error = %truncate, "Failed to roll back partial write");
        }
        return Err(e).with_context(|| format!("Failed to write responses to {}", path.display()));
    }
    debug!(bytes = bytes.len(), "Wrote response rows");

    // Lock is released when file is dropped
    Ok(pending.len())
}

/// Check the stored header against the batch layout and collect the
/// passage ids already stored for the batch's session.
fn stored_passages(file: &mut File, path: &Path, batch: &Batch) -> Result<HashSet<String>> {
    file.seek(SeekFrom::Start(0))
        .context("Failed to rewind responses file")?;

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(&*file);

    let header = rdr
        .headers()
        .context("Failed to read stored response header")?
        .clone();
    let fields: Vec<&str> = header.iter().collect();
    match RowSchema::from_header(fields.as_slice()) {
        Some(schema) if schema == batch.schema => {}
        Some(schema) => bail!(
            "{} holds {} rows, cannot append {} rows",
            path.display(),
            schema.name(),
            batch.schema.name()
        ),
        None => bail!("{} has an unrecognized header", path.display()),
    }

    let Some(session_id) = batch.session_id().map(|id| id.to_string()) else {
        return Ok(HashSet::new());
    };

    let mut stored = HashSet::new();
    for record in rdr.records() {
        let record = record.context("Failed to read stored response row")?;
        if record.get(0) == Some(session_id.as_str()) {
            stored.insert(record.get(2).unwrap_or_default().to_string());
        }
    }

    Ok(stored)
}
