//! Response sinks: where submitted batches are stored.
//!
//! Sinks provide a unified interface over the storage backends. Each
//! submission hands its whole batch to a single `append` call.

pub mod flat_file;
pub mod sheets;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{Backend, StorageSettings};
use crate::domain::Batch;

pub use flat_file::FlatFileSink;
pub use sheets::{SheetsConfig, SheetsSink};

/// Trait for storage backends
#[async_trait]
pub trait ResponseSink: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Append every row of a batch, or fail without claiming success
    async fn append(&self, batch: &Batch) -> Result<()>;
}

/// Build the sink selected by the storage settings
pub fn sink_from_settings(settings: &StorageSettings) -> Result<Box<dyn ResponseSink>> {
    match settings.backend {
        Backend::File => Ok(Box::new(FlatFileSink::new(settings.responses_file.clone()))),
        Backend::Sheets => {
            let spreadsheet_id = settings
                .spreadsheet_id
                .clone()
                .context("storage.spreadsheet_id is required for the sheets backend")?;
            let token = std::env::var(&settings.token_env).with_context(|| {
                format!(
                    "Sheets access token not found in environment variable {}",
                    settings.token_env
                )
            })?;

            Ok(Box::new(SheetsSink::new(SheetsConfig {
                spreadsheet_id,
                range: settings.range.clone(),
                access_token: token,
            })))
        }
    }
}
