//! Google Sheets backend.
//!
//! Appends a whole batch with one `values:append` request, so a
//! submission either lands completely or fails. Authentication uses an
//! OAuth bearer token obtained out-of-band for the service account.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::Batch;

use super::ResponseSink;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Configuration for the Sheets sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Document id from the spreadsheet URL
    pub spreadsheet_id: String,

    /// A1 range locating the table, e.g. "Hoja 1!A1"
    pub range: String,

    /// OAuth access token
    pub access_token: String,
}

/// Error body returned by the Sheets API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Subset of the append response we report
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: Option<String>,
    updated_rows: Option<u64>,
}

/// Spreadsheet sink
pub struct SheetsSink {
    config: SheetsConfig,
    client: reqwest::Client,
}

impl SheetsSink {
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Build the append URL
    fn append_url(&self) -> String {
        format!(
            "{}/{}/values/{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            SHEETS_API,
            self.config.spreadsheet_id,
            encode_range(&self.config.range)
        )
    }
}

/// Percent-encode the characters of an A1 range that are not URL-safe
fn encode_range(range: &str) -> String {
    range
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'!' | b':' => {
                (b as char).to_string()
            }
            other => format!("%{:02X}", other),
        })
        .collect()
}

/// Request body for `values:append`, one row per response
fn append_body(batch: &Batch) -> serde_json::Value {
    serde_json::json!({
        "majorDimension": "ROWS",
        "values": batch.rows(),
    })
}

/// Message from an API error body, or the raw body when it is not JSON
fn error_message(body: String) -> String {
    serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body)
}

#[async_trait]
impl ResponseSink for SheetsSink {
    fn name(&self) -> &str {
        "sheets"
    }

    async fn append(&self, batch: &Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.append_url())
            .bearer_auth(&self.config.access_token)
            .json(&append_body(batch))
            .send()
            .await
            .context("Failed to reach Google Sheets")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Google Sheets API error ({}): {}", status, error_message(body));
        }

        let result: AppendResponse = response
            .json()
            .await
            .context("Failed to parse Google Sheets response")?;

        let updates = result.updates;
        info!(
            rows = batch.len(),
            updated_rows = ?updates.as_ref().and_then(|u| u.updated_rows),
            updated_range = ?updates.as_ref().and_then(|u| u.updated_range.as_deref()),
            "Appended responses to spreadsheet"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Answer, GroundTruth, QuestionMode, Response, RowSchema};
    use chrono::Utc;
    use uuid::Uuid;

    fn sink(range: &str) -> SheetsSink {
        SheetsSink::new(SheetsConfig {
            spreadsheet_id: "DOC".to_string(),
            range: range.to_string(),
            access_token: "TOKEN".to_string(),
        })
    }

    #[test]
    fn test_append_url() {
        assert_eq!(
            sink("A1").append_url(),
            "https://sheets.googleapis.com/v4/spreadsheets/DOC/values/A1:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS"
        );
    }

    #[test]
    fn test_range_with_sheet_name_is_encoded() {
        assert_eq!(encode_range("Hoja 1!A1"), "Hoja%201!A1");
    }

    #[test]
    fn test_append_body_holds_every_row() {
        let batch = Batch {
            mode: QuestionMode::TwoStep,
            schema: RowSchema::Split,
            responses: vec![Response {
                session_id: Uuid::nil(),
                timestamp: Utc::now(),
                passage_id: "4".to_string(),
                text: "Un texto".to_string(),
                answer: Answer::Human,
                truth: GroundTruth::AiWithoutWatermark,
            }],
        };
        let body = append_body(&batch);

        assert_eq!(body["majorDimension"], "ROWS");
        let values = body["values"].as_array().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].as_array().unwrap().len(), 8);
        assert_eq!(values[0][2], "4");
        assert_eq!(values[0][4], "Escrito por humano");
        assert_eq!(values[0][7], "Escrito por IA sin marca de agua");
    }

    #[test]
    fn test_error_message_from_api_body() {
        let body = r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(
            error_message(body.to_string()),
            "The caller does not have permission"
        );
        assert_eq!(error_message("Bad Gateway".to_string()), "Bad Gateway");
    }
}
