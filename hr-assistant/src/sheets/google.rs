//! Google Sheets API v4 backend.

use super::{InteractionLog, LOG_TABLE, SheetError, SheetSource, rows_from_values, spreadsheet_id};
use async_trait::async_trait;
use hr_assistant_context::{RawRow, TableKind};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Reads tables and appends log rows through the Sheets REST API.
///
/// Authenticates with a bearer access token; minting that token from a
/// service account is left to the caller.
#[derive(Debug, Clone)]
pub struct GoogleSheets {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
}

impl GoogleSheets {
    /// `spreadsheet` may be a bare id or the sheet's URL.
    pub fn new(spreadsheet: &str, access_token: &str, timeout: Duration) -> Result<Self, SheetError> {
        let spreadsheet_id = spreadsheet_id(spreadsheet)?;
        let token = access_token.trim();
        if token.is_empty() {
            return Err(SheetError::Config {
                message: "a Google Sheets access token is required (set GOOGLE_SHEETS_TOKEN)"
                    .to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| SheetError::Config {
                message: "access token contains invalid header characters".to_string(),
            })?,
        );
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            spreadsheet_id,
        })
    }

    /// Points the client at another API host, e.g. a local emulator.
    pub fn with_base_url(self, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..self
        }
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, range
        )
    }

    fn append_url(&self) -> String {
        format!(
            "{}:append?valueInputOption=RAW",
            self.values_url(&format!("{LOG_TABLE}!A1"))
        )
    }
}

/// Turns a non-success response into an error, recognising a missing tab.
async fn check_status(resp: Response, table: &str) -> Result<Response, SheetError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    if status.as_u16() == 400 && body.contains("Unable to parse range") {
        return Err(SheetError::MissingTable {
            table: table.to_string(),
        });
    }
    Err(SheetError::Http {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SheetSource for GoogleSheets {
    async fn fetch_table(&self, table: TableKind) -> Result<Vec<RawRow>, SheetError> {
        let url = self.values_url(table.sheet_name());
        tracing::debug!("Fetching {} from {}", table, url);

        let resp = self.client.get(&url).send().await?;
        let resp = check_status(resp, table.sheet_name()).await?;
        let range: ValueRange = resp.json().await?;

        let rows = rows_from_values(range.into_grid());
        tracing::info!("Fetched {} rows from {}", rows.len(), table);
        Ok(rows)
    }
}

#[async_trait]
impl InteractionLog for GoogleSheets {
    async fn append_log(&self, row: &[String]) -> Result<(), SheetError> {
        let body = AppendRequest {
            values: vec![row.to_vec()],
        };
        let resp = self.client.post(self.append_url()).json(&body).send().await?;
        check_status(resp, LOG_TABLE).await?;
        tracing::debug!("Appended a row to {}", LOG_TABLE);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    /// Absent when the range has no data
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    fn into_grid(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect()
    }
}

/// Formatted values arrive as strings; anything else is rendered as text.
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct AppendRequest {
    values: Vec<Vec<String>>,
}
