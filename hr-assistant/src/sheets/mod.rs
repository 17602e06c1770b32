//! Spreadsheet collaborators.
//!
//! The assistant reads three tables and appends to a fourth. Both directions
//! sit behind small traits so the build phase and the logger never know
//! whether they are talking to Google Sheets or a directory of CSV files.

use async_trait::async_trait;
use hr_assistant_context::{RawRow, TableKind};
use regex::Regex;
use std::sync::OnceLock;

pub mod google;
pub mod local;

pub use google::GoogleSheets;
pub use local::LocalWorkbook;

/// Name of the table interactions are appended to.
pub const LOG_TABLE: &str = "Logs";

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("Sheets request failed ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Sheets request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Table `{table}` not found")]
    MissingTable { table: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid spreadsheet configuration: {message}")]
    Config { message: String },
}

/// Reads whole tables as header-keyed rows.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Every data row of `table`, in sheet order, keyed by the header row
    async fn fetch_table(&self, table: TableKind) -> Result<Vec<RawRow>, SheetError>;
}

/// Appends rows to the interaction log.
#[async_trait]
pub trait InteractionLog: Send + Sync {
    async fn append_log(&self, row: &[String]) -> Result<(), SheetError>;
}

/// Zips a grid of cells into rows keyed by the first row.
///
/// Short rows are padded with empty cells; cells beyond the header width are
/// dropped, as they have no column name.
pub fn rows_from_values(values: Vec<Vec<String>>) -> Vec<RawRow> {
    let mut grid = values.into_iter();
    let Some(headers) = grid.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

    grid.map(|cells| {
        headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), cells.get(i).cloned().unwrap_or_default()))
            .collect()
    })
    .collect()
}

fn spreadsheet_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("spreadsheet URL regex is valid")
    })
}

/// Accepts a bare spreadsheet id or a full sheet URL and returns the id.
pub fn spreadsheet_id(url_or_id: &str) -> Result<String, SheetError> {
    let trimmed = url_or_id.trim();
    if let Some(captures) = spreadsheet_url_regex().captures(trimmed) {
        return Ok(captures[1].to_string());
    }
    if !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Ok(trimmed.to_string());
    }
    Err(SheetError::Config {
        message: format!("not a spreadsheet id or URL: {url_or_id:?}"),
    })
}
