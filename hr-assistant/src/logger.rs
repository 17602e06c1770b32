//! Appends answered questions to the Logs table.

use crate::error::{AssistantError, Result};
use crate::sheets::InteractionLog;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;

/// Timestamp layout written to the log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One logged interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// Local wall-clock time, formatted with [`TIMESTAMP_FORMAT`]
    pub timestamp: String,
    pub query: String,
    pub answer: String,
}

impl LogEntry {
    pub fn at(time: DateTime<Local>, query: &str, answer: &str) -> Self {
        Self {
            timestamp: time.format(TIMESTAMP_FORMAT).to_string(),
            query: query.to_string(),
            answer: answer.to_string(),
        }
    }

    /// Cells in Logs column order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.query.clone(),
            self.answer.clone(),
        ]
    }
}

pub struct InteractionLogger {
    log: Arc<dyn InteractionLog>,
}

impl InteractionLogger {
    pub fn new(log: Arc<dyn InteractionLog>) -> Self {
        Self { log }
    }

    /// Stamps the interaction with the current local time and appends it.
    pub async fn log(&self, query: &str, answer: &str) -> Result<LogEntry> {
        let entry = LogEntry::at(Local::now(), query, answer);
        self.log
            .append_log(&entry.to_row())
            .await
            .map_err(|source| AssistantError::Logging { source })?;
        tracing::debug!("Logged interaction at {}", entry.timestamp);
        Ok(entry)
    }
}
