//! One question in, one rendered outcome out.

use crate::answerer::{Answerer, QueryResult};
use crate::error::AssistantError;
use crate::logger::{InteractionLogger, LogEntry};

/// Whether an answered question made it into the Logs table.
#[derive(Debug, Clone, PartialEq)]
pub enum LogStatus {
    Logged(LogEntry),
    /// The answer was delivered but could not be logged
    Failed(String),
}

/// Result of [`Assistant::ask`].
///
/// A failed log write is not a failed question, so it lives inside
/// `Answered` rather than next to `Failed`.
#[derive(Debug)]
pub enum Outcome {
    Answered { result: QueryResult, logged: LogStatus },
    /// Nothing was logged
    Failed(AssistantError),
}

impl Outcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, Outcome::Answered { .. })
    }
}

pub struct Assistant {
    answerer: Answerer,
    logger: InteractionLogger,
}

impl Assistant {
    pub fn new(answerer: Answerer, logger: InteractionLogger) -> Self {
        Self { answerer, logger }
    }

    pub fn answerer(&self) -> &Answerer {
        &self.answerer
    }

    /// Answers `query`, then logs the interaction if answering succeeded.
    pub async fn ask(&self, query: &str) -> Outcome {
        let result = match self.answerer.answer(query).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!("Failed to answer query: {}", err);
                return Outcome::Failed(err);
            }
        };

        let logged = match self.logger.log(query, &result.answer).await {
            Ok(entry) => LogStatus::Logged(entry),
            Err(err) => {
                tracing::warn!("{}", err);
                LogStatus::Failed(err.to_string())
            }
        };

        Outcome::Answered { result, logged }
    }
}
