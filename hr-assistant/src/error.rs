//! Error type for the assistant.

use crate::generation::GenerationError;
use crate::sheets::SheetError;
use hr_assistant_context::ContextError;

pub type Result<T> = std::result::Result<T, AssistantError>;

/// Everything that can go wrong between loading the sheet and logging an answer.
///
/// `Schema`, `Config`, `Sheet` and `Index` abort startup. `InvalidQuery` and
/// `Generation` fail a single question. `Logging` only downgrades an answered
/// question to a warning.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// A spreadsheet row is missing a required column
    #[error(transparent)]
    Schema(ContextError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The spreadsheet backend could not be read
    #[error("Spreadsheet error: {0}")]
    Sheet(#[from] SheetError),

    /// Building, opening or searching the vector index failed
    #[error("Index error: {source}")]
    Index { source: anyhow::Error },

    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Appending to the Logs table failed
    #[error("Could not log interaction: {source}")]
    Logging {
        #[source]
        source: SheetError,
    },
}

impl AssistantError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn index<E: Into<anyhow::Error>>(source: E) -> Self {
        Self::Index {
            source: source.into(),
        }
    }
}

impl From<ContextError> for AssistantError {
    fn from(error: ContextError) -> Self {
        match error {
            ContextError::Config { message } => Self::Config { message },
            schema => Self::Schema(schema),
        }
    }
}
