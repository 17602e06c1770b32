//! Error types for record formatting and corpus building

use crate::record::TableKind;

/// Result type for formatting and chunking operations.
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors raised while turning spreadsheet rows into chunks.
///
/// Both variants are raised at the boundary where the bad input is first seen:
/// a row with a missing column fails when it is converted into a [`Record`](crate::Record),
/// and invalid window parameters fail when the [`CorpusBuilder`](crate::CorpusBuilder)
/// is constructed, before any text is split.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// A row lacks a column its table requires
    #[error("{table} row {row} is missing field `{field}`")]
    Schema {
        table: TableKind,
        row: usize,
        field: &'static str,
    },

    /// Chunking parameters violate `0 < overlap + 1 <= max_chunk_size`
    #[error("Invalid chunking configuration: {message}")]
    Config { message: String },
}

impl ContextError {
    /// Create a configuration error with a custom message.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
