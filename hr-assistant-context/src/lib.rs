pub mod corpus;
pub mod document;
pub mod error;
pub mod record;

// Re-export the main formatting and chunking entry points for external use
pub use corpus::{Chunk, ChunkingConfig, CorpusBuilder, join_documents};
pub use document::{Document, format};
pub use error::{ContextError, Result};
pub use record::{
    Benefit, LeaveBalance, MalformedRowPolicy, Policy, RawRow, Record, TableKind, load_records,
};
