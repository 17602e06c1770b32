//! Storage abstraction layer for the chunk index
//!
//! Trait-based access to stored chunks and their vectors, so the
//! [`IndexStore`](crate::retrieval::index_store::IndexStore) and the inspector
//! CLI never touch SQL directly.
//!
//! ```text
//! ChunkStore ── VectorStore ── SqliteStore (over IndexDb)
//! ```

use anyhow::Result;
use async_trait::async_trait;
use half::f16;
use hr_assistant_context::Chunk;
use serde::Serialize;

pub mod sqlite_store;

/// Position of a chunk in the corpus; the primary key of the index.
pub type ChunkSequence = usize;

/// Chunk metadata without text or vector, for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkMetadata {
    pub sequence: ChunkSequence,
    pub char_start: usize,
    pub char_end: usize,
    pub dimension: usize,
    /// First characters of the chunk text
    pub preview: String,
}

/// Read access to stored chunk text.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Get a specific chunk by its corpus position
    async fn get_chunk(&self, sequence: ChunkSequence) -> Result<Option<Chunk>>;

    /// List every chunk in corpus order
    async fn list_chunks(&self) -> Result<Vec<ChunkMetadata>>;

    /// Search for chunks containing the specified text
    async fn search_text(&self, search_term: &str, case_sensitive: bool) -> Result<Vec<Chunk>>;

    /// Number of stored chunks
    async fn chunk_count(&self) -> Result<usize>;
}

/// Vector similarity search over stored chunks.
#[async_trait]
pub trait VectorStore: ChunkStore + Send + Sync {
    /// Score every stored vector against `query` and return the best `limit`
    /// chunks with their scores, best first
    async fn search_chunks(&self, query: &[f16], limit: usize) -> Result<Vec<(Chunk, f32)>>;
}
