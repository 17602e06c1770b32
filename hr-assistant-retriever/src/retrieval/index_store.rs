//! Persisted vector index over the chunked HR corpus.
//!
//! [`IndexStore`] pairs the SQLite chunk table with an embedding provider.
//! Building is idempotent: the stored chunk set is replaced wholesale inside
//! one transaction, and if the incoming chunks and embedding model hash to the
//! fingerprint already on disk the stored vectors are kept without a single
//! embedding call.

use super::index_db::{ChunkRow, IndexDb, IndexMeta};
use crate::storage::sqlite_store::SqliteStore;
use crate::storage::{ChunkStore, VectorStore};
use anyhow::{Result, anyhow, bail};
use hr_assistant_context::Chunk;
use hr_assistant_embed::EmbeddingProvider;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// A retrieved chunk with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Summary of an [`IndexStore::index`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexReport {
    pub chunk_count: usize,
    pub dimension: usize,
    pub fingerprint: String,
    /// True when the stored vectors already matched and nothing was embedded
    pub reused: bool,
}

pub struct IndexStore {
    store: SqliteStore,
    provider: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("base", &self.store.index_db().base())
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model_name())
            .finish()
    }
}

impl IndexStore {
    /// Opens the index stored under `index_dir`, creating it if needed.
    pub async fn open(index_dir: &Path, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        tracing::info!("Opening index at {}", index_dir.display());
        let index_db = IndexDb::open(index_dir).await?;
        Ok(Self {
            store: SqliteStore::new(index_db),
            provider,
        })
    }

    /// Opens a throwaway in-memory index.
    pub async fn open_memory(provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let index_db = IndexDb::open_memory().await?;
        Ok(Self {
            store: SqliteStore::new(index_db),
            provider,
        })
    }

    /// Identifies a chunk set as embedded by a given model.
    pub fn fingerprint(model_name: &str, chunks: &[Chunk]) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(model_name.as_bytes());
        hasher.update(&(chunks.len() as u64).to_le_bytes());
        for chunk in chunks {
            // Length prefixes keep ["ab", "c"] and ["a", "bc"] apart
            hasher.update(&(chunk.text.len() as u64).to_le_bytes());
            hasher.update(chunk.text.as_bytes());
        }
        hex::encode(hasher.finalize().as_bytes())
    }

    /// Replaces the stored index with `chunks`.
    pub async fn index(&self, chunks: &[Chunk]) -> Result<IndexReport> {
        let model_name = self.provider.model_name().to_string();
        let fingerprint = Self::fingerprint(&model_name, chunks);

        if let Some(meta) = self.store.index_db().get_meta().await?
            && meta.fingerprint == fingerprint
            && meta.chunk_count == chunks.len()
        {
            tracing::info!(
                "Index is up to date ({} chunks, fingerprint {}), reusing stored vectors",
                meta.chunk_count,
                &fingerprint[..12]
            );
            return Ok(IndexReport {
                chunk_count: meta.chunk_count,
                dimension: meta.dimension,
                fingerprint,
                reused: true,
            });
        }

        tracing::info!(
            "Embedding {} chunks with {} ({})",
            chunks.len(),
            model_name,
            self.provider.provider_name()
        );
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.provider.embed_texts(&texts).await?.embeddings
        };

        if embeddings.len() != chunks.len() {
            bail!(
                "Embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            );
        }
        let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
        if embeddings.iter().any(|e| e.len() != dimension || e.is_empty()) {
            bail!("Embedding provider returned vectors of inconsistent dimension");
        }

        let rows: Vec<ChunkRow> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkRow {
                sequence: chunk.sequence,
                char_start: chunk.char_start,
                char_end: chunk.char_end,
                text: chunk.text.clone(),
                embedding,
            })
            .collect();

        let meta = IndexMeta {
            fingerprint: fingerprint.clone(),
            model_name,
            provider: self.provider.provider_name().to_string(),
            dimension,
            chunk_count: rows.len(),
            built_at: chrono::Utc::now(),
        };
        self.store.index_db().replace_all(&rows, &meta).await?;

        tracing::info!("Indexed {} chunks (dimension {})", rows.len(), dimension);
        Ok(IndexReport {
            chunk_count: rows.len(),
            dimension,
            fingerprint,
            reused: false,
        })
    }

    /// Returns up to `k` chunks ranked by similarity to `query_text`, best first.
    ///
    /// Read-only. `k` is clamped to the number of stored chunks; an empty
    /// index or `k == 0` yields no results without embedding the query.
    pub async fn search(&self, query_text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let Some(meta) = self.store.index_db().get_meta().await? else {
            return Ok(Vec::new());
        };
        let stored = self.store.chunk_count().await?;
        if stored == 0 {
            return Ok(Vec::new());
        }
        if meta.model_name != self.provider.model_name() {
            bail!(
                "Index was built with embedding model {}, but the provider uses {}; rebuild the index",
                meta.model_name,
                self.provider.model_name()
            );
        }

        let query = self.provider.embed_text(query_text).await?;
        if query.len() != meta.dimension {
            return Err(anyhow!(
                "Query embedding has dimension {}, index expects {}",
                query.len(),
                meta.dimension
            ));
        }

        let results = self.store.search_chunks(&query, k.min(stored)).await?;
        tracing::debug!("Retrieved {} chunks for query", results.len());
        Ok(results
            .into_iter()
            .map(|(chunk, score)| ScoredChunk { chunk, score })
            .collect())
    }

    /// Metadata of the stored index, if one has been built
    pub async fn meta(&self) -> Result<Option<IndexMeta>> {
        self.store.index_db().get_meta().await
    }

    /// Number of stored chunks
    pub async fn len(&self) -> Result<usize> {
        self.store.chunk_count().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// The storage layer, for inspection
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Releases the database handle; later calls fail.
    pub async fn close(&self) {
        tracing::info!("Closing index at {}", self.store.index_db().base().display());
        self.store.index_db().close().await;
    }
}
