//! SQLite implementation of the storage traits
//!
//! Adapts [`IndexDb`] rows to the public [`Chunk`] type and runs cosine
//! similarity in memory over every stored vector. The HR corpus is a few
//! hundred chunks, so a linear scan is all the search needs.

use super::{ChunkMetadata, ChunkSequence, ChunkStore, VectorStore};
use crate::retrieval::index_db::{ChunkRow, IndexDb};
use anyhow::Result;
use async_trait::async_trait;
use half::f16;
use hr_assistant_context::Chunk;
use std::cmp::Ordering;

const PREVIEW_CHARS: usize = 60;

/// SQLite-based implementation of the storage traits.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    index_db: IndexDb,
}

impl SqliteStore {
    pub fn new(index_db: IndexDb) -> Self {
        Self { index_db }
    }

    /// The underlying database, for writes and metadata
    pub fn index_db(&self) -> &IndexDb {
        &self.index_db
    }

    fn row_to_chunk(row: ChunkRow) -> Chunk {
        Chunk {
            sequence: row.sequence,
            char_start: row.char_start,
            char_end: row.char_end,
            text: row.text,
        }
    }
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn get_chunk(&self, sequence: ChunkSequence) -> Result<Option<Chunk>> {
        let row = self.index_db.get_chunk(sequence).await?;
        Ok(row.map(Self::row_to_chunk))
    }

    async fn list_chunks(&self) -> Result<Vec<ChunkMetadata>> {
        let rows = self.index_db.get_all_chunks().await?;
        Ok(rows
            .into_iter()
            .map(|row| ChunkMetadata {
                sequence: row.sequence,
                char_start: row.char_start,
                char_end: row.char_end,
                dimension: row.embedding.len(),
                preview: row.text.chars().take(PREVIEW_CHARS).collect(),
            })
            .collect())
    }

    async fn search_text(&self, search_term: &str, case_sensitive: bool) -> Result<Vec<Chunk>> {
        let rows = self.index_db.search_text(search_term, case_sensitive).await?;
        Ok(rows.into_iter().map(Self::row_to_chunk).collect())
    }

    async fn chunk_count(&self) -> Result<usize> {
        self.index_db.count_chunks().await
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn search_chunks(&self, query: &[f16], limit: usize) -> Result<Vec<(Chunk, f32)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = self.index_db.get_all_chunks().await?;
        let mut scored: Vec<(Chunk, f32)> = rows
            .into_iter()
            .map(|row| {
                let score = cosine_similarity(query, &row.embedding);
                (Self::row_to_chunk(row), score)
            })
            .collect();

        // Best score first; ties keep corpus order
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.sequence.cmp(&b.0.sequence))
        });
        scored.truncate(limit);

        tracing::debug!(
            "Scored query against stored chunks, returning {}",
            scored.len()
        );
        Ok(scored)
    }
}

/// Cosine similarity of two vectors, accumulated in f32.
///
/// Mismatched lengths and zero vectors score 0.
pub fn cosine_similarity(a: &[f16], b: &[f16]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        let x = x.to_f32();
        let y = y.to_f32();
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::index_db::IndexMeta;

    fn v(values: &[f32]) -> Vec<f16> {
        values.iter().copied().map(f16::from_f32).collect()
    }

    async fn store_with(rows: Vec<(&str, Vec<f16>)>) -> anyhow::Result<SqliteStore> {
        let index_db = IndexDb::open_memory().await?;
        let mut offset = 0;
        let rows: Vec<ChunkRow> = rows
            .into_iter()
            .enumerate()
            .map(|(sequence, (text, embedding))| {
                let len = text.chars().count();
                let row = ChunkRow {
                    sequence,
                    char_start: offset,
                    char_end: offset + len,
                    text: text.to_string(),
                    embedding,
                };
                offset += len;
                row
            })
            .collect();
        let meta = IndexMeta {
            fingerprint: "f".to_string(),
            model_name: "m".to_string(),
            provider: "p".to_string(),
            dimension: 3,
            chunk_count: rows.len(),
            built_at: chrono::Utc::now(),
        };
        index_db.replace_all(&rows, &meta).await?;
        Ok(SqliteStore::new(index_db))
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() -> anyhow::Result<()> {
        let store = store_with(vec![
            ("Benefit: Gym", v(&[0.0, 1.0, 0.0])),
            ("Leave balance for sam", v(&[1.0, 0.1, 0.0])),
            ("Policy: Travel", v(&[0.7, 0.7, 0.0])),
        ])
        .await?;

        let results = store.search_chunks(&v(&[1.0, 0.0, 0.0]), 10).await?;
        let order: Vec<usize> = results.iter().map(|(c, _)| c.sequence).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!(results.windows(2).all(|w| w[0].1 >= w[1].1));

        let top = store.search_chunks(&v(&[1.0, 0.0, 0.0]), 1).await?;
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].0.sequence, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_limit_and_ties() -> anyhow::Result<()> {
        let store = store_with(vec![
            ("a", v(&[1.0, 0.0, 0.0])),
            ("b", v(&[1.0, 0.0, 0.0])),
        ])
        .await?;

        assert!(store.search_chunks(&v(&[1.0, 0.0, 0.0]), 0).await?.is_empty());
        let results = store.search_chunks(&v(&[1.0, 0.0, 0.0]), 5).await?;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.text, "a");
        assert_eq!(results[1].0.text, "b");
        Ok(())
    }

    #[tokio::test]
    async fn test_chunk_store_operations() -> anyhow::Result<()> {
        let store = store_with(vec![
            ("Policy: Remote Work (General) → Two days", v(&[1.0, 0.0, 0.0])),
            ("Benefit: Gym → Free", v(&[0.0, 1.0, 0.0])),
        ])
        .await?;

        assert_eq!(store.chunk_count().await?, 2);
        let listed = store.list_chunks().await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].dimension, 3);
        assert_eq!(listed[1].preview, "Benefit: Gym → Free");

        let chunk = store.get_chunk(1).await?.unwrap();
        assert_eq!(chunk.text, "Benefit: Gym → Free");
        assert_eq!(chunk.char_start, 40);
        assert!(store.get_chunk(9).await?.is_none());

        assert_eq!(store.search_text("gym", false).await?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_cosine_similarity() {
        let a = v(&[1.0, 0.0, 0.0]);
        assert_eq!(cosine_similarity(&a, &a), 1.0);

        // Orthogonal
        assert_eq!(cosine_similarity(&v(&[1.0, 0.0]), &v(&[0.0, 1.0])), 0.0);

        // Opposite
        assert_eq!(cosine_similarity(&v(&[1.0, 0.0]), &v(&[-1.0, 0.0])), -1.0);

        let similarity = cosine_similarity(&v(&[0.6, 0.8]), &v(&[0.8, 0.6]));
        assert!((similarity - 0.96).abs() < 0.01);

        // Zero vector
        assert_eq!(cosine_similarity(&v(&[0.0, 0.0]), &v(&[1.0, 1.0])), 0.0);

        // Different lengths
        assert_eq!(cosine_similarity(&v(&[1.0, 2.0]), &v(&[1.0, 2.0, 3.0])), 0.0);
    }
}
