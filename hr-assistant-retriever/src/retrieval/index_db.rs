//! Core SQLite operations for the chunk index.
//!
//! This module is the data layer under [`IndexStore`](super::index_store::IndexStore).
//! It stores the chunked HR corpus with one f16 embedding per chunk, plus a
//! single metadata row describing how the vectors were produced.
//!
//! ## Database Schema
//!
//! ```sql
//! -- One row per chunk of the corpus, in corpus order
//! CREATE TABLE chunks (
//!     sequence INTEGER PRIMARY KEY,    -- position of the chunk in the corpus
//!     char_start INTEGER NOT NULL,     -- character offset where the chunk begins
//!     char_end INTEGER NOT NULL,       -- character offset one past the chunk end
//!     text TEXT NOT NULL,              -- chunk text
//!     embedding BLOB NOT NULL          -- f16 vector, native byte order
//! );
//!
//! -- At most one row: which chunk set and model the vectors belong to
//! CREATE TABLE index_meta (
//!     id INTEGER PRIMARY KEY CHECK (id = 1),
//!     fingerprint TEXT NOT NULL,       -- blake3 hex over model name + chunk texts
//!     model_name TEXT NOT NULL,
//!     provider TEXT NOT NULL,
//!     dimension INTEGER NOT NULL,
//!     chunk_count INTEGER NOT NULL,
//!     built_at TEXT NOT NULL           -- RFC 3339, UTC
//! );
//! ```
//!
//! ## SQLite settings
//!
//! WAL journal, 64KB pages for the embedding blobs, full auto-vacuum so a
//! replaced index does not leave the file bloated.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use half::f16;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

/// File name of the index database inside the index directory.
pub const DB_FILE_NAME: &str = ".hr-assistant.db";

/// A chunk row as persisted, with its vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRow {
    pub sequence: usize,
    pub char_start: usize,
    pub char_end: usize,
    pub text: String,
    pub embedding: Vec<f16>,
}

/// Describes the vectors currently stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexMeta {
    /// Hex blake3 digest of the embedding model name and every chunk text
    pub fingerprint: String,
    pub model_name: String,
    pub provider: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub built_at: DateTime<Utc>,
}

/// SQLite-backed chunk index.
#[derive(Clone, Debug)]
pub struct IndexDb {
    pub(crate) base: PathBuf,
    pool: SqlitePool,
}

impl IndexDb {
    /// Opens (creating if needed) `<base>/.hr-assistant.db`.
    pub async fn open(base: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(base).await?;
        let db_path = base.join(DB_FILE_NAME);

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .create_if_missing(true)
                .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::Full)
                .page_size(1 << 16)
                .optimize_on_close(true, 1 << 10),
        )
        .await?;
        Self::new_with_pool(base, pool).await
    }

    /// Opens an in-memory index, used by tests.
    pub async fn open_memory() -> Result<Self> {
        // Every pooled connection to `:memory:` is its own database, so keep exactly one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::new_with_pool(Path::new(":memory:"), pool).await
    }

    async fn new_with_pool(base: &Path, pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;

        Ok(Self {
            base: base.to_path_buf(),
            pool,
        })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                sequence INTEGER PRIMARY KEY,
                char_start INTEGER NOT NULL,
                char_end INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS index_meta (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                fingerprint TEXT NOT NULL,
                model_name TEXT NOT NULL,
                provider TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                chunk_count INTEGER NOT NULL,
                built_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Base directory of this index
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Atomically replaces every stored chunk and the metadata row.
    ///
    /// Either the whole new set becomes visible or the previous one stays.
    pub async fn replace_all(&self, rows: &[ChunkRow], meta: &IndexMeta) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM index_meta")
            .execute(&mut *tx)
            .await?;

        for row in rows {
            let embedding_bytes = bytemuck::cast_slice::<f16, u8>(&row.embedding);
            sqlx::query(
                r#"
                INSERT INTO chunks (sequence, char_start, char_end, text, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(row.sequence as i64)
            .bind(row.char_start as i64)
            .bind(row.char_end as i64)
            .bind(&row.text)
            .bind(embedding_bytes)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO index_meta (id, fingerprint, model_name, provider, dimension, chunk_count, built_at)
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&meta.fingerprint)
        .bind(&meta.model_name)
        .bind(&meta.provider)
        .bind(meta.dimension as i64)
        .bind(meta.chunk_count as i64)
        .bind(meta.built_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Metadata of the stored index, `None` if nothing was ever indexed.
    pub async fn get_meta(&self) -> Result<Option<IndexMeta>> {
        let row = sqlx::query(
            "SELECT fingerprint, model_name, provider, dimension, chunk_count, built_at FROM index_meta WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let built_at: String = row.get("built_at");
        let built_at = DateTime::parse_from_rfc3339(&built_at)
            .map_err(|e| anyhow!("Corrupt built_at timestamp {built_at:?}: {e}"))?
            .with_timezone(&Utc);
        let dimension: i64 = row.get("dimension");
        let chunk_count: i64 = row.get("chunk_count");

        Ok(Some(IndexMeta {
            fingerprint: row.get("fingerprint"),
            model_name: row.get("model_name"),
            provider: row.get("provider"),
            dimension: dimension as usize,
            chunk_count: chunk_count as usize,
            built_at,
        }))
    }

    /// Get a chunk by its corpus position
    pub async fn get_chunk(&self, sequence: usize) -> Result<Option<ChunkRow>> {
        let row = sqlx::query(
            "SELECT sequence, char_start, char_end, text, embedding FROM chunks WHERE sequence = ?1",
        )
        .bind(sequence as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Self::row_to_chunk(&row)))
    }

    /// Get all chunks in corpus order
    pub async fn get_all_chunks(&self) -> Result<Vec<ChunkRow>> {
        let rows = sqlx::query(
            "SELECT sequence, char_start, char_end, text, embedding FROM chunks ORDER BY sequence",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::row_to_chunk).collect())
    }

    /// Chunks whose text contains `term`
    pub async fn search_text(&self, term: &str, case_sensitive: bool) -> Result<Vec<ChunkRow>> {
        // LIKE is case-insensitive for ASCII by default; instr() is not
        let (query, bound) = if case_sensitive {
            (
                "SELECT sequence, char_start, char_end, text, embedding
                 FROM chunks
                 WHERE instr(text, ?1) > 0
                 ORDER BY sequence",
                term.to_string(),
            )
        } else {
            let escaped_term = term
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            (
                "SELECT sequence, char_start, char_end, text, embedding
                 FROM chunks
                 WHERE text LIKE ?1 ESCAPE '\\'
                 ORDER BY sequence",
                format!("%{escaped_term}%"),
            )
        };

        let rows = sqlx::query(query)
            .bind(bound)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(Self::row_to_chunk).collect())
    }

    /// Number of stored chunks
    pub async fn count_chunks(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    fn row_to_chunk(row: &SqliteRow) -> ChunkRow {
        let sequence: i64 = row.get("sequence");
        let char_start: i64 = row.get("char_start");
        let char_end: i64 = row.get("char_end");
        let embedding_bytes: Vec<u8> = row.get("embedding");

        ChunkRow {
            sequence: sequence as usize,
            char_start: char_start as usize,
            char_end: char_end as usize,
            text: row.get("text"),
            embedding: decode_embedding(&embedding_bytes),
        }
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Blobs read back from SQLite carry no alignment guarantee, so copy
/// element-wise instead of casting the slice in place.
fn decode_embedding(bytes: &[u8]) -> Vec<f16> {
    bytes
        .chunks_exact(2)
        .map(|pair| f16::from_ne_bytes([pair[0], pair[1]]))
        .collect()
}
