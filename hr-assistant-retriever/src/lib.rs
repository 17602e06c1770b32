//! hr-assistant-retriever: persisted vector index for the HR corpus
//!
//! Stores the chunked corpus and one embedding per chunk in SQLite and ranks
//! chunks against a question by cosine similarity.
//!
//! ## Key Modules
//!
//! - **[`retrieval`]**: the [`IndexStore`](retrieval::index_store::IndexStore)
//!   and the SQLite layer under it
//! - **[`storage`]**: storage traits with a SQLite implementation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hr_assistant_context::{ChunkingConfig, CorpusBuilder};
//! use hr_assistant_embed::{EmbedConfig, create_provider};
//! use hr_assistant_retriever::retrieval::index_store::IndexStore;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = create_provider(EmbedConfig::fastembed("models")).await?;
//! let index = IndexStore::open(Path::new("index"), provider).await?;
//!
//! let chunks = CorpusBuilder::new(ChunkingConfig::default())?
//!     .split("Policy: Remote Work (General) → Two days a week");
//! index.index(&chunks).await?;
//!
//! for hit in index.search("Can I work from home?", 4).await? {
//!     println!("{:.3} {}", hit.score, hit.chunk.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Chunks → EmbeddingProvider → IndexDb (SQLite)
//!                                  ↓
//! Query  → EmbeddingProvider → SqliteStore cosine scan → ScoredChunk
//! ```

pub mod retrieval;
pub mod storage;

pub use retrieval::index_db::{IndexDb, IndexMeta};
pub use retrieval::index_store::{IndexReport, IndexStore, ScoredChunk};
