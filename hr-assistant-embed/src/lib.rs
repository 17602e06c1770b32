//! # hr-assistant-embed
//!
//! Text embeddings for the HR assistant. Two providers sit behind one
//! [`EmbeddingProvider`] trait:
//!
//! - [`OpenAiEmbedProvider`]: an OpenAI-compatible `/embeddings` endpoint
//!   (the default, `text-embedding-ada-002`)
//! - [`FastEmbedProvider`]: a local ONNX model loaded through fastembed
//!
//! Vectors come back as half-precision (`f16`) so the index stays small.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hr_assistant_embed::{EmbedConfig, create_provider};
//!
//! # async fn example() -> hr_assistant_embed::Result<()> {
//! let provider = create_provider(EmbedConfig::fastembed("/tmp/models")).await?;
//!
//! let texts = vec!["Policy: Remote Work (General) → Two days a week".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! Every provider is an owned value: nothing is cached in process-wide state,
//! so two providers built from the same config load the model twice.

pub mod config;
pub mod error;
pub mod openai;
pub mod provider;

use std::sync::Arc;

pub use config::{EmbedBackend, EmbedConfig, EmbedConfigBuilder};
pub use error::{EmbedError, Result};
pub use openai::OpenAiEmbedProvider;
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider, fastembed_model};

/// Build a ready-to-use provider for the configured backend.
///
/// Local models are loaded (and downloaded on first use) before this returns.
pub async fn create_provider(config: EmbedConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    config.validate()?;
    tracing::info!(
        "Creating {:?} embedding provider with model {}",
        config.backend,
        config.model_name
    );
    match config.backend {
        EmbedBackend::OpenAi => Ok(Arc::new(OpenAiEmbedProvider::new(config)?)),
        EmbedBackend::FastEmbed => Ok(Arc::new(FastEmbedProvider::create(config).await?)),
    }
}
