//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default remote embedding model, matching what the HR sheet index was built with.
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-ada-002";

/// Default local embedding model.
pub const DEFAULT_FASTEMBED_MODEL: &str = "all-MiniLM-L6-v2";

/// Which engine computes the vectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedBackend {
    /// OpenAI-compatible `/embeddings` endpoint
    #[default]
    OpenAi,
    /// Local ONNX model through fastembed
    FastEmbed,
}

/// Configuration for embedding models
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
#[serde(default)]
pub struct EmbedConfig {
    /// Engine used to compute embeddings
    #[builder(default)]
    pub backend: EmbedBackend,
    /// Name of the embedding model to use
    pub model_name: String,
    /// Directory where local models are cached
    #[builder(default = r#"PathBuf::from("models")"#)]
    pub cache_dir: PathBuf,
    /// Base URL of the OpenAI-compatible API
    #[builder(default = r#""https://api.openai.com/v1".to_string()"#)]
    pub base_url: String,
    /// API key for the remote backend; never serialized
    #[builder(default)]
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Request timeout for the remote backend, in seconds
    #[builder(default = "60")]
    pub timeout_secs: u64,
    /// Maximum batch size for embedding generation
    #[builder(default = "32")]
    pub batch_size: usize,
    /// Whether to normalize embeddings
    #[builder(default = "true")]
    pub normalize: bool,
}

impl EmbedConfig {
    /// Create a new embedding configuration using the builder
    pub fn builder() -> EmbedConfigBuilder {
        EmbedConfigBuilder::default()
    }

    /// Remote OpenAI embeddings with the default model
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            backend: EmbedBackend::OpenAi,
            model_name: DEFAULT_OPENAI_MODEL.to_string(),
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Local fastembed model cached under `cache_dir`
    pub fn fastembed<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self {
            backend: EmbedBackend::FastEmbed,
            model_name: DEFAULT_FASTEMBED_MODEL.to_string(),
            cache_dir: cache_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Set the model name (builder style)
    pub fn with_model(self, model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..self
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// Set the API key, falling back to `OPENAI_API_KEY` when not given
    pub fn with_api_key_from_env(self) -> Self {
        if self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) {
            return self;
        }
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            ..self
        }
    }

    /// Endpoint URL for remote embedding requests
    pub fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }

    /// Validate settings that can be checked without loading anything
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(EmbedError::invalid_config("model_name must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be greater than zero"));
        }
        if self.backend == EmbedBackend::OpenAi
            && self.api_key.as_deref().is_none_or(|k| k.trim().is_empty())
        {
            return Err(EmbedError::invalid_config(
                "the openai embedding backend needs an API key (set OPENAI_API_KEY)",
            ));
        }

        tracing::debug!("Embedding configuration valid for: {}", self.model_name);
        Ok(())
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        EmbedConfigBuilder::default()
            .model_name(DEFAULT_OPENAI_MODEL)
            .build()
            .expect("Failed to build default EmbedConfig")
    }
}
