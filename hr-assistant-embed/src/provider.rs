//! Embedding provider implementations

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use half::f16;
use std::sync::{Arc, Mutex};

/// Result of embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f16>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result from a vector of f16 embeddings.
    ///
    /// The dimension is inferred from the first embedding vector, or 0 when
    /// there are no embeddings.
    pub fn new(embeddings: Vec<Vec<f16>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Returns the number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding providers that can generate embeddings from text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>>;

    /// Generate embeddings for multiple texts (batch processing)
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Get the dimension of embeddings produced by this provider, 0 if not yet known
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;

    /// Get the model the vectors come from; vectors from different models are not comparable
    fn model_name(&self) -> &str;
}

/// Convert f32 embeddings to f16, optionally scaling each vector to unit length
pub(crate) fn convert_to_f16(embeddings: Vec<Vec<f32>>, normalize: bool) -> Vec<Vec<f16>> {
    embeddings
        .into_iter()
        .map(|embedding| {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            let scale = if normalize && norm > 0.0 { norm } else { 1.0 };
            embedding
                .into_iter()
                .map(|value| f16::from_f32(value / scale))
                .collect()
        })
        .collect()
}

/// Maps a configured model name onto one of fastembed's built-in models
pub fn fastembed_model(name: &str) -> Result<EmbeddingModel> {
    match name.to_ascii_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" | "baai/bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" | "nomic-ai/nomic-embed-text-v1.5" => {
            Ok(EmbeddingModel::NomicEmbedTextV15)
        }
        other => Err(EmbedError::invalid_config(format!(
            "Unsupported local embedding model: {other}"
        ))),
    }
}

/// FastEmbed-based embedding provider using local ONNX models
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Option<Arc<Mutex<TextEmbedding>>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("model", &self.model.is_some())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Creates a new uninitialized provider. Call [`initialize`](Self::initialize) before use.
    pub fn new(config: EmbedConfig) -> Self {
        Self {
            config,
            model: None,
            dimension: 0,
        }
    }

    /// Downloads (on first use) and loads the embedding model.
    pub async fn initialize(&mut self) -> Result<()> {
        tracing::info!(
            "Initializing FastEmbed provider for model: {}",
            self.config.model_name
        );

        let model_kind = fastembed_model(&self.config.model_name)?;
        let config = self.config.clone();

        // Model loading is CPU and disk bound
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                tracing::info!("Loading embedding model: {}", config.model_name);

                let init_options = InitOptions::new(model_kind)
                    .with_cache_dir(config.cache_dir.clone())
                    .with_show_download_progress(true);

                let mut model = TextEmbedding::try_new(init_options).map_err(EmbedError::model_init)?;

                // Get dimension by generating a test embedding
                let test_embeddings = model
                    .embed(vec!["test".to_string()], None)
                    .map_err(EmbedError::model_init)?;
                let dimension = test_embeddings.first().map(|emb| emb.len()).unwrap_or(0);

                tracing::info!("Model loaded successfully. Dimension: {}", dimension);
                Ok((model, dimension))
            })
            .await??;

        if dimension == 0 {
            return Err(EmbedError::invalid_config(
                "Model validation failed: empty embedding",
            ));
        }

        self.model = Some(Arc::new(Mutex::new(model)));
        self.dimension = dimension;
        Ok(())
    }

    /// Creates and initializes a provider in one step.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let mut provider = Self::new(config);
        provider.initialize().await?;
        Ok(provider)
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        let texts = vec![text.to_string()];
        let result = self.embed_texts(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_config("No embedding generated for text"))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        let model = self.model.as_ref().ok_or_else(|| {
            EmbedError::invalid_config("Model not initialized. Call initialize() first.")
        })?;

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let batch = batch.to_vec();
            let model_clone = Arc::clone(model);

            let batch_embeddings = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                tracing::debug!("Processing batch of {} texts", batch.len());

                let mut model_guard = model_clone
                    .lock()
                    .map_err(|_| EmbedError::invalid_config("Embedding model lock poisoned"))?;
                model_guard
                    .embed(batch, None)
                    .map_err(EmbedError::embedding_gen)
            })
            .await??;

            all_embeddings.extend(convert_to_f16(batch_embeddings, self.config.normalize));
        }

        tracing::debug!("Generated {} embeddings", all_embeddings.len());
        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_embedding_result() {
        let embeddings = vec![
            vec![f16::from_f32(0.1), f16::from_f32(0.2)],
            vec![f16::from_f32(0.3), f16::from_f32(0.4)],
        ];
        let result = EmbeddingResult::new(embeddings);

        assert_eq!(result.len(), 2);
        assert_eq!(result.dimension, 2);
        assert!(!result.is_empty());
        assert!(EmbeddingResult::new(vec![]).is_empty());
    }

    #[test]
    fn test_convert_to_f16_normalizes() {
        let converted = convert_to_f16(vec![vec![3.0, 4.0], vec![0.0, 0.0]], true);
        assert_eq!(converted[0], vec![f16::from_f32(0.6), f16::from_f32(0.8)]);
        // Zero vectors are left alone rather than divided by zero
        assert_eq!(converted[1], vec![f16::ZERO, f16::ZERO]);

        let raw = convert_to_f16(vec![vec![3.0, 4.0]], false);
        assert_eq!(raw[0], vec![f16::from_f32(3.0), f16::from_f32(4.0)]);
    }

    #[test]
    fn test_fastembed_model_names() {
        assert!(matches!(
            fastembed_model("all-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            fastembed_model("BAAI/bge-small-en-v1.5"),
            Ok(EmbeddingModel::BGESmallENV15)
        ));
        assert!(matches!(
            fastembed_model("text-embedding-ada-002"),
            Err(EmbedError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_fastembed_provider_creation() {
        let temp_dir = tempdir().unwrap();
        let provider = FastEmbedProvider::new(EmbedConfig::fastembed(temp_dir.path()));
        assert_eq!(provider.provider_name(), "fastembed");
        assert_eq!(provider.model_name(), "all-MiniLM-L6-v2");
        assert_eq!(provider.embedding_dimension(), 0);
    }

    #[tokio::test]
    async fn test_uninitialized_provider_errors() {
        let temp_dir = tempdir().unwrap();
        let provider = FastEmbedProvider::new(EmbedConfig::fastembed(temp_dir.path()));
        let result = provider.embed_text("leave policy").await;
        assert!(matches!(result, Err(EmbedError::InvalidConfig { .. })));
    }

    #[tokio::test]
    #[ignore] // Integration test: downloads a real ONNX model - run with: cargo test test_fastembed_similarity -- --ignored
    async fn test_fastembed_similarity() -> Result<()> {
        let temp_dir = tempdir().unwrap();
        let provider = FastEmbedProvider::create(EmbedConfig::fastembed(temp_dir.path())).await?;
        assert_eq!(provider.embedding_dimension(), 384);

        let texts = vec![
            "Leave balance for sam@example.com: Casual=2, Sick=11".to_string(),
            "How many sick days do I have left?".to_string(),
            "Benefit: Gym → Free membership".to_string(),
        ];
        let result = provider.embed_texts(&texts).await?;
        assert_eq!(result.len(), 3);

        let dot = |a: &[f16], b: &[f16]| -> f32 {
            a.iter().zip(b).map(|(x, y)| x.to_f32() * y.to_f32()).sum()
        };
        let leave_query = dot(&result.embeddings[0], &result.embeddings[1]);
        let gym_query = dot(&result.embeddings[2], &result.embeddings[1]);
        assert!(leave_query > gym_query);
        Ok(())
    }
}
