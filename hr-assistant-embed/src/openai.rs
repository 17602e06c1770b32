//! OpenAI-compatible embeddings client.

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, convert_to_f16};
use async_trait::async_trait;
use half::f16;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Embeddings provider that talks to an OpenAI-compatible `/embeddings` endpoint.
///
/// Failures are passed straight through: there is no retry or backoff here,
/// the caller decides what a failed embedding means.
#[derive(Debug)]
pub struct OpenAiEmbedProvider {
    client: Client,
    endpoint: String,
    config: EmbedConfig,
    dimension: AtomicUsize,
}

impl OpenAiEmbedProvider {
    /// Builds a new client; fails if the configuration has no API key.
    pub fn new(config: EmbedConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config.api_key.as_deref().unwrap_or_default().trim();

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {api_key}");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| EmbedError::invalid_config("invalid OpenAI API key"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.embeddings_url(),
            dimension: AtomicUsize::new(known_dimension(&config.model_name)),
            config,
        })
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.config.model_name,
            input: inputs,
        };
        let resp = self.client.post(&self.endpoint).json(&request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbedError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = resp.json().await?;
        parse_embeddings(parsed, inputs.len())
    }
}

/// Published output sizes of the common OpenAI models
fn known_dimension(model: &str) -> usize {
    match model {
        "text-embedding-ada-002" | "text-embedding-3-small" => 1536,
        "text-embedding-3-large" => 3072,
        _ => 0,
    }
}

fn parse_embeddings(mut parsed: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    parsed.data.sort_by_key(|entry| entry.index);
    if parsed.data.len() != expected {
        return Err(EmbedError::embedding_gen(format!(
            "endpoint returned {} embeddings for {} inputs",
            parsed.data.len(),
            expected
        )));
    }
    Ok(parsed
        .data
        .into_iter()
        .map(|entry| entry.embedding)
        .collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        let texts = vec![text.to_string()];
        let result = self.embed_texts(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::embedding_gen("No embedding generated for text"))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!(
            "Requesting {} embeddings from {}",
            texts.len(),
            self.endpoint
        );

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let raw = self.embed_batch(batch).await?;
            all_embeddings.extend(convert_to_f16(raw, self.config.normalize));
        }

        let result = EmbeddingResult::new(all_embeddings);
        self.dimension.store(result.dimension, Ordering::Relaxed);
        Ok(result)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension.load(Ordering::Relaxed)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_embeddings_sorts_by_index() {
        let parsed: EmbeddingResponse = serde_json::from_str(
            r#"{"object": "list", "data": [
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
            ], "model": "text-embedding-ada-002"}"#,
        )
        .unwrap();

        let embeddings = parse_embeddings(parsed, 2).unwrap();
        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_embeddings_count_mismatch() {
        let parsed: EmbeddingResponse =
            serde_json::from_str(r#"{"data": [{"index": 0, "embedding": [1.0]}]}"#).unwrap();
        assert!(matches!(
            parse_embeddings(parsed, 3),
            Err(EmbedError::EmbeddingGeneration { .. })
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let inputs = vec!["Policy: WFH".to_string()];
        let body = serde_json::to_value(EmbeddingRequest {
            model: "text-embedding-ada-002",
            input: &inputs,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"model": "text-embedding-ada-002", "input": ["Policy: WFH"]})
        );
    }

    #[test]
    fn test_provider_metadata() {
        let provider = OpenAiEmbedProvider::new(EmbedConfig::openai("sk-test")).unwrap();
        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.model_name(), "text-embedding-ada-002");
        assert_eq!(provider.embedding_dimension(), 1536);
    }

    #[test]
    fn test_missing_key_rejected() {
        let mut config = EmbedConfig::default();
        config.api_key = None;
        assert!(OpenAiEmbedProvider::new(config).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let config = EmbedConfig::builder()
            .model_name("text-embedding-ada-002")
            .api_key(Some("sk-test".to_string()))
            .base_url("http://127.0.0.1:9")
            .timeout_secs(2u64)
            .build()
            .unwrap();
        let provider = OpenAiEmbedProvider::new(config).unwrap();
        let result = provider.embed_text("annual leave").await;
        assert!(matches!(result, Err(EmbedError::Request { .. })));
    }
}
