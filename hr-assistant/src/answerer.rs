//! Retrieval-augmented answering.

use crate::error::{AssistantError, Result};
use crate::generation::{GenerationRequest, GenerativeModel};
use hr_assistant_context::Chunk;
use hr_assistant_retriever::IndexStore;
use serde::Serialize;
use std::sync::Arc;

/// Instructions placed before the retrieved context.
pub const PROMPT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// An answer and the chunks it was conditioned on, in retrieval order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<Chunk>,
}

/// Builds the prompt sent to the model.
///
/// With no sources the question goes out unchanged.
pub fn build_prompt(query: &str, sources: &[Chunk]) -> String {
    if sources.is_empty() {
        return query.to_string();
    }
    let context = sources
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{PROMPT_PREAMBLE}\n\n{context}\n\nQuestion: {query}\nHelpful Answer:")
}

pub struct Answerer {
    index: Arc<IndexStore>,
    model: Arc<dyn GenerativeModel>,
    top_k: usize,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl Answerer {
    pub fn new(index: Arc<IndexStore>, model: Arc<dyn GenerativeModel>, top_k: usize) -> Self {
        Self {
            index,
            model,
            top_k,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_sampling(self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        Self {
            temperature,
            max_tokens,
            ..self
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieves context for `query` and asks the model.
    pub async fn answer(&self, query: &str) -> Result<QueryResult> {
        if query.trim().is_empty() {
            return Err(AssistantError::InvalidQuery {
                message: "the question is empty".to_string(),
            });
        }

        let hits = self
            .index
            .search(query, self.top_k)
            .await
            .map_err(AssistantError::index)?;
        tracing::debug!(
            "Retrieved {} sources (scores: {:?})",
            hits.len(),
            hits.iter().map(|h| h.score).collect::<Vec<_>>()
        );
        let sources: Vec<Chunk> = hits.into_iter().map(|hit| hit.chunk).collect();

        let request = GenerationRequest {
            prompt: build_prompt(query, &sources),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let answer = self.model.generate(&request).await?;

        Ok(QueryResult { answer, sources })
    }
}
