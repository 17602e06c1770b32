//! This module turns formatted HR documents into overlapping retrieval chunks.
//!
//! The documents are joined into one corpus, separated by blank lines, and a
//! sliding window is moved across it. Each window holds at most
//! `max_chunk_size` characters and the next window starts `overlap` characters
//! before the previous one ended, so neighbouring chunks always share exactly
//! `overlap` characters of context.
//!
//! # Boundaries
//!
//! Cutting at exactly `max_chunk_size` would routinely split a policy line in
//! half. Before cutting, the builder looks back over the last
//! `boundary_tolerance` characters of the window for a cheap boundary and cuts
//! just after it. Boundaries are tried from most to least significant:
//!
//! 1. paragraph break (`\n\n`), which is also the seam between two documents
//! 2. line break
//! 3. sentence end (`.`, `!` or `?` followed by a space)
//!
//! If none is found the window is cut at exactly `max_chunk_size`.
//!
//! All offsets are in characters, not bytes, so multi-byte text such as the
//! `→` in policy lines never splits a code point.
//!
//! # Example
//!
//! ```
//! use hr_assistant_context::{ChunkingConfig, CorpusBuilder};
//!
//! let builder = CorpusBuilder::new(ChunkingConfig::new(500, 50)).unwrap();
//! let corpus = "x".repeat(1200);
//! let chunks = builder.split(&corpus);
//!
//! let starts: Vec<usize> = chunks.iter().map(|c| c.char_start).collect();
//! assert_eq!(starts, vec![0, 450, 900]);
//! assert!(chunks.iter().all(|c| c.text.chars().count() <= 500));
//! ```

use crate::document::Document;
use crate::error::{ContextError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Separator placed between documents when they are joined into a corpus.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Boundary patterns, ordered from most significant to least significant.
pub const BOUNDARY_DELIMITERS: &[&str] = &[
    r"\n\n",     // Paragraphs and document seams
    r"\n",       // Line breaks
    r"[.!?] ", // Sentence ends
];

/// Configuration for the sliding window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum size of each chunk in characters
    pub max_chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub overlap: usize,
    /// How far back from the hard cut to look for a boundary
    pub boundary_tolerance: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 500,
            overlap: 50,
            boundary_tolerance: 100,
        }
    }
}

impl ChunkingConfig {
    pub fn new(max_chunk_size: usize, overlap: usize) -> Self {
        Self {
            max_chunk_size,
            overlap,
            ..Self::default()
        }
    }

    pub fn with_boundary_tolerance(mut self, boundary_tolerance: usize) -> Self {
        self.boundary_tolerance = boundary_tolerance;
        self
    }

    /// Checks the window parameters before any text is split.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(ContextError::config("max_chunk_size must be greater than zero"));
        }
        if self.overlap >= self.max_chunk_size {
            return Err(ContextError::config(format!(
                "overlap ({}) must be smaller than max_chunk_size ({})",
                self.overlap, self.max_chunk_size
            )));
        }
        Ok(())
    }
}

/// A window of the corpus used as the retrieval unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The position of this chunk in the corpus (0-indexed).
    pub sequence: usize,
    /// Character offset of the first character of this chunk.
    pub char_start: usize,
    /// Character offset one past the last character of this chunk.
    pub char_end: usize,
    /// The text content of this chunk.
    pub text: String,
}

impl Chunk {
    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// Joins documents into a single corpus, one paragraph per document.
pub fn join_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(Document::as_str)
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

/// Splits a corpus of documents into overlapping chunks.
#[derive(Debug, Clone)]
pub struct CorpusBuilder {
    config: ChunkingConfig,
    delimiters: Vec<Regex>,
}

impl CorpusBuilder {
    /// Creates a builder, failing with [`ContextError::Config`] when
    /// `overlap >= max_chunk_size`.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;

        let delimiters = BOUNDARY_DELIMITERS
            .iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .map_err(|e| ContextError::config(format!("bad delimiter {pattern}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { config, delimiters })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Joins the documents and splits the resulting corpus.
    pub fn build(&self, documents: &[Document]) -> Vec<Chunk> {
        let corpus = join_documents(documents);
        let chunks = self.split(&corpus);

        tracing::debug!(
            "Built {} chunks from {} documents (max size: {}, overlap: {})",
            chunks.len(),
            documents.len(),
            self.config.max_chunk_size,
            self.config.overlap
        );

        chunks
    }

    /// Splits raw corpus text with the sliding window.
    pub fn split(&self, corpus: &str) -> Vec<Chunk> {
        // Byte offset of every character, plus the end of the string, so that
        // character positions can be sliced directly.
        let offsets: Vec<usize> = corpus
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(corpus.len()))
            .collect();
        let total = offsets.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let end = if total - start <= self.config.max_chunk_size {
                total
            } else {
                self.find_cut(corpus, &offsets, start)
            };

            chunks.push(Chunk {
                sequence: chunks.len(),
                char_start: start,
                char_end: end,
                text: corpus[offsets[start]..offsets[end]].to_string(),
            });

            if end == total {
                break;
            }
            // find_cut guarantees end > start + overlap, so the window advances
            start = end - self.config.overlap;
        }

        chunks
    }

    // Returns the character offset to end the chunk starting at `start`.
    fn find_cut(&self, corpus: &str, offsets: &[usize], start: usize) -> usize {
        let target = start + self.config.max_chunk_size;
        let floor = (start + self.config.overlap + 1)
            .max(target.saturating_sub(self.config.boundary_tolerance));
        if floor >= target {
            return target;
        }

        let window = &corpus[offsets[floor]..offsets[target]];
        for delimiter in &self.delimiters {
            if let Some(mat) = delimiter.find_iter(window).last() {
                return floor + window[..mat.end()].chars().count();
            }
        }

        target
    }
}
