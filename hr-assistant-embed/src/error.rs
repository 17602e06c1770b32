//! Error types for the embedding system

/// Result type for embedding operations.
///
/// This is a convenience type alias that uses [`EmbedError`] as the error type.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// This enum covers configuration mistakes, local model loading failures and
/// failures of the remote embeddings endpoint. Each variant keeps the
/// underlying error as its source so callers can log the full chain.
///
/// # Error Categories
///
/// - **Configuration Errors**: Unknown model names, missing API keys
/// - **Initialization Errors**: Failures while loading a local ONNX model
/// - **Runtime Errors**: Problems during embedding generation
/// - **Remote Errors**: Transport failures and non-success HTTP statuses
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when model configuration is invalid
    #[error("Invalid model configuration: {message}")]
    InvalidConfig { message: String },

    /// Error during model initialization
    #[error("Model initialization failed: {source}")]
    ModelInitialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error during embedding generation
    #[error("Embedding generation failed: {source}")]
    EmbeddingGeneration {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The embeddings endpoint answered with a non-success status
    #[error("Embeddings request failed ({status}): {body}")]
    Http { status: u16, body: String },

    /// Transport-level failure talking to the embeddings endpoint
    #[error("Embeddings request error: {source}")]
    Request {
        #[from]
        source: reqwest::Error,
    },

    /// Async task join errors
    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl EmbedError {
    /// Create a model initialization error from any error type.
    pub fn model_init<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::ModelInitialization {
            source: source.into(),
        }
    }

    /// Create an embedding generation error from any error type.
    pub fn embedding_gen<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::EmbeddingGeneration {
            source: source.into(),
        }
    }

    /// Create an invalid configuration error with a custom message.
    ///
    /// Used for configuration validation errors such as unknown model names
    /// or a remote backend without an API key.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
