//! Error taxonomy for the RAG pipeline.
//!
//! Empty retrieval results and malformed citations are deliberately absent:
//! neither is ever an error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    /// Embedding backend unavailable, unauthorized, or rate-limited.
    #[error("embedding provider error: {message}")]
    Provider { message: String, retryable: bool },

    /// Language-model backend failure.
    #[error("generation failed: {message}")]
    Generation { message: String, retryable: bool },

    /// Provider and index disagree on vector dimensionality. Always fatal;
    /// the corpus must be re-ingested with a consistent provider.
    #[error("embedding dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl RagError {
    pub fn provider(message: impl Into<String>, retryable: bool) -> Self {
        Self::Provider {
            message: message.into(),
            retryable,
        }
    }

    pub fn generation(message: impl Into<String>, retryable: bool) -> Self {
        Self::Generation {
            message: message.into(),
            retryable,
        }
    }

    /// Whether a caller-side retry policy may try the operation again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } | Self::Generation { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
