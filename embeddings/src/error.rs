//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur when generating embeddings.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// API request failed with a non-success status.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Provider returned a response we could not use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Two vectors of different lengths were compared.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// HTTP transport error (includes timeouts).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
