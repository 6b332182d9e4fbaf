//! Error types for the retrieval core.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval core.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Library loading error.
    #[error("library error: {0}")]
    Library(#[from] cadrag_library::LibraryError),

    /// Embedding provider error.
    #[error("embedding error: {0}")]
    Embedding(#[from] cadrag_embeddings::EmbeddingError),

    /// A rebuild produced zero usable entries.
    #[error("index build failed: no entries embedded successfully")]
    BuildFailed,

    /// Entry and vector counts disagree (corrupt construction input or
    /// persisted snapshot).
    #[error("index unsynced: {entries} entries but {vectors} vectors")]
    Unsynced { entries: usize, vectors: usize },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
