//! Error types for library loading.

use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Errors that can occur while loading the command library.
///
/// Malformed records are not errors: the loader logs and skips them.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// IO error while reading a source file that exists.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
