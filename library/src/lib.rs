//! # Command Library
//!
//! This crate loads the command library that backs the CADRAG retrieval
//! engine: built-in CAD commands, extension-script commands, and
//! user-contributed code snippets, all stored as pipe-delimited text files.
//!
//! Loading is deliberately forgiving: a malformed record or a missing
//! source file is logged and skipped, never fatal. The loader is the only
//! place where [`CommandEntry`] values are constructed from raw text.

pub mod entry;
pub mod error;
pub mod loader;

pub use entry::{CommandEntry, SourceKind};
pub use error::{LibraryError, Result};
pub use loader::{LibraryLoader, LibrarySources};
