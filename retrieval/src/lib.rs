//! # Retrieval
//!
//! The core of the CADRAG engine: immutable vector-index snapshots with
//! ranked cosine-similarity search, out-of-place rebuilds with a single
//! atomic publish, and an on-disk snapshot that survives restarts.
//!
//! ## Architecture
//!
//! ```text
//! LibraryLoader ──► IndexBuilder ──► VectorIndex (immutable)
//!                        │                ▲
//!                        ▼                │ atomic swap
//!              RebuildCoordinator ────────┘
//!                        │
//!                        ▼
//!                  IndexSnapshot (disk)
//! ```
//!
//! Searches only ever touch the currently published index; a rebuild in
//! flight is invisible to readers until its one-pointer publish.

pub mod builder;
pub mod coordinator;
pub mod error;
pub mod index;
pub mod snapshot;

pub use builder::{BuildOutput, IndexBuilder};
pub use coordinator::{RebuildCoordinator, RebuildOutcome, RebuildStats};
pub use error::{Result, RetrievalError};
pub use index::{SearchHit, SourceCounts, VectorIndex};
pub use snapshot::IndexSnapshot;
