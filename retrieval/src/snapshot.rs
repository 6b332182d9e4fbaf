//! On-disk index snapshot.
//!
//! A successful rebuild persists the full index so a restart can publish
//! it without re-embedding the whole library. The snapshot is only reused
//! when its entry list still matches what the loader produces from the
//! current source files; any drift forces a fresh build.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use cadrag_embeddings::Embedding;
use cadrag_library::CommandEntry;

use crate::error::{Result, RetrievalError};
use crate::index::VectorIndex;

/// Serialized form of a [`VectorIndex`].
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexSnapshot {
    entries: Vec<CommandEntry>,
    vectors: Vec<Embedding>,
    dimension: usize,
}

impl IndexSnapshot {
    /// Persist an index atomically (write to a temp file, then rename).
    pub async fn save(path: &Path, index: &VectorIndex) -> Result<()> {
        let snapshot = IndexSnapshot {
            entries: index.entries().to_vec(),
            vectors: index.vectors().to_vec(),
            dimension: index.dimension(),
        };

        let content = serde_json::to_string(&snapshot)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, path).await?;

        debug!("Saved index snapshot: {}", path.display());
        Ok(())
    }

    /// Load a persisted index, validating it against the freshly loaded
    /// entry list.
    ///
    /// Returns `Ok(None)` when there is no snapshot, it cannot be parsed,
    /// or it is stale (its entries differ from `expected`). Returns
    /// [`RetrievalError::Unsynced`] when entry and vector counts disagree,
    /// so the caller discards it and forces a full rebuild.
    pub async fn load(path: &Path, expected: &[CommandEntry]) -> Result<Option<VectorIndex>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).await?;
        let snapshot: IndexSnapshot = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                warn!("Discarding unreadable index snapshot {}: {e}", path.display());
                return Ok(None);
            }
        };

        if snapshot.entries.len() != snapshot.vectors.len() {
            return Err(RetrievalError::Unsynced {
                entries: snapshot.entries.len(),
                vectors: snapshot.vectors.len(),
            });
        }

        if snapshot.entries != expected {
            info!("Index snapshot is stale, a full rebuild is required");
            return Ok(None);
        }

        let index = VectorIndex::new(snapshot.entries, snapshot.vectors, snapshot.dimension)?;
        info!(
            "Loaded index snapshot with {} entries from {}",
            index.len(),
            path.display()
        );
        Ok(Some(index))
    }
}
