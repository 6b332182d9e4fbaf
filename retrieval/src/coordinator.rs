//! Out-of-place rebuilds with atomic publish.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use tracing::{debug, info, warn};

use cadrag_embeddings::EmbeddingProvider;
use cadrag_library::{LibraryLoader, LibrarySources};

use crate::builder::IndexBuilder;
use crate::error::Result;
use crate::index::{SourceCounts, VectorIndex};
use crate::snapshot::IndexSnapshot;

/// Statistics from a completed rebuild.
#[derive(Debug, Clone, Copy)]
pub struct RebuildStats {
    /// Entries in the published index.
    pub entry_count: usize,

    /// Entries degraded to zero vectors.
    pub degraded: usize,

    /// Per-source entry counts.
    pub per_source: SourceCounts,
}

/// Result of a rebuild trigger.
#[derive(Debug, Clone, Copy)]
pub enum RebuildOutcome {
    /// A rebuild ran to completion and was published.
    Completed(RebuildStats),

    /// A rebuild was already in flight; this trigger was a no-op.
    ///
    /// Callers needing the very latest source files re-trigger after the
    /// in-flight rebuild completes. Source files rarely change faster than
    /// one rebuild cycle, so this is the documented coalescing policy
    /// rather than a queue.
    Coalesced,
}

/// Coordinates index rebuilds and owns the published-index pointer.
///
/// At most one rebuild runs at a time; concurrent triggers coalesce into
/// the in-flight one. The previously published index keeps serving every
/// `search` throughout a rebuild; publication is a single atomic pointer
/// store, so a reader sees either the old index or the new one, never a
/// mix. A failed rebuild leaves the published index untouched.
pub struct RebuildCoordinator {
    sources: LibrarySources,
    provider: Arc<dyn EmbeddingProvider>,
    builder: IndexBuilder,
    current: ArcSwapOption<VectorIndex>,
    building: AtomicBool,
    snapshot_path: Option<PathBuf>,
}

impl RebuildCoordinator {
    /// Create a coordinator with no published index yet.
    pub fn new(sources: LibrarySources, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            sources,
            provider,
            builder: IndexBuilder::new(),
            current: ArcSwapOption::empty(),
            building: AtomicBool::new(false),
            snapshot_path: None,
        }
    }

    /// Persist each successful rebuild to (and restore startup state from)
    /// the given snapshot file.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Override the index builder (batch size etc.).
    pub fn with_builder(mut self, builder: IndexBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// The currently published index, if any. Lock-free.
    pub fn current(&self) -> Option<Arc<VectorIndex>> {
        self.current.load_full()
    }

    /// Publish an initial index: from the snapshot when it is still valid
    /// for the current source files, otherwise via a full rebuild.
    pub async fn initialize(&self) -> Result<RebuildStats> {
        if let Some(path) = &self.snapshot_path {
            let entries = LibraryLoader::load(&self.sources).await?;

            match IndexSnapshot::load(path, &entries).await {
                Ok(Some(index)) => {
                    let stats = RebuildStats {
                        entry_count: index.len(),
                        degraded: 0,
                        per_source: index.source_counts(),
                    };
                    self.current.store(Some(Arc::new(index)));
                    return Ok(stats);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Discarding index snapshot, forcing full rebuild: {e}");
                }
            }
        }

        match self.rebuild().await? {
            RebuildOutcome::Completed(stats) => Ok(stats),
            // Unreachable during startup, but stay honest about the type.
            RebuildOutcome::Coalesced => Ok(self.stats_from_current()),
        }
    }

    /// Trigger a rebuild.
    ///
    /// Idempotent while a rebuild is in flight: a concurrent trigger
    /// returns [`RebuildOutcome::Coalesced`] without queueing.
    pub async fn rebuild(&self) -> Result<RebuildOutcome> {
        if self
            .building
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Rebuild already in flight; coalescing trigger");
            return Ok(RebuildOutcome::Coalesced);
        }

        let result = self.rebuild_inner().await;
        self.building.store(false, Ordering::SeqCst);
        result.map(RebuildOutcome::Completed)
    }

    /// Load, embed, construct, publish. Runs entirely out-of-place: the
    /// published index is only touched by the final pointer store.
    async fn rebuild_inner(&self) -> Result<RebuildStats> {
        let entries = LibraryLoader::load(&self.sources).await?;
        info!("Rebuilding index over {} entries", entries.len());

        let output = self.builder.build(entries, self.provider.as_ref()).await?;

        let stats = RebuildStats {
            entry_count: output.index.len(),
            degraded: output.degraded,
            per_source: output.index.source_counts(),
        };

        let index = Arc::new(output.index);
        self.current.store(Some(index.clone()));
        info!(
            "Published index: {} entries, {} degraded",
            stats.entry_count, stats.degraded
        );

        if let Some(path) = &self.snapshot_path {
            if let Err(e) = IndexSnapshot::save(path, &index).await {
                warn!("Failed to save index snapshot: {e}");
            }
        }

        Ok(stats)
    }

    fn stats_from_current(&self) -> RebuildStats {
        match self.current() {
            Some(index) => RebuildStats {
                entry_count: index.len(),
                degraded: 0,
                per_source: index.source_counts(),
            },
            None => RebuildStats {
                entry_count: 0,
                degraded: 0,
                per_source: SourceCounts::default(),
            },
        }
    }
}
