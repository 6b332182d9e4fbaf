//! Building a vector index from command entries.

use tracing::{debug, warn};

use cadrag_embeddings::{Embedding, EmbeddingProvider};
use cadrag_library::CommandEntry;

use crate::error::{Result, RetrievalError};
use crate::index::VectorIndex;

/// Default number of texts per provider call, to respect upstream rate
/// limits.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Output of a successful build.
#[derive(Debug)]
pub struct BuildOutput {
    /// The constructed index.
    pub index: VectorIndex,

    /// Entries that fell back to a zero vector because their batch failed
    /// or the provider returned a malformed vector.
    pub degraded: usize,
}

/// Builds a [`VectorIndex`] by embedding entry search texts in batches.
///
/// A failing batch degrades its entries to zero vectors instead of
/// aborting the build; the build as a whole fails only when zero entries
/// embed successfully.
pub struct IndexBuilder {
    batch_size: usize,
}

impl IndexBuilder {
    /// Create a builder with the default batch size.
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the maximum number of texts per provider call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed every entry and construct the index.
    pub async fn build(
        &self,
        entries: Vec<CommandEntry>,
        provider: &dyn EmbeddingProvider,
    ) -> Result<BuildOutput> {
        let dimension = provider.dimension();
        let mut vectors: Vec<Embedding> = Vec::with_capacity(entries.len());
        let mut degraded = 0usize;

        for chunk in entries.chunks(self.batch_size) {
            let texts: Vec<String> = chunk.iter().map(|e| e.search_text.clone()).collect();

            match provider.embed_batch(&texts).await {
                Ok(batch) if batch.len() == chunk.len() => {
                    for embedding in batch {
                        if embedding.len() == dimension {
                            vectors.push(embedding);
                        } else {
                            warn!(
                                "Provider returned vector of length {}, expected {dimension}; degrading entry",
                                embedding.len()
                            );
                            vectors.push(vec![0.0; dimension]);
                            degraded += 1;
                        }
                    }
                }
                Ok(batch) => {
                    warn!(
                        "Provider returned {} vectors for {} texts; degrading batch",
                        batch.len(),
                        chunk.len()
                    );
                    vectors.extend(std::iter::repeat_with(|| vec![0.0; dimension]).take(chunk.len()));
                    degraded += chunk.len();
                }
                Err(e) => {
                    warn!("Embedding batch of {} texts failed: {e}; degrading batch", chunk.len());
                    vectors.extend(std::iter::repeat_with(|| vec![0.0; dimension]).take(chunk.len()));
                    degraded += chunk.len();
                }
            }
        }

        // An empty library counts as zero successful embeddings too.
        if degraded == entries.len() {
            return Err(RetrievalError::BuildFailed);
        }

        debug!(
            "Built index with {} entries ({degraded} degraded)",
            entries.len()
        );

        let index = VectorIndex::new(entries, vectors, dimension)?;
        Ok(BuildOutput { index, degraded })
    }
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cadrag_embeddings::EmbeddingError;
    use cadrag_library::SourceKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn entries(n: usize) -> Vec<CommandEntry> {
        (0..n)
            .map(|i| CommandEntry::new(format!("cmd{i}"), format!("desc {i}"), "", SourceKind::Builtin))
            .collect()
    }

    /// Provider that fails for texts containing a marker substring.
    struct MarkerProvider {
        fail_marker: &'static str,
        calls: AtomicUsize,
    }

    impl MarkerProvider {
        fn new(fail_marker: &'static str) -> Self {
            Self {
                fail_marker,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MarkerProvider {
        fn name(&self) -> &str {
            "marker"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn embed(&self, text: &str) -> cadrag_embeddings::Result<Embedding> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains(self.fail_marker) {
                return Err(EmbeddingError::ApiRequest("simulated failure".to_string()));
            }
            Ok(vec![1.0, 0.0])
        }
    }

    #[tokio::test]
    async fn test_build_pairs_every_entry() {
        let builder = IndexBuilder::new();
        let output = builder
            .build(entries(7), &MarkerProvider::new("<never>"))
            .await
            .unwrap();

        assert_eq!(output.index.len(), 7);
        assert_eq!(output.index.vectors().len(), 7);
        assert_eq!(output.degraded, 0);
    }

    #[tokio::test]
    async fn test_degraded_batch_still_builds() {
        // Batch size 1: exactly one failing entry degrades, nine succeed.
        let builder = IndexBuilder::new().with_batch_size(1);
        let mut all = entries(9);
        all.push(CommandEntry::new("bad", "desc <fail>", "", SourceKind::Builtin));

        let output = builder
            .build(all, &MarkerProvider::new("<fail>"))
            .await
            .unwrap();

        assert_eq!(output.index.len(), 10);
        assert_eq!(output.degraded, 1);
        assert_eq!(output.index.vectors()[9], vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_all_degraded_fails_build() {
        let builder = IndexBuilder::new().with_batch_size(2);
        let all = vec![
            CommandEntry::new("a", "desc <fail>", "", SourceKind::Builtin),
            CommandEntry::new("b", "desc <fail>", "", SourceKind::Builtin),
        ];

        let result = builder.build(all, &MarkerProvider::new("<fail>")).await;
        assert!(matches!(result, Err(RetrievalError::BuildFailed)));
    }

    #[tokio::test]
    async fn test_empty_entries_fail_build() {
        let builder = IndexBuilder::new();
        let result = builder.build(Vec::new(), &MarkerProvider::new("<fail>")).await;
        assert!(matches!(result, Err(RetrievalError::BuildFailed)));
    }

    #[tokio::test]
    async fn test_batching_respects_batch_size() {
        let provider = MarkerProvider::new("<never>");
        let builder = IndexBuilder::new().with_batch_size(3);
        builder.build(entries(8), &provider).await.unwrap();

        // The default embed_batch delegates to embed once per text.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 8);
    }
}
