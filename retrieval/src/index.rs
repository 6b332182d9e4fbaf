//! Immutable vector index with ranked similarity search.

use ordered_float::OrderedFloat;
use tracing::warn;

use cadrag_embeddings::{Embedding, cosine_similarity};
use cadrag_library::{CommandEntry, SourceKind};

use crate::error::{Result, RetrievalError};

/// A search result: one command entry with its similarity score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matched entry.
    pub entry: CommandEntry,

    /// Cosine similarity to the query, in [-1.0, 1.0].
    pub score: f32,
}

/// Per-source entry counts of an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCounts {
    pub builtin: usize,
    pub extension: usize,
    pub user: usize,
}

/// An immutable snapshot pairing every command entry with its embedding.
///
/// Created once per (re)build, read by arbitrarily many concurrent
/// searches, and retired when superseded. Entry order is load order, which
/// encodes source priority and is the ranking tie-break.
#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<CommandEntry>,
    vectors: Vec<Embedding>,
    dimension: usize,
}

impl VectorIndex {
    /// Construct an index, enforcing the pairing invariant.
    ///
    /// An index where `entries.len() != vectors.len()`, or where any vector
    /// has the wrong dimension, is never constructed.
    pub fn new(
        entries: Vec<CommandEntry>,
        vectors: Vec<Embedding>,
        dimension: usize,
    ) -> Result<Self> {
        if entries.len() != vectors.len() {
            return Err(RetrievalError::Unsynced {
                entries: entries.len(),
                vectors: vectors.len(),
            });
        }

        for vector in &vectors {
            if vector.len() != dimension {
                return Err(RetrievalError::Unsynced {
                    entries: entries.len(),
                    vectors: vectors.len(),
                });
            }
        }

        Ok(Self {
            entries,
            vectors,
            dimension,
        })
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector dimensionality.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// All entries, in load order.
    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// All vectors, in load order.
    pub fn vectors(&self) -> &[Embedding] {
        &self.vectors
    }

    /// Count entries per source kind.
    pub fn source_counts(&self) -> SourceCounts {
        let mut counts = SourceCounts::default();
        for entry in &self.entries {
            match entry.source_kind {
                SourceKind::Builtin => counts.builtin += 1,
                SourceKind::Extension => counts.extension += 1,
                SourceKind::User => counts.user += 1,
            }
        }
        counts
    }

    /// Return the top `k` entries by cosine similarity to `query`.
    ///
    /// Results are ordered by descending score; ties keep load order
    /// (source priority, then file line order). A query of the wrong
    /// dimension yields no results rather than an error.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        if query.len() != self.dimension {
            warn!(
                "Query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            );
            return Vec::new();
        }

        let mut scored: Vec<(usize, OrderedFloat<f32>)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, vector)| {
                // Dimensions are uniform by construction, so this cannot fail.
                let score = cosine_similarity(query, vector).unwrap_or(0.0);
                (i, OrderedFloat(score))
            })
            .collect();

        // Stable sort: equal scores keep load order.
        scored.sort_by_key(|&(_, score)| std::cmp::Reverse(score));

        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| SearchHit {
                entry: self.entries[i].clone(),
                score: score.0,
            })
            .collect()
    }
}
