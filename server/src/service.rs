//! Retrieval service wiring the HTTP handlers to the retrieval core.

use std::sync::Arc;

use regex::Regex;
use tracing::{info, warn};

use cadrag_embeddings::EmbeddingProvider;
use cadrag_library::CommandEntry;
use cadrag_retrieval::{RebuildCoordinator, RebuildOutcome, SearchHit, SourceCounts};

use crate::error::{Result, ServerError};
use crate::store::{UserCodeRecord, UserCodeStore};

/// Outcome of a query against the retrieval core.
#[derive(Debug)]
pub enum SearchOutcome {
    /// The index answered; hits are ranked by descending similarity.
    Ready(Vec<SearchHit>),

    /// No answer is possible right now; the reason says why.
    Unavailable(&'static str),
}

/// A point-in-time view of the published index.
#[derive(Debug, Clone, Copy)]
pub struct ServiceStats {
    /// Whether an index is published at all.
    pub ready: bool,

    /// Entries in the published index.
    pub entry_count: usize,

    /// Per-source entry counts.
    pub counts: SourceCounts,

    /// Vector dimension, when an index is published.
    pub dimension: Option<usize>,
}

/// Application-level operations behind the HTTP routes.
///
/// Holds the rebuild coordinator (and through it the published index),
/// the embedding provider for query vectors, and the user code store.
pub struct RetrievalService {
    coordinator: Arc<RebuildCoordinator>,
    provider: Arc<dyn EmbeddingProvider>,
    store: UserCodeStore,
    default_top_k: usize,
}

impl RetrievalService {
    pub fn new(
        coordinator: Arc<RebuildCoordinator>,
        provider: Arc<dyn EmbeddingProvider>,
        store: UserCodeStore,
        default_top_k: usize,
    ) -> Self {
        Self {
            coordinator,
            provider,
            store,
            default_top_k,
        }
    }

    /// Rank library commands against a free-text requirement.
    ///
    /// An absent index or a failing embedding service degrade to
    /// [`SearchOutcome::Unavailable`] rather than an error: the caller
    /// asked a well-formed question the engine cannot answer yet.
    pub async fn search(&self, requirement: &str, top_k: Option<usize>) -> Result<SearchOutcome> {
        let requirement = requirement.trim();
        if requirement.is_empty() {
            return Err(ServerError::InvalidRequest(
                "requirement must not be empty".to_string(),
            ));
        }

        let Some(index) = self.coordinator.current() else {
            return Ok(SearchOutcome::Unavailable("index not ready"));
        };

        let query = match self.provider.embed(requirement).await {
            Ok(query) => query,
            Err(e) => {
                warn!("Query embedding failed: {e}");
                return Ok(SearchOutcome::Unavailable("embedding service unavailable"));
            }
        };

        let k = top_k.unwrap_or(self.default_top_k);
        Ok(SearchOutcome::Ready(index.search(&query, k)))
    }

    /// Trigger an index rebuild.
    pub async fn rebuild(&self) -> Result<RebuildOutcome> {
        Ok(self.coordinator.rebuild().await?)
    }

    /// Snapshot of the published index state.
    pub fn stats(&self) -> ServiceStats {
        match self.coordinator.current() {
            Some(index) => ServiceStats {
                ready: true,
                entry_count: index.len(),
                counts: index.source_counts(),
                dimension: Some(index.dimension()),
            },
            None => ServiceStats {
                ready: false,
                entry_count: 0,
                counts: SourceCounts::default(),
                dimension: None,
            },
        }
    }

    /// Every entry of the published index, in load order. Empty while no
    /// index is published.
    pub fn list_commands(&self) -> Vec<CommandEntry> {
        self.coordinator
            .current()
            .map(|index| index.entries().to_vec())
            .unwrap_or_default()
    }

    /// All stored user codes.
    pub async fn list_user_codes(&self) -> Result<Vec<UserCodeRecord>> {
        self.store.list().await
    }

    /// One user code with its body.
    pub async fn get_user_code(&self, id: &str) -> Result<(UserCodeRecord, String)> {
        self.store.get(id).await
    }

    /// Store a new user code and fold it into the index.
    ///
    /// The code is persisted first; a rebuild failure afterwards is
    /// logged and the entry becomes searchable on the next rebuild.
    pub async fn create_user_code(
        &self,
        command: &str,
        description: &str,
        code: &str,
    ) -> Result<UserCodeRecord> {
        let command = command.trim();
        let description = description.trim();
        if command.is_empty() || description.is_empty() || code.trim().is_empty() {
            return Err(ServerError::InvalidRequest(
                "command, description and code must not be empty".to_string(),
            ));
        }

        let record = self.store.save(command, description, code).await?;
        self.rebuild_after_mutation("create").await;
        Ok(record)
    }

    /// Delete a user code and drop it from the index.
    pub async fn delete_user_code(&self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        self.rebuild_after_mutation("delete").await;
        Ok(())
    }

    /// Extract the command name a code body would define.
    ///
    /// Prefers a `(defun c:NAME ...)` definition; falls back to the first
    /// plain `(defun NAME ...)`.
    pub fn preview_command(&self, code: &str) -> Result<Option<String>> {
        let command_def = Regex::new(r"(?i)\(defun\s+c:([A-Za-z0-9_-]+)")
            .map_err(|e| ServerError::Internal(format!("command pattern: {e}")))?;
        if let Some(caps) = command_def.captures(code) {
            return Ok(caps.get(1).map(|m| m.as_str().to_string()));
        }

        let function_def = Regex::new(r"(?i)\(defun\s+([A-Za-z0-9_-]+)")
            .map_err(|e| ServerError::Internal(format!("function pattern: {e}")))?;
        Ok(function_def
            .captures(code)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string()))
    }

    async fn rebuild_after_mutation(&self, action: &str) {
        match self.coordinator.rebuild().await {
            Ok(RebuildOutcome::Completed(stats)) => {
                info!(
                    "Index rebuilt after user code {action}: {} entries",
                    stats.entry_count
                );
            }
            Ok(RebuildOutcome::Coalesced) => {
                info!("Rebuild after user code {action} coalesced into one in flight");
            }
            Err(e) => {
                warn!("Rebuild after user code {action} failed, keeping previous index: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cadrag_embeddings::Embedding;
    use cadrag_library::{LibrarySources, SourceKind};
    use tempfile::TempDir;

    /// Maps keywords to fixed directions so similarity is predictable.
    struct StubProvider;

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn embed(&self, text: &str) -> cadrag_embeddings::Result<Embedding> {
            let text = text.to_lowercase();
            if text.contains("stair") {
                Ok(vec![0.5, 0.5])
            } else if text.contains("line") {
                Ok(vec![1.0, 0.0])
            } else if text.contains("circle") {
                Ok(vec![0.0, 1.0])
            } else {
                Ok(vec![0.1, 0.0])
            }
        }
    }

    async fn service_in(dir: &TempDir) -> RetrievalService {
        let sources = LibrarySources::in_dir(dir.path());
        tokio::fs::write(
            &sources.builtin_file,
            "LINE|Draw a line|L|basic\nCIRCLE|Draw a circle|C|basic\n",
        )
        .await
        .unwrap();

        let provider: Arc<dyn EmbeddingProvider> = Arc::new(StubProvider);
        let coordinator = Arc::new(RebuildCoordinator::new(sources, provider.clone()));
        let store = UserCodeStore::new(dir.path().join("user_codes"));

        RetrievalService::new(coordinator, provider, store, 3)
    }

    #[tokio::test]
    async fn test_search_before_index_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir).await;

        let outcome = service.search("draw a line", None).await.unwrap();
        assert!(matches!(outcome, SearchOutcome::Unavailable("index not ready")));
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir).await;
        service.rebuild().await.unwrap();

        let outcome = service.search("I need to draw a line", None).await.unwrap();
        let SearchOutcome::Ready(hits) = outcome else {
            panic!("expected hits");
        };
        assert_eq!(hits[0].entry.name, "LINE");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_empty_requirement_is_invalid() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir).await;

        let result = service.search("   ", None).await;
        assert!(matches!(result, Err(ServerError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_top_k_limits_hits() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir).await;
        service.rebuild().await.unwrap();

        let outcome = service.search("circle", Some(1)).await.unwrap();
        let SearchOutcome::Ready(hits) = outcome else {
            panic!("expected hits");
        };
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.name, "CIRCLE");
    }

    #[tokio::test]
    async fn test_created_user_code_becomes_searchable() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir).await;
        service.rebuild().await.unwrap();

        let record = service
            .create_user_code("stairs", "Draw a staircase", "(defun c:stairs () (princ))")
            .await
            .unwrap();

        let outcome = service.search("staircase", None).await.unwrap();
        let SearchOutcome::Ready(hits) = outcome else {
            panic!("expected hits");
        };
        assert_eq!(hits[0].entry.name, "stairs");
        assert_eq!(hits[0].entry.source_kind, SourceKind::User);
        assert_eq!(
            hits[0].entry.content_ref.as_deref(),
            Some(record.filename.as_str())
        );
    }

    #[tokio::test]
    async fn test_deleted_user_code_leaves_index() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir).await;
        service.rebuild().await.unwrap();

        let record = service
            .create_user_code("stairs", "Draw a staircase", "(princ)")
            .await
            .unwrap();
        service.delete_user_code(&record.id).await.unwrap();

        let stats = service.stats();
        assert_eq!(stats.counts.user, 0);
        assert_eq!(stats.entry_count, 2);
    }

    #[tokio::test]
    async fn test_list_commands_reflects_index() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir).await;
        assert!(service.list_commands().is_empty());

        service.rebuild().await.unwrap();
        let names: Vec<String> = service
            .list_commands()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["LINE", "CIRCLE"]);
    }

    #[tokio::test]
    async fn test_blank_user_code_is_invalid() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir).await;

        let result = service.create_user_code("stairs", "", "(princ)").await;
        assert!(matches!(result, Err(ServerError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_preview_prefers_command_definition() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir).await;

        let code = "(defun helper () nil)\n(defun c:STAIRS (/ p) (princ))";
        assert_eq!(
            service.preview_command(code).unwrap(),
            Some("STAIRS".to_string())
        );
    }

    #[tokio::test]
    async fn test_preview_falls_back_to_plain_defun() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir).await;

        assert_eq!(
            service.preview_command("(defun grid-draw (n) n)").unwrap(),
            Some("grid-draw".to_string())
        );
        assert_eq!(service.preview_command("(princ \"hi\")").unwrap(), None);
    }
}
