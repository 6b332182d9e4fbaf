//! Server configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cadrag_library::LibrarySources;

/// Default number of results returned per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Default settle window for file-change bursts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// Runtime configuration of the retrieval server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,

    /// Directory holding the command library files.
    pub library_dir: PathBuf,

    /// Base URL of the Ollama server.
    pub ollama_host: String,

    /// Embedding model name.
    pub embedding_model: String,

    /// Vector dimension of the embedding model.
    pub embedding_dimension: usize,

    /// Settle window for file-change bursts before a rebuild fires.
    pub debounce: Duration,

    /// Results returned per query when the request does not say.
    pub default_top_k: usize,
}

impl ServerConfig {
    /// The library's backing files under `library_dir`.
    pub fn sources(&self) -> LibrarySources {
        LibrarySources::in_dir(&self.library_dir)
    }

    /// Directory where user code blobs live.
    pub fn user_codes_dir(&self) -> PathBuf {
        self.library_dir.join("user_codes")
    }

    /// Location of the persisted index snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.library_dir.join("index_snapshot.json")
    }

    /// Files whose changes trigger a rebuild.
    pub fn watch_files(&self) -> Vec<PathBuf> {
        self.sources().files().iter().map(|p| p.to_path_buf()).collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5001)),
            library_dir: PathBuf::from("library"),
            ollama_host: "http://localhost:11434".to_string(),
            embedding_model: "bge-m3".to_string(),
            embedding_dimension: 1024,
            debounce: DEFAULT_DEBOUNCE,
            default_top_k: DEFAULT_TOP_K,
        }
    }
}

impl ServerConfig {
    /// Configuration rooted at the given library directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            library_dir: dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_paths_derive_from_library_dir() {
        let config = ServerConfig::in_dir("/srv/cadrag");

        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("/srv/cadrag/index_snapshot.json")
        );
        assert_eq!(
            config.user_codes_dir(),
            PathBuf::from("/srv/cadrag/user_codes")
        );
        assert_eq!(config.watch_files().len(), 3);
    }
}
