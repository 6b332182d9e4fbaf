//! CADRAG server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use cadrag_embeddings::{EmbeddingProvider, OllamaProvider};
use cadrag_retrieval::{RebuildCoordinator, RebuildOutcome};
use cadrag_server::config::DEFAULT_TOP_K;
use cadrag_server::{RetrievalService, ServerConfig, UserCodeStore, router};
use cadrag_watcher::{LibraryWatcher, debounce};

#[derive(Debug, Parser)]
#[command(
    name = "cadrag-server",
    about = "Command retrieval engine over a local embedding model"
)]
struct Cli {
    /// Address to bind the HTTP listener to.
    #[arg(long, default_value = "0.0.0.0:5001")]
    bind: SocketAddr,

    /// Directory holding the command library files.
    #[arg(long, default_value = "library")]
    library_dir: PathBuf,

    /// Base URL of the Ollama server.
    #[arg(long, env = "OLLAMA_HOST", default_value = OllamaProvider::DEFAULT_HOST)]
    ollama_host: String,

    /// Embedding model name.
    #[arg(long, env = "EMBEDDING_MODEL", default_value = OllamaProvider::DEFAULT_MODEL)]
    embedding_model: String,

    /// Vector dimension of the embedding model.
    #[arg(long, default_value_t = OllamaProvider::DEFAULT_DIMENSION)]
    embedding_dimension: usize,

    /// Seconds of quiet after a file change before the index rebuilds.
    #[arg(long, default_value_t = 2)]
    debounce_secs: u64,

    /// Results returned per query when the request does not say.
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            library_dir: self.library_dir,
            ollama_host: self.ollama_host,
            embedding_model: self.embedding_model,
            embedding_dimension: self.embedding_dimension,
            debounce: Duration::from_secs(self.debounce_secs),
            default_top_k: self.top_k,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Cli::parse().into_config();

    let provider: Arc<dyn EmbeddingProvider> = Arc::new(
        OllamaProvider::new()
            .with_host(config.ollama_host.clone())
            .with_model(config.embedding_model.clone())
            .with_dimension(config.embedding_dimension),
    );
    info!(
        "Using embedding model {} ({} dimensions) at {}",
        config.embedding_model, config.embedding_dimension, config.ollama_host
    );

    let store = UserCodeStore::new(config.user_codes_dir());
    store.ensure_layout().await?;

    let coordinator = Arc::new(
        RebuildCoordinator::new(config.sources(), provider.clone())
            .with_snapshot_path(config.snapshot_path()),
    );

    match coordinator.initialize().await {
        Ok(stats) => info!(
            "Index ready: {} entries ({} builtin, {} extension, {} user)",
            stats.entry_count,
            stats.per_source.builtin,
            stats.per_source.extension,
            stats.per_source.user
        ),
        Err(e) => error!("Initial index build failed, serving degraded until sources change: {e}"),
    }

    // The watcher handle must outlive the server; dropping it stops the
    // OS-level watch.
    let (_watcher, events) = LibraryWatcher::spawn(config.watch_files())?;
    let rebuild_coordinator = coordinator.clone();
    let window = config.debounce;
    tokio::spawn(async move {
        // The rebuild is spawned rather than awaited so a slow rebuild
        // never stalls event intake.
        debounce(events, window, move || {
            let coordinator = rebuild_coordinator.clone();
            tokio::spawn(async move {
                match coordinator.rebuild().await {
                    Ok(RebuildOutcome::Completed(stats)) => info!(
                        "Library changed, index rebuilt: {} entries, {} degraded",
                        stats.entry_count, stats.degraded
                    ),
                    Ok(RebuildOutcome::Coalesced) => {
                        debug!("Library change coalesced into a rebuild already in flight");
                    }
                    Err(e) => error!(
                        "Rebuild after library change failed, keeping previous index: {e}"
                    ),
                }
            });
            std::future::ready(())
        })
        .await;
    });

    let service = Arc::new(RetrievalService::new(
        coordinator,
        provider,
        store,
        config.default_top_k,
    ));

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(service)).await?;

    Ok(())
}
