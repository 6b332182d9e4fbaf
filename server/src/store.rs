//! User code storage and persistence.
//!
//! User-contributed command codes live next to the command library: one
//! `.lsp` blob per code plus a pipe-delimited index file that the library
//! loader also reads. Every index rewrite goes through a temp file and a
//! rename, so the loader and the file watcher never observe a partial
//! index.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, ServerError};

/// Lines starting with this marker are preserved as comments across
/// index rewrites.
const COMMENT_MARKER: char = '#';

const INDEX_HEADER: &str = "# User command codes\n# Format: id|command|description|filename|created\n";

/// One record of the user code index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCodeRecord {
    /// Six-digit identifier.
    pub id: String,

    /// Command name the code defines.
    pub command: String,

    /// Human description, used as search text.
    pub description: String,

    /// File name of the code blob, relative to the store directory.
    pub filename: String,

    /// Creation timestamp (`YYYY-MM-DD HH:MM:SS`).
    pub created_at: String,
}

/// Storage backend for user command codes.
///
/// Mutations serialize on an internal lock: a save or delete holds it
/// across the read of the current index, id assignment, and the rewrite,
/// so concurrent requests never interleave their read-modify-write cycles
/// or mint the same id.
pub struct UserCodeStore {
    dir: PathBuf,
    index_file: PathBuf,
    write_lock: Mutex<()>,
    temp_seq: AtomicU64,
}

impl UserCodeStore {
    /// Create a store rooted at the given directory. No IO happens until
    /// [`UserCodeStore::ensure_layout`] or a mutation runs.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let index_file = dir.join("user_codes.txt");
        Self {
            dir,
            index_file,
            write_lock: Mutex::new(()),
            temp_seq: AtomicU64::new(0),
        }
    }

    /// Create the store directory and an empty index file if missing.
    pub async fn ensure_layout(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        if !self.index_file.exists() {
            self.write_index(INDEX_HEADER).await?;
            info!("Created user code index: {}", self.index_file.display());
        }

        Ok(())
    }

    /// Persist a new code, returning its index record.
    pub async fn save(&self, command: &str, description: &str, code: &str) -> Result<UserCodeRecord> {
        let _guard = self.write_lock.lock().await;
        self.ensure_layout().await?;

        let records = self.list().await?;
        let id = next_id(&records);
        let filename = format!("code_{id}.lsp");

        let code_path = self.dir.join(&filename);
        let temp_path = code_path.with_extension("lsp.tmp");
        fs::write(&temp_path, code).await?;
        fs::rename(&temp_path, &code_path).await?;

        let record = UserCodeRecord {
            id,
            command: command.to_string(),
            description: description.to_string(),
            filename,
            created_at: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        let mut content = fs::read_to_string(&self.index_file).await?;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&format_record(&record));
        content.push('\n');
        self.write_index(&content).await?;

        info!("Saved user code {} ({})", record.id, record.command);
        Ok(record)
    }

    /// All records, in index order.
    pub async fn list(&self) -> Result<Vec<UserCodeRecord>> {
        if !self.index_file.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.index_file).await?;
        let mut records = Vec::new();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(COMMENT_MARKER) {
                continue;
            }

            match parse_record(line) {
                Some(record) => records.push(record),
                None => warn!(
                    "Skipping malformed user code record at {}:{}",
                    self.index_file.display(),
                    line_no + 1
                ),
            }
        }

        Ok(records)
    }

    /// A record and its code body.
    pub async fn get(&self, id: &str) -> Result<(UserCodeRecord, String)> {
        let record = self
            .find(id)
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("user code {id}")))?;

        // An indexed record whose blob vanished is a 404, not a 500.
        let code = fs::read_to_string(self.dir.join(&record.filename))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ServerError::NotFound(format!("user code {id}")),
                _ => ServerError::Io(e),
            })?;
        Ok((record, code))
    }

    /// Remove a record and its code blob.
    ///
    /// Comment lines in the index survive the rewrite. A missing code
    /// blob is logged, not fatal; the index stays authoritative.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let record = self
            .find(id)
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("user code {id}")))?;

        let content = fs::read_to_string(&self.index_file).await?;
        let mut kept = String::new();
        for line in content.lines() {
            let trimmed = line.trim();
            let is_target = !trimmed.is_empty()
                && !trimmed.starts_with(COMMENT_MARKER)
                && parse_record(trimmed).is_some_and(|r| r.id == id);
            if !is_target {
                kept.push_str(line);
                kept.push('\n');
            }
        }
        self.write_index(&kept).await?;

        let code_path = self.dir.join(&record.filename);
        if let Err(e) = fs::remove_file(&code_path).await {
            warn!("Failed to remove code blob {}: {e}", code_path.display());
        }

        info!("Deleted user code {id}");
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<UserCodeRecord>> {
        Ok(self.list().await?.into_iter().find(|r| r.id == id))
    }

    async fn write_index(&self, content: &str) -> Result<()> {
        // Per-rewrite temp name: two rewrites must never share a temp
        // file, or one rename steals the other's.
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let temp_path = self.index_file.with_extension(format!("txt.{seq}.tmp"));
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &self.index_file).await?;
        debug!("Rewrote user code index: {}", self.index_file.display());
        Ok(())
    }
}

fn format_record(record: &UserCodeRecord) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        record.id, record.command, record.description, record.filename, record.created_at
    )
}

fn parse_record(line: &str) -> Option<UserCodeRecord> {
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < 4 {
        return None;
    }

    Some(UserCodeRecord {
        id: parts[0].trim().to_string(),
        command: parts[1].trim().to_string(),
        description: parts[2].trim().to_string(),
        filename: parts[3].trim().to_string(),
        created_at: parts.get(4).copied().unwrap_or("").trim().to_string(),
    })
}

/// Pick a six-digit id not present in `records`, seeded from the clock.
fn next_id(records: &[UserCodeRecord]) -> String {
    let existing: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    let mut seed = (Utc::now().timestamp_millis() as u64) % 1_000_000;

    loop {
        let candidate = format!("{seed:06}");
        if !existing.contains(candidate.as_str()) {
            return candidate;
        }
        seed = (seed + 1) % 1_000_000;
    }
}
