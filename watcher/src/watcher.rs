//! Library file watcher implementation.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::Result;

/// Capacity of the raw event channel between the notify callback thread
/// and the async debouncer.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Watches the library's backing files and forwards change events.
///
/// Watches each file's parent directory rather than the file itself:
/// editors and the user-code store replace files atomically (write to a
/// temp file, then rename), which would silently drop a watch placed on
/// the file path. Events are filtered back down to the named files before
/// forwarding.
///
/// The watch stops when the `LibraryWatcher` is dropped.
pub struct LibraryWatcher {
    // Held only to keep the OS watch alive.
    _watcher: RecommendedWatcher,
}

impl LibraryWatcher {
    /// Start watching the given files, returning the watcher handle and
    /// the channel on which changed paths arrive.
    pub fn spawn(files: Vec<PathBuf>) -> Result<(Self, mpsc::Receiver<PathBuf>)> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let names: HashSet<OsString> = files
            .iter()
            .filter_map(|f| f.file_name().map(OsString::from))
            .collect();

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if !matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) {
                        return;
                    }

                    for path in event.paths {
                        let watched = path.file_name().is_some_and(|n| names.contains(n));
                        if !watched {
                            continue;
                        }

                        debug!("Library file changed: {}", path.display());
                        if let Err(e) = event_tx.blocking_send(path) {
                            error!("Failed to forward library change event: {e}");
                        }
                    }
                }
                Err(e) => {
                    error!("Watch error: {e}");
                }
            },
        )?;

        let mut dirs: Vec<PathBuf> = files
            .iter()
            .filter_map(|f| f.parent().map(PathBuf::from))
            .collect();
        dirs.sort();
        dirs.dedup();

        for dir in dirs {
            match watcher.watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => debug!("Watching directory: {}", dir.display()),
                Err(e) => warn!("Failed to watch {}: {e}", dir.display()),
            }
        }

        info!("Library watcher started over {} files", files.len());
        Ok((Self { _watcher: watcher }, event_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_watcher_creation() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("builtin_commands.txt");
        std::fs::write(&file, "LINE|Draw a line|L|basic\n").unwrap();

        let result = LibraryWatcher::spawn(vec![file]);
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_modification_forwards_event() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("builtin_commands.txt");
        std::fs::write(&file, "LINE|Draw a line|L|basic\n").unwrap();

        let (_watcher, mut rx) = LibraryWatcher::spawn(vec![file.clone()]).unwrap();

        std::fs::write(&file, "CIRCLE|Draw a circle|C|basic\n").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within timeout")
            .expect("channel closed");
        assert_eq!(event.file_name(), file.file_name());
    }

    #[tokio::test]
    async fn test_unrelated_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let watched = dir.path().join("builtin_commands.txt");
        std::fs::write(&watched, "LINE|Draw a line|L|basic\n").unwrap();

        let (_watcher, mut rx) = LibraryWatcher::spawn(vec![watched.clone()]).unwrap();

        // Touch a sibling file the watcher should not report.
        std::fs::write(dir.path().join("notes.txt"), "scratch").unwrap();

        let unrelated = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(unrelated.is_err(), "event leaked for an unwatched file");

        // The watched file still gets through afterwards.
        std::fs::write(&watched, "CIRCLE|Draw a circle|C|basic\n").unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within timeout")
            .expect("channel closed");
        assert_eq!(event.file_name(), watched.file_name());
    }
}
