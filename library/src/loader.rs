//! Loading command entries from pipe-delimited source files.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::entry::{CommandEntry, SourceKind};
use crate::error::Result;

/// Lines starting with this marker are treated as comments.
const COMMENT_MARKER: char = '#';

/// The backing files of the command library, in load-priority order.
#[derive(Debug, Clone)]
pub struct LibrarySources {
    /// Built-in commands (`name|description|alias|kind`).
    pub builtin_file: PathBuf,

    /// Extension-script commands (same format as built-in).
    pub extension_file: PathBuf,

    /// User entry index (`id|command|description|filename[|timestamp]`).
    pub user_index_file: PathBuf,
}

impl LibrarySources {
    /// Conventional layout under a single library directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            builtin_file: dir.join("builtin_commands.txt"),
            extension_file: dir.join("extension_commands.txt"),
            user_index_file: dir.join("user_codes").join("user_codes.txt"),
        }
    }

    /// All backing files, in priority order.
    pub fn files(&self) -> [&Path; 3] {
        [
            &self.builtin_file,
            &self.extension_file,
            &self.user_index_file,
        ]
    }
}

/// Loads [`CommandEntry`] records from the library's backing files.
///
/// The loader never aborts on a single malformed record: bad lines are
/// logged and skipped, and a source file that does not exist contributes
/// zero entries. Loading the same unmodified files twice yields identical
/// entry sequences.
pub struct LibraryLoader;

impl LibraryLoader {
    /// Load all sources in priority order: builtin, extension, user.
    pub async fn load(sources: &LibrarySources) -> Result<Vec<CommandEntry>> {
        let mut entries = Vec::new();

        Self::load_source(&sources.builtin_file, SourceKind::Builtin, &mut entries).await?;
        Self::load_source(&sources.extension_file, SourceKind::Extension, &mut entries).await?;
        Self::load_source(&sources.user_index_file, SourceKind::User, &mut entries).await?;

        debug!("Loaded {} command entries", entries.len());
        Ok(entries)
    }

    /// Load one source file, appending parsed entries.
    async fn load_source(
        path: &Path,
        kind: SourceKind,
        entries: &mut Vec<CommandEntry>,
    ) -> Result<()> {
        if !path.exists() {
            warn!(
                "Library source missing, skipping: {} ({})",
                path.display(),
                kind.label()
            );
            return Ok(());
        }

        let content = fs::read_to_string(path).await?;
        let before = entries.len();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(COMMENT_MARKER) {
                continue;
            }

            let parsed = match kind {
                SourceKind::Builtin | SourceKind::Extension => Self::parse_command_line(line, kind),
                SourceKind::User => Self::parse_user_line(line),
            };

            match parsed {
                Some(entry) => entries.push(entry),
                None => {
                    warn!(
                        "Skipping malformed record at {}:{}",
                        path.display(),
                        line_no + 1
                    );
                }
            }
        }

        debug!(
            "Loaded {} {} entries from {}",
            entries.len() - before,
            kind.label(),
            path.display()
        );
        Ok(())
    }

    /// Parse a builtin/extension record: `name|description|alias|kind`.
    fn parse_command_line(line: &str, kind: SourceKind) -> Option<CommandEntry> {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() < 4 {
            return None;
        }

        let name = parts[0].trim();
        let description = parts[1].trim();
        let alias = parts[2].trim();
        if name.is_empty() || description.is_empty() {
            return None;
        }

        Some(CommandEntry::new(name, description, alias, kind))
    }

    /// Parse a user record: `id|command|description|filename[|timestamp]`.
    fn parse_user_line(line: &str) -> Option<CommandEntry> {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() < 4 {
            return None;
        }

        let name = parts[1].trim();
        let description = parts[2].trim();
        let filename = parts[3].trim();
        if name.is_empty() || description.is_empty() {
            return None;
        }

        Some(CommandEntry::new(name, description, "", SourceKind::User).with_content_ref(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    async fn write_library(
        dir: &TempDir,
        builtin: &str,
        extension: &str,
        user: &str,
    ) -> LibrarySources {
        let sources = LibrarySources::in_dir(dir.path());
        fs::write(&sources.builtin_file, builtin).await.unwrap();
        fs::write(&sources.extension_file, extension).await.unwrap();
        fs::create_dir_all(sources.user_index_file.parent().unwrap())
            .await
            .unwrap();
        fs::write(&sources.user_index_file, user).await.unwrap();
        sources
    }

    #[tokio::test]
    async fn test_load_priority_order() {
        let dir = TempDir::new().unwrap();
        let sources = write_library(
            &dir,
            "LINE|Draw a line|L|basic\n",
            "mirrtext|Mirror text in place|mt|lisp\n",
            "000001|stairs|Draw a staircase|code_000001.lsp|2024-01-01 00:00:00\n",
        )
        .await;

        let entries = LibraryLoader::load(&sources).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].source_kind, SourceKind::Builtin);
        assert_eq!(entries[1].source_kind, SourceKind::Extension);
        assert_eq!(entries[2].source_kind, SourceKind::User);
        assert_eq!(entries[2].content_ref.as_deref(), Some("code_000001.lsp"));
    }

    #[tokio::test]
    async fn test_comments_and_blank_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let sources = write_library(
            &dir,
            "# header comment\n\nLINE|Draw a line|L|basic\n\n# trailing\n",
            "",
            "",
        )
        .await;

        let entries = LibraryLoader::load(&sources).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "LINE");
    }

    #[tokio::test]
    async fn test_malformed_line_skipped() {
        let dir = TempDir::new().unwrap();
        let sources = write_library(
            &dir,
            "LINE|Draw a line|L|basic\nbroken|only-two-fields\nCIRCLE|Draw a circle|C|basic\n",
            "",
            "",
        )
        .await;

        let entries = LibraryLoader::load(&sources).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "LINE");
        assert_eq!(entries[1].name, "CIRCLE");
    }

    #[tokio::test]
    async fn test_empty_name_or_description_skipped() {
        let dir = TempDir::new().unwrap();
        let sources = write_library(
            &dir,
            "|missing name|x|basic\nTRIM||t|basic\nERASE|Remove objects|E|basic\n",
            "",
            "",
        )
        .await;

        let entries = LibraryLoader::load(&sources).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "ERASE");
    }

    #[tokio::test]
    async fn test_missing_source_file_yields_zero_entries() {
        let dir = TempDir::new().unwrap();
        let sources = LibrarySources::in_dir(dir.path());

        let entries = LibraryLoader::load(&sources).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_idempotent_load() {
        let dir = TempDir::new().unwrap();
        let sources = write_library(
            &dir,
            "LINE|Draw a line|L|basic\nCIRCLE|Draw a circle|C|basic\n",
            "offsetx|Offset along X|ox|lisp\n",
            "000002|grid|Draw a grid|code_000002.lsp\n",
        )
        .await;

        let first = LibraryLoader::load(&sources).await.unwrap();
        let second = LibraryLoader::load(&sources).await.unwrap();
        assert_eq!(first, second);
    }
}
