//! Command entry types.

use serde::{Deserialize, Serialize};

/// Origin category of a command entry.
///
/// The variant order is the load priority: built-in commands are loaded
/// (and rank on ties) before extension commands, which rank before
/// user-contributed entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Built-in CAD command.
    Builtin,

    /// Extension-script command.
    Extension,

    /// User-contributed code snippet.
    User,
}

impl SourceKind {
    /// Human-readable label, used in API responses and logs.
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Builtin => "builtin",
            SourceKind::Extension => "extension",
            SourceKind::User => "user",
        }
    }
}

/// A single entry of the command library.
///
/// Entries are constructed by the loader and never mutated afterwards.
/// For user entries the code body itself is not held here; `content_ref`
/// points at the stored file so the index never carries code blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEntry {
    /// Command or function identifier.
    pub name: String,

    /// Natural-language description of what the command does.
    pub description: String,

    /// Optional short form; empty when the command has none.
    pub alias: String,

    /// Where the entry came from.
    pub source_kind: SourceKind,

    /// Text sent to the embedding provider. Derived, never embedded with
    /// anything else.
    pub search_text: String,

    /// Filename of the stored code body (user entries only).
    pub content_ref: Option<String>,
}

impl CommandEntry {
    /// Create an entry, deriving its search text.
    ///
    /// The search text is `"{description} {name} {alias}"`, with the alias
    /// allowed to be empty. Callers are expected to have validated that
    /// `name` and `description` are non-empty; the loader skips records
    /// where they are not.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        alias: impl Into<String>,
        source_kind: SourceKind,
    ) -> Self {
        let name = name.into();
        let description = description.into();
        let alias = alias.into();
        let search_text = format!("{description} {name} {alias}");

        Self {
            name,
            description,
            alias,
            source_kind,
            search_text,
            content_ref: None,
        }
    }

    /// Attach a reference to externally stored code.
    pub fn with_content_ref(mut self, content_ref: impl Into<String>) -> Self {
        self.content_ref = Some(content_ref.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_search_text_derivation() {
        let entry = CommandEntry::new("LINE", "Draw a straight line", "L", SourceKind::Builtin);
        assert_eq!(entry.search_text, "Draw a straight line LINE L");
    }

    #[test]
    fn test_search_text_with_empty_alias() {
        let entry = CommandEntry::new("mirror", "Mirror selected objects", "", SourceKind::User);
        assert_eq!(entry.search_text, "Mirror selected objects mirror ");
    }

    #[test]
    fn test_content_ref() {
        let entry = CommandEntry::new("stairs", "Draw a staircase", "", SourceKind::User)
            .with_content_ref("code_000123.lsp");
        assert_eq!(entry.content_ref.as_deref(), Some("code_000123.lsp"));
    }
}
