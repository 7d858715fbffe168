//! The opaque rich-text document tree.
//!
//! The editor collaborator owns the shape of this structure; the core never
//! interprets it beyond deriving a title from the first line of text.

use serde::{Deserialize, Serialize};

/// A single node in the editor's document tree.
///
/// Serializes to the editor's wire shape: `{"type": ..., "content": [...],
/// "text": ...}` with empty/absent fields omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(rename = "content", default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocumentNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl DocumentNode {
    /// The empty document a new note starts with: `{"type": "doc", "content": []}`.
    pub fn empty() -> Self {
        Self::node("doc", Vec::new())
    }

    pub fn node(node_type: impl Into<String>, children: Vec<DocumentNode>) -> Self {
        Self {
            node_type: node_type.into(),
            children,
            text: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            node_type: "text".to_string(),
            children: Vec::new(),
            text: Some(text.into()),
        }
    }
}

/// Maximum number of characters a derived title keeps.
pub const TITLE_MAX_CHARS: usize = 50;

/// Derive a note title from document content.
///
/// Looks at exactly one position: the first content element of the
/// document root's first child (the leading text of the first paragraph).
/// That text is truncated to [`TITLE_MAX_CHARS`] characters and trimmed.
/// Returns `None` when that element is missing or has no text — deeper
/// nesting and later siblings are not searched — in which case the caller
/// keeps the existing title.
pub fn derive_title(content: &DocumentNode) -> Option<String> {
    let first_child = content.children.first()?;
    let leaf = first_child.children.first()?;
    let text = leaf.text.as_deref().filter(|t| !t.is_empty())?;
    let truncated: String = text.chars().take(TITLE_MAX_CHARS).collect();
    let trimmed = truncated.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
