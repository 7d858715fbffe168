// src/note.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::DocumentNode;

/// Title every note starts with until the user or the title derivation
/// replaces it.
pub const DEFAULT_TITLE: &str = "Untitled Note";

/// A single note in the working set.
///
/// The id is client-generated at creation time so the note is addressable
/// before any network round-trip. When the remote store assigns its own id
/// on insert, [`NoteRepository`](crate::NoteRepository) rewrites it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: DocumentNode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl Note {
    /// A fresh note: client-generated id, default title, empty document,
    /// both timestamps set to now.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            content: DocumentNode::empty(),
            created_at: now,
            updated_at: now,
            owner_id: None,
        }
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial-field update payload for a note.
///
/// Absent fields leave the existing value untouched, so updates merge
/// instead of overwrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<DocumentNode>,
}

impl NoteUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: DocumentNode) -> Self {
        Self {
            title: None,
            content: Some(content),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }

    /// Merge the provided fields over `note` and refresh `updated_at`.
    pub fn apply(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
        note.updated_at = Utc::now();
    }
}

/// An authenticated session, supplied by the auth collaborator.
///
/// The core only reads presence/absence and the owner id; it never creates,
/// stores, or destroys sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_note_has_default_title_and_empty_content() {
        let note = Note::new();
        assert_eq!(note.title, DEFAULT_TITLE);
        assert_eq!(note.content, DocumentNode::empty());
        assert_eq!(note.created_at, note.updated_at);
        assert!(note.owner_id.is_none());
    }

    #[test]
    fn test_new_notes_get_distinct_ids() {
        assert_ne!(Note::new().id, Note::new().id);
    }

    #[test]
    fn test_apply_merges_only_provided_fields() {
        let mut note = Note::new();
        let content = DocumentNode::node("doc", vec![DocumentNode::text("hi")]);

        NoteUpdate::title("x").apply(&mut note);
        NoteUpdate::content(content.clone()).apply(&mut note);

        assert_eq!(note.title, "x");
        assert_eq!(note.content, content);
    }

    #[test]
    fn test_apply_refreshes_updated_at() {
        let mut note = Note::new();
        let before = note.updated_at;
        NoteUpdate::title("x").apply(&mut note);
        assert!(note.updated_at >= before);
        assert_eq!(note.created_at, before);
    }

    #[test]
    fn test_note_serde_round_trip() {
        let mut note = Note::new();
        note.owner_id = Some("user-1".to_string());
        let json = serde_json::to_string(&note).unwrap();
        let back: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note);
    }
}
