//! Note domain model.
//!
//! # Responsibility
//! - Define the single persisted record of the application.
//! - Provide display helpers used by the rendering layer.
//!
//! # Invariants
//! - `id` is `None` until the store assigns one on insert.
//! - Once assigned, `id` is unique and never reused for another note.

use serde::{Deserialize, Serialize};

/// Store-assigned note identifier.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NoteId = i64;

/// Persisted note with optional title and description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Absent until first persisted.
    pub id: Option<NoteId>,
    /// Free text, may be blank.
    pub title: Option<String>,
    /// Free text, may be blank.
    pub description: Option<String>,
}

impl Note {
    /// Creates an unsaved note. The store assigns `id` on insert.
    pub fn new(title: Option<String>, description: Option<String>) -> Self {
        Self {
            id: None,
            title,
            description,
        }
    }

    /// Creates a note with a caller-provided id.
    ///
    /// Inserting such a note fails when the id is already taken.
    pub fn with_id(id: NoteId, title: Option<String>, description: Option<String>) -> Self {
        Self {
            id: Some(id),
            title,
            description,
        }
    }

    /// Shorthand for a note that only carries a description.
    pub fn from_description(description: impl Into<String>) -> Self {
        Self::new(None, Some(description.into()))
    }

    /// Returns the title when it holds visible text.
    pub fn display_title(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    /// Returns the description when it holds visible text.
    pub fn display_description(&self) -> Option<&str> {
        non_blank(self.description.as_deref())
    }

    /// Returns whether the note has been persisted at least once.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}
