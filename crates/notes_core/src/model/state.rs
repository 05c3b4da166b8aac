//! Observable values owned by the note list view-model.
//!
//! # Invariants
//! - Exactly one `NotesState` branch is rendered at a time.
//! - `Actions` is never persisted; it lives as long as the screen.

use crate::model::note::Note;

/// What the note list screen should render right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesState {
    /// A load is in flight.
    Loading,
    /// The store holds no notes.
    Empty,
    /// The store holds at least one note, in store order.
    Success(Vec<Note>),
    /// The last load failed; carries the error display text.
    Failure(String),
}

impl NotesState {
    /// Maps a completed read into `Empty` or `Success`.
    pub fn from_notes(notes: Vec<Note>) -> Self {
        if notes.is_empty() {
            Self::Empty
        } else {
            Self::Success(notes)
        }
    }

    /// Short stable label, used in log events.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Empty => "empty",
            Self::Success(_) => "success",
            Self::Failure(_) => "failure",
        }
    }
}

/// Pending user action on the note list screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Actions {
    /// No dialog is open.
    #[default]
    Idle,
    /// The entry dialog is open; `None` means a new note.
    OpenDialog(Option<Note>),
}
