//! Domain model for the note list screen.
//!
//! # Responsibility
//! - Define the persisted `Note` record.
//! - Define the observable screen values (`NotesState`, `Actions`).
//!
//! # Invariants
//! - A note id is assigned by the store and never changes afterwards.
//! - No validation layer exists: blank title and description are accepted.

pub mod note;
pub mod state;
