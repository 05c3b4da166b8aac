//! Core domain logic for the notes app.
//! This crate is the single source of truth for note storage and the
//! note list screen state.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{Note, NoteId};
pub use model::state::{Actions, NotesState};
pub use repo::note_dao::{NoteDao, RepoError, RepoResult, SqliteNoteDao};
pub use repo::notes_repository::{DaoNotesRepository, NotesRepository};
pub use service::note_list::{NoteListError, NoteListViewModel, WriteOutcome, WriteResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
