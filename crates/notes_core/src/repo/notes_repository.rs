//! Notes repository seam over the DAO.
//!
//! # Responsibility
//! - Decouple the view-model from the concrete storage type.
//! - Offer a single-note surface on top of the batch DAO contract.
//!
//! # Invariants
//! - Pure forwarding: no caching, batching or retry.

use crate::model::note::{Note, NoteId};
use crate::repo::note_dao::{NoteDao, RepoError, RepoResult};
use std::slice;
use tokio::sync::watch;

/// Repository interface consumed by the note list view-model.
pub trait NotesRepository: Send + Sync {
    /// One-shot read of every note.
    fn get_notes(&self) -> RepoResult<Vec<Note>>;
    /// Live read that follows every committed change.
    fn observe_notes(&self) -> watch::Receiver<Vec<Note>>;
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Inserts one note and returns its assigned id.
    fn save(&self, note: &Note) -> RepoResult<NoteId>;
    /// Full replace by id. Returns affected row count.
    fn update(&self, note: &Note) -> RepoResult<usize>;
    /// Removes by id. Returns affected row count.
    fn delete(&self, note: &Note) -> RepoResult<usize>;
}

/// DAO-backed repository; the only production implementation.
pub struct DaoNotesRepository<D: NoteDao> {
    dao: D,
}

impl<D: NoteDao> DaoNotesRepository<D> {
    pub fn new(dao: D) -> Self {
        Self { dao }
    }
}

impl<D: NoteDao> NotesRepository for DaoNotesRepository<D> {
    fn get_notes(&self) -> RepoResult<Vec<Note>> {
        self.dao.get_all()
    }

    fn observe_notes(&self) -> watch::Receiver<Vec<Note>> {
        self.dao.observe_all()
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        self.dao.get_by_id(id)
    }

    fn save(&self, note: &Note) -> RepoResult<NoteId> {
        self.dao
            .insert(slice::from_ref(note))?
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::InvalidData("insert returned no id".to_string()))
    }

    fn update(&self, note: &Note) -> RepoResult<usize> {
        self.dao.update(slice::from_ref(note))
    }

    fn delete(&self, note: &Note) -> RepoResult<usize> {
        self.dao.delete(slice::from_ref(note))
    }
}
