//! Note list view-model.
//!
//! # Responsibility
//! - Own the observable screen values (`NotesState`, `Actions`, notices).
//! - Run every storage call on a background task so observers never block.
//! - Translate load failures into `NotesState::Failure` and write failures
//!   into a transient notice plus a returned error.
//!
//! # Invariants
//! - The view-model is the only writer of its observable values.
//! - `on_start` always publishes `Loading` before anything else.
//! - After the first snapshot the list follows the live store read, so
//!   writes from any caller are reflected without a manual reload.
//! - Write failures never reach `NotesState`.

use crate::model::note::{Note, NoteId};
use crate::model::state::{Actions, NotesState};
use crate::repo::note_dao::{RepoError, RepoResult};
use crate::repo::notes_repository::NotesRepository;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Error returned by background writes.
#[derive(Debug)]
pub enum NoteListError {
    /// Persistence-layer failure.
    Repo(RepoError),
    /// The background task panicked or was cancelled.
    Task(String),
}

impl Display for NoteListError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Task(details) => write!(f, "background task failed: {details}"),
        }
    }
}

impl Error for NoteListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Task(_) => None,
        }
    }
}

impl From<RepoError> for NoteListError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Successful result of a background write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Saved(NoteId),
    /// Affected row count; zero when the note no longer exists.
    Updated(usize),
    /// Affected row count; zero when the note no longer exists.
    Deleted(usize),
}

pub type WriteResult = Result<WriteOutcome, NoteListError>;

/// View-model for the single note list screen.
///
/// Constructed and owned by the screen controller. Dropping it (or calling
/// [`NoteListViewModel::close`]) stops the live list task; writes already
/// in flight still run to completion.
pub struct NoteListViewModel<R: NotesRepository + 'static> {
    repository: Arc<R>,
    runtime: Handle,
    notes: Arc<watch::Sender<NotesState>>,
    actions: watch::Sender<Actions>,
    notices: Arc<watch::Sender<Option<String>>>,
    load_generation: Arc<AtomicU64>,
    load_task: Mutex<Option<JoinHandle<()>>>,
}

impl<R: NotesRepository + 'static> NoteListViewModel<R> {
    /// Creates a view-model bound to the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime. Use
    /// [`NoteListViewModel::with_runtime`] from synchronous callers.
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_runtime(repository, Handle::current())
    }

    /// Creates a view-model that spawns its work on `runtime`.
    pub fn with_runtime(repository: Arc<R>, runtime: Handle) -> Self {
        let (notes, _) = watch::channel(NotesState::Loading);
        let (actions, _) = watch::channel(Actions::Idle);
        let (notices, _) = watch::channel(None);
        Self {
            repository,
            runtime,
            notes: Arc::new(notes),
            actions,
            notices: Arc::new(notices),
            load_generation: Arc::new(AtomicU64::new(0)),
            load_task: Mutex::new(None),
        }
    }

    /// Subscribes to the list state.
    pub fn notes(&self) -> watch::Receiver<NotesState> {
        self.notes.subscribe()
    }

    /// Subscribes to the pending dialog action.
    pub fn actions(&self) -> watch::Receiver<Actions> {
        self.actions.subscribe()
    }

    /// Subscribes to transient write-failure notices.
    pub fn notices(&self) -> watch::Receiver<Option<String>> {
        self.notices.subscribe()
    }

    /// Snapshot of the current list state.
    pub fn state(&self) -> NotesState {
        self.notes.borrow().clone()
    }

    /// Hides the current notice, if any.
    pub fn clear_notice(&self) {
        self.notices.send_replace(None);
    }

    /// Starts (or restarts) loading the note list.
    ///
    /// Publishes `Loading` immediately; the read runs in the background.
    pub fn on_start(&self) {
        let mut slot = self
            .load_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.notes.send_replace(NotesState::Loading);
        info!("event=notes_load module=service status=start generation={generation}");

        let load = LoadTask {
            repository: Arc::clone(&self.repository),
            notes: Arc::clone(&self.notes),
            current_generation: Arc::clone(&self.load_generation),
            generation,
        };
        *slot = Some(self.runtime.spawn(load.run()));
    }

    /// Opens the entry dialog, for an existing note or a new one.
    pub fn on_card_click(&self, note: Option<Note>) {
        self.actions.send_replace(Actions::OpenDialog(note));
    }

    /// Deletes `note` in the background.
    pub fn on_card_long_click(&self, note: Note) -> JoinHandle<WriteResult> {
        self.spawn_write("delete", move |repository| {
            repository.delete(&note).map(WriteOutcome::Deleted)
        })
    }

    /// Closes the entry dialog without saving.
    pub fn on_dismiss_dialog(&self) {
        self.actions.send_replace(Actions::Idle);
    }

    /// Closes the dialog and persists its content in the background.
    ///
    /// When the dialog was opened for a persisted note, that note is
    /// replaced; otherwise a new note is saved.
    pub fn on_confirm(
        &self,
        title: Option<String>,
        description: Option<String>,
    ) -> JoinHandle<WriteResult> {
        let editing = match self.actions.send_replace(Actions::Idle) {
            Actions::OpenDialog(Some(note)) if note.is_persisted() => note.id,
            _ => None,
        };

        match editing {
            Some(id) => {
                let note = Note::with_id(id, title, description);
                self.spawn_write("update", move |repository| {
                    repository.update(&note).map(WriteOutcome::Updated)
                })
            }
            None => {
                let note = Note::new(title, description);
                self.spawn_write("save", move |repository| {
                    repository.save(&note).map(WriteOutcome::Saved)
                })
            }
        }
    }

    /// Stops following the store. Pending writes are not cancelled.
    pub fn close(&self) {
        let mut slot = self
            .load_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.abort();
            info!("event=notes_load module=service status=closed");
        }
    }

    fn spawn_write<F>(&self, operation: &'static str, write: F) -> JoinHandle<WriteResult>
    where
        F: FnOnce(&R) -> RepoResult<WriteOutcome> + Send + 'static,
    {
        let repository = Arc::clone(&self.repository);
        let notices = Arc::clone(&self.notices);
        self.runtime.spawn(async move {
            let started_at = Instant::now();
            let joined = tokio::task::spawn_blocking(move || write(repository.as_ref())).await;
            let result = match joined {
                Ok(result) => result.map_err(NoteListError::from),
                Err(err) => Err(NoteListError::Task(err.to_string())),
            };

            match &result {
                Ok(outcome) => info!(
                    "event=note_write module=service status=ok operation={operation} duration_ms={} outcome={outcome:?}",
                    started_at.elapsed().as_millis()
                ),
                Err(err) => {
                    warn!(
                        "event=note_write module=service status=error operation={operation} duration_ms={} error={err}",
                        started_at.elapsed().as_millis()
                    );
                    notices.send_replace(Some(format!("could not {operation} note: {err}")));
                }
            }
            result
        })
    }
}

impl<R: NotesRepository + 'static> Drop for NoteListViewModel<R> {
    fn drop(&mut self) {
        self.close();
    }
}

struct LoadTask<R: NotesRepository + 'static> {
    repository: Arc<R>,
    notes: Arc<watch::Sender<NotesState>>,
    current_generation: Arc<AtomicU64>,
    generation: u64,
}

impl<R: NotesRepository + 'static> LoadTask<R> {
    async fn run(self) {
        let started_at = Instant::now();
        // Subscribe before the read so no commit between the two is missed.
        let mut live = self.repository.observe_notes();

        let reader = Arc::clone(&self.repository);
        let initial = match tokio::task::spawn_blocking(move || reader.get_notes()).await {
            Ok(Ok(notes)) => notes,
            Ok(Err(err)) => return self.fail(err.to_string(), started_at),
            Err(err) => return self.fail(err.to_string(), started_at),
        };

        let state = NotesState::from_notes(initial);
        info!(
            "event=notes_load module=service status=ok generation={} state={} duration_ms={}",
            self.generation,
            state.label(),
            started_at.elapsed().as_millis()
        );
        self.publish(state);

        while live.changed().await.is_ok() {
            let snapshot = live.borrow_and_update().clone();
            self.publish(NotesState::from_notes(snapshot));
        }
    }

    fn fail(&self, message: String, started_at: Instant) {
        warn!(
            "event=notes_load module=service status=error generation={} duration_ms={} error={message}",
            self.generation,
            started_at.elapsed().as_millis()
        );
        self.publish(NotesState::Failure(message));
    }

    // Checked under the channel lock: `on_start` bumps the generation before
    // it publishes `Loading`, so a superseded load can never land after it.
    fn publish(&self, state: NotesState) -> bool {
        self.notes.send_if_modified(|current| {
            if self.current_generation.load(Ordering::SeqCst) != self.generation {
                return false;
            }
            *current = state;
            true
        })
    }
}
