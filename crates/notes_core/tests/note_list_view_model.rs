use notes_core::db::open_db_in_memory;
use notes_core::{
    Actions, DaoNotesRepository, Note, NoteId, NoteListError, NoteListViewModel, NotesRepository,
    NotesState, RepoError, RepoResult, SqliteNoteDao, WriteOutcome,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use tokio::sync::{mpsc as async_mpsc, watch};

type SqliteRepository = DaoNotesRepository<SqliteNoteDao>;

fn sqlite_repository(seed: &[&str]) -> Arc<SqliteRepository> {
    let dao = SqliteNoteDao::try_new(open_db_in_memory().unwrap()).unwrap();
    let repo = DaoNotesRepository::new(dao);
    for description in seed {
        repo.save(&Note::from_description(*description)).unwrap();
    }
    Arc::new(repo)
}

/// Repository whose every call fails, for error-path tests.
struct FailingRepository;

impl FailingRepository {
    fn error() -> RepoError {
        RepoError::InvalidData("boom".to_string())
    }
}

impl NotesRepository for FailingRepository {
    fn get_notes(&self) -> RepoResult<Vec<Note>> {
        Err(Self::error())
    }

    fn observe_notes(&self) -> watch::Receiver<Vec<Note>> {
        watch::channel(Vec::new()).1
    }

    fn get_note(&self, _id: NoteId) -> RepoResult<Option<Note>> {
        Err(Self::error())
    }

    fn save(&self, _note: &Note) -> RepoResult<NoteId> {
        Err(Self::error())
    }

    fn update(&self, _note: &Note) -> RepoResult<usize> {
        Err(Self::error())
    }

    fn delete(&self, _note: &Note) -> RepoResult<usize> {
        Err(Self::error())
    }
}

/// Repository whose N-th `get_notes` call returns N notes. The first call
/// is held until the test releases it.
struct GatedRepository {
    calls: AtomicUsize,
    entered: async_mpsc::UnboundedSender<usize>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl GatedRepository {
    fn new() -> (
        Arc<Self>,
        async_mpsc::UnboundedReceiver<usize>,
        mpsc::Sender<()>,
    ) {
        let (entered_tx, entered_rx) = async_mpsc::unbounded_channel();
        let (release_tx, release_rx) = mpsc::channel();
        let repo = Self {
            calls: AtomicUsize::new(0),
            entered: entered_tx,
            release: Mutex::new(release_rx),
        };
        (Arc::new(repo), entered_rx, release_tx)
    }
}

impl NotesRepository for GatedRepository {
    fn get_notes(&self) -> RepoResult<Vec<Note>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.entered.send(call);
        if call == 1 {
            let _ = self.release.lock().unwrap().recv();
        }
        let notes = (1..=call)
            .map(|id| Note::with_id(id as NoteId, None, Some(format!("read {call}"))))
            .collect();
        let _ = self.entered.send(call + 100);
        Ok(notes)
    }

    fn observe_notes(&self) -> watch::Receiver<Vec<Note>> {
        watch::channel(Vec::new()).1
    }

    fn get_note(&self, _id: NoteId) -> RepoResult<Option<Note>> {
        Ok(None)
    }

    fn save(&self, _note: &Note) -> RepoResult<NoteId> {
        Ok(0)
    }

    fn update(&self, _note: &Note) -> RepoResult<usize> {
        Ok(0)
    }

    fn delete(&self, _note: &Note) -> RepoResult<usize> {
        Ok(0)
    }
}

async fn settle(rx: &mut watch::Receiver<NotesState>) -> NotesState {
    rx.wait_for(|state| *state != NotesState::Loading)
        .await
        .unwrap()
        .clone()
}

async fn wait_for_count(rx: &mut watch::Receiver<NotesState>, count: usize) -> Vec<Note> {
    let state = rx
        .wait_for(|state| matches!(state, NotesState::Success(notes) if notes.len() == count))
        .await
        .unwrap()
        .clone();
    match state {
        NotesState::Success(notes) => notes,
        other => panic!("unexpected state: {other:?}"),
    }
}

#[tokio::test]
async fn start_with_empty_store_goes_loading_then_empty() {
    let vm = NoteListViewModel::new(sqlite_repository(&[]));
    let mut rx = vm.notes();

    vm.on_start();
    assert_eq!(*rx.borrow_and_update(), NotesState::Loading);
    assert_eq!(settle(&mut rx).await, NotesState::Empty);
}

#[tokio::test]
async fn start_with_notes_goes_loading_then_success() {
    let vm = NoteListViewModel::new(sqlite_repository(&["Cartao 1", "Cartao 2", "Cartao 3"]));
    let mut rx = vm.notes();

    vm.on_start();
    assert_eq!(vm.state(), NotesState::Loading);
    match settle(&mut rx).await {
        NotesState::Success(notes) => {
            assert_eq!(notes.len(), 3);
            assert_eq!(notes[0].description.as_deref(), Some("Cartao 1"));
        }
        other => panic!("unexpected state: {other:?}"),
    }
}

#[tokio::test]
async fn start_with_failing_repository_goes_loading_then_failure() {
    let vm = NoteListViewModel::new(Arc::new(FailingRepository));
    let mut rx = vm.notes();

    vm.on_start();
    assert_eq!(*rx.borrow_and_update(), NotesState::Loading);
    match settle(&mut rx).await {
        NotesState::Failure(message) => assert!(message.contains("boom")),
        other => panic!("unexpected state: {other:?}"),
    }
}

#[tokio::test]
async fn long_click_deletes_and_live_list_refreshes() {
    let vm = NoteListViewModel::new(sqlite_repository(&["a", "b", "c"]));
    let mut rx = vm.notes();
    vm.on_start();
    let notes = wait_for_count(&mut rx, 3).await;

    let outcome = vm.on_card_long_click(notes[0].clone()).await.unwrap();
    assert_eq!(outcome.unwrap(), WriteOutcome::Deleted(1));

    let remaining = wait_for_count(&mut rx, 2).await;
    assert_eq!(remaining[0].description.as_deref(), Some("b"));
    assert_eq!(remaining[1].description.as_deref(), Some("c"));
}

#[tokio::test]
async fn deleting_last_note_goes_back_to_empty() {
    let vm = NoteListViewModel::new(sqlite_repository(&["only"]));
    let mut rx = vm.notes();
    vm.on_start();
    let notes = wait_for_count(&mut rx, 1).await;

    vm.on_card_long_click(notes[0].clone())
        .await
        .unwrap()
        .unwrap();
    rx.wait_for(|state| *state == NotesState::Empty)
        .await
        .unwrap();
}

#[tokio::test]
async fn card_click_and_dismiss_toggle_actions_only() {
    let vm = NoteListViewModel::new(sqlite_repository(&[]));
    let mut rx = vm.notes();
    vm.on_start();
    assert_eq!(settle(&mut rx).await, NotesState::Empty);

    let actions = vm.actions();
    assert_eq!(*actions.borrow(), Actions::Idle);

    vm.on_card_click(None);
    assert_eq!(*actions.borrow(), Actions::OpenDialog(None));
    assert_eq!(vm.state(), NotesState::Empty);

    vm.on_dismiss_dialog();
    assert_eq!(*actions.borrow(), Actions::Idle);
    assert_eq!(vm.state(), NotesState::Empty);
}

#[tokio::test]
async fn confirm_saves_new_note_and_closes_dialog() {
    let vm = NoteListViewModel::new(sqlite_repository(&[]));
    let mut rx = vm.notes();
    vm.on_start();
    settle(&mut rx).await;

    vm.on_card_click(None);
    let handle = vm.on_confirm(None, Some("Cartao 1".to_string()));
    assert_eq!(*vm.actions().borrow(), Actions::Idle);

    let outcome = handle.await.unwrap().unwrap();
    let WriteOutcome::Saved(id) = outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };

    let notes = wait_for_count(&mut rx, 1).await;
    assert_eq!(notes[0].id, Some(id));
    assert_eq!(notes[0].description.as_deref(), Some("Cartao 1"));
}

#[tokio::test]
async fn confirm_on_existing_note_updates_it_in_place() {
    let repo = sqlite_repository(&["Cartao 1", "Cartao 2"]);
    let vm = NoteListViewModel::new(Arc::clone(&repo));
    let mut rx = vm.notes();
    vm.on_start();
    let notes = wait_for_count(&mut rx, 2).await;

    vm.on_card_click(Some(notes[0].clone()));
    let outcome = vm
        .on_confirm(Some("titulo".to_string()), Some("Atualizado".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Updated(1));

    let state = rx
        .wait_for(|state| match state {
            NotesState::Success(notes) => notes[0].description.as_deref() == Some("Atualizado"),
            _ => false,
        })
        .await
        .unwrap()
        .clone();
    let updated = match state {
        NotesState::Success(notes) => notes,
        other => panic!("unexpected state: {other:?}"),
    };
    assert_eq!(updated.len(), 2);
    assert_eq!(updated[0].id, notes[0].id);
    assert_eq!(updated[0].title.as_deref(), Some("titulo"));
}

#[tokio::test]
async fn write_failure_publishes_notice_and_leaves_state_alone() {
    let vm = NoteListViewModel::new(Arc::new(FailingRepository));
    let mut rx = vm.notes();
    vm.on_start();
    let failed = settle(&mut rx).await;

    let err = vm
        .on_confirm(None, Some("lost".to_string()))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, NoteListError::Repo(RepoError::InvalidData(_))));

    let notice = vm.notices().borrow().clone();
    assert!(notice.unwrap().contains("could not save note"));
    assert_eq!(vm.state(), failed);

    vm.clear_notice();
    assert!(vm.notices().borrow().is_none());
}

#[tokio::test]
async fn start_is_reentrant() {
    let repo = sqlite_repository(&[]);
    let vm = NoteListViewModel::new(Arc::clone(&repo));
    let mut rx = vm.notes();
    vm.on_start();
    assert_eq!(settle(&mut rx).await, NotesState::Empty);

    repo.save(&Note::from_description("late")).unwrap();
    wait_for_count(&mut rx, 1).await;

    vm.on_start();
    assert_eq!(vm.state(), NotesState::Loading);
    match settle(&mut rx).await {
        NotesState::Success(notes) => assert_eq!(notes.len(), 1),
        other => panic!("unexpected state: {other:?}"),
    }
}

#[tokio::test]
async fn close_stops_following_the_store() {
    let repo = sqlite_repository(&["kept"]);
    let vm = NoteListViewModel::new(Arc::clone(&repo));
    let mut rx = vm.notes();
    vm.on_start();
    wait_for_count(&mut rx, 1).await;

    vm.close();
    repo.save(&Note::from_description("unseen")).unwrap();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    match vm.state() {
        NotesState::Success(notes) => assert_eq!(notes.len(), 1),
        other => panic!("unexpected state: {other:?}"),
    }
}

#[tokio::test]
async fn restart_while_loading_keeps_the_newer_read() {
    let (repo, mut entered, release) = GatedRepository::new();
    let vm = NoteListViewModel::new(Arc::clone(&repo));
    let mut rx = vm.notes();

    vm.on_start();
    assert_eq!(entered.recv().await, Some(1));

    vm.on_start();
    assert_eq!(vm.state(), NotesState::Loading);
    match settle(&mut rx).await {
        NotesState::Success(notes) => assert_eq!(notes.len(), 2),
        other => panic!("unexpected state: {other:?}"),
    }

    release.send(()).unwrap();
    while let Some(event) = entered.recv().await {
        if event == 101 {
            break;
        }
    }
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    match vm.state() {
        NotesState::Success(notes) => {
            assert_eq!(notes.len(), 2);
            assert_eq!(notes[0].description.as_deref(), Some("read 2"));
        }
        other => panic!("unexpected state: {other:?}"),
    }
}

#[tokio::test]
async fn confirm_on_unsaved_dialog_note_saves_a_new_one() {
    let vm = NoteListViewModel::new(sqlite_repository(&[]));
    let mut rx = vm.notes();
    vm.on_start();
    settle(&mut rx).await;

    vm.on_card_click(Some(Note::from_description("draft")));
    let outcome = vm
        .on_confirm(None, Some("draft".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, WriteOutcome::Saved(_)));
    assert_eq!(wait_for_count(&mut rx, 1).await.len(), 1);
}
