//! Note DAO contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/update/delete/read APIs over the `notes` table.
//! - Keep SQL details inside the core persistence boundary.
//! - Publish a live snapshot of all notes after every committed change.
//!
//! # Invariants
//! - Batch writes run in one transaction: all rows are kept or none.
//! - `get_all` returns rows in primary-key order.
//! - Unknown ids on update/delete affect zero rows and are not errors.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::note::{Note, NoteId};
use log::{debug, warn};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    description
FROM notes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Insert collided with an existing id.
    ConstraintViolation {
        id: Option<NoteId>,
        message: String,
    },
    InvalidData(String),
    /// Another thread panicked while holding the connection.
    LockPoisoned,
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ConstraintViolation {
                id: Some(id),
                message,
            } => write!(f, "constraint violation for note {id}: {message}"),
            Self::ConstraintViolation { id: None, message } => {
                write!(f, "constraint violation: {message}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::LockPoisoned => write!(f, "notes connection lock poisoned"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection is not migrated: expected schema version {expected_version}, found {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Data access contract for notes.
pub trait NoteDao: Send + Sync {
    /// Inserts notes and returns their ids in input order.
    fn insert(&self, notes: &[Note]) -> RepoResult<Vec<NoteId>>;
    /// Replaces title and description by id. Returns affected row count.
    fn update(&self, notes: &[Note]) -> RepoResult<usize>;
    /// Removes rows by id. Returns affected row count.
    fn delete(&self, notes: &[Note]) -> RepoResult<usize>;
    /// Removes rows whose id and content both match.
    fn delete_exact(&self, notes: &[Note]) -> RepoResult<usize>;
    fn get_all(&self) -> RepoResult<Vec<Note>>;
    fn get_by_id(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Live read: the receiver always holds the latest committed snapshot.
    fn observe_all(&self) -> watch::Receiver<Vec<Note>>;
}

/// SQLite-backed note DAO.
///
/// Owns its connection so it can be shared across background tasks.
pub struct SqliteNoteDao {
    conn: Mutex<Connection>,
    snapshot: watch::Sender<Vec<Note>>,
}

impl SqliteNoteDao {
    /// Constructs a DAO from a migrated/ready connection.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        let initial = query_all(&conn)?;
        let (snapshot, _) = watch::channel(initial);
        Ok(Self {
            conn: Mutex::new(conn),
            snapshot,
        })
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }

    // A failed re-read must not turn a committed write into an error.
    fn publish(&self, conn: &Connection, operation: &str) {
        match query_all(conn) {
            Ok(notes) => {
                debug!(
                    "event=notes_publish module=repo status=ok operation={operation} count={}",
                    notes.len()
                );
                self.snapshot.send_replace(notes);
            }
            Err(err) => warn!(
                "event=notes_publish module=repo status=error operation={operation} error={err}"
            ),
        }
    }

    fn write_batch<F>(&self, notes: &[Note], operation: &str, mut apply: F) -> RepoResult<usize>
    where
        F: FnMut(&rusqlite::Transaction<'_>, NoteId, &Note) -> rusqlite::Result<usize>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut changed = 0;
        for note in notes {
            let Some(id) = note.id else {
                continue;
            };
            changed += apply(&tx, id, note)?;
        }
        tx.commit()?;

        if changed > 0 {
            self.publish(&conn, operation);
        }
        Ok(changed)
    }
}

impl NoteDao for SqliteNoteDao {
    fn insert(&self, notes: &[Note]) -> RepoResult<Vec<NoteId>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(notes.len());
        for note in notes {
            tx.execute(
                "INSERT INTO notes (id, title, description) VALUES (?1, ?2, ?3);",
                params![note.id, note.title.as_deref(), note.description.as_deref()],
            )
            .map_err(|err| map_insert_error(err, note.id))?;
            ids.push(tx.last_insert_rowid());
        }
        tx.commit()?;

        if !ids.is_empty() {
            self.publish(&conn, "insert");
        }
        Ok(ids)
    }

    fn update(&self, notes: &[Note]) -> RepoResult<usize> {
        self.write_batch(notes, "update", |tx, id, note| {
            tx.execute(
                "UPDATE notes SET title = ?2, description = ?3 WHERE id = ?1;",
                params![id, note.title.as_deref(), note.description.as_deref()],
            )
        })
    }

    fn delete(&self, notes: &[Note]) -> RepoResult<usize> {
        self.write_batch(notes, "delete", |tx, id, _| {
            tx.execute("DELETE FROM notes WHERE id = ?1;", [id])
        })
    }

    fn delete_exact(&self, notes: &[Note]) -> RepoResult<usize> {
        self.write_batch(notes, "delete_exact", |tx, id, note| {
            tx.execute(
                "DELETE FROM notes
                 WHERE id = ?1
                   AND title IS ?2
                   AND description IS ?3;",
                params![id, note.title.as_deref(), note.description.as_deref()],
            )
        })
    }

    fn get_all(&self) -> RepoResult<Vec<Note>> {
        let conn = self.lock()?;
        query_all(&conn)
    }

    fn get_by_id(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }

        Ok(None)
    }

    fn observe_all(&self) -> watch::Receiver<Vec<Note>> {
        self.snapshot.subscribe()
    }
}

fn query_all(conn: &Connection) -> RepoResult<Vec<Note>> {
    let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} ORDER BY id ASC;"))?;
    let mut rows = stmt.query([])?;
    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        notes.push(parse_note_row(row)?);
    }
    Ok(notes)
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id: Option<NoteId> = row.get("id")?;
    let id = id.ok_or_else(|| RepoError::InvalidData("null value in notes.id".to_string()))?;
    Ok(Note {
        id: Some(id),
        title: row.get("title")?,
        description: row.get("description")?,
    })
}

fn map_insert_error(err: rusqlite::Error, id: Option<NoteId>) -> RepoError {
    if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        return RepoError::ConstraintViolation {
            id,
            message: err.to_string(),
        };
    }
    err.into()
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "notes")? {
        return Err(RepoError::MissingRequiredTable("notes"));
    }

    for column in ["id", "title", "description"] {
        if !table_has_column(conn, "notes", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "notes",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
