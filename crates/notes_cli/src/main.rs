//! Command-line front-end for the notes store.
//!
//! # Responsibility
//! - Collect configuration (database path, logging) from arguments.
//! - Drive the note list view-model and render its settled state.

mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use notes_core::db::open_db;
use notes_core::{
    init_logging, Actions, DaoNotesRepository, NoteId, NoteListViewModel, NotesRepository,
    NotesState, SqliteNoteDao, WriteOutcome,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Repository = DaoNotesRepository<SqliteNoteDao>;

#[derive(Parser)]
#[command(name = "notes")]
#[command(about = "Local note list backed by SQLite", long_about = None)]
struct Cli {
    /// SQLite database file, created on first use.
    #[arg(long, global = true, default_value = "notes.sqlite3")]
    db: PathBuf,
    /// Log level: trace|debug|info|warn|error.
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Absolute directory for rolling log files. Logging is off without it.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// Print notes as JSON instead of the card grid.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every note
    List,
    /// Show one note
    Show { id: NoteId },
    /// Create a note
    Add {
        #[arg(long)]
        title: Option<String>,
        description: String,
    },
    /// Replace title and/or description of a note
    Edit {
        id: NoteId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a note
    Delete { id: NoteId },
    /// Print core linkage information
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_ref() {
        let level = cli
            .log_level
            .as_deref()
            .unwrap_or(notes_core::default_log_level());
        let log_dir = log_dir
            .to_str()
            .context("log directory must be valid UTF-8")?;
        init_logging(level, log_dir).map_err(anyhow::Error::msg)?;
    }

    let json = cli.json;
    match cli.command {
        Commands::Ping => {
            println!("notes_core ping={}", notes_core::ping());
            println!("notes_core version={}", notes_core::core_version());
            Ok(())
        }
        Commands::List => {
            let (_, view_model) = open_screen(&cli.db)?;
            finish(&view_model, json).await
        }
        Commands::Show { id } => {
            let repository = open_repository(&cli.db)?;
            let note = find_note(&repository, id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&note)?);
            } else {
                print!(
                    "{}",
                    ui::render_screen(&NotesState::Success(vec![note]), &Actions::Idle)
                );
            }
            Ok(())
        }
        Commands::Add { title, description } => {
            let (_, view_model) = open_screen(&cli.db)?;
            view_model.on_card_click(None);
            let outcome = view_model
                .on_confirm(title, Some(description))
                .await
                .context("save task did not finish")??;
            if let WriteOutcome::Saved(id) = outcome {
                info!("event=cli_add module=cli status=ok id={id}");
                eprintln!("saved note #{id}");
            }
            finish(&view_model, json).await
        }
        Commands::Edit {
            id,
            title,
            description,
        } => {
            if title.is_none() && description.is_none() {
                bail!("nothing to change: pass --title and/or --description");
            }
            let (repository, view_model) = open_screen(&cli.db)?;
            let current = find_note(&repository, id)?;
            let title = title.or_else(|| current.title.clone());
            let description = description.or_else(|| current.description.clone());
            view_model.on_card_click(Some(current));
            view_model
                .on_confirm(title, description)
                .await
                .context("update task did not finish")??;
            eprintln!("updated note #{id}");
            finish(&view_model, json).await
        }
        Commands::Delete { id } => {
            let (repository, view_model) = open_screen(&cli.db)?;
            let note = find_note(&repository, id)?;
            view_model
                .on_card_long_click(note)
                .await
                .context("delete task did not finish")??;
            eprintln!("deleted note #{id}");
            finish(&view_model, json).await
        }
    }
}

fn open_repository(db: &Path) -> Result<Arc<Repository>> {
    let conn =
        open_db(db).with_context(|| format!("failed to open database `{}`", db.display()))?;
    let dao = SqliteNoteDao::try_new(conn).context("database is not usable")?;
    Ok(Arc::new(DaoNotesRepository::new(dao)))
}

fn open_screen(db: &Path) -> Result<(Arc<Repository>, NoteListViewModel<Repository>)> {
    let repository = open_repository(db)?;
    let view_model = NoteListViewModel::new(Arc::clone(&repository));
    Ok((repository, view_model))
}

async fn finish(view_model: &NoteListViewModel<Repository>, json: bool) -> Result<()> {
    let state = load_settled(view_model).await?;
    view_model.close();
    print_state(&state, json)
}

fn find_note(repository: &Repository, id: NoteId) -> Result<notes_core::Note> {
    repository
        .get_note(id)?
        .with_context(|| format!("note #{id} not found"))
}

async fn load_settled(view_model: &NoteListViewModel<Repository>) -> Result<NotesState> {
    let mut states = view_model.notes();
    view_model.on_start();
    let state = states
        .wait_for(|state| *state != NotesState::Loading)
        .await
        .context("note list closed before loading finished")?
        .clone();
    Ok(state)
}

// Load failures exit non-zero in both output modes.
fn print_state(state: &NotesState, json: bool) -> Result<()> {
    if !json {
        print!("{}", ui::render_screen(state, &Actions::Idle));
    }

    match state {
        NotesState::Success(notes) if json => {
            println!("{}", serde_json::to_string_pretty(notes)?)
        }
        NotesState::Empty if json => println!("[]"),
        NotesState::Success(_) | NotesState::Empty => {}
        NotesState::Failure(message) => bail!("could not load notes: {message}"),
        NotesState::Loading => bail!("note list is still loading"),
    }
    Ok(())
}
