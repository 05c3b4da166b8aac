//! Text rendering of the note list screen.
//!
//! # Responsibility
//! - Render exactly one branch per `NotesState`.
//! - Append the entry dialog when `Actions::OpenDialog` is pending.
//!
//! # Invariants
//! - Blank titles and descriptions are never rendered.
//! - Success renders a two-column grid in store order.

use notes_core::{Actions, Note, NotesState};

const CARD_WIDTH: usize = 30;
const COLUMN_GAP: &str = "  ";

/// Renders the whole screen for the given state and pending action.
pub fn render_screen(state: &NotesState, actions: &Actions) -> String {
    let mut out = render_state(state);
    if let Actions::OpenDialog(note) = actions {
        out.push('\n');
        out.push_str(&render_dialog(note.as_ref()));
    }
    out
}

fn render_state(state: &NotesState) -> String {
    match state {
        NotesState::Loading => "Loading notes...\n".to_string(),
        NotesState::Empty => {
            "   .-----.\n   | ~~~ |\n   '-----'\nNo notes yet. Add one with `notes add <text>`.\n"
                .to_string()
        }
        NotesState::Success(notes) => render_grid(notes),
        NotesState::Failure(message) => format!("! Could not load notes: {message}\n"),
    }
}

fn render_grid(notes: &[Note]) -> String {
    let mut out = String::new();
    for row in notes.chunks(2) {
        let left = card_lines(&row[0]);
        let right = row.get(1).map(card_lines).unwrap_or_default();
        let height = left.len().max(right.len());
        for idx in 0..height {
            let left_line = left.get(idx).map(String::as_str).unwrap_or("");
            match right.get(idx) {
                Some(right_line) => {
                    out.push_str(&format!(
                        "{:<width$}{}{}",
                        left_line,
                        COLUMN_GAP,
                        right_line,
                        width = CARD_WIDTH
                    ));
                }
                None => out.push_str(left_line.trim_end()),
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

fn card_lines(note: &Note) -> Vec<String> {
    let mut lines = vec![match note.id {
        Some(id) => format!("#{id}"),
        None => "#new".to_string(),
    }];
    if let Some(title) = note.display_title() {
        lines.push(fit(title));
    }
    if let Some(description) = note.display_description() {
        lines.push(fit(description));
    }
    lines
}

fn render_dialog(note: Option<&Note>) -> String {
    match note {
        Some(note) => {
            let id = note.id.map_or_else(|| "new".to_string(), |id| id.to_string());
            format!(
                "[ Edit note #{id} ]\ntitle: {}\ndescription: {}\n[ Cancel ] [ Save ]\n",
                note.title.as_deref().unwrap_or(""),
                note.description.as_deref().unwrap_or("")
            )
        }
        None => "[ New note ]\ntitle:\ndescription:\n[ Cancel ] [ Save ]\n".to_string(),
    }
}

// Single-line, width-capped text for one card row.
fn fit(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= CARD_WIDTH {
        return flat;
    }
    let mut cut = flat.chars().take(CARD_WIDTH - 3).collect::<String>();
    cut.push_str("...");
    cut
}
