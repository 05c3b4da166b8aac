//! Screen-level services.
//!
//! # Responsibility
//! - Orchestrate repository calls into observable screen state.
//! - Keep the rendering layer decoupled from storage details.

pub mod note_list;
