//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - `note_dao`: narrow SQL-facing contract over the `notes` table.
//! - `notes_repository`: forwarding seam consumed by the view-model.
//!
//! # Invariants
//! - Missing rows are reported as `None` or a zero row count, never as errors.
//! - Every committed write republishes the live note snapshot.

pub mod note_dao;
pub mod notes_repository;
