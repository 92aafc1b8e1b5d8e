//! Domain model for modules, class sessions, folders and notes.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep naming/colour/template rules pure and storage-agnostic.
//!
//! # Invariants
//! - Every folder and note is identified by a stable UUID.
//! - Modules are keyed by their `code`.
//! - Timestamps are epoch milliseconds and never move backwards on update.

pub mod attachment;
pub mod color;
pub mod folder;
pub mod module;
pub mod note;
pub mod session;
pub mod settings;

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
