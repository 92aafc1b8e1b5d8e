//! Core domain logic for ClassNotes.
//! This crate is the single source of truth for folder and note invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attachment::Attachment;
pub use model::color::color_for;
pub use model::folder::{Folder, FolderId, FolderValidationError};
pub use model::module::Module;
pub use model::note::{Note, NoteId};
pub use model::session::{ClassSession, SessionId, SessionKind};
pub use model::settings::UserSettings;
pub use repo::{EntityStore, SqliteStore, StoreError, StoreResult, UnitOfWork};
pub use service::catalog_service::{
    CatalogError, CatalogService, DatedLesson, ImportReport, Semester, TimetableSource,
};
pub use service::folder_service::{FolderService, ReconcileError, ReconcileReport};
pub use service::note_service::{NoteService, NoteServiceError};
pub use service::reminder_service::{
    NotificationService, ReminderError, ReminderReport, ReminderRequest, ReminderScheduler,
    SchedulingError,
};
pub use service::settings_service::{SettingsError, SettingsService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
