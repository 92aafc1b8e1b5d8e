//! Entity store contracts and the SQLite implementation.
//!
//! # Responsibility
//! - Define one repository trait per aggregate (catalog, folders, notes,
//!   settings) plus a unit-of-work trait for transactional saves.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `SqliteStore` only wraps connections migrated to the latest version.
//! - Update paths never move `updated_at` backwards.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::folder::FolderValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod catalog_repo;
pub mod folder_repo;
pub mod note_repo;
pub mod settings_repo;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failures (fetch/save, schema, persisted data).
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Write rejected by model validation.
    Validation(FolderValidationError),
    /// Update/delete target does not exist.
    NotFound { entity: &'static str, id: String },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "store requires table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "store requires column `{column}` in table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<FolderValidationError> for StoreError {
    fn from(value: FolderValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Transaction boundary: everything between `begin` and `commit` is saved
/// all-or-nothing.
pub trait UnitOfWork {
    fn begin(&self) -> StoreResult<()>;
    fn commit(&self) -> StoreResult<()>;
    /// Discards the open unit. A no-op when none is open.
    fn rollback(&self) -> StoreResult<()>;
}

/// Everything reconciliation needs from a store: catalog, folders, notes
/// and a transaction boundary.
pub trait EntityStore:
    catalog_repo::CatalogRepository
    + folder_repo::FolderRepository
    + note_repo::NoteRepository
    + UnitOfWork
{
}

impl<T> EntityStore for T where
    T: catalog_repo::CatalogRepository
        + folder_repo::FolderRepository
        + note_repo::NoteRepository
        + UnitOfWork
{
}

/// SQLite-backed entity store.
///
/// Callers serialize access: one store per coordinating context.
#[derive(Clone, Copy)]
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &'conn Connection {
        self.conn
    }
}

impl UnitOfWork for SqliteStore<'_> {
    fn begin(&self) -> StoreResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    fn rollback(&self) -> StoreResult<()> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }
}

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "modules",
        &["code", "title", "semester_key", "tutorial_group", "folder_id"],
    ),
    (
        "class_sessions",
        &["id", "module_code", "start_ms", "end_ms", "kind", "cancelled"],
    ),
    (
        "folders",
        &[
            "id",
            "name",
            "module_code",
            "module_ref",
            "session_type",
            "is_sub_folder",
            "parent_folder_id",
        ],
    ),
    (
        "notes",
        &["id", "module_code", "session_id", "folder_id", "title", "updated_at"],
    ),
    ("attachments", &["id", "note_id", "filename"]),
    ("user_settings", &["id", "reminder_lead_minutes"]),
];

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(StoreError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
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

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
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

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> StoreResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

pub(crate) fn parse_flag(value: i64, column: &'static str) -> StoreResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn require_changed(
    changed: usize,
    entity: &'static str,
    id: impl ToString,
) -> StoreResult<()> {
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity,
            id: id.to_string(),
        });
    }
    Ok(())
}
