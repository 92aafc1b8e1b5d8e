//! Module and class-session persistence.
//!
//! # Invariants
//! - `modules.code` is unique; inserts of an existing code fail.
//! - Deleting a module cascades to its sessions, folders and their notes.
//! - Session listings are ordered by `start_ms ASC, id ASC`.

use crate::model::folder::FolderId;
use crate::model::module::Module;
use crate::model::now_epoch_ms;
use crate::model::session::{ClassSession, SessionId, SessionKind};
use crate::repo::{
    bool_to_int, parse_flag, parse_optional_uuid, parse_uuid, require_changed, SqliteStore,
    StoreResult,
};
use rusqlite::{params, OptionalExtension, Row};

const MODULE_SELECT_SQL: &str = "SELECT
    code,
    title,
    semester_key,
    tutorial_group,
    folder_id,
    created_at,
    updated_at
FROM modules";

const SESSION_SELECT_SQL: &str = "SELECT
    id,
    module_code,
    start_ms,
    end_ms,
    kind,
    location,
    week_number,
    cancelled,
    created_at,
    updated_at
FROM class_sessions";

/// Repository interface for modules and their sessions.
pub trait CatalogRepository {
    fn insert_module(&self, module: &Module) -> StoreResult<()>;
    fn get_module(&self, code: &str) -> StoreResult<Option<Module>>;
    /// All modules ordered by code.
    fn list_modules(&self) -> StoreResult<Vec<Module>>;
    fn delete_module(&self, code: &str) -> StoreResult<()>;
    /// Links (or unlinks) the module's main folder.
    fn set_module_folder(&self, code: &str, folder_id: Option<FolderId>) -> StoreResult<()>;
    /// Unlinks every module's main folder, returning the rows touched.
    fn clear_all_module_folders(&self) -> StoreResult<usize>;
    fn insert_session(&self, session: &ClassSession) -> StoreResult<()>;
    fn get_session(&self, id: SessionId) -> StoreResult<Option<ClassSession>>;
    fn list_sessions_for_module(&self, code: &str) -> StoreResult<Vec<ClassSession>>;
    /// Sessions with `start_ms > after_ms` that are not cancelled.
    fn list_upcoming_sessions(&self, after_ms: i64) -> StoreResult<Vec<ClassSession>>;
    fn set_session_cancelled(&self, id: SessionId, cancelled: bool) -> StoreResult<()>;
    /// Deletes every session of a module (and, by cascade, its session notes).
    fn delete_sessions_for_module(&self, code: &str) -> StoreResult<usize>;
}

impl CatalogRepository for SqliteStore<'_> {
    fn insert_module(&self, module: &Module) -> StoreResult<()> {
        self.conn().execute(
            "INSERT INTO modules (
                code,
                title,
                semester_key,
                tutorial_group,
                folder_id,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                module.code.as_str(),
                module.title.as_str(),
                module.semester_key.as_str(),
                module.tutorial_group.as_deref(),
                module.folder_id.map(|id| id.to_string()),
                module.created_at,
                module.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_module(&self, code: &str) -> StoreResult<Option<Module>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{MODULE_SELECT_SQL} WHERE code = ?1;"))?;
        let mut rows = stmt.query([code])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_module_row(row)?));
        }
        Ok(None)
    }

    fn list_modules(&self) -> StoreResult<Vec<Module>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{MODULE_SELECT_SQL} ORDER BY code ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut modules = Vec::new();
        while let Some(row) = rows.next()? {
            modules.push(parse_module_row(row)?);
        }
        Ok(modules)
    }

    fn delete_module(&self, code: &str) -> StoreResult<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM modules WHERE code = ?1;", [code])?;
        require_changed(changed, "module", code)
    }

    fn set_module_folder(&self, code: &str, folder_id: Option<FolderId>) -> StoreResult<()> {
        let changed = self.conn().execute(
            "UPDATE modules
             SET folder_id = ?2,
                 updated_at = MAX(updated_at, ?3)
             WHERE code = ?1;",
            params![code, folder_id.map(|id| id.to_string()), now_epoch_ms()],
        )?;
        require_changed(changed, "module", code)
    }

    fn clear_all_module_folders(&self) -> StoreResult<usize> {
        let changed = self.conn().execute(
            "UPDATE modules
             SET folder_id = NULL,
                 updated_at = MAX(updated_at, ?1)
             WHERE folder_id IS NOT NULL;",
            [now_epoch_ms()],
        )?;
        Ok(changed)
    }

    fn insert_session(&self, session: &ClassSession) -> StoreResult<()> {
        self.conn().execute(
            "INSERT INTO class_sessions (
                id,
                module_code,
                start_ms,
                end_ms,
                kind,
                location,
                week_number,
                cancelled,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                session.id.to_string(),
                session.module_code.as_str(),
                session.start_ms,
                session.end_ms,
                session.kind.as_str(),
                session.location.as_deref(),
                session.week_number,
                bool_to_int(session.cancelled),
                session.created_at,
                session.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, id: SessionId) -> StoreResult<Option<ClassSession>> {
        let session = self
            .conn()
            .query_row(
                &format!("{SESSION_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_session_row(row)),
            )
            .optional()?;
        session.transpose()
    }

    fn list_sessions_for_module(&self, code: &str) -> StoreResult<Vec<ClassSession>> {
        let mut stmt = self.conn().prepare(&format!(
            "{SESSION_SELECT_SQL}
             WHERE module_code = ?1
             ORDER BY start_ms ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([code])?;
        let mut sessions = Vec::new();
        while let Some(row) = rows.next()? {
            sessions.push(parse_session_row(row)?);
        }
        Ok(sessions)
    }

    fn list_upcoming_sessions(&self, after_ms: i64) -> StoreResult<Vec<ClassSession>> {
        let mut stmt = self.conn().prepare(&format!(
            "{SESSION_SELECT_SQL}
             WHERE start_ms > ?1
               AND cancelled = 0
             ORDER BY start_ms ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([after_ms])?;
        let mut sessions = Vec::new();
        while let Some(row) = rows.next()? {
            sessions.push(parse_session_row(row)?);
        }
        Ok(sessions)
    }

    fn set_session_cancelled(&self, id: SessionId, cancelled: bool) -> StoreResult<()> {
        let changed = self.conn().execute(
            "UPDATE class_sessions
             SET cancelled = ?2,
                 updated_at = MAX(updated_at, ?3)
             WHERE id = ?1;",
            params![id.to_string(), bool_to_int(cancelled), now_epoch_ms()],
        )?;
        require_changed(changed, "class session", id)
    }

    fn delete_sessions_for_module(&self, code: &str) -> StoreResult<usize> {
        let changed = self
            .conn()
            .execute("DELETE FROM class_sessions WHERE module_code = ?1;", [code])?;
        Ok(changed)
    }
}

fn parse_module_row(row: &Row<'_>) -> StoreResult<Module> {
    Ok(Module {
        code: row.get("code")?,
        title: row.get("title")?,
        semester_key: row.get("semester_key")?,
        tutorial_group: row.get("tutorial_group")?,
        folder_id: parse_optional_uuid(row.get("folder_id")?, "modules.folder_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_session_row(row: &Row<'_>) -> StoreResult<ClassSession> {
    let id_text: String = row.get("id")?;
    let kind_text: String = row.get("kind")?;
    Ok(ClassSession {
        id: parse_uuid(&id_text, "class_sessions.id")?,
        module_code: row.get("module_code")?,
        start_ms: row.get("start_ms")?,
        end_ms: row.get("end_ms")?,
        kind: SessionKind::from_raw(&kind_text),
        location: row.get("location")?,
        week_number: row.get("week_number")?,
        cancelled: parse_flag(row.get("cancelled")?, "class_sessions.cancelled")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
