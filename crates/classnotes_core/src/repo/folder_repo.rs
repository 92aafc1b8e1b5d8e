//! Folder persistence.
//!
//! # Responsibility
//! - Store module folders, sub-folders and Quick Notes in one flat table.
//! - Resolve parent/child links by `parent_folder_id` lookups.
//!
//! # Invariants
//! - Writes call `Folder::validate()` before SQL mutations.
//! - Sibling order is `sort_order ASC, id ASC`; new folders append.
//! - Deleting a folder cascades to the notes still inside it; callers
//!   re-home notes first.

use crate::model::folder::{Folder, FolderId};
use crate::model::now_epoch_ms;
use crate::repo::{
    bool_to_int, parse_flag, parse_optional_uuid, parse_uuid, require_changed, SqliteStore,
    StoreError, StoreResult,
};
use rusqlite::{params, Connection, Row};

const FOLDER_SELECT_SQL: &str = "SELECT
    id,
    name,
    module_code,
    module_ref,
    color,
    is_archived,
    sort_order,
    session_type,
    is_sub_folder,
    parent_folder_id,
    created_at,
    updated_at
FROM folders";

/// Repository interface for folders.
pub trait FolderRepository {
    /// Persists `folder`, appending it to its siblings; returns the stored row.
    fn insert_folder(&self, folder: &Folder) -> StoreResult<Folder>;
    fn get_folder(&self, id: FolderId) -> StoreResult<Option<Folder>>;
    /// Every folder, in creation order.
    fn list_folders(&self) -> StoreResult<Vec<Folder>>;
    /// Folders whose `parent_folder_id` equals `parent_id`.
    fn list_sub_folders(&self, parent_id: FolderId) -> StoreResult<Vec<Folder>>;
    fn rename_folder(&self, id: FolderId, name: &str) -> StoreResult<()>;
    fn set_folder_archived(&self, id: FolderId, archived: bool) -> StoreResult<()>;
    fn delete_folder(&self, id: FolderId) -> StoreResult<()>;
    fn delete_all_folders(&self) -> StoreResult<usize>;
}

impl FolderRepository for SqliteStore<'_> {
    fn insert_folder(&self, folder: &Folder) -> StoreResult<Folder> {
        folder.validate()?;
        let sort_order = next_sort_order(self.conn(), folder.parent_folder_id)?;
        self.conn().execute(
            "INSERT INTO folders (
                id,
                name,
                module_code,
                module_ref,
                color,
                is_archived,
                sort_order,
                session_type,
                is_sub_folder,
                parent_folder_id,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                folder.id.to_string(),
                folder.name.as_str(),
                folder.module_code.as_deref(),
                folder.module_ref.as_deref(),
                folder.color.as_deref(),
                bool_to_int(folder.is_archived),
                sort_order,
                folder.session_type.as_deref(),
                bool_to_int(folder.is_sub_folder),
                folder.parent_folder_id.map(|id| id.to_string()),
                folder.created_at,
                folder.updated_at,
            ],
        )?;
        self.get_folder(folder.id)?.ok_or(StoreError::NotFound {
            entity: "folder",
            id: folder.id.to_string(),
        })
    }

    fn get_folder(&self, id: FolderId) -> StoreResult<Option<Folder>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{FOLDER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_folder_row(row)?));
        }
        Ok(None)
    }

    fn list_folders(&self) -> StoreResult<Vec<Folder>> {
        let mut stmt = self.conn().prepare(&format!(
            "{FOLDER_SELECT_SQL} ORDER BY created_at ASC, sort_order ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut folders = Vec::new();
        while let Some(row) = rows.next()? {
            folders.push(parse_folder_row(row)?);
        }
        Ok(folders)
    }

    fn list_sub_folders(&self, parent_id: FolderId) -> StoreResult<Vec<Folder>> {
        let mut stmt = self.conn().prepare(&format!(
            "{FOLDER_SELECT_SQL}
             WHERE parent_folder_id = ?1
             ORDER BY sort_order ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([parent_id.to_string()])?;
        let mut folders = Vec::new();
        while let Some(row) = rows.next()? {
            folders.push(parse_folder_row(row)?);
        }
        Ok(folders)
    }

    fn rename_folder(&self, id: FolderId, name: &str) -> StoreResult<()> {
        let changed = self.conn().execute(
            "UPDATE folders
             SET name = ?2,
                 updated_at = MAX(updated_at, ?3)
             WHERE id = ?1;",
            params![id.to_string(), name, now_epoch_ms()],
        )?;
        require_changed(changed, "folder", id)
    }

    fn set_folder_archived(&self, id: FolderId, archived: bool) -> StoreResult<()> {
        let changed = self.conn().execute(
            "UPDATE folders
             SET is_archived = ?2,
                 updated_at = MAX(updated_at, ?3)
             WHERE id = ?1;",
            params![id.to_string(), bool_to_int(archived), now_epoch_ms()],
        )?;
        require_changed(changed, "folder", id)
    }

    fn delete_folder(&self, id: FolderId) -> StoreResult<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM folders WHERE id = ?1;", [id.to_string()])?;
        require_changed(changed, "folder", id)
    }

    fn delete_all_folders(&self) -> StoreResult<usize> {
        let changed = self.conn().execute("DELETE FROM folders;", [])?;
        Ok(changed)
    }
}

fn next_sort_order(conn: &Connection, parent_id: Option<FolderId>) -> StoreResult<i64> {
    let next = match parent_id {
        Some(parent_id) => conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM folders
             WHERE parent_folder_id = ?1;",
            [parent_id.to_string()],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM folders
             WHERE parent_folder_id IS NULL;",
            [],
            |row| row.get(0),
        )?,
    };
    Ok(next)
}

fn parse_folder_row(row: &Row<'_>) -> StoreResult<Folder> {
    let id_text: String = row.get("id")?;
    Ok(Folder {
        id: parse_uuid(&id_text, "folders.id")?,
        name: row.get("name")?,
        module_code: row.get("module_code")?,
        module_ref: row.get("module_ref")?,
        color: row.get("color")?,
        is_archived: parse_flag(row.get("is_archived")?, "folders.is_archived")?,
        sort_order: row.get("sort_order")?,
        session_type: row.get("session_type")?,
        is_sub_folder: parse_flag(row.get("is_sub_folder")?, "folders.is_sub_folder")?,
        parent_folder_id: parse_optional_uuid(
            row.get("parent_folder_id")?,
            "folders.parent_folder_id",
        )?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
