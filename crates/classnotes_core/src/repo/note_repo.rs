//! Note and attachment persistence.
//!
//! # Responsibility
//! - Provide note CRUD plus folder placement updates.
//! - Own attachment rows, which live and die with their note.
//!
//! # Invariants
//! - Note listings are ordered by `updated_at DESC, id ASC`.
//! - Content edits bump `updated_at` monotonically; folder moves do not
//!   touch it.

use crate::model::attachment::Attachment;
use crate::model::folder::FolderId;
use crate::model::note::{Note, NoteId};
use crate::model::now_epoch_ms;
use crate::repo::{
    bool_to_int, parse_flag, parse_optional_uuid, parse_uuid, require_changed, SqliteStore,
    StoreResult,
};
use rusqlite::{params, Row};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    module_code,
    session_id,
    session_start,
    folder_id,
    title,
    body_markdown,
    pinned,
    created_at,
    updated_at
FROM notes";

/// Repository interface for notes and their attachments.
pub trait NoteRepository {
    fn insert_note(&self, note: &Note) -> StoreResult<()>;
    fn get_note(&self, id: NoteId) -> StoreResult<Option<Note>>;
    fn list_notes(&self) -> StoreResult<Vec<Note>>;
    /// Notes with no folder assigned.
    fn list_unfiled_notes(&self) -> StoreResult<Vec<Note>>;
    fn list_notes_in_folder(&self, folder_id: FolderId) -> StoreResult<Vec<Note>>;
    fn set_note_folder(&self, id: NoteId, folder_id: Option<FolderId>) -> StoreResult<()>;
    /// Clears the folder of every note, returning the rows touched.
    fn detach_all_notes(&self) -> StoreResult<usize>;
    fn update_note_content(&self, id: NoteId, title: &str, body_markdown: &str)
        -> StoreResult<()>;
    fn set_note_pinned(&self, id: NoteId, pinned: bool) -> StoreResult<()>;
    /// Bumps `updated_at` without changing content.
    fn touch_note(&self, id: NoteId) -> StoreResult<()>;
    fn delete_note(&self, id: NoteId) -> StoreResult<()>;
    fn insert_attachment(&self, attachment: &Attachment) -> StoreResult<()>;
    fn list_attachments(&self, note_id: NoteId) -> StoreResult<Vec<Attachment>>;
}

impl NoteRepository for SqliteStore<'_> {
    fn insert_note(&self, note: &Note) -> StoreResult<()> {
        self.conn().execute(
            "INSERT INTO notes (
                id,
                module_code,
                session_id,
                session_start,
                folder_id,
                title,
                body_markdown,
                pinned,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                note.id.to_string(),
                note.module_code.as_str(),
                note.session_id.map(|id| id.to_string()),
                note.session_start,
                note.folder_id.map(|id| id.to_string()),
                note.title.as_str(),
                note.body_markdown.as_str(),
                bool_to_int(note.pinned),
                note.created_at,
                note.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_note(&self, id: NoteId) -> StoreResult<Option<Note>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn list_notes(&self) -> StoreResult<Vec<Note>> {
        self.query_notes(
            &format!("{NOTE_SELECT_SQL} ORDER BY updated_at DESC, id ASC;"),
            None,
        )
    }

    fn list_unfiled_notes(&self) -> StoreResult<Vec<Note>> {
        self.query_notes(
            &format!(
                "{NOTE_SELECT_SQL}
                 WHERE folder_id IS NULL
                 ORDER BY updated_at DESC, id ASC;"
            ),
            None,
        )
    }

    fn list_notes_in_folder(&self, folder_id: FolderId) -> StoreResult<Vec<Note>> {
        self.query_notes(
            &format!(
                "{NOTE_SELECT_SQL}
                 WHERE folder_id = ?1
                 ORDER BY updated_at DESC, id ASC;"
            ),
            Some(folder_id.to_string()),
        )
    }

    fn set_note_folder(&self, id: NoteId, folder_id: Option<FolderId>) -> StoreResult<()> {
        let changed = self.conn().execute(
            "UPDATE notes SET folder_id = ?2 WHERE id = ?1;",
            params![id.to_string(), folder_id.map(|value| value.to_string())],
        )?;
        require_changed(changed, "note", id)
    }

    fn detach_all_notes(&self) -> StoreResult<usize> {
        let changed = self.conn().execute(
            "UPDATE notes SET folder_id = NULL WHERE folder_id IS NOT NULL;",
            [],
        )?;
        Ok(changed)
    }

    fn update_note_content(
        &self,
        id: NoteId,
        title: &str,
        body_markdown: &str,
    ) -> StoreResult<()> {
        let changed = self.conn().execute(
            "UPDATE notes
             SET title = ?2,
                 body_markdown = ?3,
                 updated_at = MAX(updated_at, ?4)
             WHERE id = ?1;",
            params![id.to_string(), title, body_markdown, now_epoch_ms()],
        )?;
        require_changed(changed, "note", id)
    }

    fn set_note_pinned(&self, id: NoteId, pinned: bool) -> StoreResult<()> {
        let changed = self.conn().execute(
            "UPDATE notes
             SET pinned = ?2,
                 updated_at = MAX(updated_at, ?3)
             WHERE id = ?1;",
            params![id.to_string(), bool_to_int(pinned), now_epoch_ms()],
        )?;
        require_changed(changed, "note", id)
    }

    fn touch_note(&self, id: NoteId) -> StoreResult<()> {
        let changed = self.conn().execute(
            "UPDATE notes SET updated_at = MAX(updated_at, ?2) WHERE id = ?1;",
            params![id.to_string(), now_epoch_ms()],
        )?;
        require_changed(changed, "note", id)
    }

    fn delete_note(&self, id: NoteId) -> StoreResult<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM notes WHERE id = ?1;", [id.to_string()])?;
        require_changed(changed, "note", id)
    }

    fn insert_attachment(&self, attachment: &Attachment) -> StoreResult<()> {
        self.conn().execute(
            "INSERT INTO attachments (
                id,
                note_id,
                filename,
                bytes,
                file_size,
                mime_type,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                attachment.id.to_string(),
                attachment.note_id.to_string(),
                attachment.filename.as_str(),
                attachment.bytes.as_deref(),
                attachment.file_size,
                attachment.mime_type.as_deref(),
                attachment.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_attachments(&self, note_id: NoteId) -> StoreResult<Vec<Attachment>> {
        let mut stmt = self.conn().prepare(
            "SELECT
                id,
                note_id,
                filename,
                bytes,
                file_size,
                mime_type,
                created_at
             FROM attachments
             WHERE note_id = ?1
             ORDER BY created_at ASC, id ASC;",
        )?;
        let mut rows = stmt.query([note_id.to_string()])?;
        let mut attachments = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let note_text: String = row.get("note_id")?;
            attachments.push(Attachment {
                id: parse_uuid(&id_text, "attachments.id")?,
                note_id: parse_uuid(&note_text, "attachments.note_id")?,
                filename: row.get("filename")?,
                bytes: row.get("bytes")?,
                file_size: row.get("file_size")?,
                mime_type: row.get("mime_type")?,
                created_at: row.get("created_at")?,
            });
        }
        Ok(attachments)
    }
}

impl SqliteStore<'_> {
    fn query_notes(&self, sql: &str, bind: Option<String>) -> StoreResult<Vec<Note>> {
        let mut stmt = self.conn().prepare(sql)?;
        let mut rows = match bind {
            Some(value) => stmt.query([value])?,
            None => stmt.query([])?,
        };
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }
}

fn parse_note_row(row: &Row<'_>) -> StoreResult<Note> {
    let id_text: String = row.get("id")?;
    Ok(Note {
        id: parse_uuid(&id_text, "notes.id")?,
        module_code: row.get("module_code")?,
        session_id: parse_optional_uuid(row.get("session_id")?, "notes.session_id")?,
        session_start: row.get("session_start")?,
        folder_id: parse_optional_uuid(row.get("folder_id")?, "notes.folder_id")?,
        title: row.get("title")?,
        body_markdown: row.get("body_markdown")?,
        pinned: parse_flag(row.get("pinned")?, "notes.pinned")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
