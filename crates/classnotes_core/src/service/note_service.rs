//! Note editing use-case service.
//!
//! # Responsibility
//! - Edit, pin and delete notes that reconciliation has already filed.
//! - Attach binary payloads to notes.
//!
//! # Invariants
//! - Titles are trimmed and must not be blank.
//! - Every edit bumps `updated_at` without moving it backwards.
//! - Attachment insert and note touch commit together.

use crate::model::attachment::Attachment;
use crate::model::folder::FolderId;
use crate::model::note::{Note, NoteId};
use crate::repo::note_repo::NoteRepository;
use crate::repo::{StoreError, UnitOfWork};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Title is blank after trim.
    InvalidTitle,
    /// Attachment filename is blank after trim.
    InvalidFilename,
    NoteNotFound(NoteId),
    /// Persistence-layer failure.
    Store(StoreError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "note title must not be blank"),
            Self::InvalidFilename => write!(f, "attachment filename must not be blank"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for NoteServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository + UnitOfWork> {
    repo: R,
}

impl<R: NoteRepository + UnitOfWork> NoteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_note(&self, id: NoteId) -> Result<Note, NoteServiceError> {
        self.repo
            .get_note(id)?
            .ok_or(NoteServiceError::NoteNotFound(id))
    }

    /// Notes in one folder, newest first.
    pub fn list_notes_in_folder(&self, folder_id: FolderId) -> Result<Vec<Note>, NoteServiceError> {
        Ok(self.repo.list_notes_in_folder(folder_id)?)
    }

    /// Replaces title and body.
    pub fn update_note(
        &self,
        id: NoteId,
        title: impl Into<String>,
        body_markdown: impl Into<String>,
    ) -> Result<Note, NoteServiceError> {
        let title = normalize_title(title.into())?;
        self.get_note(id)?;
        self.repo
            .update_note_content(id, title.as_str(), body_markdown.into().as_str())?;
        self.read_back(id)
    }

    pub fn set_pinned(&self, id: NoteId, pinned: bool) -> Result<Note, NoteServiceError> {
        self.get_note(id)?;
        self.repo.set_note_pinned(id, pinned)?;
        self.read_back(id)
    }

    /// Deletes a note and, by cascade, its attachments.
    pub fn delete_note(&self, id: NoteId) -> Result<(), NoteServiceError> {
        self.get_note(id)?;
        self.repo.delete_note(id)?;
        Ok(())
    }

    pub fn add_attachment(
        &self,
        note_id: NoteId,
        filename: &str,
        bytes: Option<Vec<u8>>,
        mime_type: Option<String>,
    ) -> Result<Attachment, NoteServiceError> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(NoteServiceError::InvalidFilename);
        }
        self.get_note(note_id)?;

        let attachment = Attachment::new(note_id, filename, bytes, mime_type);
        self.repo.begin()?;
        let written = self
            .repo
            .insert_attachment(&attachment)
            .and_then(|()| self.repo.touch_note(note_id))
            .and_then(|()| self.repo.commit());
        if let Err(err) = written {
            if let Err(rollback_err) = self.repo.rollback() {
                warn!(
                    "event=attachment_add module=notes status=error error_code=rollback_failed error={rollback_err}"
                );
            }
            return Err(err.into());
        }
        Ok(attachment)
    }

    pub fn list_attachments(&self, note_id: NoteId) -> Result<Vec<Attachment>, NoteServiceError> {
        Ok(self.repo.list_attachments(note_id)?)
    }

    fn read_back(&self, id: NoteId) -> Result<Note, NoteServiceError> {
        self.repo
            .get_note(id)?
            .ok_or(NoteServiceError::InconsistentState(
                "updated note not found in read-back",
            ))
    }
}

fn normalize_title(value: String) -> Result<String, NoteServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NoteServiceError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}
