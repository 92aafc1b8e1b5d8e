//! Note attachment model.

use crate::model::note::NoteId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AttachmentId = Uuid;

/// Binary payload owned by exactly one note; deleted with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub note_id: NoteId,
    pub filename: String,
    pub bytes: Option<Vec<u8>>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub created_at: i64,
}

impl Attachment {
    /// Creates an attachment, deriving `file_size` from `bytes`.
    pub fn new(
        note_id: NoteId,
        filename: impl Into<String>,
        bytes: Option<Vec<u8>>,
        mime_type: Option<String>,
    ) -> Self {
        let file_size = bytes.as_ref().map(|data| data.len() as i64);
        Self {
            id: Uuid::new_v4(),
            note_id,
            filename: filename.into(),
            bytes,
            file_size,
            mime_type,
            created_at: super::now_epoch_ms(),
        }
    }
}
