//! Note model and Markdown templates.
//!
//! # Invariants
//! - A note is a session note iff both `session_id` and `session_start`
//!   are set; otherwise it is standalone.
//! - Templates are pure constructors and never touch the store.

use crate::model::folder::FolderId;
use crate::model::session::{ClassSession, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable note identifier.
pub type NoteId = Uuid;

pub const DEFAULT_NOTE_TITLE: &str = "Untitled Note";

/// User-authored Markdown note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub module_code: String,
    pub session_id: Option<SessionId>,
    /// Epoch milliseconds of the linked session start.
    pub session_start: Option<i64>,
    pub folder_id: Option<FolderId>,
    pub title: String,
    pub body_markdown: String,
    pub pinned: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Note {
    pub fn new(
        module_code: impl Into<String>,
        title: impl Into<String>,
        body_markdown: impl Into<String>,
    ) -> Self {
        let now = super::now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            module_code: module_code.into(),
            session_id: None,
            session_start: None,
            folder_id: None,
            title: title.into(),
            body_markdown: body_markdown.into(),
            pinned: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds the per-session template, linked to `session`.
    pub fn session_template(session: &ClassSession) -> Self {
        let title = format!(
            "{} {} — {}",
            session.module_code,
            session.kind.display_name(),
            format_day(session.start_ms)
        );
        let body = [
            format!("# {title}"),
            String::new(),
            "## Key Concepts".to_string(),
            String::new(),
            "## Examples".to_string(),
            String::new(),
            "## Questions".to_string(),
            String::new(),
            "## Action Items".to_string(),
            "- [ ] …".to_string(),
        ]
        .join("\n");

        let mut note = Self::new(session.module_code.clone(), title, body);
        note.session_id = Some(session.id);
        note.session_start = Some(session.start_ms);
        note
    }

    /// Builds a standalone note; `title` defaults to "Untitled Note".
    pub fn standalone_template(module_code: impl Into<String>, title: Option<&str>) -> Self {
        let title = title.unwrap_or(DEFAULT_NOTE_TITLE).to_string();
        let body = [
            format!("# {title}"),
            String::new(),
            "## Notes".to_string(),
            String::new(),
            "- ".to_string(),
            String::new(),
            "## Questions".to_string(),
            String::new(),
            "- ".to_string(),
            String::new(),
            "## Action Items".to_string(),
            String::new(),
            "- [ ] ".to_string(),
        ]
        .join("\n");
        Self::new(module_code, title, body)
    }

    pub fn is_session_note(&self) -> bool {
        self.session_id.is_some() && self.session_start.is_some()
    }

    pub fn is_standalone_note(&self) -> bool {
        !self.is_session_note()
    }
}

/// Title used for quick notes created at `now_ms`.
pub fn quick_note_title(now_ms: i64) -> String {
    format!("Quick Note - {}", format_with(now_ms, "%Y-%m-%d %H:%M"))
}

fn format_day(epoch_ms: i64) -> String {
    format_with(epoch_ms, "%Y-%m-%d")
}

fn format_with(epoch_ms: i64, pattern: &str) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .unwrap_or_default()
        .format(pattern)
        .to_string()
}
