//! Class session model.
//!
//! # Invariants
//! - A session belongs to exactly one module (`module_code`).
//! - `end_ms` should not be earlier than `start_ms`.
//! - Unknown persisted kind strings read back as `SessionKind::Others`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable class session identifier.
pub type SessionId = Uuid;

/// Kind of scheduled class meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Lecture,
    Tutorial,
    Lab,
    Others,
}

impl SessionKind {
    pub const ALL: [SessionKind; 4] = [Self::Lecture, Self::Tutorial, Self::Lab, Self::Others];

    /// Raw persisted value; also the sub-folder `session_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lecture => "lecture",
            Self::Tutorial => "tutorial",
            Self::Lab => "lab",
            Self::Others => "others",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Lecture => "Lecture",
            Self::Tutorial => "Tutorial",
            Self::Lab => "Lab",
            Self::Others => "Others",
        }
    }

    /// Parses a persisted raw value, falling back to `Others`.
    pub fn from_raw(value: &str) -> Self {
        match value {
            "lecture" => Self::Lecture,
            "tutorial" => Self::Tutorial,
            "lab" => Self::Lab,
            _ => Self::Others,
        }
    }

    /// Maps a free-form timetable lesson type (`"Lecture"`, `"Sectional
    /// Teaching"`, `"Laboratory"`, ...) onto a session kind.
    pub fn from_lesson_type(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        if lowered.contains("lec") {
            Self::Lecture
        } else if lowered.contains("tut") {
            Self::Tutorial
        } else if lowered.contains("lab") {
            Self::Lab
        } else {
            Self::Others
        }
    }
}

/// A scheduled class meeting belonging to one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSession {
    pub id: SessionId,
    pub module_code: String,
    /// Epoch milliseconds.
    pub start_ms: i64,
    /// Epoch milliseconds.
    pub end_ms: i64,
    pub kind: SessionKind,
    pub location: Option<String>,
    pub week_number: Option<i64>,
    pub cancelled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ClassSession {
    pub fn new(
        module_code: impl Into<String>,
        start_ms: i64,
        end_ms: i64,
        kind: SessionKind,
        location: Option<String>,
    ) -> Self {
        let now = super::now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            module_code: module_code.into(),
            start_ms,
            end_ms,
            kind,
            location,
            week_number: None,
            cancelled: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Identifier shared with the notification service:
    /// `<moduleCode>-<startEpochSeconds>-<kindRaw>`.
    pub fn composite_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.module_code,
            self.start_ms.div_euclid(1000),
            self.kind.as_str()
        )
    }
}
