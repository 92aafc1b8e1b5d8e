//! Module (enrolled course) model.

use crate::model::folder::FolderId;
use serde::{Deserialize, Serialize};

/// A course the user is enrolled in for one semester.
///
/// Sessions and folders are owned through the store's cascading foreign
/// keys; the struct only carries the main-folder reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Unique key, e.g. `CS1010`.
    pub code: String,
    pub title: String,
    /// Semester identifier such as `2025-S1`.
    pub semester_key: String,
    pub tutorial_group: Option<String>,
    /// Main module folder, created lazily by reconciliation.
    pub folder_id: Option<FolderId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Module {
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        semester_key: impl Into<String>,
    ) -> Self {
        let now = super::now_epoch_ms();
        Self {
            code: code.into(),
            title: title.into(),
            semester_key: semester_key.into(),
            tutorial_group: None,
            folder_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name of this module's main folder: `<code> - <title>`.
    pub fn folder_name(&self) -> String {
        format!("{} - {}", self.code, self.title)
    }

    /// Prefix every correctly-placed main folder name starts with.
    pub fn folder_name_prefix(code: &str) -> String {
        format!("{code} - ")
    }

    /// Whether the semester key denotes semester one.
    pub fn is_first_semester(&self) -> bool {
        self.semester_key.contains("S1")
    }
}
