//! User preference singleton.

use serde::{Deserialize, Serialize};

/// Fixed primary key of the settings row.
pub const SETTINGS_SINGLETON_ID: &str = "singleton";
pub const DEFAULT_REMINDER_LEAD_MINUTES: i64 = 15;

/// Scheduling and reminder preferences. Exactly one row exists per store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub academic_year: Option<String>,
    pub semester: Option<String>,
    pub student_name: Option<String>,
    pub student_id: Option<String>,
    pub reminder_lead_minutes: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Default for UserSettings {
    fn default() -> Self {
        let now = super::now_epoch_ms();
        Self {
            academic_year: None,
            semester: None,
            student_name: None,
            student_id: None,
            reminder_lead_minutes: DEFAULT_REMINDER_LEAD_MINUTES,
            created_at: now,
            updated_at: now,
        }
    }
}
