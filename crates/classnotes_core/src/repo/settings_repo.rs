//! Persistence for the `UserSettings` singleton row.

use crate::model::settings::{UserSettings, SETTINGS_SINGLETON_ID};
use crate::repo::{SqliteStore, StoreResult};
use rusqlite::{params, OptionalExtension};

pub trait SettingsRepository {
    fn load_settings(&self) -> StoreResult<Option<UserSettings>>;
    /// Upserts the singleton row. `updated_at` never moves backwards.
    fn save_settings(&self, settings: &UserSettings) -> StoreResult<()>;
}

impl SettingsRepository for SqliteStore<'_> {
    fn load_settings(&self) -> StoreResult<Option<UserSettings>> {
        let settings = self
            .conn()
            .query_row(
                "SELECT
                    academic_year,
                    semester,
                    student_name,
                    student_id,
                    reminder_lead_minutes,
                    created_at,
                    updated_at
                 FROM user_settings
                 WHERE id = ?1;",
                [SETTINGS_SINGLETON_ID],
                |row| {
                    Ok(UserSettings {
                        academic_year: row.get("academic_year")?,
                        semester: row.get("semester")?,
                        student_name: row.get("student_name")?,
                        student_id: row.get("student_id")?,
                        reminder_lead_minutes: row.get("reminder_lead_minutes")?,
                        created_at: row.get("created_at")?,
                        updated_at: row.get("updated_at")?,
                    })
                },
            )
            .optional()?;
        Ok(settings)
    }

    fn save_settings(&self, settings: &UserSettings) -> StoreResult<()> {
        self.conn().execute(
            "INSERT INTO user_settings (
                id,
                academic_year,
                semester,
                student_name,
                student_id,
                reminder_lead_minutes,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                academic_year = excluded.academic_year,
                semester = excluded.semester,
                student_name = excluded.student_name,
                student_id = excluded.student_id,
                reminder_lead_minutes = excluded.reminder_lead_minutes,
                updated_at = MAX(user_settings.updated_at, excluded.updated_at);",
            params![
                SETTINGS_SINGLETON_ID,
                settings.academic_year.as_deref(),
                settings.semester.as_deref(),
                settings.student_name.as_deref(),
                settings.student_id.as_deref(),
                settings.reminder_lead_minutes,
                settings.created_at,
                settings.updated_at,
            ],
        )?;
        Ok(())
    }
}
