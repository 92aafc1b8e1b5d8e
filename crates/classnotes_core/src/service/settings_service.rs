//! User settings use-case service.

use crate::model::now_epoch_ms;
use crate::model::settings::UserSettings;
use crate::repo::settings_repo::SettingsRepository;
use crate::repo::StoreError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum SettingsError {
    InvalidLeadMinutes(i64),
    Store(StoreError),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLeadMinutes(minutes) => {
                write!(f, "reminder lead minutes must not be negative: {minutes}")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::InvalidLeadMinutes(_) => None,
        }
    }
}

impl From<StoreError> for SettingsError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

pub struct SettingsService<R: SettingsRepository> {
    repo: R,
}

impl<R: SettingsRepository> SettingsService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the singleton, creating it with defaults on first access.
    pub fn load(&self) -> Result<UserSettings, SettingsError> {
        if let Some(settings) = self.repo.load_settings()? {
            return Ok(settings);
        }
        let settings = UserSettings::default();
        self.repo.save_settings(&settings)?;
        info!("event=settings_init module=settings status=ok");
        Ok(settings)
    }

    /// Persists `settings` and returns the stored row.
    pub fn save(&self, settings: &UserSettings) -> Result<UserSettings, SettingsError> {
        if settings.reminder_lead_minutes < 0 {
            return Err(SettingsError::InvalidLeadMinutes(
                settings.reminder_lead_minutes,
            ));
        }
        let mut updated = settings.clone();
        updated.updated_at = now_epoch_ms();
        self.repo.save_settings(&updated)?;
        self.load()
    }

    pub fn set_reminder_lead_minutes(&self, minutes: i64) -> Result<UserSettings, SettingsError> {
        let mut settings = self.load()?;
        settings.reminder_lead_minutes = minutes;
        self.save(&settings)
    }
}
