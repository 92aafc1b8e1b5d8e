//! Local reminder scheduling for upcoming class sessions.
//!
//! # Responsibility
//! - Replace the platform's pending reminders with one reminder per
//!   upcoming, non-cancelled session.
//!
//! # Invariants
//! - Reminders are keyed by `ClassSession::composite_id`.
//! - A session whose lead-adjusted fire time is not in the future is
//!   skipped, never scheduled with a zero delay.
//! - A failure to schedule one reminder does not stop the others.

use crate::model::session::ClassSession;
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::StoreError;
use log::{info, warn};
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// One local notification to schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRequest {
    pub id: String,
    pub title: String,
    pub body: String,
    /// Delay from now until delivery.
    pub fire_delay: Duration,
    pub payload: serde_json::Value,
}

impl ReminderRequest {
    /// Builds the reminder for `session`, or `None` when its fire time
    /// has already passed or lies before the representable range.
    pub fn for_session(session: &ClassSession, lead_minutes: i64, now_ms: i64) -> Option<Self> {
        let fire_at_ms = lead_minutes
            .checked_mul(60_000)
            .and_then(|lead_ms| session.start_ms.checked_sub(lead_ms))?;
        if fire_at_ms <= now_ms {
            return None;
        }
        let delay_ms = u64::try_from(fire_at_ms - now_ms).ok()?;

        Some(Self {
            id: session.composite_id(),
            title: format!("{} Starting Soon", session.kind.display_name()),
            body: format!("{} starts in {lead_minutes} minutes", session.module_code),
            fire_delay: Duration::from_millis(delay_ms),
            payload: json!({
                "sessionId": session.id.to_string(),
                "moduleCode": session.module_code,
                "sessionStart": session.start_ms.div_euclid(1000),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    PermissionDenied,
    /// The platform rejected the request.
    Rejected(String),
}

impl Display for SchedulingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "notification permission denied"),
            Self::Rejected(details) => write!(f, "notification rejected: {details}"),
        }
    }
}

impl Error for SchedulingError {}

/// Platform notification boundary.
pub trait NotificationService {
    /// Asks for (or reports) permission to deliver notifications.
    fn request_permission(&self) -> bool;
    fn remove_all_pending(&self);
    fn schedule(&self, request: &ReminderRequest) -> Result<(), SchedulingError>;
}

#[derive(Debug)]
pub enum ReminderError {
    InvalidLeadTime(i64),
    PermissionDenied,
    Store(StoreError),
}

impl Display for ReminderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLeadTime(minutes) => {
                write!(f, "reminder lead time must not be negative: {minutes}")
            }
            Self::PermissionDenied => write!(f, "notification permission denied"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReminderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ReminderError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub scheduled: usize,
    /// Sessions whose fire time had already passed.
    pub skipped_past: usize,
    /// Requests the notification service rejected.
    pub failed: usize,
}

pub struct ReminderScheduler<N: NotificationService> {
    notifier: N,
}

impl<N: NotificationService> ReminderScheduler<N> {
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Clears pending reminders and schedules one per upcoming session.
    pub fn schedule_reminders<S: CatalogRepository>(
        &self,
        store: &S,
        lead_minutes: i64,
        now_ms: i64,
    ) -> Result<ReminderReport, ReminderError> {
        if lead_minutes < 0 {
            return Err(ReminderError::InvalidLeadTime(lead_minutes));
        }
        if !self.notifier.request_permission() {
            warn!(
                "event=reminder_schedule module=reminders status=error error_code=permission_denied"
            );
            return Err(ReminderError::PermissionDenied);
        }

        let sessions = store.list_upcoming_sessions(now_ms)?;
        self.notifier.remove_all_pending();

        let mut report = ReminderReport::default();
        for session in &sessions {
            let Some(request) = ReminderRequest::for_session(session, lead_minutes, now_ms) else {
                report.skipped_past += 1;
                continue;
            };
            match self.notifier.schedule(&request) {
                Ok(()) => report.scheduled += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        "event=reminder_schedule module=reminders status=error reminder_id={} error={err}",
                        request.id
                    );
                }
            }
        }

        info!(
            "event=reminder_schedule module=reminders status=ok lead_minutes={lead_minutes} scheduled={} skipped_past={} failed={}",
            report.scheduled, report.skipped_past, report.failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::ReminderRequest;
    use crate::model::session::{ClassSession, SessionKind};
    use std::time::Duration;

    const START_MS: i64 = 1_754_964_000_000;

    fn tutorial_at(start_ms: i64) -> ClassSession {
        ClassSession::new("CS1010", start_ms, start_ms + 3_600_000, SessionKind::Tutorial, None)
    }

    #[test]
    fn request_carries_session_metadata() {
        let session = tutorial_at(START_MS);
        let now_ms = START_MS - 60 * 60_000;

        let request = ReminderRequest::for_session(&session, 15, now_ms).unwrap();
        assert_eq!(request.id, format!("CS1010-{}-tutorial", START_MS / 1000));
        assert_eq!(request.title, "Tutorial Starting Soon");
        assert_eq!(request.body, "CS1010 starts in 15 minutes");
        assert_eq!(request.fire_delay, Duration::from_secs(45 * 60));
        assert_eq!(request.payload["moduleCode"], "CS1010");
        assert_eq!(request.payload["sessionStart"], START_MS / 1000);
        assert_eq!(request.payload["sessionId"], session.id.to_string());
    }

    #[test]
    fn request_is_skipped_once_fire_time_passed() {
        let session = tutorial_at(START_MS);
        assert!(ReminderRequest::for_session(&session, 15, START_MS - 15 * 60_000).is_none());
        assert!(ReminderRequest::for_session(&session, 15, START_MS - 15 * 60_000 - 1).is_some());
    }

    #[test]
    fn oversized_lead_is_skipped_instead_of_overflowing() {
        let session = tutorial_at(START_MS);
        assert!(ReminderRequest::for_session(&session, i64::MAX / 1000, 0).is_none());
        assert!(ReminderRequest::for_session(&session, i64::MAX, 0).is_none());
    }
}
