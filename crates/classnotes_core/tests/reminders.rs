use classnotes_core::db::open_db_in_memory;
use classnotes_core::repo::catalog_repo::CatalogRepository;
use classnotes_core::{
    ClassSession, Module, NotificationService, ReminderError, ReminderRequest, ReminderScheduler,
    SchedulingError, SessionKind, SettingsService, SqliteStore,
};
use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use std::time::Duration;

const NOW_MS: i64 = 1_754_964_000_000;
const MINUTE_MS: i64 = 60_000;

struct FakeNotifier {
    permitted: bool,
    reject_title: Option<&'static str>,
    removals: Cell<usize>,
    scheduled: RefCell<Vec<ReminderRequest>>,
}

impl FakeNotifier {
    fn permitting() -> Self {
        Self {
            permitted: true,
            reject_title: None,
            removals: Cell::new(0),
            scheduled: RefCell::new(Vec::new()),
        }
    }
}

impl NotificationService for FakeNotifier {
    fn request_permission(&self) -> bool {
        self.permitted
    }

    fn remove_all_pending(&self) {
        self.removals.set(self.removals.get() + 1);
        self.scheduled.borrow_mut().clear();
    }

    fn schedule(&self, request: &ReminderRequest) -> Result<(), SchedulingError> {
        if self.reject_title == Some(request.title.as_str()) {
            return Err(SchedulingError::Rejected("quota exceeded".to_string()));
        }
        self.scheduled.borrow_mut().push(request.clone());
        Ok(())
    }
}

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn seed_sessions(store: &SqliteStore<'_>) -> Vec<ClassSession> {
    store
        .insert_module(&Module::new("CS1010", "Programming Methodology", "2025-S1"))
        .unwrap();
    let at = |minutes: i64, kind: SessionKind| {
        let start = NOW_MS + minutes * MINUTE_MS;
        ClassSession::new("CS1010", start, start + 60 * MINUTE_MS, kind, None)
    };
    let sessions = vec![
        at(-30, SessionKind::Lecture),
        at(10, SessionKind::Lecture),
        at(60, SessionKind::Tutorial),
        at(120, SessionKind::Lab),
    ];
    for session in &sessions {
        store.insert_session(session).unwrap();
    }
    sessions
}

#[test]
fn schedules_future_sessions_and_skips_passed_fire_times() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let sessions = seed_sessions(&store);
    let scheduler = ReminderScheduler::new(FakeNotifier::permitting());

    let report = scheduler.schedule_reminders(&store, 15, NOW_MS).unwrap();

    assert_eq!(report.scheduled, 2);
    assert_eq!(report.skipped_past, 1);
    assert_eq!(report.failed, 0);
    let scheduled = scheduler.notifier().scheduled.borrow();
    assert_eq!(scheduled[0].id, sessions[2].composite_id());
    assert_eq!(scheduled[0].fire_delay, Duration::from_secs(45 * 60));
    assert_eq!(scheduled[0].title, "Tutorial Starting Soon");
    assert_eq!(scheduled[1].title, "Lab Starting Soon");
    assert_eq!(scheduled[1].body, "CS1010 starts in 15 minutes");
}

#[test]
fn rescheduling_replaces_pending_reminders() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    seed_sessions(&store);
    let scheduler = ReminderScheduler::new(FakeNotifier::permitting());

    scheduler.schedule_reminders(&store, 15, NOW_MS).unwrap();
    let report = scheduler.schedule_reminders(&store, 0, NOW_MS).unwrap();

    assert_eq!(report.scheduled, 3);
    assert_eq!(scheduler.notifier().removals.get(), 2);
    assert_eq!(scheduler.notifier().scheduled.borrow().len(), 3);
}

#[test]
fn stored_oversized_lead_skips_every_session() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    seed_sessions(&store);
    let lead = SettingsService::new(store)
        .set_reminder_lead_minutes(i64::MAX / 1000)
        .unwrap()
        .reminder_lead_minutes;
    let scheduler = ReminderScheduler::new(FakeNotifier::permitting());

    let report = scheduler.schedule_reminders(&store, lead, NOW_MS).unwrap();

    assert_eq!(report.scheduled, 0);
    assert_eq!(report.skipped_past, 3);
    assert_eq!(report.failed, 0);
    assert!(scheduler.notifier().scheduled.borrow().is_empty());
}

#[test]
fn cancelled_sessions_are_not_scheduled() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let sessions = seed_sessions(&store);
    store.set_session_cancelled(sessions[3].id, true).unwrap();
    let scheduler = ReminderScheduler::new(FakeNotifier::permitting());

    let report = scheduler.schedule_reminders(&store, 15, NOW_MS).unwrap();

    assert_eq!(report.scheduled, 1);
}

#[test]
fn rejected_request_does_not_stop_the_rest() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    seed_sessions(&store);
    let notifier = FakeNotifier {
        reject_title: Some("Tutorial Starting Soon"),
        ..FakeNotifier::permitting()
    };
    let scheduler = ReminderScheduler::new(notifier);

    let report = scheduler.schedule_reminders(&store, 15, NOW_MS).unwrap();

    assert_eq!(report.scheduled, 1);
    assert_eq!(report.failed, 1);
}

#[test]
fn negative_lead_and_denied_permission_are_errors() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    seed_sessions(&store);

    let scheduler = ReminderScheduler::new(FakeNotifier::permitting());
    assert!(matches!(
        scheduler.schedule_reminders(&store, -5, NOW_MS),
        Err(ReminderError::InvalidLeadTime(-5))
    ));
    assert_eq!(scheduler.notifier().removals.get(), 0);

    let denied = ReminderScheduler::new(FakeNotifier {
        permitted: false,
        ..FakeNotifier::permitting()
    });
    assert!(matches!(
        denied.schedule_reminders(&store, 15, NOW_MS),
        Err(ReminderError::PermissionDenied)
    ));
    assert!(denied.notifier().scheduled.borrow().is_empty());
}
