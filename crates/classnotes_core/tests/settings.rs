use classnotes_core::db::open_db_in_memory;
use classnotes_core::model::settings::DEFAULT_REMINDER_LEAD_MINUTES;
use classnotes_core::repo::settings_repo::SettingsRepository;
use classnotes_core::{SettingsError, SettingsService, SqliteStore};

#[test]
fn load_creates_the_singleton_once() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = SettingsService::new(store);

    assert!(store.load_settings().unwrap().is_none());
    let first = service.load().unwrap();
    let second = service.load().unwrap();

    assert_eq!(first.reminder_lead_minutes, DEFAULT_REMINDER_LEAD_MINUTES);
    assert_eq!(first.created_at, second.created_at);
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM user_settings;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn save_persists_profile_and_lead_time() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = SettingsService::new(store);

    let mut settings = service.load().unwrap();
    settings.student_name = Some("Alex Tan".to_string());
    settings.semester = Some("S1".to_string());
    service.save(&settings).unwrap();
    let updated = service.set_reminder_lead_minutes(30).unwrap();

    assert_eq!(updated.reminder_lead_minutes, 30);
    assert_eq!(updated.student_name.as_deref(), Some("Alex Tan"));
    assert_eq!(service.load().unwrap(), updated);
}

#[test]
fn negative_lead_minutes_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = SettingsService::new(store);

    assert!(matches!(
        service.set_reminder_lead_minutes(-1),
        Err(SettingsError::InvalidLeadMinutes(-1))
    ));
    assert_eq!(
        service.load().unwrap().reminder_lead_minutes,
        DEFAULT_REMINDER_LEAD_MINUTES
    );
}

#[test]
fn updated_at_never_moves_backwards() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let mut settings = SettingsService::new(store).load().unwrap();
    let stamped = settings.updated_at;

    settings.updated_at = 0;
    store.save_settings(&settings).unwrap();

    assert_eq!(store.load_settings().unwrap().unwrap().updated_at, stamped);
}
