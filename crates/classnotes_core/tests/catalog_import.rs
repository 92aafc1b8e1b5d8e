use classnotes_core::db::open_db_in_memory;
use classnotes_core::repo::catalog_repo::CatalogRepository;
use classnotes_core::repo::folder_repo::FolderRepository;
use classnotes_core::repo::note_repo::NoteRepository;
use classnotes_core::service::catalog_service::TimetableSourceError;
use classnotes_core::{
    CatalogError, CatalogService, DatedLesson, FolderService, Semester, SessionKind, SqliteStore,
    TimetableSource,
};
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::HashMap;

const WEEK_1_MS: i64 = 1_754_964_000_000;
const HOUR_MS: i64 = 3_600_000;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn lesson(offset_hours: i64, lesson_type: &str) -> DatedLesson {
    let start_ms = WEEK_1_MS + offset_hours * HOUR_MS;
    DatedLesson {
        start_ms,
        end_ms: start_ms + 2 * HOUR_MS,
        lesson_type: lesson_type.to_string(),
        location: Some("COM1-0210".to_string()),
        week_number: Some(1),
    }
}

/// Serves canned lessons per module code and records each request.
#[derive(Default)]
struct FakeTimetable {
    lessons: HashMap<String, Vec<DatedLesson>>,
    failing: Option<String>,
    requests: RefCell<Vec<(String, Semester)>>,
}

impl TimetableSource for FakeTimetable {
    fn fetch_lessons(
        &self,
        module_code: &str,
        semester: Semester,
    ) -> Result<Vec<DatedLesson>, TimetableSourceError> {
        self.requests
            .borrow_mut()
            .push((module_code.to_string(), semester));
        if self.failing.as_deref() == Some(module_code) {
            return Err("timetable unavailable".into());
        }
        Ok(self.lessons.get(module_code).cloned().unwrap_or_default())
    }
}

#[test]
fn register_module_normalizes_and_rejects_duplicates() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = CatalogService::new(store);

    let module = service
        .register_module(" cs1010s ", "Programming Methodology", "2025-S1", None)
        .unwrap();
    assert_eq!(module.code, "CS1010S");
    assert!(store.get_module("CS1010S").unwrap().is_some());

    assert!(matches!(
        service.register_module("CS1010S", "Again", "2025-S1", None),
        Err(CatalogError::DuplicateModule(code)) if code == "CS1010S"
    ));
    assert!(matches!(
        service.register_module("CS-1010", "Bad", "2025-S1", None),
        Err(CatalogError::InvalidModuleCode(_))
    ));
    assert!(matches!(
        service.register_module("MA1521", "  ", "2025-S1", None),
        Err(CatalogError::InvalidTitle)
    ));
    assert_eq!(service.list_modules().unwrap().len(), 1);
}

#[test]
fn import_creates_sessions_and_unfiled_template_notes() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let catalog = CatalogService::new(store);
    catalog
        .register_module("CS1010", "Programming Methodology", "2025-S1", None)
        .unwrap();

    let report = catalog
        .import_sessions(
            "CS1010",
            &[
                lesson(0, "Lecture"),
                lesson(24, "Sectional Teaching"),
                lesson(48, "Laboratory"),
                lesson(72, "Tutorial"),
            ],
        )
        .unwrap();

    assert_eq!(report.sessions_created, 4);
    assert_eq!(report.notes_created, 4);
    let kinds: Vec<SessionKind> = catalog
        .list_sessions("CS1010")
        .unwrap()
        .into_iter()
        .map(|session| session.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            SessionKind::Lecture,
            SessionKind::Others,
            SessionKind::Lab,
            SessionKind::Tutorial
        ]
    );

    let unfiled = store.list_unfiled_notes().unwrap();
    assert_eq!(unfiled.len(), 4);
    assert!(unfiled.iter().all(|note| note.is_session_note()));
    assert!(store.list_folders().unwrap().is_empty());

    let migrated = FolderService::new(store)
        .migrate_existing_notes_to_folders()
        .unwrap();
    assert_eq!(migrated.notes_placed, 4);
    assert_eq!(migrated.folders_created, 6);
}

#[test]
fn import_with_inverted_window_writes_nothing() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let catalog = CatalogService::new(store);
    catalog
        .register_module("CS1010", "Programming Methodology", "2025-S1", None)
        .unwrap();
    let mut broken = lesson(24, "Lecture");
    broken.end_ms = broken.start_ms - 1;

    let err = catalog
        .import_sessions("CS1010", &[lesson(0, "Lecture"), broken])
        .unwrap_err();

    assert!(matches!(err, CatalogError::InvalidSessionWindow { .. }));
    assert!(catalog.list_sessions("CS1010").unwrap().is_empty());
    assert!(store.list_notes().unwrap().is_empty());
}

#[test]
fn import_for_unknown_module_is_rejected() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let catalog = CatalogService::new(store);

    assert!(matches!(
        catalog.import_sessions("ZZ9999", &[lesson(0, "Lecture")]),
        Err(CatalogError::ModuleNotFound(code)) if code == "ZZ9999"
    ));
}

#[test]
fn regenerate_replaces_sessions_per_semester() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let catalog = CatalogService::new(store);
    catalog
        .register_module("CS1010", "Programming Methodology", "2025-S1", None)
        .unwrap();
    catalog
        .register_module("CS2030", "Programming Methodology II", "2025-S2", None)
        .unwrap();
    catalog
        .import_sessions("CS1010", &[lesson(0, "Lecture"), lesson(1, "Lecture")])
        .unwrap();

    let source = FakeTimetable {
        lessons: HashMap::from([
            ("CS1010".to_string(), vec![lesson(10, "Tutorial")]),
            ("CS2030".to_string(), vec![lesson(20, "Lab"), lesson(30, "Lecture")]),
        ]),
        ..FakeTimetable::default()
    };

    let report = catalog.regenerate_all_sessions(&source).unwrap();

    assert_eq!(report.sessions_deleted, 2);
    assert_eq!(report.sessions_created, 3);
    assert_eq!(
        source.requests.borrow().as_slice(),
        &[
            ("CS1010".to_string(), Semester::First),
            ("CS2030".to_string(), Semester::Second)
        ]
    );
    let cs1010 = catalog.list_sessions("CS1010").unwrap();
    assert_eq!(cs1010.len(), 1);
    assert_eq!(cs1010[0].kind, SessionKind::Tutorial);
    assert_eq!(store.list_notes().unwrap().len(), 3);
}

#[test]
fn failed_fetch_leaves_sessions_untouched() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let catalog = CatalogService::new(store);
    catalog
        .register_module("CS1010", "Programming Methodology", "2025-S1", None)
        .unwrap();
    catalog
        .register_module("CS2030", "Programming Methodology II", "2025-S2", None)
        .unwrap();
    catalog
        .import_sessions("CS1010", &[lesson(0, "Lecture")])
        .unwrap();
    let source = FakeTimetable {
        failing: Some("CS2030".to_string()),
        ..FakeTimetable::default()
    };

    let err = catalog.regenerate_all_sessions(&source).unwrap_err();

    assert!(matches!(err, CatalogError::Timetable { module_code, .. } if module_code == "CS2030"));
    assert_eq!(catalog.list_sessions("CS1010").unwrap().len(), 1);
    assert_eq!(store.list_notes().unwrap().len(), 1);
}

#[test]
fn delete_module_cascades_sessions_folders_and_filed_notes() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let catalog = CatalogService::new(store);
    let module = catalog
        .register_module("CS1010", "Programming Methodology", "2025-S1", None)
        .unwrap();
    catalog
        .import_sessions("CS1010", &[lesson(0, "Lecture")])
        .unwrap();
    let folders = FolderService::new(store);
    folders
        .create_note_in_module_folder(&module, None, Some("Scratch"), false)
        .unwrap();

    catalog.delete_module("cs1010").unwrap();

    assert!(store.list_sessions_for_module("CS1010").unwrap().is_empty());
    assert!(store.list_folders().unwrap().is_empty());
    assert!(store.list_notes().unwrap().is_empty());
    assert!(matches!(
        catalog.delete_module("CS1010"),
        Err(CatalogError::ModuleNotFound(_))
    ));
}
