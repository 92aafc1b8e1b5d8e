//! Module catalog and session import.
//!
//! # Responsibility
//! - Register and remove modules with validated codes.
//! - Turn timetable lessons into class sessions plus linked template notes.
//!
//! # Invariants
//! - Module codes are stored trimmed and uppercased.
//! - An import writes all of its sessions and notes or none of them.
//! - Imported notes are left unfiled; folder placement is reconciliation's job.

use crate::model::module::Module;
use crate::model::note::Note;
use crate::model::session::{ClassSession, SessionKind};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::note_repo::NoteRepository;
use crate::repo::{StoreError, UnitOfWork};
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

static MODULE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,4}[0-9]{4}[A-Z]{0,3}$").expect("valid module code regex"));

/// Boxed error produced by a timetable source.
pub type TimetableSourceError = Box<dyn Error + Send + Sync + 'static>;

/// Teaching half of an academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    /// Semester one when the key contains `S1`, semester two otherwise.
    pub fn for_module(module: &Module) -> Self {
        if module.is_first_semester() {
            Self::First
        } else {
            Self::Second
        }
    }
}

/// One concrete, dated occurrence of a lesson from a timetable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedLesson {
    /// Epoch milliseconds.
    pub start_ms: i64,
    /// Epoch milliseconds.
    pub end_ms: i64,
    /// Free-form lesson type as published, e.g. `"Sectional Teaching"`.
    pub lesson_type: String,
    pub location: Option<String>,
    pub week_number: Option<i64>,
}

/// Supplier of dated lessons for a module.
pub trait TimetableSource {
    fn fetch_lessons(
        &self,
        module_code: &str,
        semester: Semester,
    ) -> Result<Vec<DatedLesson>, TimetableSourceError>;
}

/// What an import wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub sessions_created: usize,
    pub notes_created: usize,
    /// Sessions removed before re-import.
    pub sessions_deleted: usize,
}

#[derive(Debug)]
pub enum CatalogError {
    /// Code does not match the module code format after normalization.
    InvalidModuleCode(String),
    DuplicateModule(String),
    ModuleNotFound(String),
    /// Title is blank after trim.
    InvalidTitle,
    /// Lesson ends before it starts.
    InvalidSessionWindow { start_ms: i64, end_ms: i64 },
    /// The timetable source failed for this module.
    Timetable {
        module_code: String,
        source: TimetableSourceError,
    },
    Store(StoreError),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidModuleCode(code) => write!(f, "invalid module code: `{code}`"),
            Self::DuplicateModule(code) => write!(f, "module already registered: {code}"),
            Self::ModuleNotFound(code) => write!(f, "module not found: {code}"),
            Self::InvalidTitle => write!(f, "module title must not be blank"),
            Self::InvalidSessionWindow { start_ms, end_ms } => {
                write!(f, "session ends before it starts: {start_ms} > {end_ms}")
            }
            Self::Timetable {
                module_code,
                source,
            } => write!(f, "timetable fetch failed for {module_code}: {source}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Timetable { source, .. } => Some(source.as_ref()),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Trims and uppercases `raw`, then checks the module code format.
pub fn normalize_module_code(raw: &str) -> Result<String, CatalogError> {
    let code = raw.trim().to_uppercase();
    if MODULE_CODE_RE.is_match(code.as_str()) {
        Ok(code)
    } else {
        Err(CatalogError::InvalidModuleCode(raw.trim().to_string()))
    }
}

/// Catalog service facade over repository implementations.
pub struct CatalogService<S>
where
    S: CatalogRepository + NoteRepository + UnitOfWork,
{
    store: S,
}

impl<S> CatalogService<S>
where
    S: CatalogRepository + NoteRepository + UnitOfWork,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn register_module(
        &self,
        code: &str,
        title: &str,
        semester_key: &str,
        tutorial_group: Option<String>,
    ) -> Result<Module, CatalogError> {
        let code = normalize_module_code(code)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(CatalogError::InvalidTitle);
        }
        if self.store.get_module(code.as_str())?.is_some() {
            return Err(CatalogError::DuplicateModule(code));
        }

        let mut module = Module::new(code, title, semester_key.trim());
        module.tutorial_group = tutorial_group.filter(|group| !group.trim().is_empty());
        self.store.insert_module(&module)?;
        info!(
            "event=module_register module=catalog status=ok code={}",
            module.code
        );
        Ok(module)
    }

    pub fn get_module(&self, code: &str) -> Result<Module, CatalogError> {
        let code = code.trim().to_uppercase();
        self.store
            .get_module(code.as_str())?
            .ok_or(CatalogError::ModuleNotFound(code))
    }

    pub fn list_modules(&self) -> Result<Vec<Module>, CatalogError> {
        Ok(self.store.list_modules()?)
    }

    /// Removes a module together with its sessions, folders and the notes
    /// filed in them.
    pub fn delete_module(&self, code: &str) -> Result<(), CatalogError> {
        let module = self.get_module(code)?;
        self.store.delete_module(module.code.as_str())?;
        info!(
            "event=module_delete module=catalog status=ok code={}",
            module.code
        );
        Ok(())
    }

    pub fn add_session(&self, session: &ClassSession) -> Result<(), CatalogError> {
        if session.end_ms < session.start_ms {
            return Err(CatalogError::InvalidSessionWindow {
                start_ms: session.start_ms,
                end_ms: session.end_ms,
            });
        }
        self.get_module(session.module_code.as_str())?;
        self.store.insert_session(session)?;
        Ok(())
    }

    pub fn list_sessions(&self, code: &str) -> Result<Vec<ClassSession>, CatalogError> {
        let module = self.get_module(code)?;
        Ok(self.store.list_sessions_for_module(module.code.as_str())?)
    }

    pub fn set_session_cancelled(
        &self,
        session: &ClassSession,
        cancelled: bool,
    ) -> Result<(), CatalogError> {
        self.store.set_session_cancelled(session.id, cancelled)?;
        Ok(())
    }

    /// Creates one session and one session-linked template note per lesson.
    pub fn import_sessions(
        &self,
        code: &str,
        lessons: &[DatedLesson],
    ) -> Result<ImportReport, CatalogError> {
        let module = self.get_module(code)?;
        validate_lessons(lessons)?;
        self.in_unit("session_import", |report| {
            self.write_lessons(&module, lessons, report)
        })
    }

    /// Drops every module's sessions (and their linked notes) and
    /// re-imports them from `source`.
    ///
    /// All lessons are fetched before anything is written; a fetch failure
    /// leaves the store untouched.
    pub fn regenerate_all_sessions<T: TimetableSource>(
        &self,
        source: &T,
    ) -> Result<ImportReport, CatalogError> {
        let mut fetched = Vec::new();
        for module in self.store.list_modules()? {
            let lessons = source
                .fetch_lessons(module.code.as_str(), Semester::for_module(&module))
                .map_err(|source| CatalogError::Timetable {
                    module_code: module.code.clone(),
                    source,
                })?;
            validate_lessons(&lessons)?;
            fetched.push((module, lessons));
        }

        self.in_unit("session_regenerate", |report| {
            for (module, lessons) in &fetched {
                report.sessions_deleted += self
                    .store
                    .delete_sessions_for_module(module.code.as_str())?;
                self.write_lessons(module, lessons, report)?;
            }
            Ok(())
        })
    }

    fn write_lessons(
        &self,
        module: &Module,
        lessons: &[DatedLesson],
        report: &mut ImportReport,
    ) -> Result<(), CatalogError> {
        for lesson in lessons {
            let mut session = ClassSession::new(
                module.code.clone(),
                lesson.start_ms,
                lesson.end_ms,
                SessionKind::from_lesson_type(lesson.lesson_type.as_str()),
                lesson.location.clone(),
            );
            session.week_number = lesson.week_number;
            self.store.insert_session(&session)?;
            report.sessions_created += 1;

            self.store.insert_note(&Note::session_template(&session))?;
            report.notes_created += 1;
        }
        Ok(())
    }

    fn in_unit<F>(&self, event: &'static str, op: F) -> Result<ImportReport, CatalogError>
    where
        F: FnOnce(&mut ImportReport) -> Result<(), CatalogError>,
    {
        let started_at = Instant::now();
        self.store.begin()?;

        let mut report = ImportReport::default();
        let outcome = op(&mut report).and_then(|()| Ok(self.store.commit()?));
        match outcome {
            Ok(()) => {
                info!(
                    "event={event} module=catalog status=ok duration_ms={} sessions_created={} notes_created={} sessions_deleted={}",
                    started_at.elapsed().as_millis(),
                    report.sessions_created,
                    report.notes_created,
                    report.sessions_deleted
                );
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback() {
                    error!(
                        "event={event} module=catalog status=error error_code=rollback_failed error={rollback_err}"
                    );
                }
                error!(
                    "event={event} module=catalog status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }
}

fn validate_lessons(lessons: &[DatedLesson]) -> Result<(), CatalogError> {
    match lessons.iter().find(|lesson| lesson.end_ms < lesson.start_ms) {
        Some(lesson) => Err(CatalogError::InvalidSessionWindow {
            start_ms: lesson.start_ms,
            end_ms: lesson.end_ms,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_module_code, CatalogError, Semester};
    use crate::model::module::Module;

    #[test]
    fn module_codes_are_trimmed_and_uppercased() {
        assert_eq!(normalize_module_code("  cs1010s ").unwrap(), "CS1010S");
        assert_eq!(normalize_module_code("GESS1025").unwrap(), "GESS1025");
    }

    #[test]
    fn malformed_module_codes_are_rejected() {
        for raw in ["", "C1010", "CS101", "CSABC1010", "CS1010ABCD", "CS 1010"] {
            assert!(
                matches!(
                    normalize_module_code(raw),
                    Err(CatalogError::InvalidModuleCode(_))
                ),
                "accepted `{raw}`"
            );
        }
    }

    #[test]
    fn semester_follows_key() {
        let first = Module::new("CS1010", "Programming Methodology", "2025-S1");
        let second = Module::new("CS2030", "Programming Methodology II", "2025-S2");
        assert_eq!(Semester::for_module(&first), Semester::First);
        assert_eq!(Semester::for_module(&second), Semester::Second);
    }
}
