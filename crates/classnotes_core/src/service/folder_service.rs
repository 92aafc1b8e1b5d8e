//! Folder reconciliation use-case service.
//!
//! # Responsibility
//! - Derive each module's folder tree (main folder plus one sub-folder per
//!   session kind and a "General" sub-folder) from catalog state.
//! - Place notes into the sub-folder matching their session type.
//! - Detect and repair structurally invalid folders, and rebuild the whole
//!   hierarchy from modules and notes.
//!
//! # Invariants
//! - Every public mutating operation runs inside one unit of work and
//!   either commits fully or rolls back and returns the error.
//! - `ensure_folder_for_module` is idempotent: repeated calls create no
//!   duplicate folders.
//! - Stale sub-folders (session kind no longer scheduled) are kept.
//! - At most one Quick Notes folder is created store-wide.
//! - Notes are never left inside a folder that is about to be deleted.

use crate::model::folder::{
    Folder, FolderId, FolderValidationError, GENERAL_SESSION_TYPE, RESERVED_SUB_FOLDER_NAMES,
};
use crate::model::module::Module;
use crate::model::note::{quick_note_title, Note, NoteId};
use crate::model::now_epoch_ms;
use crate::model::session::{ClassSession, SessionKind};
use crate::repo::{EntityStore, StoreError};
use log::{error, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors from reconciliation operations.
#[derive(Debug)]
pub enum ReconcileError {
    /// No module is registered under this code.
    ModuleNotFound(String),
    NoteNotFound(NoteId),
    FolderNotFound(FolderId),
    /// Parent is missing or is not this module's main folder.
    InvalidParent(FolderId),
    /// Fetch/save failure; the unit of work was rolled back.
    Store(StoreError),
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModuleNotFound(code) => write!(f, "module not found: {code}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::InvalidParent(id) => write!(f, "invalid parent folder: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ReconcileError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Counters describing what one reconciliation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub folders_created: usize,
    pub folders_deleted: usize,
    /// Notes filed into a module folder tree.
    pub notes_placed: usize,
    /// Notes with no matching module, filed into Quick Notes.
    pub notes_to_quick_notes: usize,
    /// Placements that found no matching sub-folder and used the main
    /// module folder instead.
    pub main_folder_fallbacks: usize,
}

impl ReconcileReport {
    /// True when some placement had to fall back to a main folder.
    pub fn is_degraded(&self) -> bool {
        self.main_folder_fallbacks > 0
    }

    fn absorb(&mut self, other: ReconcileReport) {
        self.folders_created += other.folders_created;
        self.folders_deleted += other.folders_deleted;
        self.notes_placed += other.notes_placed;
        self.notes_to_quick_notes += other.notes_to_quick_notes;
        self.main_folder_fallbacks += other.main_folder_fallbacks;
    }
}

/// Why cleanup flagged a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Malformation {
    /// Session-type label at top level with no module.
    LooseSessionFolder,
    /// Module-scoped folder at module level with a foreign `<code> - ` name.
    MisplacedModuleFolder,
    /// Sub-folder whose parent is missing, itself, or not a module folder.
    OrphanSubFolder,
    /// Second sub-folder for the same session type under one parent.
    DuplicateSubFolder,
    /// Quick Notes folder beyond the first.
    DuplicateQuickNotes,
}

impl Malformation {
    fn as_str(self) -> &'static str {
        match self {
            Self::LooseSessionFolder => "loose_session_folder",
            Self::MisplacedModuleFolder => "misplaced_module_folder",
            Self::OrphanSubFolder => "orphan_sub_folder",
            Self::DuplicateSubFolder => "duplicate_sub_folder",
            Self::DuplicateQuickNotes => "duplicate_quick_notes",
        }
    }
}

/// Folder reconciliation engine over an entity store.
///
/// Callers serialize invocations against one store; nothing here locks.
pub struct FolderService<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> FolderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the module's main folder, creating it and any missing
    /// sub-folders first.
    pub fn ensure_folder_for_module(&self, module: &Module) -> ReconcileResult<Folder> {
        let (folder, _) = self.in_unit("folder_ensure", |report| {
            let module = self.load_module(&module.code)?;
            self.ensure_module_tree(&module, report)
        })?;
        Ok(folder)
    }

    /// Creates one sub-folder under `parent` for every session kind of the
    /// module (plus "general") that has none yet. Returns the created ones.
    ///
    /// `parent` is re-read from the store and must be this module's main
    /// folder; anything else fails with `InvalidParent` and writes nothing.
    pub fn ensure_sub_folders_for_module(
        &self,
        module: &Module,
        parent: &Folder,
    ) -> ReconcileResult<Vec<Folder>> {
        let (created, _) = self.in_unit("folder_ensure_sub", |report| {
            let module = self.load_module(&module.code)?;
            let parent = self
                .store
                .get_folder(parent.id)?
                .filter(|folder| {
                    folder.is_module_folder()
                        && folder.module_ref.as_deref() == Some(module.code.as_str())
                })
                .ok_or(ReconcileError::InvalidParent(parent.id))?;
            self.ensure_sub_folders(&module, &parent, report)
        })?;
        Ok(created)
    }

    /// Renames a folder. The name is trimmed and must not be blank.
    pub fn rename_folder(&self, id: FolderId, name: &str) -> ReconcileResult<Folder> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReconcileError::Store(StoreError::Validation(
                FolderValidationError::BlankName,
            )));
        }
        let (folder, _) = self.in_unit("folder_rename", |_| {
            self.require_folder(id)?;
            self.store.rename_folder(id, name)?;
            self.require_folder(id)
        })?;
        Ok(folder)
    }

    pub fn set_folder_archived(&self, id: FolderId, archived: bool) -> ReconcileResult<Folder> {
        let (folder, _) = self.in_unit("folder_archive", |_| {
            self.require_folder(id)?;
            self.store.set_folder_archived(id, archived)?;
            self.require_folder(id)
        })?;
        Ok(folder)
    }

    /// All folders whose `parent_folder_id` is `parent.id`.
    pub fn get_sub_folders(&self, parent: &Folder) -> ReconcileResult<Vec<Folder>> {
        Ok(self.store.list_sub_folders(parent.id)?)
    }

    /// Notes in the module's main folder and all of its sub-folders,
    /// newest first. Empty when the module has no folder yet.
    pub fn get_all_notes_for_module(&self, module: &Module) -> ReconcileResult<Vec<Note>> {
        let Some(main) = self.current_main_folder(&module.code)? else {
            return Ok(Vec::new());
        };

        let mut notes = self.store.list_notes_in_folder(main.id)?;
        for sub_folder in self.store.list_sub_folders(main.id)? {
            notes.extend(self.store.list_notes_in_folder(sub_folder.id)?);
        }
        sort_newest_first(&mut notes);
        Ok(notes)
    }

    /// Notes in the sub-folder for `kind`, newest first.
    pub fn get_notes_for_session_type(
        &self,
        kind: SessionKind,
        module: &Module,
    ) -> ReconcileResult<Vec<Note>> {
        match self.placement_folder(module, Some(kind.as_str()))? {
            Some(folder) => Ok(self.store.list_notes_in_folder(folder.id)?),
            None => Ok(Vec::new()),
        }
    }

    /// Resolves the sub-folder serving `session_type` ("general" when
    /// absent). `None` when the module has no tree or no such sub-folder.
    pub fn placement_folder(
        &self,
        module: &Module,
        session_type: Option<&str>,
    ) -> ReconcileResult<Option<Folder>> {
        let Some(main) = self.current_main_folder(&module.code)? else {
            return Ok(None);
        };
        let target = session_type.unwrap_or(GENERAL_SESSION_TYPE);
        Ok(self
            .store
            .list_sub_folders(main.id)?
            .into_iter()
            .find(|folder| folder.serves_session_type(target)))
    }

    /// Creates a note in the module's sub-folder for the session's kind
    /// ("General" without a session), building the folder tree first.
    ///
    /// A session template is used only when `is_session_note` is set and a
    /// session is given; otherwise a standalone template titled `title`.
    pub fn create_note_in_module_folder(
        &self,
        module: &Module,
        session: Option<&ClassSession>,
        title: Option<&str>,
        is_session_note: bool,
    ) -> ReconcileResult<Note> {
        let (note, _) = self.in_unit("note_create", |report| {
            let module = self.load_module(&module.code)?;
            let main = self.ensure_module_tree(&module, report)?;
            let session_type = session
                .map(|session| session.kind.as_str())
                .unwrap_or(GENERAL_SESSION_TYPE);
            let target = self.resolve_placement(&main, session_type, report)?;

            let mut note = match session {
                Some(session) if is_session_note => Note::session_template(session),
                _ => Note::standalone_template(module.code.clone(), title),
            };
            note.folder_id = Some(target.id);
            self.store.insert_note(&note)?;
            report.notes_placed += 1;
            Ok(note)
        })?;
        Ok(note)
    }

    /// Creates a timestamped standalone note in the module's General
    /// sub-folder.
    pub fn create_quick_note(&self, module: &Module) -> ReconcileResult<Note> {
        let title = quick_note_title(now_epoch_ms());
        self.create_note_in_module_folder(module, None, Some(title.as_str()), false)
    }

    /// Returns the Quick Notes folder, creating it when absent.
    pub fn find_or_create_quick_notes_folder(&self) -> ReconcileResult<Folder> {
        let (folder, _) = self.in_unit("quick_notes_ensure", |report| {
            self.quick_notes_folder(report)
        })?;
        Ok(folder)
    }

    /// Deletes structurally invalid folders after re-homing their notes.
    ///
    /// Flagged: session-type labels with no module, module-scoped folders
    /// at module level whose name carries another module's prefix,
    /// sub-folders without a valid module parent, duplicate sub-folders
    /// for one session type, and extra Quick Notes folders.
    pub fn cleanup_duplicate_folders(&self) -> ReconcileResult<ReconcileReport> {
        let ((), report) = self.in_unit("folder_cleanup", |report| self.cleanup(report))?;
        Ok(report)
    }

    /// Files every unfiled note, then runs cleanup; one commit at the end.
    pub fn migrate_existing_notes_to_folders(&self) -> ReconcileResult<ReconcileReport> {
        let ((), report) = self.in_unit("folder_migrate", |report| {
            for note in self.store.list_unfiled_notes()? {
                self.file_note(&note, report)?;
            }
            self.cleanup(report)
        })?;
        Ok(report)
    }

    /// Deletes every folder and rebuilds all module trees from scratch.
    ///
    /// Runs as two units of work: clear, then rebuild. If the second unit
    /// fails, every note and module is left folder-less; calling this again
    /// recovers.
    pub fn rebuild_folder_structure(&self) -> ReconcileResult<ReconcileReport> {
        let ((), mut report) = self.in_unit("folder_rebuild_clear", |report| {
            self.store.detach_all_notes()?;
            self.store.clear_all_module_folders()?;
            report.folders_deleted += self.store.delete_all_folders()?;
            Ok(())
        })?;

        let ((), rebuilt) = self.in_unit("folder_rebuild_fill", |report| {
            for module in self.store.list_modules()? {
                self.ensure_module_tree(&module, report)?;
            }
            for note in self.store.list_notes()? {
                self.file_note(&note, report)?;
            }
            Ok(())
        })?;
        report.absorb(rebuilt);
        Ok(report)
    }

    fn in_unit<T, F>(&self, event: &'static str, op: F) -> ReconcileResult<(T, ReconcileReport)>
    where
        F: FnOnce(&mut ReconcileReport) -> ReconcileResult<T>,
    {
        let started_at = Instant::now();
        info!("event={event} module=folders status=start");

        if let Err(err) = self.store.begin() {
            error!(
                "event={event} module=folders status=error error_code=begin_failed error={err}"
            );
            return Err(err.into());
        }

        let mut report = ReconcileReport::default();
        let outcome = op(&mut report).and_then(|value| {
            self.store.commit()?;
            Ok(value)
        });

        match outcome {
            Ok(value) => {
                info!(
                    "event={event} module=folders status=ok duration_ms={} folders_created={} folders_deleted={} notes_placed={} notes_to_quick_notes={} main_folder_fallbacks={}",
                    started_at.elapsed().as_millis(),
                    report.folders_created,
                    report.folders_deleted,
                    report.notes_placed,
                    report.notes_to_quick_notes,
                    report.main_folder_fallbacks
                );
                Ok((value, report))
            }
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback() {
                    warn!(
                        "event={event} module=folders status=error error_code=rollback_failed error={rollback_err}"
                    );
                }
                error!(
                    "event={event} module=folders status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    fn load_module(&self, code: &str) -> ReconcileResult<Module> {
        self.store
            .get_module(code)?
            .ok_or_else(|| ReconcileError::ModuleNotFound(code.to_string()))
    }

    fn require_folder(&self, id: FolderId) -> ReconcileResult<Folder> {
        self.store
            .get_folder(id)?
            .ok_or(ReconcileError::FolderNotFound(id))
    }

    fn current_main_folder(&self, code: &str) -> ReconcileResult<Option<Folder>> {
        let module = self.load_module(code)?;
        let Some(folder_id) = module.folder_id else {
            return Ok(None);
        };
        Ok(self
            .store
            .get_folder(folder_id)?
            .filter(Folder::is_module_folder))
    }

    /// `module` must be freshly loaded so `folder_id` is current.
    fn ensure_module_tree(
        &self,
        module: &Module,
        report: &mut ReconcileReport,
    ) -> ReconcileResult<Folder> {
        let existing = match module.folder_id {
            Some(folder_id) => self
                .store
                .get_folder(folder_id)?
                .filter(Folder::is_module_folder),
            None => None,
        };

        let main = match existing {
            Some(folder) => folder,
            None => {
                let folder = self.store.insert_folder(&Folder::module_folder(module))?;
                self.store.set_module_folder(&module.code, Some(folder.id))?;
                report.folders_created += 1;
                folder
            }
        };

        self.ensure_sub_folders(module, &main, report)?;
        Ok(main)
    }

    fn ensure_sub_folders(
        &self,
        module: &Module,
        parent: &Folder,
        report: &mut ReconcileReport,
    ) -> ReconcileResult<Vec<Folder>> {
        let mut required: BTreeSet<&'static str> = self
            .store
            .list_sessions_for_module(&module.code)?
            .into_iter()
            .map(|session| session.kind.as_str())
            .collect();
        required.insert(GENERAL_SESSION_TYPE);

        let existing = self.store.list_sub_folders(parent.id)?;
        let mut created = Vec::new();
        for session_type in required {
            if existing
                .iter()
                .any(|folder| folder.serves_session_type(session_type))
            {
                continue;
            }
            let folder = self
                .store
                .insert_folder(&Folder::sub_folder(module, parent, session_type))?;
            report.folders_created += 1;
            created.push(folder);
        }
        Ok(created)
    }

    fn resolve_placement(
        &self,
        main: &Folder,
        session_type: &str,
        report: &mut ReconcileReport,
    ) -> ReconcileResult<Folder> {
        let sub_folder = self
            .store
            .list_sub_folders(main.id)?
            .into_iter()
            .find(|folder| folder.serves_session_type(session_type));
        match sub_folder {
            Some(folder) => Ok(folder),
            None => {
                warn!(
                    "event=folder_place module=folders status=fallback folder_id={} session_type={session_type}",
                    main.id
                );
                report.main_folder_fallbacks += 1;
                Ok(main.clone())
            }
        }
    }

    fn note_session_type(&self, note: &Note) -> ReconcileResult<&'static str> {
        let Some(session_id) = note.session_id else {
            return Ok(GENERAL_SESSION_TYPE);
        };
        Ok(self
            .store
            .get_session(session_id)?
            .map(|session| session.kind.as_str())
            .unwrap_or(GENERAL_SESSION_TYPE))
    }

    /// Moves `note` into its module's correct sub-folder, or Quick Notes
    /// when no module matches its `module_code`.
    fn file_note(&self, note: &Note, report: &mut ReconcileReport) -> ReconcileResult<()> {
        match self.store.get_module(&note.module_code)? {
            Some(module) => {
                let main = self.ensure_module_tree(&module, report)?;
                let session_type = self.note_session_type(note)?;
                let target = self.resolve_placement(&main, session_type, report)?;
                self.store.set_note_folder(note.id, Some(target.id))?;
                report.notes_placed += 1;
            }
            None => {
                let quick_notes = self.quick_notes_folder(report)?;
                self.store.set_note_folder(note.id, Some(quick_notes.id))?;
                report.notes_to_quick_notes += 1;
            }
        }
        Ok(())
    }

    fn quick_notes_folder(&self, report: &mut ReconcileReport) -> ReconcileResult<Folder> {
        if let Some(folder) = self
            .store
            .list_folders()?
            .into_iter()
            .find(Folder::is_quick_notes)
        {
            return Ok(folder);
        }
        let folder = self.store.insert_folder(&Folder::quick_notes())?;
        report.folders_created += 1;
        Ok(folder)
    }

    fn cleanup(&self, report: &mut ReconcileReport) -> ReconcileResult<()> {
        let folders = self.store.list_folders()?;
        let flagged = find_malformed(&folders);

        for (folder_id, malformation) in flagged {
            let notes = self.store.list_notes_in_folder(folder_id)?;
            if malformation == Malformation::DuplicateQuickNotes {
                let survivor = self.quick_notes_folder(report)?;
                for note in notes {
                    self.store.set_note_folder(note.id, Some(survivor.id))?;
                    report.notes_to_quick_notes += 1;
                }
            } else {
                for note in notes {
                    self.file_note(&note, report)?;
                }
            }
            self.store.delete_folder(folder_id)?;
            report.folders_deleted += 1;
            info!(
                "event=folder_cleanup module=folders status=deleted folder_id={folder_id} reason={}",
                malformation.as_str()
            );
        }
        Ok(())
    }
}

fn find_malformed(folders: &[Folder]) -> Vec<(FolderId, Malformation)> {
    let by_id: HashMap<FolderId, &Folder> =
        folders.iter().map(|folder| (folder.id, folder)).collect();
    let mut flagged = Vec::new();
    let mut quick_notes_seen = false;
    let mut sub_folder_groups: BTreeMap<(FolderId, String, String), Vec<&Folder>> =
        BTreeMap::new();

    for folder in folders {
        if let Some(malformation) = classify(folder, &by_id) {
            flagged.push((folder.id, malformation));
            continue;
        }

        if folder.is_quick_notes() {
            if quick_notes_seen {
                flagged.push((folder.id, Malformation::DuplicateQuickNotes));
            }
            quick_notes_seen = true;
            continue;
        }

        if let (true, Some(parent_id), Some(session_type)) = (
            folder.is_sub_folder,
            folder.parent_folder_id,
            folder.session_type.as_ref(),
        ) {
            sub_folder_groups
                .entry((parent_id, folder.name.clone(), session_type.clone()))
                .or_default()
                .push(folder);
        }
    }

    for mut group in sub_folder_groups.into_values() {
        group.sort_by(|left, right| {
            left.sort_order
                .cmp(&right.sort_order)
                .then_with(|| left.id.cmp(&right.id))
        });
        for duplicate in group.into_iter().skip(1) {
            flagged.push((duplicate.id, Malformation::DuplicateSubFolder));
        }
    }

    flagged
}

fn classify(folder: &Folder, by_id: &HashMap<FolderId, &Folder>) -> Option<Malformation> {
    if !folder.is_sub_folder
        && folder.module_code.is_none()
        && RESERVED_SUB_FOLDER_NAMES.contains(&folder.name.as_str())
    {
        return Some(Malformation::LooseSessionFolder);
    }

    if let Some(module_code) = folder.module_code.as_deref() {
        if !folder.is_sub_folder
            && !folder.is_module_folder()
            && folder.name.contains(" - ")
            && !folder.name.starts_with(&Module::folder_name_prefix(module_code))
        {
            return Some(Malformation::MisplacedModuleFolder);
        }
    }

    if folder.is_sub_folder {
        let parent_is_module_folder = folder
            .parent_folder_id
            .filter(|parent_id| *parent_id != folder.id)
            .and_then(|parent_id| by_id.get(&parent_id))
            .is_some_and(|parent| parent.is_module_folder());
        if !parent_is_module_folder {
            return Some(Malformation::OrphanSubFolder);
        }
    }

    None
}

fn sort_newest_first(notes: &mut [Note]) {
    notes.sort_by(|left, right| {
        right
            .updated_at
            .cmp(&left.updated_at)
            .then_with(|| left.id.cmp(&right.id))
    });
}

#[cfg(test)]
mod tests {
    use super::{find_malformed, Malformation};
    use crate::model::folder::Folder;
    use crate::model::module::Module;

    fn module_tree() -> (Module, Folder, Folder) {
        let module = Module::new("CS1010", "Programming Methodology", "2025-S1");
        let main = Folder::module_folder(&module);
        let general = Folder::sub_folder(&module, &main, "general");
        (module, main, general)
    }

    #[test]
    fn well_formed_tree_is_not_flagged() {
        let (_, main, general) = module_tree();
        let quick = Folder::quick_notes();
        assert!(find_malformed(&[main, general, quick]).is_empty());
    }

    #[test]
    fn loose_session_label_is_flagged() {
        let loose = Folder::new("Tutorial", None);
        let flagged = find_malformed(std::slice::from_ref(&loose));
        assert_eq!(flagged, vec![(loose.id, Malformation::LooseSessionFolder)]);
    }

    #[test]
    fn misplaced_module_level_folder_is_flagged() {
        let mut misplaced = Folder::new("Week 3 - Tutorial", None);
        misplaced.module_code = Some("CS1010".to_string());
        let mut custom = Folder::new("CS1010 - Extra", None);
        custom.module_code = Some("CS1010".to_string());

        let flagged = find_malformed(&[misplaced.clone(), custom]);
        assert_eq!(
            flagged,
            vec![(misplaced.id, Malformation::MisplacedModuleFolder)]
        );
    }

    #[test]
    fn orphan_and_duplicate_sub_folders_are_flagged() {
        let (module, main, general) = module_tree();
        let mut duplicate = Folder::sub_folder(&module, &main, "general");
        duplicate.sort_order = general.sort_order + 1;
        let unrelated = Folder::new("Unrelated", None);
        let orphan = Folder::sub_folder(&module, &unrelated, "lecture");

        let flagged = find_malformed(&[main, general, duplicate.clone(), orphan.clone()]);
        assert!(flagged.contains(&(orphan.id, Malformation::OrphanSubFolder)));
        assert!(flagged.contains(&(duplicate.id, Malformation::DuplicateSubFolder)));
        assert_eq!(flagged.len(), 2);
    }

    #[test]
    fn second_quick_notes_folder_is_flagged() {
        let first = Folder::quick_notes();
        let second = Folder::quick_notes();
        let flagged = find_malformed(&[first, second.clone()]);
        assert_eq!(flagged, vec![(second.id, Malformation::DuplicateQuickNotes)]);
    }
}
