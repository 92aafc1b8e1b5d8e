//! Folder model and structural classification.
//!
//! # Responsibility
//! - Define module folders, session-type sub-folders and Quick Notes.
//! - Provide the naming rules reconciliation matches folders by.
//!
//! # Invariants
//! - A module folder has `module_code` and `module_ref` set and is not a
//!   sub-folder; `module_code == module_ref`.
//! - A sub-folder references its parent by id (`parent_folder_id`), never
//!   by ownership, and never references itself.
//! - Quick Notes has neither `module_code` nor the sub-folder flag.

use crate::model::color::{color_for, color_for_session_type, DEFAULT_FOLDER_COLOR};
use crate::model::module::Module;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable folder identifier.
pub type FolderId = Uuid;

/// Session type of the sub-folder every module tree carries.
pub const GENERAL_SESSION_TYPE: &str = "general";
/// Name of the store-wide catch-all folder.
pub const QUICK_NOTES_FOLDER_NAME: &str = "Quick Notes";
/// Labels that only make sense inside a module's sub-folder namespace.
pub const RESERVED_SUB_FOLDER_NAMES: [&str; 5] =
    ["General", "Others", "Lecture", "Tutorial", "Lab"];

/// Validation failures for folder records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderValidationError {
    BlankName,
    SelfParent(FolderId),
    SubFolderWithoutParent(FolderId),
}

impl Display for FolderValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "folder name must not be blank"),
            Self::SelfParent(id) => write!(f, "folder {id} cannot be its own parent"),
            Self::SubFolderWithoutParent(id) => {
                write!(f, "sub-folder {id} requires parent_folder_id")
            }
        }
    }
}

impl Error for FolderValidationError {}

/// Organizational container for notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub module_code: Option<String>,
    /// Owning module link. Deleting the module deletes the folder.
    pub module_ref: Option<String>,
    pub color: Option<String>,
    pub is_archived: bool,
    pub sort_order: i64,
    pub session_type: Option<String>,
    pub is_sub_folder: bool,
    pub parent_folder_id: Option<FolderId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Folder {
    /// Creates a plain folder with no module association.
    pub fn new(name: impl Into<String>, color: Option<String>) -> Self {
        let now = super::now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            module_code: None,
            module_ref: None,
            color,
            is_archived: false,
            sort_order: 0,
            session_type: None,
            is_sub_folder: false,
            parent_folder_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds the main folder for `module`.
    pub fn module_folder(module: &Module) -> Self {
        let mut folder = Self::new(
            module.folder_name(),
            Some(color_for(&module.code).to_string()),
        );
        folder.module_code = Some(module.code.clone());
        folder.module_ref = Some(module.code.clone());
        folder
    }

    /// Builds one session-type sub-folder under `parent`.
    pub fn sub_folder(module: &Module, parent: &Folder, session_type: &str) -> Self {
        let mut folder = Self::new(
            sub_folder_name(session_type),
            Some(color_for_session_type(session_type).to_string()),
        );
        folder.module_code = Some(module.code.clone());
        folder.module_ref = Some(module.code.clone());
        folder.session_type = Some(session_type.to_string());
        folder.is_sub_folder = true;
        folder.parent_folder_id = Some(parent.id);
        folder
    }

    pub fn quick_notes() -> Self {
        Self::new(QUICK_NOTES_FOLDER_NAME, Some(DEFAULT_FOLDER_COLOR.to_string()))
    }

    pub fn is_module_folder(&self) -> bool {
        self.module_code.is_some() && self.module_ref.is_some() && !self.is_sub_folder
    }

    pub fn is_quick_notes(&self) -> bool {
        self.name == QUICK_NOTES_FOLDER_NAME && !self.is_module_folder() && !self.is_sub_folder
    }

    /// Whether this sub-folder serves notes of `session_type`.
    pub fn serves_session_type(&self, session_type: &str) -> bool {
        self.is_sub_folder
            && self.name == sub_folder_name(session_type)
            && self.session_type.as_deref() == Some(session_type)
    }

    pub fn icon_name(&self) -> &'static str {
        if self.is_sub_folder {
            return match self.session_type.as_deref().map(str::to_ascii_lowercase).as_deref() {
                Some("lecture") => "person.wave.2",
                Some("tutorial") => "person.2.badge.gearshape",
                Some("lab") | Some("laboratory") => "flask",
                Some("general") => "doc.text",
                _ => "folder",
            };
        }
        if self.is_module_folder() {
            "folder.fill"
        } else {
            "folder"
        }
    }

    pub fn display_color(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_FOLDER_COLOR)
    }

    pub fn validate(&self) -> Result<(), FolderValidationError> {
        if self.name.trim().is_empty() {
            return Err(FolderValidationError::BlankName);
        }
        if self.parent_folder_id == Some(self.id) {
            return Err(FolderValidationError::SelfParent(self.id));
        }
        if self.is_sub_folder && self.parent_folder_id.is_none() {
            return Err(FolderValidationError::SubFolderWithoutParent(self.id));
        }
        Ok(())
    }
}

/// Display name of the sub-folder for `session_type`.
pub fn sub_folder_name(session_type: &str) -> String {
    if session_type == GENERAL_SESSION_TYPE {
        return "General".to_string();
    }
    capitalize_words(session_type)
}

fn capitalize_words(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{sub_folder_name, Folder, FolderValidationError, GENERAL_SESSION_TYPE};
    use crate::model::module::Module;

    #[test]
    fn sub_folder_names_are_capitalized() {
        assert_eq!(sub_folder_name(GENERAL_SESSION_TYPE), "General");
        assert_eq!(sub_folder_name("lecture"), "Lecture");
        assert_eq!(sub_folder_name("lab"), "Lab");
        assert_eq!(sub_folder_name("others"), "Others");
        assert_eq!(sub_folder_name("design studio"), "Design Studio");
    }

    #[test]
    fn classification_predicates() {
        let module = Module::new("CS1010", "Programming Methodology", "2025-S1");
        let main = Folder::module_folder(&module);
        assert!(main.is_module_folder());
        assert_eq!(main.name, "CS1010 - Programming Methodology");
        assert_eq!(main.icon_name(), "folder.fill");

        let sub = Folder::sub_folder(&module, &main, "tutorial");
        assert!(!sub.is_module_folder());
        assert!(sub.serves_session_type("tutorial"));
        assert!(!sub.serves_session_type("lecture"));
        assert_eq!(sub.parent_folder_id, Some(main.id));
        assert_eq!(sub.icon_name(), "person.2.badge.gearshape");

        let quick = Folder::quick_notes();
        assert!(quick.is_quick_notes());
        assert_eq!(quick.display_color(), "#007AFF");
    }

    #[test]
    fn validate_rejects_self_parent() {
        let mut folder = Folder::new("Loop", None);
        folder.parent_folder_id = Some(folder.id);
        assert_eq!(
            folder.validate(),
            Err(FolderValidationError::SelfParent(folder.id))
        );
    }
}
