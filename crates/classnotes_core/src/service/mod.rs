//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own unit-of-work boundaries; repositories never commit on their own.

pub mod catalog_service;
pub mod folder_service;
pub mod note_service;
pub mod reminder_service;
pub mod settings_service;
