//! Maintenance CLI for a ClassNotes database.
//!
//! # Responsibility
//! - Open (and migrate) a database file and run reconciliation passes.
//! - Print a short human-readable summary per command.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use classnotes_core::{
    default_log_level, init_logging, open_db, CatalogService, FolderService, NotificationService,
    ReconcileReport, ReminderRequest, ReminderScheduler, SchedulingError, SettingsService,
    SqliteStore,
};
use std::cell::Cell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "classnotes")]
#[command(about = "Maintain the folder structure of a ClassNotes database", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database file; created and migrated when missing
    #[arg(long, global = true, env = "CLASSNOTES_DB", default_value = "classnotes.db")]
    db: PathBuf,

    /// Directory for rolling log files; logging is off when unset
    #[arg(long, global = true, env = "CLASSNOTES_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true, env = "CLASSNOTES_LOG_LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Register a module
    #[command(name = "add-module")]
    AddModule {
        code: String,
        title: String,
        #[arg(long, default_value = "S1")]
        semester: String,
        #[arg(long)]
        tutorial_group: Option<String>,
    },
    /// File unfiled notes into module folders, then clean up
    Migrate,
    /// Remove malformed and duplicate folders
    Cleanup,
    /// Delete all folders and rebuild them from modules and notes
    Rebuild,
    /// Print the folder tree with note counts
    Tree,
    /// Show the reminders that would be scheduled for upcoming sessions
    Reminders {
        /// Overrides the lead time stored in settings
        #[arg(long)]
        lead_minutes: Option<i64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_ref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let store = SqliteStore::try_new(&conn).context("database is not usable")?;

    match cli.command {
        Command::AddModule {
            code,
            title,
            semester,
            tutorial_group,
        } => {
            let module = CatalogService::new(store).register_module(
                &code,
                &title,
                &semester,
                tutorial_group,
            )?;
            let folder = FolderService::new(store).ensure_folder_for_module(&module)?;
            println!("registered {} in folder \"{}\"", module.code, folder.name);
        }
        Command::Migrate => {
            print_report(
                "migrate",
                FolderService::new(store).migrate_existing_notes_to_folders()?,
            );
        }
        Command::Cleanup => {
            print_report(
                "cleanup",
                FolderService::new(store).cleanup_duplicate_folders()?,
            );
        }
        Command::Rebuild => {
            print_report(
                "rebuild",
                FolderService::new(store).rebuild_folder_structure()?,
            );
        }
        Command::Tree => print_tree(store)?,
        Command::Reminders { lead_minutes } => {
            let lead_minutes = match lead_minutes {
                Some(minutes) => minutes,
                None => SettingsService::new(store).load()?.reminder_lead_minutes,
            };
            let scheduler = ReminderScheduler::new(PrintingNotifier::default());
            let report = scheduler.schedule_reminders(
                &store,
                lead_minutes,
                classnotes_core::model::now_epoch_ms(),
            )?;
            println!(
                "reminders: {} scheduled, {} already past, {} failed",
                report.scheduled, report.skipped_past, report.failed
            );
        }
    }
    Ok(())
}

fn print_report(command: &str, report: ReconcileReport) {
    println!(
        "{command}: {} folders created, {} deleted, {} notes placed, {} to Quick Notes",
        report.folders_created,
        report.folders_deleted,
        report.notes_placed,
        report.notes_to_quick_notes
    );
    if report.is_degraded() {
        println!(
            "warning: {} notes fell back to a main module folder",
            report.main_folder_fallbacks
        );
    }
}

fn print_tree(store: SqliteStore<'_>) -> Result<()> {
    use classnotes_core::repo::folder_repo::FolderRepository;
    use classnotes_core::repo::note_repo::NoteRepository;

    let folders = store.list_folders()?;
    for folder in folders.iter().filter(|folder| !folder.is_sub_folder) {
        let notes = store.list_notes_in_folder(folder.id)?.len();
        println!("{} ({notes})", folder.name);
        for sub_folder in store.list_sub_folders(folder.id)? {
            let notes = store.list_notes_in_folder(sub_folder.id)?.len();
            println!("  {} ({notes})", sub_folder.name);
        }
    }
    let unfiled = store.list_unfiled_notes()?.len();
    if unfiled > 0 {
        println!("unfiled notes: {unfiled}");
    }
    Ok(())
}

/// Prints reminders instead of handing them to a platform service.
#[derive(Default)]
struct PrintingNotifier {
    printed: Cell<usize>,
}

impl NotificationService for PrintingNotifier {
    fn request_permission(&self) -> bool {
        true
    }

    fn remove_all_pending(&self) {
        self.printed.set(0);
    }

    fn schedule(&self, request: &ReminderRequest) -> Result<(), SchedulingError> {
        self.printed.set(self.printed.get() + 1);
        println!(
            "{:>3}. in {:>6} min  {}  {}: {}",
            self.printed.get(),
            request.fire_delay.as_secs() / 60,
            request.id,
            request.title,
            request.body
        );
        Ok(())
    }
}
