use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::host::{self, HostRequest, HostResponse};
use crate::models::{Project, Section, TodoUpdate};
use crate::report::{month_name, seasonal_projects, weekly_report};
use crate::storage::FileStore;
use crate::store::{AppStore, ImportError};
use crate::utils::{parse_date, Profile};

#[derive(Parser)]
#[command(name = "track")]
#[command(about = "Track - daily time tracking for your projects")]
#[command(version)]
pub struct Cli {
    /// Use development mode (uses separate dev config/data)
    #[arg(long)]
    pub dev: bool,

    /// Use the embedded database instead of the data file
    #[arg(long)]
    pub sandboxed: bool,

    /// Day to work on (YYYY-MM-DD), defaults to today
    #[arg(long, global = true)]
    pub date: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the Today and On Deck lists (default if no subcommand)
    Show,
    /// List projects
    Projects {
        /// Include archived projects
        #[arg(long)]
        all: bool,
    },
    /// Create a project
    AddProject { name: String },
    /// Rename a project
    RenameProject { project: String, name: String },
    /// Archive a project (its history is kept)
    ArchiveProject { project: String },
    /// Set or clear the months a project is in season
    Season {
        project: String,
        /// First month (1-12)
        #[arg(long, requires = "end")]
        start: Option<u8>,
        /// Last month (1-12)
        #[arg(long, requires = "start")]
        end: Option<u8>,
    },
    /// Add a project to the day
    Add {
        project: String,
        /// Put it on deck instead of today
        #[arg(long)]
        on_deck: bool,
    },
    /// Remove an entry from the day
    Remove { entry: String },
    /// Set the hours logged on an entry
    Log { entry: String, hours: f64 },
    /// Mark an entry done
    Done {
        entry: String,
        /// Mark as not done instead
        #[arg(long)]
        undo: bool,
    },
    /// Add a todo to an entry
    Todo { entry: String, text: String },
    /// Tick off a todo on an entry
    Check {
        entry: String,
        todo: String,
        /// Uncheck instead
        #[arg(long)]
        undo: bool,
    },
    /// Move an entry to a section and position
    Move {
        entry: String,
        section: Section,
        index: usize,
    },
    /// Copy another day's entries onto this day
    Populate {
        source: String,
        /// Carry over unfinished todos
        #[arg(long)]
        todos: bool,
    },
    /// Replace a project's notes
    Note { project: String, text: String },
    /// Save a project's current notes under a name
    SaveNote { project: String, name: String },
    /// Weekly hours per project
    Report,
    /// Write a backup file
    Export {
        /// Target directory (defaults to the current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Replace all data with a backup file
    Import { file: PathBuf },
    /// Print where the data file lives
    DataPath,
    /// Update UI preferences
    Prefs {
        #[arg(long)]
        toggle_dark_mode: bool,
        #[arg(long)]
        sidebar_width: Option<u16>,
        #[arg(long)]
        notes_height: Option<u16>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("No project matches '{0}'")]
    UnknownProject(String),
    #[error("No entry on {date} matches '{entry}'")]
    UnknownEntry { date: String, entry: String },
    #[error("No todo matches '{0}'")]
    UnknownTodo(String),
    #[error("{0}")]
    ImportError(#[from] ImportError),
    #[error("Export failed: {0}")]
    ExportError(#[from] std::io::Error),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Validate a --date argument and return it as a day key
pub fn resolve_date(date: Option<&str>) -> Result<Option<String>, CliError> {
    match date {
        Some(date_str) => {
            parse_date(date_str)
                .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", date_str, e)))?;
            Ok(Some(date_str.to_string()))
        }
        None => Ok(None),
    }
}

/// Find a project by id or by case-insensitive name
fn resolve_project(store: &AppStore, reference: &str) -> Result<String, CliError> {
    if let Some(project) = store.project_by_id(reference) {
        return Ok(project.id.clone());
    }
    let wanted = reference.trim().to_lowercase();
    store
        .data()
        .projects
        .iter()
        .filter(|p| p.name.to_lowercase() == wanted)
        // Prefer an active project over an archived one with the same name
        .min_by_key(|p| p.archived)
        .map(|p| p.id.clone())
        .ok_or_else(|| CliError::UnknownProject(reference.to_string()))
}

/// Find an entry on the current date by id or unique id prefix
fn resolve_entry(store: &AppStore, reference: &str) -> Result<String, CliError> {
    let date = store.current_date();
    let matches: Vec<&str> = store
        .entries_for_date(date)
        .iter()
        .map(|e| e.id.as_str())
        .filter(|id| *id == reference || id.starts_with(reference))
        .collect();
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        _ if matches.contains(&reference) => Ok(reference.to_string()),
        _ => Err(CliError::UnknownEntry {
            date: date.to_string(),
            entry: reference.to_string(),
        }),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Handle the show command
pub fn handle_show(store: &AppStore) {
    let date = store.current_date();
    println!("{}  ({} hrs)", date, store.total_time_for_date(date));

    if let Ok(parsed) = parse_date(date) {
        use chrono::Datelike;
        let seasonal = seasonal_projects(&store.data().projects, parsed.month() as u8);
        if !seasonal.active.is_empty() {
            println!("In season: {}", seasonal.active.join(", "));
        }
        if !seasonal.upcoming.is_empty() {
            let upcoming: Vec<String> = seasonal
                .upcoming
                .iter()
                .map(|(name, start)| format!("{} (Begins in {})", name, month_name(*start)))
                .collect();
            println!("Coming up: {}", upcoming.join(", "));
        }
    }

    for (section, entries) in [
        (Section::Today, store.today_entries()),
        (Section::OnDeck, store.on_deck_entries()),
    ] {
        println!();
        println!("{}", section.label());
        if entries.is_empty() {
            println!("  (empty)");
        }
        for entry in entries {
            println!(
                "  [{}] {}  {}  {} hrs",
                if entry.done { "x" } else { " " },
                short_id(&entry.id),
                store.project_label(&entry.project_id),
                entry.time_spent
            );
            for todo in &entry.daily_todos {
                println!(
                    "      - [{}] {}  {}",
                    if todo.done { "x" } else { " " },
                    short_id(&todo.id),
                    todo.text
                );
            }
        }
    }
}

/// Handle the projects command
pub fn handle_projects(store: &AppStore, all: bool) {
    let projects: Vec<&Project> = if all {
        store.data().projects.iter().collect()
    } else {
        store.active_projects()
    };
    for project in projects {
        let mut line = format!("{}  {}", short_id(&project.id), project.name);
        if let (Some(start), Some(end)) = (project.start_month, project.end_month) {
            line.push_str(&format!("  ({} - {})", month_name(start), month_name(end)));
        }
        if project.archived {
            line.push_str("  [archived]");
        }
        println!("{}", line);
    }
}

/// Handle the add-project command
pub fn handle_add_project(store: &mut AppStore, name: &str) -> Result<(), CliError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidValue("project name cannot be empty".to_string()));
    }
    let id = store.add_project(name);
    println!("Project created successfully (ID: {})", id);
    Ok(())
}

pub fn handle_rename_project(store: &mut AppStore, project: &str, name: &str) -> Result<(), CliError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidValue("project name cannot be empty".to_string()));
    }
    let id = resolve_project(store, project)?;
    store.rename_project(&id, name);
    Ok(())
}

pub fn handle_archive_project(store: &mut AppStore, project: &str) -> Result<(), CliError> {
    let id = resolve_project(store, project)?;
    store.delete_project(&id);
    println!("Project archived");
    Ok(())
}

pub fn handle_season(
    store: &mut AppStore,
    project: &str,
    start: Option<u8>,
    end: Option<u8>,
) -> Result<(), CliError> {
    let id = resolve_project(store, project)?;
    let window = start.zip(end);
    if !store.set_project_active_window(&id, window) {
        return Err(CliError::InvalidValue("months must be between 1 and 12".to_string()));
    }
    Ok(())
}

/// Handle the add command
pub fn handle_add_entry(store: &mut AppStore, project: &str, on_deck: bool) -> Result<(), CliError> {
    let project_id = resolve_project(store, project)?;
    let section = if on_deck { Section::OnDeck } else { Section::Today };
    let id = store.add_entry(&project_id, section);
    println!("Added to {} (entry {})", section.label(), short_id(&id));
    Ok(())
}

pub fn handle_remove_entry(store: &mut AppStore, entry: &str) -> Result<(), CliError> {
    let entry_id = resolve_entry(store, entry)?;
    let date = store.current_date().to_string();
    store.remove_entry(&date, &entry_id);
    Ok(())
}

pub fn handle_log(store: &mut AppStore, entry: &str, hours: f64) -> Result<(), CliError> {
    let entry_id = resolve_entry(store, entry)?;
    let date = store.current_date().to_string();
    store.update_entry_time(&date, &entry_id, hours);
    Ok(())
}

pub fn handle_done(store: &mut AppStore, entry: &str, done: bool) -> Result<(), CliError> {
    let entry_id = resolve_entry(store, entry)?;
    let date = store.current_date().to_string();
    store.update_entry_done(&date, &entry_id, done);
    Ok(())
}

pub fn handle_add_todo(store: &mut AppStore, entry: &str, text: &str) -> Result<(), CliError> {
    let entry_id = resolve_entry(store, entry)?;
    let date = store.current_date().to_string();
    store.add_daily_todo(&date, &entry_id, text.trim());
    Ok(())
}

pub fn handle_check(store: &mut AppStore, entry: &str, todo: &str, done: bool) -> Result<(), CliError> {
    let entry_id = resolve_entry(store, entry)?;
    let date = store.current_date().to_string();
    let todo_id = store
        .entries_for_date(&date)
        .iter()
        .find(|e| e.id == entry_id)
        .and_then(|e| e.daily_todos.iter().find(|t| t.id == todo || t.id.starts_with(todo)))
        .map(|t| t.id.clone())
        .ok_or_else(|| CliError::UnknownTodo(todo.to_string()))?;
    let update = TodoUpdate {
        text: None,
        done: Some(done),
    };
    store.update_daily_todo(&date, &entry_id, &todo_id, update);
    Ok(())
}

pub fn handle_move(store: &mut AppStore, entry: &str, section: Section, index: usize) -> Result<(), CliError> {
    let entry_id = resolve_entry(store, entry)?;
    let date = store.current_date().to_string();
    store.move_entry(&date, &entry_id, section, index);
    Ok(())
}

/// Handle the populate command
pub fn handle_populate(store: &mut AppStore, source: &str, todos: bool) -> Result<(), CliError> {
    let source = resolve_date(Some(source))?.unwrap_or_default();
    let count = store.populate_from_day(&source, todos);
    println!("Copied {} entries from {}", count, source);
    Ok(())
}

pub fn handle_note(store: &mut AppStore, project: &str, text: &str) -> Result<(), CliError> {
    let id = resolve_project(store, project)?;
    store.update_project_global_notes(&id, text);
    Ok(())
}

pub fn handle_save_note(store: &mut AppStore, project: &str, name: &str) -> Result<(), CliError> {
    let id = resolve_project(store, project)?;
    store.save_project_note(&id, name.trim());
    println!("Notes saved as '{}'", name.trim());
    Ok(())
}

/// Handle the report command
pub fn handle_report(store: &AppStore) -> Result<(), CliError> {
    let anchor = parse_date(store.current_date())
        .map_err(|e| CliError::DateParseError(e.to_string()))?;
    let report = weekly_report(store.data(), anchor);

    println!(
        "Week of {} - {}",
        report.week_start.format("%b %-d"),
        report.week_end().format("%b %-d, %Y")
    );
    let header: Vec<String> = report.days().iter().map(|d| d.format("%a %-m/%-d").to_string()).collect();
    println!("{:<24} {}  Total", "Project", header.join("  "));
    for row in &report.rows {
        let cells: Vec<String> = row.daily_totals.iter().map(|t| format!("{:>7}", t)).collect();
        println!("{:<24} {}  {}", row.name, cells.join("  "), row.total);
    }
    let totals: Vec<String> = report.column_totals.iter().map(|t| format!("{:>7}", t)).collect();
    println!("{:<24} {}  {}", "TOTAL", totals.join("  "), report.grand_total);
    Ok(())
}

pub fn handle_export(store: &AppStore, dir: Option<&Path>) -> Result<(), CliError> {
    let dir = dir.unwrap_or_else(|| Path::new("."));
    let path = store.export_to_dir(dir)?;
    println!("Backup written to {}", path.display());
    Ok(())
}

pub fn handle_import(store: &mut AppStore, file: &Path) -> Result<(), CliError> {
    store.import_file(file)?;
    let data = store.data();
    println!(
        "Imported {} projects and {} days",
        data.projects.len(),
        data.days.len()
    );
    Ok(())
}

/// Handle the data-path command
pub fn handle_data_path(config: &Config) {
    let store = FileStore::new(&config.get_data_dir());
    if let HostResponse::DataPath(path) = host::dispatch(&store, HostRequest::GetDataPath) {
        println!("{}", path);
    }
}

/// Handle the prefs command
pub fn handle_prefs(
    config: &mut Config,
    profile: Profile,
    toggle_dark_mode: bool,
    sidebar_width: Option<u16>,
    notes_height: Option<u16>,
) -> Result<(), CliError> {
    let prefs = &mut config.preferences;
    if toggle_dark_mode {
        prefs.toggle_dark_mode();
    }
    if let Some(width) = sidebar_width {
        prefs.set_sidebar_width(width);
    }
    if let Some(height) = notes_height {
        prefs.set_notes_height(height);
    }
    println!(
        "dark_mode = {}, sidebar_width = {}, notes_height = {}",
        prefs.dark_mode, prefs.sidebar_width, prefs.notes_height
    );
    config.save_with_profile(profile)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppData;

    fn store_on(date: &str) -> AppStore {
        let mut store = AppStore::in_memory(AppData::default());
        store.set_current_date(date);
        store
    }

    #[test]
    fn resolve_date_validates_format() {
        assert_eq!(resolve_date(None).unwrap(), None);
        assert_eq!(resolve_date(Some("2024-03-04")).unwrap().as_deref(), Some("2024-03-04"));
        assert!(matches!(resolve_date(Some("03/04/2024")), Err(CliError::DateParseError(_))));
    }

    #[test]
    fn projects_resolve_by_id_or_name() {
        let mut store = store_on("2024-03-04");
        let old = store.add_project("Garden");
        store.delete_project(&old);
        let current = store.add_project("garden");

        assert_eq!(resolve_project(&store, &old).unwrap(), old);
        assert_eq!(resolve_project(&store, "GARDEN").unwrap(), current);
        assert!(matches!(resolve_project(&store, "nope"), Err(CliError::UnknownProject(_))));
    }

    #[test]
    fn entries_resolve_by_unique_prefix() {
        let mut store = store_on("2024-03-04");
        let project = store.add_project("Run");
        let entry = store.add_entry(&project, Section::Today);

        assert_eq!(resolve_entry(&store, short_id(&entry)).unwrap(), entry);
        assert_eq!(resolve_entry(&store, &entry).unwrap(), entry);
        assert!(resolve_entry(&store, "zzzz").is_err());

        // Ambiguous prefix
        store.add_entry(&project, Section::Today);
        assert!(resolve_entry(&store, "").is_err());
    }

    #[test]
    fn add_project_rejects_blank_names() {
        let mut store = store_on("2024-03-04");
        assert!(handle_add_project(&mut store, "   ").is_err());
        assert!(store.data().projects.is_empty());
    }

    #[test]
    fn parses_move_with_section_names() {
        let cli = Cli::try_parse_from(["track", "--date", "2024-03-04", "move", "abc", "on-deck", "2"]).unwrap();
        match cli.command {
            Some(Commands::Move { entry, section, index }) => {
                assert_eq!(entry, "abc");
                assert_eq!(section, Section::OnDeck);
                assert_eq!(index, 2);
            }
            _ => panic!("expected move command"),
        }
        assert_eq!(cli.date.as_deref(), Some("2024-03-04"));
    }
}
