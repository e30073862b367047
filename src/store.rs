//! The authoritative application state.
//!
//! Every mutation runs synchronously against the in-memory snapshot and then
//! hands the new snapshot to the [`PersistScheduler`]. Operations that name an
//! unknown project, date, entry, note or todo leave the state untouched and
//! report `false` / `None`.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::migrate::{self, MigrationError};
use crate::models::{AppData, Day, DayEntry, NotesTarget, Project, SavedNote, Section, TodoItem, TodoUpdate};
use crate::persist::PersistScheduler;
use crate::storage::DataStore;
use crate::utils::{get_current_date_string, new_id};

/// Placeholder shown for entries whose project record no longer exists
pub const DELETED_PROJECT_LABEL: &str = "(Deleted project)";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Could not read file: {0}")]
    Unreadable(#[from] std::io::Error),
    #[error("Could not parse file as JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid backup file.")]
    InvalidBackup,
    #[error("Invalid backup file: {0}")]
    Migration(#[from] MigrationError),
}

pub struct AppStore {
    data: Arc<AppData>,
    current_date: String,
    selected_notes_target: Option<NotesTarget>,
    is_loaded: bool,
    backend: Option<Arc<dyn DataStore>>,
    scheduler: Option<PersistScheduler>,
}

impl AppStore {
    /// Empty, not-yet-loaded store wired to `backend`.
    ///
    /// Must be called inside a tokio runtime; the flush task starts immediately.
    pub fn new(backend: Arc<dyn DataStore>, debounce: Duration) -> Self {
        let scheduler = PersistScheduler::spawn(Arc::clone(&backend), debounce);
        Self {
            data: Arc::new(AppData::default()),
            current_date: get_current_date_string(),
            selected_notes_target: None,
            is_loaded: false,
            backend: Some(backend),
            scheduler: Some(scheduler),
        }
    }

    /// Create a store and load its data from `backend`
    pub async fn open(backend: Arc<dyn DataStore>, debounce: Duration) -> Self {
        let mut store = Self::new(backend, debounce);
        store.initialize().await;
        store
    }

    /// A loaded store with no durable backing, used by tooling and tests
    pub fn in_memory(data: AppData) -> Self {
        Self {
            data: Arc::new(data),
            current_date: get_current_date_string(),
            selected_notes_target: None,
            is_loaded: true,
            backend: None,
            scheduler: None,
        }
    }

    /// Load and normalize persisted data.
    ///
    /// Missing or unusable data leaves the store empty; it never fails. An
    /// unusable payload is handed back to the backend to keep aside, so the
    /// first save cannot destroy it.
    pub async fn initialize(&mut self) {
        if let Some(backend) = self.backend.clone() {
            match tokio::task::spawn_blocking(move || load_snapshot(backend.as_ref())).await {
                Ok(Some(data)) => {
                    log::info!(
                        "Loaded {} projects and {} days",
                        data.projects.len(),
                        data.days.len()
                    );
                    self.data = Arc::new(data);
                }
                Ok(None) => {}
                Err(e) => log::warn!("Load task failed: {}", e),
            }
        }
        self.is_loaded = true;
    }

    /// Flush pending writes and stop the persistence task.
    ///
    /// Dropping the store without calling this discards an unflushed snapshot.
    pub async fn close(mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown().await;
        }
    }

    /// Apply `f` to a private copy of the data and schedule a write
    fn commit<T>(&mut self, f: impl FnOnce(&mut AppData) -> T) -> T {
        let result = f(Arc::make_mut(&mut self.data));
        if let Some(scheduler) = &self.scheduler {
            scheduler.schedule(&self.data);
        }
        result
    }

    fn has_entry(&self, date: &str, entry_id: &str) -> bool {
        self.data.entry(date, entry_id).is_some()
    }

    fn has_todo(&self, date: &str, entry_id: &str, todo_id: &str) -> bool {
        self.data
            .entry(date, entry_id)
            .is_some_and(|e| e.daily_todos.iter().any(|t| t.id == todo_id))
    }

    fn has_saved_note(&self, project_id: &str, note_id: &str) -> bool {
        self.data
            .project(project_id)
            .is_some_and(|p| p.saved_notes.iter().any(|n| n.id == note_id))
    }

    // ── Projects ──

    /// Add a project and return its id; callers trim and reject empty names
    pub fn add_project(&mut self, name: &str) -> String {
        let project = Project::new(name.to_string());
        let id = project.id.clone();
        self.commit(|data| data.projects.push(project));
        id
    }

    pub fn rename_project(&mut self, id: &str, name: &str) -> bool {
        if self.data.project(id).is_none() {
            return false;
        }
        self.commit(|data| {
            if let Some(project) = data.project_mut(id) {
                project.name = name.to_string();
            }
        });
        true
    }

    /// Archive a project. Its record and all entries referencing it are kept.
    pub fn delete_project(&mut self, id: &str) -> bool {
        if self.data.project(id).is_none() {
            return false;
        }
        self.commit(|data| {
            if let Some(project) = data.project_mut(id) {
                project.archived = true;
            }
        });
        true
    }

    /// Set (or clear, with `None`) the recurring month window of a project
    pub fn set_project_active_window(&mut self, id: &str, window: Option<(u8, u8)>) -> bool {
        if self.data.project(id).is_none() {
            return false;
        }
        if let Some((start, end)) = window {
            if !(1..=12).contains(&start) || !(1..=12).contains(&end) {
                return false;
            }
        }
        self.commit(|data| {
            if let Some(project) = data.project_mut(id) {
                project.start_month = window.map(|(start, _)| start);
                project.end_month = window.map(|(_, end)| end);
            }
        });
        true
    }

    pub fn update_project_global_notes(&mut self, id: &str, notes: &str) -> bool {
        if self.data.project(id).is_none() {
            return false;
        }
        self.commit(|data| {
            if let Some(project) = data.project_mut(id) {
                project.global_notes = notes.to_string();
            }
        });
        true
    }

    /// Snapshot the project's current notes under `name`, returning the new note id
    pub fn save_project_note(&mut self, project_id: &str, name: &str) -> Option<String> {
        let project = self.data.project(project_id)?;
        let note = SavedNote {
            id: new_id(),
            name: name.to_string(),
            content: project.global_notes.clone(),
            saved_at: chrono::Utc::now(),
        };
        let note_id = note.id.clone();
        self.commit(|data| {
            if let Some(project) = data.project_mut(project_id) {
                project.saved_notes.push(note);
            }
        });
        Some(note_id)
    }

    /// Replace the project's notes with a saved note's content; the saved note stays
    pub fn load_project_note(&mut self, project_id: &str, note_id: &str) -> bool {
        if !self.has_saved_note(project_id, note_id) {
            return false;
        }
        self.commit(|data| {
            if let Some(project) = data.project_mut(project_id) {
                if let Some(content) = project
                    .saved_notes
                    .iter()
                    .find(|n| n.id == note_id)
                    .map(|n| n.content.clone())
                {
                    project.global_notes = content;
                }
            }
        });
        true
    }

    pub fn rename_project_note(&mut self, project_id: &str, note_id: &str, name: &str) -> bool {
        if !self.has_saved_note(project_id, note_id) {
            return false;
        }
        self.commit(|data| {
            if let Some(note) = data
                .project_mut(project_id)
                .and_then(|p| p.saved_notes.iter_mut().find(|n| n.id == note_id))
            {
                note.name = name.to_string();
            }
        });
        true
    }

    pub fn delete_project_note(&mut self, project_id: &str, note_id: &str) -> bool {
        if !self.has_saved_note(project_id, note_id) {
            return false;
        }
        self.commit(|data| {
            if let Some(project) = data.project_mut(project_id) {
                project.saved_notes.retain(|n| n.id != note_id);
            }
        });
        true
    }

    // ── Navigation and selection (not persisted) ──

    /// Switch days; always closes the notes panel
    pub fn set_current_date(&mut self, date: &str) {
        self.current_date = date.to_string();
        self.selected_notes_target = None;
    }

    pub fn set_selected_notes_target(&mut self, target: Option<NotesTarget>) {
        self.selected_notes_target = target;
    }

    // ── Entries ──

    /// Append an entry for `project_id` to `section` of the current date
    pub fn add_entry(&mut self, project_id: &str, section: Section) -> String {
        let date = self.current_date.clone();
        let order = self
            .data
            .days
            .get(&date)
            .map_or(0, |day| day.next_order(section));
        let entry = DayEntry::new(project_id.to_string(), section, order);
        let id = entry.id.clone();
        self.commit(|data| {
            data.days
                .entry(date.clone())
                .or_insert_with(|| Day::new(date))
                .entries
                .push(entry);
        });
        id
    }

    /// Delete an entry. Remaining `order` values are left as they are.
    pub fn remove_entry(&mut self, date: &str, entry_id: &str) -> bool {
        if !self.has_entry(date, entry_id) {
            return false;
        }
        self.commit(|data| {
            if let Some(day) = data.days.get_mut(date) {
                day.entries.retain(|e| e.id != entry_id);
            }
        });
        if self
            .selected_notes_target
            .as_ref()
            .is_some_and(|t| t.entry_id == entry_id)
        {
            self.selected_notes_target = None;
        }
        true
    }

    /// Set logged hours, clamped to [0, 24] and rounded to two decimals
    pub fn update_entry_time(&mut self, date: &str, entry_id: &str, hours: f64) -> bool {
        if !self.has_entry(date, entry_id) {
            return false;
        }
        self.commit(|data| {
            if let Some(entry) = data.entry_mut(date, entry_id) {
                entry.set_time_spent(hours);
            }
        });
        true
    }

    pub fn update_entry_done(&mut self, date: &str, entry_id: &str, done: bool) -> bool {
        if !self.has_entry(date, entry_id) {
            return false;
        }
        self.commit(|data| {
            if let Some(entry) = data.entry_mut(date, entry_id) {
                entry.done = done;
            }
        });
        true
    }

    pub fn add_daily_todo(&mut self, date: &str, entry_id: &str, text: &str) -> Option<String> {
        if !self.has_entry(date, entry_id) {
            return None;
        }
        let todo = TodoItem::new(text.to_string());
        let todo_id = todo.id.clone();
        self.commit(|data| {
            if let Some(entry) = data.entry_mut(date, entry_id) {
                entry.daily_todos.push(todo);
            }
        });
        Some(todo_id)
    }

    pub fn update_daily_todo(
        &mut self,
        date: &str,
        entry_id: &str,
        todo_id: &str,
        update: TodoUpdate,
    ) -> bool {
        if !self.has_todo(date, entry_id, todo_id) {
            return false;
        }
        self.commit(|data| {
            if let Some(todo) = data
                .entry_mut(date, entry_id)
                .and_then(|e| e.daily_todos.iter_mut().find(|t| t.id == todo_id))
            {
                if let Some(text) = update.text {
                    todo.text = text;
                }
                if let Some(done) = update.done {
                    todo.done = done;
                }
            }
        });
        true
    }

    pub fn remove_daily_todo(&mut self, date: &str, entry_id: &str, todo_id: &str) -> bool {
        if !self.has_todo(date, entry_id, todo_id) {
            return false;
        }
        self.commit(|data| {
            if let Some(entry) = data.entry_mut(date, entry_id) {
                entry.daily_todos.retain(|t| t.id != todo_id);
            }
        });
        true
    }

    /// Move an entry to `new_index` of `to_section` (clamped to the section
    /// length) and renumber the target section. The source section keeps its
    /// order values.
    pub fn move_entry(&mut self, date: &str, entry_id: &str, to_section: Section, new_index: usize) -> bool {
        if !self.has_entry(date, entry_id) {
            return false;
        }
        self.commit(|data| {
            let Some(day) = data.days.get_mut(date) else {
                return;
            };
            let Some(pos) = day.entries.iter().position(|e| e.id == entry_id) else {
                return;
            };
            let mut moved = day.entries.remove(pos);
            moved.section = to_section;

            let (mut target, others): (Vec<DayEntry>, Vec<DayEntry>) = std::mem::take(&mut day.entries)
                .into_iter()
                .partition(|e| e.section == to_section);
            target.sort_by_key(|e| e.order);
            let index = new_index.min(target.len());
            target.insert(index, moved);
            renumber(&mut target);

            day.entries = others;
            day.entries.extend(target);
        });
        true
    }

    /// Renumber `section` to follow `entry_ids`.
    ///
    /// Ids not in the section are ignored; section entries missing from the
    /// list keep their relative order after the listed ones.
    pub fn reorder_entries(&mut self, date: &str, section: Section, entry_ids: &[String]) -> bool {
        if !self.data.days.contains_key(date) {
            return false;
        }
        self.commit(|data| {
            let Some(day) = data.days.get_mut(date) else {
                return;
            };
            let (mut current, others): (Vec<DayEntry>, Vec<DayEntry>) = std::mem::take(&mut day.entries)
                .into_iter()
                .partition(|e| e.section == section);
            current.sort_by_key(|e| e.order);

            let mut reordered = Vec::with_capacity(current.len());
            for id in entry_ids {
                if let Some(pos) = current.iter().position(|e| &e.id == id) {
                    reordered.push(current.remove(pos));
                }
            }
            reordered.extend(current);
            renumber(&mut reordered);

            day.entries = others;
            day.entries.extend(reordered);
        });
        true
    }

    /// Copy the structure of `source_date` onto the current date.
    ///
    /// New entries get fresh ids, zero time and `done = false`, and are
    /// appended per section. With `import_incomplete_todos`, open todos are
    /// cloned with fresh ids; finished todos are never copied. Returns the
    /// number of entries created.
    pub fn populate_from_day(&mut self, source_date: &str, import_incomplete_todos: bool) -> usize {
        let Some(source) = self.data.days.get(source_date) else {
            return 0;
        };
        let date = self.current_date.clone();
        let (mut next_today, mut next_on_deck) = match self.data.days.get(&date) {
            Some(day) => (day.next_order(Section::Today), day.next_order(Section::OnDeck)),
            None => (0, 0),
        };

        let mut sorted: Vec<&DayEntry> = source.entries.iter().collect();
        sorted.sort_by_key(|e| (e.section == Section::OnDeck, e.order));

        let new_entries: Vec<DayEntry> = sorted
            .into_iter()
            .map(|entry| {
                let slot = match entry.section {
                    Section::Today => &mut next_today,
                    Section::OnDeck => &mut next_on_deck,
                };
                let mut copy = DayEntry::new(entry.project_id.clone(), entry.section, *slot);
                *slot += 1;
                if import_incomplete_todos {
                    copy.daily_todos = entry
                        .daily_todos
                        .iter()
                        .filter(|t| !t.done)
                        .map(|t| TodoItem::new(t.text.clone()))
                        .collect();
                }
                copy
            })
            .collect();

        let count = new_entries.len();
        if count == 0 {
            return 0;
        }
        self.commit(|data| {
            data.days
                .entry(date.clone())
                .or_insert_with(|| Day::new(date))
                .entries
                .extend(new_entries);
        });
        count
    }

    // ── Export / import ──

    pub fn export_data(&self) -> AppData {
        self.data.as_ref().clone()
    }

    /// Pretty-printed JSON of the full snapshot
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self.data.as_ref())
    }

    /// Write a backup named `track-backup-<today>.json` into `dir`
    pub fn export_to_dir(&self, dir: &Path) -> Result<PathBuf, std::io::Error> {
        let path = dir.join(backup_file_name(&get_current_date_string()));
        let json = self.export_json().map_err(std::io::Error::other)?;
        std::fs::create_dir_all(dir)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Replace all data with an imported snapshot.
    ///
    /// The payload must be an object with `projects` or `days`; on rejection
    /// the current state is untouched.
    pub fn import_data(&mut self, raw: Value) -> Result<(), ImportError> {
        if !migrate::has_backup_shape(&raw) {
            return Err(ImportError::InvalidBackup);
        }
        let data = migrate::normalize(raw)?;
        self.commit(|current| *current = data);
        Ok(())
    }

    pub fn import_file(&mut self, path: &Path) -> Result<(), ImportError> {
        let contents = std::fs::read_to_string(path)?;
        let raw: Value = serde_json::from_str(&contents)?;
        self.import_data(raw)
    }

    // ── Queries ──

    pub fn data(&self) -> &AppData {
        &self.data
    }

    /// Shared handle to the current snapshot; unchanged by no-op mutations
    pub fn snapshot(&self) -> Arc<AppData> {
        Arc::clone(&self.data)
    }

    pub fn current_date(&self) -> &str {
        &self.current_date
    }

    pub fn selected_notes_target(&self) -> Option<&NotesTarget> {
        self.selected_notes_target.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    /// All entries of a date in storage order
    pub fn entries_for_date(&self, date: &str) -> &[DayEntry] {
        self.data
            .days
            .get(date)
            .map(|day| day.entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn section_entries(&self, date: &str, section: Section) -> Vec<&DayEntry> {
        self.data
            .days
            .get(date)
            .map(|day| day.section_entries(section))
            .unwrap_or_default()
    }

    pub fn today_entries(&self) -> Vec<&DayEntry> {
        self.section_entries(&self.current_date, Section::Today)
    }

    pub fn on_deck_entries(&self) -> Vec<&DayEntry> {
        self.section_entries(&self.current_date, Section::OnDeck)
    }

    /// Dates with at least one entry, most recent first
    pub fn dates_with_entries(&self) -> Vec<&str> {
        self.data
            .days
            .iter()
            .rev()
            .filter(|(_, day)| !day.entries.is_empty())
            .map(|(date, _)| date.as_str())
            .collect()
    }

    pub fn project_by_id(&self, id: &str) -> Option<&Project> {
        self.data.project(id)
    }

    /// Project name for display, or a placeholder for dangling references
    pub fn project_label(&self, id: &str) -> &str {
        self.data
            .project(id)
            .map_or(DELETED_PROJECT_LABEL, |p| p.name.as_str())
    }

    /// Non-archived projects sorted by name, ignoring case
    pub fn active_projects(&self) -> Vec<&Project> {
        let mut projects: Vec<&Project> =
            self.data.projects.iter().filter(|p| !p.archived).collect();
        projects.sort_by_cached_key(|p| p.name.to_lowercase());
        projects
    }

    pub fn total_time_for_date(&self, date: &str) -> f64 {
        self.entries_for_date(date).iter().map(|e| e.time_spent).sum()
    }
}

fn load_snapshot(backend: &dyn DataStore) -> Option<AppData> {
    let raw = backend.load()?;
    if let Err(e) = migrate::validate(&raw) {
        log::warn!("Stored data is unusable, starting empty: {}", e);
        backend.keep_unreadable(&raw);
        return None;
    }
    match migrate::normalize(raw) {
        Ok(data) => Some(data),
        Err(e) => {
            log::warn!("Stored data is unusable, starting empty: {}", e);
            None
        }
    }
}

/// Deterministic export file name for a given date key
pub fn backup_file_name(date: &str) -> String {
    format!("track-backup-{}.json", date)
}

fn renumber(entries: &mut [DayEntry]) {
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.order = index as i64;
    }
}
