use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::utils::{clamp_hours, new_id};

/// Which list of a day an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Today,
    OnDeck,
}

impl Section {
    pub fn label(self) -> &'static str {
        match self {
            Section::Today => "Today",
            Section::OnDeck => "On Deck",
        }
    }
}

impl std::str::FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Section::Today),
            "ondeck" | "on-deck" | "on_deck" | "deck" => Ok(Section::OnDeck),
            other => Err(format!("Unknown section '{}' (expected today or on-deck)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedNote {
    pub id: String,
    pub name: String,
    pub content: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub global_notes: String,
    #[serde(default)]
    pub saved_notes: Vec<SavedNote>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_month: Option<u8>, // 1-12
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_month: Option<u8>, // 1-12
}

impl Project {
    pub fn new(name: String) -> Self {
        Self {
            id: new_id(),
            name,
            global_notes: String::new(),
            saved_notes: Vec::new(),
            created_at: Utc::now(),
            archived: false,
            start_month: None,
            end_month: None,
        }
    }

    /// Saved notes in display order (most recently saved first)
    pub fn saved_notes_newest_first(&self) -> Vec<&SavedNote> {
        let mut notes: Vec<&SavedNote> = self.saved_notes.iter().collect();
        notes.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        notes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl TodoItem {
    pub fn new(text: String) -> Self {
        Self {
            id: new_id(),
            text,
            done: false,
        }
    }
}

/// Partial update applied by `update_daily_todo`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoUpdate {
    pub text: Option<String>,
    pub done: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    pub id: String,
    pub project_id: String,
    pub section: Section,
    #[serde(default)]
    pub time_spent: f64, // hours, 0..=24
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub daily_todos: Vec<TodoItem>,
    #[serde(default)]
    pub order: i64, // position within (date, section)
}

impl DayEntry {
    pub fn new(project_id: String, section: Section, order: i64) -> Self {
        Self {
            id: new_id(),
            project_id,
            section,
            time_spent: 0.0,
            done: false,
            daily_todos: Vec::new(),
            order,
        }
    }

    pub fn set_time_spent(&mut self, hours: f64) {
        self.time_spent = clamp_hours(hours);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub date: String, // YYYY-MM-DD
    #[serde(default)]
    pub entries: Vec<DayEntry>,
}

impl Day {
    pub fn new(date: String) -> Self {
        Self {
            date,
            entries: Vec::new(),
        }
    }

    /// Entries of one section sorted by `order` (stable, so ties keep insertion order)
    pub fn section_entries(&self, section: Section) -> Vec<&DayEntry> {
        let mut entries: Vec<&DayEntry> =
            self.entries.iter().filter(|e| e.section == section).collect();
        entries.sort_by_key(|e| e.order);
        entries
    }

    /// Order value for an entry appended to the end of `section`
    pub fn next_order(&self, section: Section) -> i64 {
        let mut count = 0;
        let mut max = -1;
        for entry in self.entries.iter().filter(|e| e.section == section) {
            count += 1;
            max = max.max(entry.order);
        }
        count.max(max + 1)
    }

    pub fn entry(&self, entry_id: &str) -> Option<&DayEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    pub fn entry_mut(&mut self, entry_id: &str) -> Option<&mut DayEntry> {
        self.entries.iter_mut().find(|e| e.id == entry_id)
    }
}

/// The complete persisted snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppData {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub days: BTreeMap<String, Day>,
}

impl AppData {
    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    pub fn entry(&self, date: &str, entry_id: &str) -> Option<&DayEntry> {
        self.days.get(date).and_then(|day| day.entry(entry_id))
    }

    pub fn entry_mut(&mut self, date: &str, entry_id: &str) -> Option<&mut DayEntry> {
        self.days.get_mut(date).and_then(|day| day.entry_mut(entry_id))
    }
}

/// Which entry's notes panel is open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesTarget {
    pub entry_id: String,
    pub project_id: String,
}
