//! Normalizes loaded or imported payloads into the current `AppData` shape.
//!
//! Older snapshots may lack `savedNotes` on projects or `dailyTodos` on
//! entries; both become empty lists. Records are repaired one at a time: a
//! missing id gets a fresh one, a missing or unreadable timestamp becomes the
//! Unix epoch and malformed optional fields fall back to their defaults. Only
//! records that are not objects at all are skipped. Normalization is idempotent.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{AppData, Day, DayEntry, Project, SavedNote, TodoItem};
use crate::utils::{clamp_hours, new_id};

/// Stand-in for timestamps that are missing or unreadable
const EPOCH: &str = "1970-01-01T00:00:00Z";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Payload is not a JSON object")]
    NotAnObject,
    #[error("Payload does not match the data schema: {0}")]
    Shape(#[from] serde_json::Error),
}

/// True when the payload looks like a backup: an object with `projects` or `days`
pub fn has_backup_shape(raw: &Value) -> bool {
    raw.as_object()
        .is_some_and(|obj| obj.contains_key("projects") || obj.contains_key("days"))
}

/// Check the top level: an object whose `projects` is a list and whose
/// `days` is an object keyed by date (either may be missing or null).
pub fn validate(raw: &Value) -> Result<(), MigrationError> {
    let Some(root) = raw.as_object() else {
        return Err(MigrationError::NotAnObject);
    };
    if !matches!(root.get("projects"), None | Some(Value::Null | Value::Array(_))) {
        return Err(shape_error("`projects` must be a list"));
    }
    if !matches!(root.get("days"), None | Some(Value::Null | Value::Object(_))) {
        return Err(shape_error("`days` must be an object keyed by date"));
    }
    Ok(())
}

/// Repair every record and build the typed snapshot.
///
/// Fails only when [`validate`] rejects the top level.
pub fn normalize(raw: Value) -> Result<AppData, MigrationError> {
    validate(&raw)?;
    let Value::Object(mut root) = raw else {
        return Err(MigrationError::NotAnObject);
    };

    let projects = match root.remove("projects") {
        Some(Value::Array(projects)) => projects,
        _ => Vec::new(),
    };
    let days = match root.remove("days") {
        Some(Value::Object(days)) => days,
        _ => Map::new(),
    };

    Ok(AppData {
        projects: projects.into_iter().filter_map(normalize_project).collect(),
        days: days
            .into_iter()
            .map(|(date, day)| {
                let day = normalize_day(&date, day);
                (date, day)
            })
            .collect(),
    })
}

fn normalize_project(value: Value) -> Option<Project> {
    let Value::Object(mut project) = value else {
        log::warn!("Skipping project record that is not an object");
        return None;
    };
    ensure_id(&mut project, "id");
    ensure_string(&mut project, "name");
    ensure_string(&mut project, "globalNotes");
    ensure_timestamp(&mut project, "createdAt");
    ensure_bool(&mut project, "archived");
    keep_month(&mut project, "startMonth");
    keep_month(&mut project, "endMonth");

    let saved_notes: Vec<SavedNote> = take_list(&mut project, "savedNotes")
        .into_iter()
        .filter_map(normalize_saved_note)
        .collect();
    let mut project: Project = from_record(project, "project")?;
    project.saved_notes = saved_notes;
    Some(project)
}

fn normalize_saved_note(value: Value) -> Option<SavedNote> {
    let Value::Object(mut note) = value else {
        return None;
    };
    ensure_id(&mut note, "id");
    ensure_string(&mut note, "name");
    ensure_string(&mut note, "content");
    ensure_timestamp(&mut note, "savedAt");
    from_record(note, "saved note")
}

fn normalize_day(date: &str, value: Value) -> Day {
    let mut day = match value {
        Value::Object(day) => day,
        _ => Map::new(),
    };
    let date = match day.remove("date") {
        Some(Value::String(date)) => date,
        _ => date.to_string(),
    };
    let entries = take_list(&mut day, "entries")
        .into_iter()
        .filter_map(normalize_entry)
        .collect();
    Day { date, entries }
}

fn normalize_entry(value: Value) -> Option<DayEntry> {
    let Value::Object(mut entry) = value else {
        log::warn!("Skipping day entry that is not an object");
        return None;
    };
    ensure_id(&mut entry, "id");
    ensure_string(&mut entry, "projectId");
    if !matches!(entry.get("section").and_then(Value::as_str), Some("today" | "onDeck")) {
        entry.insert("section".to_string(), Value::from("today"));
    }

    let hours = entry.get("timeSpent").and_then(Value::as_f64).unwrap_or(0.0);
    entry.insert("timeSpent".to_string(), Value::from(clamp_hours(hours)));
    ensure_bool(&mut entry, "done");

    let order = match entry.get("order") {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        _ => None,
    };
    match order {
        Some(order) => entry.insert("order".to_string(), Value::from(order)),
        None => entry.remove("order"),
    };

    let todos: Vec<TodoItem> = take_list(&mut entry, "dailyTodos")
        .into_iter()
        .filter_map(normalize_todo)
        .collect();
    let mut entry: DayEntry = from_record(entry, "entry")?;
    entry.daily_todos = todos;
    Some(entry)
}

fn normalize_todo(value: Value) -> Option<TodoItem> {
    let Value::Object(mut todo) = value else {
        return None;
    };
    ensure_id(&mut todo, "id");
    ensure_string(&mut todo, "text");
    ensure_bool(&mut todo, "done");
    from_record(todo, "todo")
}

fn from_record<T: DeserializeOwned>(record: Map<String, Value>, kind: &str) -> Option<T> {
    match serde_json::from_value(Value::Object(record)) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Skipping malformed {} record: {}", kind, e);
            None
        }
    }
}

fn shape_error(msg: &str) -> MigrationError {
    MigrationError::Shape(<serde_json::Error as serde::de::Error>::custom(msg))
}

/// Numeric ids become strings; missing or empty ids are regenerated
fn ensure_id(obj: &mut Map<String, Value>, key: &str) {
    let id = match obj.get(key) {
        Some(Value::String(id)) if !id.is_empty() => return,
        Some(Value::Number(n)) => n.to_string(),
        _ => new_id(),
    };
    obj.insert(key.to_string(), Value::String(id));
}

fn ensure_string(obj: &mut Map<String, Value>, key: &str) {
    let text = match obj.get(key) {
        Some(Value::String(_)) => return,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    obj.insert(key.to_string(), Value::String(text));
}

fn ensure_bool(obj: &mut Map<String, Value>, key: &str) {
    if !obj.get(key).is_some_and(Value::is_boolean) {
        obj.insert(key.to_string(), Value::Bool(false));
    }
}

/// RFC 3339 strings are kept, epoch milliseconds converted, anything else reset
fn ensure_timestamp(obj: &mut Map<String, Value>, key: &str) {
    let stamp = match obj.get(key) {
        Some(Value::String(s)) if s.parse::<DateTime<FixedOffset>>().is_ok() => return,
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| EPOCH.to_string()),
        _ => EPOCH.to_string(),
    };
    obj.insert(key.to_string(), Value::String(stamp));
}

fn keep_month(obj: &mut Map<String, Value>, key: &str) {
    if !obj
        .get(key)
        .and_then(Value::as_u64)
        .is_some_and(|m| (1..=12).contains(&m))
    {
        obj.remove(key);
    }
}

fn take_list(obj: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match obj.remove(key) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}
