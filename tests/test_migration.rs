//! Integration tests for schema normalization, export and import.

mod common;

use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

use common::*;
use track::migrate::normalize;
use track::store::{ImportError, backup_file_name};

fn legacy_payload() -> Value {
    json!({
        "projects": [
            {
                "id": "p1",
                "name": "Legacy",
                "createdAt": "2022-05-01T08:30:00Z",
                "archived": false
            },
            {
                "id": "p2",
                "name": "Seasonal",
                "globalNotes": "",
                "savedNotes": null,
                "createdAt": "2022-05-02T08:30:00Z",
                "archived": true,
                "startMonth": 11,
                "endMonth": null
            }
        ],
        "days": {
            "2022-05-03": {
                "date": "2022-05-03",
                "entries": [
                    { "id": "e1", "projectId": "p1", "section": "today", "timeSpent": 30, "done": true, "order": 0 },
                    { "id": "e2", "projectId": "p2", "section": "onDeck", "timeSpent": 0, "done": false, "order": 0, "dailyTodos": {} }
                ]
            }
        }
    })
}

#[test]
fn test_missing_collections_are_filled() {
    let data = normalize(legacy_payload()).unwrap();

    assert!(data.projects.iter().all(|p| p.saved_notes.is_empty()));
    assert_eq!(data.projects[0].global_notes, "");
    assert_eq!(data.projects[1].start_month, Some(11));
    assert_eq!(data.projects[1].end_month, None);

    let day = &data.days["2022-05-03"];
    assert!(day.entries.iter().all(|e| e.daily_todos.is_empty()));
    assert_eq!(day.entries[0].time_spent, 24.0);
    assert_eq!(day.entries[1].section, Section::OnDeck);
}

#[test]
fn test_normalize_is_idempotent() {
    let once = normalize(legacy_payload()).unwrap();
    let twice = normalize(serde_json::to_value(&once).unwrap()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_day_without_date_takes_its_key() {
    let data = normalize(json!({ "days": { "2024-01-01": { "entries": [] } } })).unwrap();
    assert_eq!(data.days["2024-01-01"].date, "2024-01-01");
}

#[test]
fn test_export_import_round_trip() {
    let (mut store, id) = store_with_project("Round trip");
    let entry = store.add_entry(&id, Section::Today);
    store.update_entry_time(DAY, &entry, 2.75);
    store.add_daily_todo(DAY, &entry, "check");
    store.update_project_global_notes(&id, "some notes");
    store.save_project_note(&id, "snapshot");

    let json = store.export_json().unwrap();
    let mut other = AppStore::in_memory(AppData::default());
    other.import_data(serde_json::from_str(&json).unwrap()).unwrap();

    assert_eq!(other.data(), store.data());
    assert_eq!(other.export_data(), store.export_data());
}

#[test]
fn test_import_rejects_payload_without_projects_or_days() {
    let (mut store, _) = store_with_project("Keep me");
    let before = store.snapshot();

    for payload in [json!({}), json!([]), json!({ "other": true }), json!(42)] {
        let result = store.import_data(payload);
        assert!(matches!(result, Err(ImportError::InvalidBackup)));
    }

    assert!(Arc::ptr_eq(&before, &store.snapshot()));
    assert_eq!(
        ImportError::InvalidBackup.to_string(),
        "Invalid backup file."
    );
}

#[test]
fn test_import_with_bad_shape_leaves_state() {
    let (mut store, id) = store_with_project("Untouched");
    let result = store.import_data(json!({ "projects": "not a list" }));

    assert!(matches!(result, Err(ImportError::Migration(_))));
    assert_eq!(store.data().projects.len(), 1);
    assert!(store.project_by_id(&id).is_some());
}

#[test]
fn test_import_replaces_wholesale() {
    let (mut store, old_id) = store_with_project("Old");
    store.add_entry(&old_id, Section::Today);

    store.import_data(legacy_payload()).unwrap();

    assert!(store.project_by_id(&old_id).is_none());
    assert_eq!(store.data().projects.len(), 2);
    assert!(store.entries_for_date(DAY).is_empty());
    assert_eq!(store.dates_with_entries(), vec!["2022-05-03"]);
}

#[test]
fn test_import_file_and_export_to_dir() {
    let temp = TempDir::new().unwrap();
    let (store, id) = store_with_project("Exported");

    let path = store.export_to_dir(temp.path()).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("track-backup-"));
    assert!(name.ends_with(".json"));

    let mut restored = AppStore::in_memory(AppData::default());
    restored.import_file(&path).unwrap();
    assert_eq!(restored.project_by_id(&id).unwrap().name, "Exported");
}

#[test]
fn test_import_file_errors() {
    let temp = TempDir::new().unwrap();
    let mut store = AppStore::in_memory(AppData::default());

    let missing = temp.path().join("missing.json");
    assert!(matches!(store.import_file(&missing), Err(ImportError::Unreadable(_))));

    let garbage = temp.path().join("garbage.json");
    std::fs::write(&garbage, "{ not json").unwrap();
    assert!(matches!(store.import_file(&garbage), Err(ImportError::Parse(_))));
}

#[test]
fn test_import_repairs_individual_records() {
    let (mut store, _) = store_with_project("Replaced");
    store
        .import_data(json!({ "projects": [{ "id": "x" }, { "id": "y", "name": "Named" }] }))
        .unwrap();

    assert_eq!(store.data().projects.len(), 2);
    assert_eq!(store.project_by_id("x").unwrap().name, "");
    assert_eq!(store.project_by_id("y").unwrap().name, "Named");
}

#[test]
fn test_backup_file_name() {
    assert_eq!(backup_file_name("2024-03-04"), "track-backup-2024-03-04.json");
}
