#![allow(dead_code)]

use serde_json::Value;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub use track::models::{AppData, DayEntry, NotesTarget, Section, TodoUpdate};
pub use track::storage::DataStore;
pub use track::AppStore;

pub const DAY: &str = "2024-03-04";
pub const NEXT_DAY: &str = "2024-03-05";

/// In-memory backend that records every save
#[derive(Default)]
pub struct RecordingStore {
    initial: Option<Value>,
    saves: Mutex<Vec<AppData>>,
    kept: Mutex<Vec<Value>>,
    fail_saves: bool,
    // Saves block until the gate opens
    gated: bool,
    gate_open: Mutex<bool>,
    gate: Condvar,
    save_started: Notify,
}

impl RecordingStore {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_payload(raw: Value) -> Arc<Self> {
        Arc::new(Self {
            initial: Some(raw),
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_saves: true,
            ..Self::default()
        })
    }

    /// Backend whose saves hang until `open_gate` is called
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gated: true,
            ..Self::default()
        })
    }

    pub fn saves(&self) -> Vec<AppData> {
        self.saves.lock().unwrap().clone()
    }

    /// Payloads handed over as unreadable
    pub fn kept(&self) -> Vec<Value> {
        self.kept.lock().unwrap().clone()
    }

    /// Wait until a save has begun
    pub async fn save_started(&self) {
        self.save_started.notified().await;
    }

    pub fn open_gate(&self) {
        *self.gate_open.lock().unwrap() = true;
        self.gate.notify_all();
    }
}

impl DataStore for RecordingStore {
    fn load(&self) -> Option<Value> {
        self.initial.clone()
    }

    fn save(&self, data: &AppData) -> bool {
        self.saves.lock().unwrap().push(data.clone());
        self.save_started.notify_one();
        if self.gated {
            let mut open = self.gate_open.lock().unwrap();
            while !*open {
                open = self.gate.wait(open).unwrap();
            }
        }
        !self.fail_saves
    }

    fn keep_unreadable(&self, raw: &Value) -> bool {
        self.kept.lock().unwrap().push(raw.clone());
        true
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

pub const WINDOW: Duration = Duration::from_millis(150);

/// Store backed by a recording backend, already loaded
pub async fn recording_store(backend: &Arc<RecordingStore>) -> AppStore {
    let backend: Arc<dyn DataStore> = backend.clone();
    AppStore::open(backend, WINDOW).await
}

/// In-memory store positioned on `DAY` with one project
pub fn store_with_project(name: &str) -> (AppStore, String) {
    let mut store = AppStore::in_memory(AppData::default());
    store.set_current_date(DAY);
    let project_id = store.add_project(name);
    (store, project_id)
}

/// Ids of a section in display order
pub fn section_ids(store: &AppStore, date: &str, section: Section) -> Vec<String> {
    store
        .section_entries(date, section)
        .into_iter()
        .map(|e| e.id.clone())
        .collect()
}

/// Order values of a section in display order
pub fn section_orders(store: &AppStore, date: &str, section: Section) -> Vec<i64> {
    store
        .section_entries(date, section)
        .into_iter()
        .map(|e| e.order)
        .collect()
}
