pub mod cli;
pub mod config;
pub mod host;
pub mod migrate;
pub mod models;
pub mod persist;
pub mod report;
pub mod storage;
pub mod store;
pub mod utils;

pub use config::{Config, StorageMode};
pub use models::{AppData, Day, DayEntry, Project, SavedNote, Section, TodoItem};
pub use store::AppStore;
pub use utils::Profile;
