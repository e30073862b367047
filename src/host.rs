//! Messages exchanged with the privileged host process in host-file mode.
//!
//! The shell exposes three channels (`load-data`, `save-data`,
//! `get-data-path`); requests and responses travel as tagged JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::AppData;
use crate::storage::FileStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "kebab-case")]
pub enum HostRequest {
    LoadData,
    SaveData { data: AppData },
    GetDataPath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "result", rename_all = "kebab-case")]
pub enum HostResponse {
    #[serde(rename = "load-data")]
    Data(Value),
    #[serde(rename = "save-data")]
    Saved(bool),
    #[serde(rename = "get-data-path")]
    DataPath(String),
}

/// Serve one request against the data file
pub fn dispatch(store: &FileStore, request: HostRequest) -> HostResponse {
    match request {
        HostRequest::LoadData => HostResponse::Data(store.load_data()),
        HostRequest::SaveData { data } => HostResponse::Saved(store.save_data(&data)),
        HostRequest::GetDataPath => {
            HostResponse::DataPath(store.data_path().display().to_string())
        }
    }
}
