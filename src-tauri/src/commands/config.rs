use serde::Serialize;
use tauri::{AppHandle, State};
use tauri_plugin_store::StoreExt;
use tracing::{info, warn};

use crate::config::{parse_base_url, ApiConfig, BASE_URL_PREFERENCE};

pub const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSettings {
    /// The URL this run talks to.
    pub active_base_url: String,
    /// What is saved for the next launch, if anything.
    pub saved_base_url: Option<String>,
}

/// Read a saved preference, if any.
pub fn read_preference(app: &AppHandle, key: &str) -> Result<Option<String>, String> {
    let store = app.store(PREFERENCES_FILE).map_err(|e| {
        warn!("Failed to open store: {}", e);
        e.to_string()
    })?;
    Ok(store.get(key).and_then(|v| v.as_str().map(|s| s.to_string())))
}

#[tauri::command]
pub fn get_preference(app: AppHandle, key: &str) -> Result<Option<String>, String> {
    info!("Getting preference: {}", key);
    read_preference(&app, key)
}

/// Save a preference. A base URL is checked before it is stored and takes
/// effect on the next launch.
#[tauri::command]
pub fn set_preference(app: AppHandle, key: &str, value: &str) -> Result<(), String> {
    info!("Setting preference: {} = {}", key, value);
    let value = value.trim();
    if key == BASE_URL_PREFERENCE && !value.is_empty() {
        parse_base_url(value)?;
    }

    let store = app.store(PREFERENCES_FILE).map_err(|e| {
        warn!("Failed to open store: {}", e);
        e.to_string()
    })?;
    store.set(key, serde_json::json!(value));
    store.save().map_err(|e| {
        warn!("Failed to save store: {}", e);
        e.to_string()
    })
}

#[tauri::command]
pub fn api_settings(app: AppHandle, config: State<'_, ApiConfig>) -> Result<ApiSettings, String> {
    Ok(ApiSettings {
        active_base_url: config.base_url.to_string(),
        saved_base_url: read_preference(&app, BASE_URL_PREFERENCE)?.filter(|v| !v.is_empty()),
    })
}
