use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tauri::State;
use tracing::{debug, info};

use crate::session::upload::{self, UploadSummary};
use crate::session::SessionContext;
use crate::store::{NewFile, UploadSnapshot};
use crate::validation::{validate_file_selection, FileMeta};

/// A picked file as the webview sends it: metadata plus base64 bytes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFile {
    pub name: String,
    pub mime_type: String,
    pub data_base64: String,
}

fn decode(file: StagedFile) -> Result<NewFile, String> {
    let payload = STANDARD
        .decode(file.data_base64.as_bytes())
        .map_err(|e| format!("Could not read {}: {}", file.name, e))?;
    Ok(NewFile {
        meta: FileMeta {
            name: file.name,
            mime_type: file.mime_type,
            size: payload.len() as u64,
        },
        payload,
    })
}

/// Check a selection before its bytes are read.
#[tauri::command]
pub fn check_file_selection(
    state: State<'_, Arc<SessionContext>>,
    files: Vec<FileMeta>,
) -> Result<(), String> {
    validate_file_selection(&files, state.uploads.file_count())
}

#[tauri::command]
pub fn stage_files(
    state: State<'_, Arc<SessionContext>>,
    files: Vec<StagedFile>,
) -> Result<UploadSnapshot, String> {
    debug!("Staging {} files", files.len());
    let files = files
        .into_iter()
        .map(decode)
        .collect::<Result<Vec<_>, _>>()?;
    state.uploads.add_files(files)?;
    Ok(state.uploads.snapshot())
}

#[tauri::command]
pub fn discard_pending_files(
    state: State<'_, Arc<SessionContext>>,
) -> Result<UploadSnapshot, String> {
    let dropped = state.uploads.discard_pending();
    info!("Discarded {} pending files", dropped);
    Ok(state.uploads.snapshot())
}

#[tauri::command]
pub async fn upload_staged_files(
    state: State<'_, Arc<SessionContext>>,
) -> Result<UploadSummary, String> {
    let ctx = Arc::clone(state.inner());
    upload::upload_pending(&ctx).await.map_err(String::from)
}

#[tauri::command]
pub fn upload_state(state: State<'_, Arc<SessionContext>>) -> Result<UploadSnapshot, String> {
    Ok(state.uploads.snapshot())
}
