use std::sync::Arc;

use serde::Serialize;
use tauri::State;
use tracing::info;

use crate::export;
use crate::session::timer::{self, SessionClock};
use crate::session::{polling, results, SessionContext};
use crate::store::ResultsSnapshot;

/// Everything the dashboard renders on mount.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub session_id: Option<String>,
    pub results: ResultsSnapshot,
    pub is_polling: bool,
    pub clock: SessionClock,
}

#[tauri::command]
pub fn dashboard_state(state: State<'_, Arc<SessionContext>>) -> Result<DashboardState, String> {
    Ok(DashboardState {
        session_id: state.current_session_id(),
        results: state.images.snapshot(),
        is_polling: state.polling.is_polling(),
        clock: timer::current_clock(&state),
    })
}

/// Re-read results for the current session.
#[tauri::command]
pub async fn refresh_results(
    state: State<'_, Arc<SessionContext>>,
) -> Result<ResultsSnapshot, String> {
    if let Some(session_id) = state.current_session_id() {
        polling::refresh_results(&state, &session_id).await?;
    }
    Ok(state.images.snapshot())
}

#[tauri::command]
pub fn next_image(state: State<'_, Arc<SessionContext>>) -> Result<ResultsSnapshot, String> {
    state.images.next();
    Ok(state.images.snapshot())
}

#[tauri::command]
pub fn previous_image(state: State<'_, Arc<SessionContext>>) -> Result<ResultsSnapshot, String> {
    state.images.previous();
    Ok(state.images.snapshot())
}

#[tauri::command]
pub fn select_image(
    state: State<'_, Arc<SessionContext>>,
    index: usize,
) -> Result<ResultsSnapshot, String> {
    state.images.select(index);
    Ok(state.images.snapshot())
}

/// Returns the class the image was moved to.
#[tauri::command]
pub async fn mark_poor_quality(
    state: State<'_, Arc<SessionContext>>,
    image_name: String,
) -> Result<String, String> {
    results::mark_poor_quality(&state, &image_name)
        .await
        .map_err(String::from)
}

/// Returns the path the CSV was saved to.
#[tauri::command]
pub async fn export_results_csv(state: State<'_, Arc<SessionContext>>) -> Result<String, String> {
    let path = export::export_results_csv(&state, None).await?;
    info!("Exported results to {:?}", path);
    Ok(path.display().to_string())
}
