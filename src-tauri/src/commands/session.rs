use std::sync::Arc;

use tauri::State;
use tracing::info;

use crate::session::timer::{self, SessionClock};
use crate::session::SessionContext;

#[tauri::command]
pub fn session_clock(state: State<'_, Arc<SessionContext>>) -> Result<SessionClock, String> {
    Ok(timer::current_clock(&state))
}

/// The user agreed to lose the session; close for real this time.
#[tauri::command]
pub fn confirm_close(
    window: tauri::Window,
    state: State<'_, Arc<SessionContext>>,
) -> Result<(), String> {
    info!("Close confirmed for window '{}'", window.label());
    state.close_guard.confirm();
    window.close().map_err(|e| e.to_string())
}
