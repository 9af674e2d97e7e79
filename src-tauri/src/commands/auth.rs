use std::sync::Arc;

use serde::Serialize;
use tauri::State;
use tracing::info;

use crate::session::auth::{self, LoginOutcome};
use crate::session::SessionContext;
use crate::validation::{self, LoginFormErrors};

/// What the router needs to decide between `/` and `/dashboard`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub authenticated: bool,
    pub username: String,
    pub email: String,
    pub session_id: Option<String>,
}

#[tauri::command]
pub fn validate_login_form(email: String, password: String) -> LoginFormErrors {
    validation::validate_login_form(&email, &password)
}

#[tauri::command]
pub async fn login(
    state: State<'_, Arc<SessionContext>>,
    email: String,
    password: String,
) -> Result<LoginOutcome, String> {
    auth::login(&state, &email, &password)
        .await
        .map_err(String::from)
}

/// Returns the route to show next.
#[tauri::command]
pub async fn logout(state: State<'_, Arc<SessionContext>>) -> Result<String, String> {
    info!("Logout requested");
    Ok(auth::logout(&state).await.to_string())
}

#[tauri::command]
pub fn auth_state(state: State<'_, Arc<SessionContext>>) -> Result<AuthState, String> {
    let snapshot = state.credentials.snapshot();
    Ok(AuthState {
        authenticated: state.has_access_cookie(),
        username: snapshot.username,
        email: snapshot.email,
        session_id: state.current_session_id(),
    })
}
