use serde::Serialize;
use tracing::{info, warn};

use super::SessionContext;
use crate::api::{ApiError, LoginRequest};
use crate::error::DugongError;
use crate::storage::{cookie_lifetime, ACCESS_TOKEN_COOKIE};
use crate::store::AuthSnapshot;
use crate::validation::validate_login_form;

pub const LANDING_ROUTE: &str = "/";
pub const DASHBOARD_ROUTE: &str = "/dashboard";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub route: String,
    pub auth: AuthSnapshot,
}

fn login_failure(err: ApiError) -> DugongError {
    match err {
        ApiError::Status { message, .. } if !message.is_empty() => DugongError::Auth(message),
        other => {
            warn!("Login request failed: {}", other);
            DugongError::Auth("Login failed".to_string())
        }
    }
}

pub async fn login(
    ctx: &SessionContext,
    email: &str,
    password: &str,
) -> Result<LoginOutcome, DugongError> {
    let email = email.trim();
    let errors = validate_login_form(email, password);
    if let Some(message) = errors.first() {
        return Err(DugongError::Validation(message.to_string()));
    }

    let request = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    };
    let response = ctx.api.login(&request).await.map_err(login_failure)?;

    let Some(token) = response.bearer().map(str::to_string) else {
        return Err(DugongError::Auth("No access token received".to_string()));
    };

    ctx.storage
        .set_cookie(ACCESS_TOKEN_COOKIE, &token, cookie_lifetime())
        .map_err(DugongError::Storage)?;
    ctx.credentials.set_token(token);
    ctx.credentials
        .set_username(response.username.clone().unwrap_or_default());
    ctx.credentials.set_email(
        response
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| email.to_string()),
    );

    if let Some(session_id) = response.session_id.filter(|s| !s.is_empty()) {
        // A different session means the old upload state belongs to nobody.
        if ctx
            .uploads
            .session_id()
            .is_some_and(|current| current != session_id)
        {
            ctx.polling.cancel();
            ctx.uploads.clear_store();
            ctx.images.clear_store();
            ctx.publish_results();
        }
        ctx.credentials.set_session_id(session_id);
    }

    info!("Signed in as {}", ctx.credentials.snapshot().email);
    Ok(LoginOutcome {
        route: DASHBOARD_ROUTE.to_string(),
        auth: ctx.credentials.snapshot(),
    })
}

/// Drop every trace of the session locally. Storage failures are logged.
pub fn clear_local_session(ctx: &SessionContext) {
    if let Err(e) = ctx.storage.remove_cookie(ACCESS_TOKEN_COOKIE) {
        warn!("Failed to remove access cookie: {}", e);
    }
    ctx.credentials.clear_store();
    ctx.uploads.clear_store();
    ctx.images.clear_store();
    if let Err(e) = ctx.storage.clear_session_keys() {
        warn!("Failed to clear session storage: {}", e);
    }
    ctx.publish_results();
}

/// Stop polling, ask the backend to drop the session, then clear
/// everything local. Returns the route to show next.
pub async fn logout(ctx: &SessionContext) -> &'static str {
    ctx.polling.cancel();

    if let Some(session_id) = ctx.current_session_id() {
        match ctx.api.cleanup_session(&session_id).await {
            Ok(()) => info!("Backend session {} cleaned up", session_id),
            Err(e) => warn!("Cleanup of session {} failed: {}", session_id, e),
        }
    }

    clear_local_session(ctx);
    info!("Signed out");
    LANDING_ROUTE
}
