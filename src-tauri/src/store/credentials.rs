use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::lock;
use crate::storage::Repository;

/// Who is signed in. Mirrored to the `auth-storage` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl CredentialRecord {
    /// True exactly when a non-empty token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// What the UI sees of the credential record. The token itself stays in
/// the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
    pub username: String,
    pub email: String,
    pub session_id: Option<String>,
    pub is_authenticated: bool,
}

pub struct CredentialStore {
    state: Mutex<CredentialRecord>,
    repo: Arc<dyn Repository<CredentialRecord>>,
}

impl CredentialStore {
    /// Build the store, restoring whatever the repository still holds.
    pub fn new(repo: Arc<dyn Repository<CredentialRecord>>) -> Self {
        let initial = match repo.load() {
            Ok(Some(record)) => {
                info!("Restored credentials for '{}'", record.email);
                record
            }
            Ok(None) => CredentialRecord::default(),
            Err(e) => {
                warn!("Failed to restore credentials: {}", e);
                CredentialRecord::default()
            }
        };

        Self {
            state: Mutex::new(initial),
            repo,
        }
    }

    fn update(&self, apply: impl FnOnce(&mut CredentialRecord)) {
        let snapshot = {
            let mut state = lock(&self.state);
            apply(&mut state);
            state.clone()
        };
        if let Err(e) = self.repo.save(&snapshot) {
            warn!("Failed to persist credentials: {}", e);
        }
    }

    /// Any non-empty token counts as authenticated; its format is not checked.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.update(|s| s.token = Some(token).filter(|t| !t.is_empty()));
    }

    pub fn set_username(&self, username: impl Into<String>) {
        let username = username.into();
        self.update(|s| s.username = username);
    }

    pub fn set_email(&self, email: impl Into<String>) {
        let email = email.into();
        self.update(|s| s.email = email);
    }

    pub fn set_session_id(&self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        self.update(|s| s.session_id = Some(session_id));
    }

    /// Reset every field to the signed-out state.
    pub fn clear_store(&self) {
        *lock(&self.state) = CredentialRecord::default();
        if let Err(e) = self.repo.clear() {
            warn!("Failed to clear persisted credentials: {}", e);
        }
    }

    pub fn record(&self) -> CredentialRecord {
        lock(&self.state).clone()
    }

    pub fn token(&self) -> Option<String> {
        lock(&self.state).token.clone()
    }

    pub fn session_id(&self) -> Option<String> {
        lock(&self.state).session_id.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.state).is_authenticated()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        let state = lock(&self.state);
        AuthSnapshot {
            username: state.username.clone(),
            email: state.email.clone(),
            session_id: state.session_id.clone(),
            is_authenticated: state.is_authenticated(),
        }
    }
}
