//! Session lifecycle: sign-in, the upload-and-poll cycle, the countdown,
//! and cleanup when the session ends or the app closes.

pub mod auth;
pub mod cleanup;
pub mod polling;
pub mod results;
pub mod timer;
pub mod upload;

use std::sync::Arc;

use crate::api::DugongBackend;
use crate::clock::Clock;
use crate::notifier::{UiEvent, UiNotifier};
use crate::storage::{
    staleness_cutoff, ClientStorage, StaleAfter, ACCESS_TOKEN_COOKIE, AUTH_STORAGE_KEY,
    UPLOAD_STORAGE_KEY,
};
use crate::store::{CredentialStore, ImageResultStore, UploadSessionStore};

use cleanup::CloseGuard;
use polling::{PollPolicy, PollingController};

/// Everything a command or background task needs, shared as
/// `Arc<SessionContext>` in Tauri state.
pub struct SessionContext {
    pub api: Arc<dyn DugongBackend>,
    pub storage: Arc<ClientStorage>,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn UiNotifier>,
    pub credentials: CredentialStore,
    pub uploads: UploadSessionStore,
    pub images: ImageResultStore,
    pub polling: PollingController,
    pub poll_policy: PollPolicy,
    pub close_guard: CloseGuard,
}

impl SessionContext {
    /// Wire the stores to their storage keys and restore what is still
    /// fresh.
    pub fn new(
        api: Arc<dyn DugongBackend>,
        storage: Arc<ClientStorage>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn UiNotifier>,
    ) -> Self {
        let credentials = CredentialStore::new(Arc::new(StaleAfter::new(
            storage.clone(),
            AUTH_STORAGE_KEY,
            staleness_cutoff(),
        )));
        let uploads = UploadSessionStore::new(Arc::new(StaleAfter::new(
            storage.clone(),
            UPLOAD_STORAGE_KEY,
            staleness_cutoff(),
        )));

        Self {
            api,
            storage,
            clock,
            notifier,
            credentials,
            uploads,
            images: ImageResultStore::new(),
            polling: PollingController::new(),
            poll_policy: PollPolicy::default(),
            close_guard: CloseGuard::new(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// The upload session if one has started, otherwise the one issued at
    /// sign-in.
    pub fn current_session_id(&self) -> Option<String> {
        self.uploads
            .session_id()
            .or_else(|| self.credentials.session_id())
    }

    /// Routing check: a live `access_token` cookie.
    pub fn has_access_cookie(&self) -> bool {
        match self.storage.get_cookie(ACCESS_TOKEN_COOKIE) {
            Ok(cookie) => cookie.is_some(),
            Err(e) => {
                tracing::warn!("Cookie lookup failed: {}", e);
                false
            }
        }
    }

    pub fn publish_results(&self) {
        self.notifier
            .notify(UiEvent::ResultsUpdated(self.images.snapshot()));
    }
}
