use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::lock;
use crate::api::UploadPayload;
use crate::error::DugongError;
use crate::storage::Repository;
use crate::validation::{validate_file_selection, FileMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

/// A file handed over by the UI, bytes included.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub meta: FileMeta,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
struct UploadFile {
    id: String,
    meta: FileMeta,
    payload: Arc<[u8]>,
    progress: u8,
    status: UploadStatus,
    url: Option<String>,
    error: Option<String>,
}

impl UploadFile {
    fn view(&self) -> UploadFileView {
        UploadFileView {
            id: self.id.clone(),
            name: self.meta.name.clone(),
            size: self.meta.size,
            progress: self.progress,
            status: self.status,
            url: self.url.clone(),
            error: self.error.clone(),
        }
    }
}

/// A staged file as the UI lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileView {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub progress: u8,
    pub status: UploadStatus,
    pub url: Option<String>,
    pub error: Option<String>,
}

/// The part of the upload session that survives a restart. File payloads
/// are never written out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedUpload {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub session_start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSnapshot {
    pub session_id: Option<String>,
    pub session_start_time: Option<DateTime<Utc>>,
    pub files: Vec<UploadFileView>,
}

#[derive(Default)]
struct UploadState {
    session_id: Option<String>,
    session_start_time: Option<DateTime<Utc>>,
    files: Vec<UploadFile>,
}

impl UploadState {
    fn persisted(&self) -> PersistedUpload {
        PersistedUpload {
            session_id: self.session_id.clone(),
            session_start_time: self.session_start_time,
        }
    }

    fn file_mut(&mut self, id: &str) -> Option<&mut UploadFile> {
        self.files.iter_mut().find(|f| f.id == id)
    }
}

/// The current upload session: its id, when its 15-minute window began and
/// the files staged in it.
pub struct UploadSessionStore {
    state: Mutex<UploadState>,
    repo: Arc<dyn Repository<PersistedUpload>>,
}

impl UploadSessionStore {
    pub fn new(repo: Arc<dyn Repository<PersistedUpload>>) -> Self {
        let mut state = UploadState::default();
        match repo.load() {
            Ok(Some(saved)) => {
                // A start time without a session id is meaningless.
                state.session_start_time = saved
                    .session_start_time
                    .filter(|_| saved.session_id.is_some());
                state.session_id = saved.session_id;
                debug!("Restored upload session {:?}", state.session_id);
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to restore upload session: {}", e),
        }

        Self {
            state: Mutex::new(state),
            repo,
        }
    }

    fn persist(&self, value: PersistedUpload) {
        if let Err(e) = self.repo.save(&value) {
            warn!("Failed to persist upload session: {}", e);
        }
    }

    /// Validate and stage a selection. Nothing is staged if any file fails.
    /// Returns the ids given to the new files.
    pub fn add_files(&self, files: Vec<NewFile>) -> Result<Vec<String>, DugongError> {
        let mut state = lock(&self.state);

        let metas: Vec<FileMeta> = files.iter().map(|f| f.meta.clone()).collect();
        validate_file_selection(&metas, state.files.len()).map_err(DugongError::Validation)?;

        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            let id = Uuid::new_v4().to_string();
            ids.push(id.clone());
            state.files.push(UploadFile {
                id,
                meta: file.meta,
                payload: Arc::from(file.payload),
                progress: 0,
                status: UploadStatus::Pending,
                url: None,
                error: None,
            });
        }
        info!("Staged {} files ({} total)", ids.len(), state.files.len());
        Ok(ids)
    }

    /// Assign the session. Switching to a different id drops the old
    /// start time; the new session has not started yet.
    pub fn set_session_id(&self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        let persisted = {
            let mut state = lock(&self.state);
            if state.session_id.as_deref() != Some(session_id.as_str()) {
                state.session_start_time = None;
            }
            state.session_id = Some(session_id);
            state.persisted()
        };
        self.persist(persisted);
    }

    /// Start the 15-minute window at `now`. Requires a session id.
    pub fn reset_session_timer(&self, now: DateTime<Utc>) -> Result<(), DugongError> {
        let persisted = {
            let mut state = lock(&self.state);
            if state.session_id.is_none() {
                return Err(DugongError::Session(
                    "Cannot start the session timer without a session".to_string(),
                ));
            }
            state.session_start_time = Some(now);
            state.persisted()
        };
        info!("Session timer started at {}", now);
        self.persist(persisted);
        Ok(())
    }

    /// Clamp to 100. Returns false for an unknown id.
    pub fn update_file_progress(&self, id: &str, progress: u8) -> bool {
        let mut state = lock(&self.state);
        match state.file_mut(id) {
            Some(file) => {
                file.progress = progress.min(100);
                true
            }
            None => false,
        }
    }

    pub fn update_file_status(
        &self,
        id: &str,
        status: UploadStatus,
        url: Option<String>,
        error: Option<String>,
    ) -> bool {
        let mut state = lock(&self.state);
        let Some(file) = state.file_mut(id) else {
            return false;
        };
        file.status = status;
        if status == UploadStatus::Success {
            file.progress = 100;
        }
        if url.is_some() {
            file.url = url;
        }
        file.error = error;
        true
    }

    pub fn clear_files(&self) {
        lock(&self.state).files.clear();
    }

    /// Drop files that were staged but never sent.
    pub fn discard_pending(&self) -> usize {
        let mut state = lock(&self.state);
        let before = state.files.len();
        state.files.retain(|f| f.status != UploadStatus::Pending);
        before - state.files.len()
    }

    pub fn get_file_by_id(&self, id: &str) -> Option<UploadFileView> {
        lock(&self.state)
            .files
            .iter()
            .find(|f| f.id == id)
            .map(UploadFile::view)
    }

    /// Ids and request bodies of every pending file, in staging order.
    pub fn pending_payloads(&self) -> Vec<(String, UploadPayload)> {
        lock(&self.state)
            .files
            .iter()
            .filter(|f| f.status == UploadStatus::Pending)
            .map(|f| {
                (
                    f.id.clone(),
                    UploadPayload {
                        name: f.meta.name.clone(),
                        mime_type: f.meta.mime_type.clone(),
                        bytes: f.payload.to_vec(),
                    },
                )
            })
            .collect()
    }

    pub fn has_files(&self) -> bool {
        !lock(&self.state).files.is_empty()
    }

    pub fn file_count(&self) -> usize {
        lock(&self.state).files.len()
    }

    pub fn session_id(&self) -> Option<String> {
        lock(&self.state).session_id.clone()
    }

    pub fn session_start_time(&self) -> Option<DateTime<Utc>> {
        lock(&self.state).session_start_time
    }

    /// Null the session, its start time and every staged file.
    pub fn clear_store(&self) {
        *lock(&self.state) = UploadState::default();
        if let Err(e) = self.repo.clear() {
            warn!("Failed to clear persisted upload session: {}", e);
        }
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        let state = lock(&self.state);
        UploadSnapshot {
            session_id: state.session_id.clone(),
            session_start_time: state.session_start_time,
            files: state.files.iter().map(UploadFile::view).collect(),
        }
    }
}
