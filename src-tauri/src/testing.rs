//! Scripted backend and recording notifier for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::api::{
    ApiError, ApiResult, DugongBackend, LoginRequest, LoginResponse, MoveToFalsePositiveRequest,
    PendingBeacons, SessionMetadata, SessionStatus, UploadPayload, UploadResponse,
};
use crate::clock::Clock;
use crate::notifier::{UiEvent, UiNotifier};
use crate::session::SessionContext;
use crate::storage::ClientStorage;

/// What one `session_status` call returns.
#[derive(Debug, Clone, Copy)]
pub enum StatusStep {
    Images(usize),
    /// As many images as calls made so far, this one included.
    Growing,
    Fail,
}

enum LoginReply {
    Ok(LoginResponse),
    Status(u16, String),
    Unreachable,
}

pub struct MockBackend {
    login: Mutex<LoginReply>,
    login_requests: Mutex<Vec<LoginRequest>>,
    status_script: Mutex<VecDeque<StatusStep>>,
    status_fallback: Mutex<StatusStep>,
    status_calls: AtomicUsize,
    uploads: Mutex<Vec<(String, Vec<String>)>>,
    fail_uploads: AtomicBool,
    backfills: Mutex<Vec<String>>,
    fail_backfill: AtomicBool,
    cleanups: Mutex<Vec<String>>,
    fail_cleanup: AtomicBool,
    beacons: Mutex<Vec<(String, String)>>,
    beacon_latency: Mutex<Option<Duration>>,
    beacons_landed: Arc<AtomicUsize>,
    pending_beacons: PendingBeacons,
    moves: Mutex<Vec<MoveToFalsePositiveRequest>>,
    csv: Mutex<Vec<u8>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            login: Mutex::new(LoginReply::Ok(LoginResponse {
                access_token: Some("tok123".into()),
                username: Some("Dana Reef".into()),
                session_id: Some("s1".into()),
                ..Default::default()
            })),
            login_requests: Mutex::new(Vec::new()),
            status_script: Mutex::new(VecDeque::new()),
            status_fallback: Mutex::new(StatusStep::Images(0)),
            status_calls: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
            fail_uploads: AtomicBool::new(false),
            backfills: Mutex::new(Vec::new()),
            fail_backfill: AtomicBool::new(false),
            cleanups: Mutex::new(Vec::new()),
            fail_cleanup: AtomicBool::new(false),
            beacons: Mutex::new(Vec::new()),
            beacon_latency: Mutex::new(None),
            beacons_landed: Arc::new(AtomicUsize::new(0)),
            pending_beacons: PendingBeacons::new(),
            moves: Mutex::new(Vec::new()),
            csv: Mutex::new(b"image_name\n".to_vec()),
        }
    }

    pub fn with_login(self, response: LoginResponse) -> Self {
        *self.login.lock().unwrap() = LoginReply::Ok(response);
        self
    }

    pub fn with_login_error(self, status: u16, message: &str) -> Self {
        *self.login.lock().unwrap() = LoginReply::Status(status, message.to_string());
        self
    }

    pub fn with_login_unreachable(self) -> Self {
        *self.login.lock().unwrap() = LoginReply::Unreachable;
        self
    }

    pub fn script_status(&self, steps: Vec<StatusStep>) {
        self.status_script.lock().unwrap().extend(steps);
    }

    pub fn set_status_fallback(&self, step: StatusStep) {
        *self.status_fallback.lock().unwrap() = step;
    }

    pub fn fail_uploads(&self) {
        self.fail_uploads.store(true, Ordering::SeqCst);
    }

    pub fn fail_backfill(&self) {
        self.fail_backfill.store(true, Ordering::SeqCst);
    }

    pub fn fail_cleanup(&self) {
        self.fail_cleanup.store(true, Ordering::SeqCst);
    }

    /// Beacons become spawned deliveries that land after `latency`.
    pub fn set_beacon_latency(&self, latency: Duration) {
        *self.beacon_latency.lock().unwrap() = Some(latency);
    }

    pub fn beacons_landed(&self) -> usize {
        self.beacons_landed.load(Ordering::SeqCst)
    }

    pub fn set_csv(&self, bytes: Vec<u8>) {
        *self.csv.lock().unwrap() = bytes;
    }

    pub fn login_requests(&self) -> Vec<LoginRequest> {
        self.login_requests.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<(String, Vec<String>)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn backfill_calls(&self) -> Vec<String> {
        self.backfills.lock().unwrap().clone()
    }

    pub fn cleanup_calls(&self) -> Vec<String> {
        self.cleanups.lock().unwrap().clone()
    }

    pub fn beacons(&self) -> Vec<(String, String)> {
        self.beacons.lock().unwrap().clone()
    }

    pub fn moves(&self) -> Vec<MoveToFalsePositiveRequest> {
        self.moves.lock().unwrap().clone()
    }
}

pub fn session_metadata(count: usize) -> SessionMetadata {
    let mut images = Map::new();
    for i in 0..count {
        images.insert(
            format!("img_{}.jpg", i),
            json!({
                "dugongCount": i % 3,
                "motherCalfCount": i % 2,
                "imageClass": "resting",
            }),
        );
    }
    SessionMetadata {
        images,
        last_activity: Some("2026-01-05T10:00:00".to_string()),
    }
}

#[async_trait]
impl DugongBackend for MockBackend {
    async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        self.login_requests.lock().unwrap().push(request.clone());
        match &*self.login.lock().unwrap() {
            LoginReply::Ok(response) => Ok(response.clone()),
            LoginReply::Status(status, message) => Err(ApiError::Status {
                status: *status,
                message: message.clone(),
            }),
            LoginReply::Unreachable => Err(ApiError::Network("connection refused".into())),
        }
    }

    async fn upload_images(
        &self,
        session_id: &str,
        files: Vec<UploadPayload>,
    ) -> ApiResult<UploadResponse> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                message: "disk full".into(),
            });
        }
        let names = files.into_iter().map(|f| f.name).collect();
        self.uploads
            .lock()
            .unwrap()
            .push((session_id.to_string(), names));
        Ok(UploadResponse {
            message: Some("Files uploaded".into()),
            session_id: Some(session_id.to_string()),
        })
    }

    async fn session_status(&self, _session_id: &str) -> ApiResult<SessionStatus> {
        let call = self.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let step = self
            .status_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(*self.status_fallback.lock().unwrap());
        let count = match step {
            StatusStep::Images(n) => n,
            StatusStep::Growing => call,
            StatusStep::Fail => return Err(ApiError::Network("timed out".into())),
        };
        Ok(SessionStatus {
            time_remaining: Some(900),
            metadata: session_metadata(count),
        })
    }

    async fn backfill_detections(&self, session_id: &str) -> ApiResult<()> {
        self.backfills.lock().unwrap().push(session_id.to_string());
        if self.fail_backfill.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 404,
                message: "Session not found".into(),
            });
        }
        Ok(())
    }

    async fn cleanup_session(&self, session_id: &str) -> ApiResult<()> {
        self.cleanups.lock().unwrap().push(session_id.to_string());
        if self.fail_cleanup.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection reset".into()));
        }
        Ok(())
    }

    async fn export_session_csv(&self, _session_id: &str) -> ApiResult<Vec<u8>> {
        Ok(self.csv.lock().unwrap().clone())
    }

    async fn move_to_false_positive(&self, request: &MoveToFalsePositiveRequest) -> ApiResult<()> {
        self.moves.lock().unwrap().push(request.clone());
        Ok(())
    }

    fn image_url(&self, session_id: &str, file_name: &str) -> String {
        format!("http://mock/uploads/{}/images/{}", session_id, file_name)
    }

    fn send_cleanup_beacon(&self, session_id: &str, source: &str) -> bool {
        self.beacons
            .lock()
            .unwrap()
            .push((session_id.to_string(), source.to_string()));
        if let Some(latency) = *self.beacon_latency.lock().unwrap() {
            let landed = self.beacons_landed.clone();
            self.pending_beacons.track(tokio::spawn(async move {
                tokio::time::sleep(latency).await;
                landed.fetch_add(1, Ordering::SeqCst);
            }));
        }
        true
    }

    async fn flush_beacons(&self, within: Duration) -> bool {
        self.pending_beacons.flush(within).await
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&UiEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl UiNotifier for RecordingNotifier {
    fn notify(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A context over in-memory storage, the given backend and clock.
pub fn test_context(
    api: Arc<MockBackend>,
    clock: Arc<dyn Clock>,
) -> (Arc<SessionContext>, Arc<RecordingNotifier>) {
    let storage = Arc::new(ClientStorage::open_in_memory(clock.clone()).unwrap());
    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = SessionContext::new(api, storage, clock, notifier.clone());
    (Arc::new(ctx), notifier)
}
