//! Access to the dugong detection REST API.
//!
//! Everything the client needs from the backend goes through the
//! [`DugongBackend`] trait so the session controllers can be driven by a
//! scripted backend in tests. [`HttpBackend`] is the reqwest implementation.

pub mod beacon;
pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use beacon::PendingBeacons;
pub use client::HttpBackend;
pub use types::{
    LoginRequest, LoginResponse, MoveToFalsePositiveRequest, SessionMetadata, SessionStatus,
    UploadPayload, UploadResponse,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    Request(String),
}

impl ApiError {
    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

impl From<ApiError> for String {
    fn from(err: ApiError) -> Self {
        err.to_string()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Backend beacon source labels.
pub mod beacon_source {
    pub const WINDOW_CLOSE: &str = "window_close";
    pub const APP_EXIT: &str = "app_exit";
}

#[async_trait]
pub trait DugongBackend: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse>;

    async fn upload_images(
        &self,
        session_id: &str,
        files: Vec<UploadPayload>,
    ) -> ApiResult<UploadResponse>;

    async fn session_status(&self, session_id: &str) -> ApiResult<SessionStatus>;

    async fn backfill_detections(&self, session_id: &str) -> ApiResult<()>;

    async fn cleanup_session(&self, session_id: &str) -> ApiResult<()>;

    async fn export_session_csv(&self, session_id: &str) -> ApiResult<Vec<u8>>;

    async fn move_to_false_positive(&self, request: &MoveToFalsePositiveRequest) -> ApiResult<()>;

    /// URL the UI loads an uploaded image from.
    fn image_url(&self, session_id: &str, file_name: &str) -> String;

    /// Queue a cleanup notification and return immediately.
    ///
    /// Never fails loudly; the return value only says whether the request
    /// was handed to the runtime. [`DugongBackend::flush_beacons`] waits on it.
    fn send_cleanup_beacon(&self, session_id: &str, source: &str) -> bool;

    /// Give queued beacons up to `within` to land. False if any were cut off.
    async fn flush_beacons(&self, _within: Duration) -> bool {
        true
    }
}
