use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login reply. Older deployments send `token` instead of `access_token`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl LoginResponse {
    /// The bearer token, preferring `access_token`. Empty strings count as absent.
    pub fn bearer(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.token.as_deref().filter(|t| !t.is_empty()))
    }
}

/// One image sent in a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Reply of `GET /api/session-status/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionStatus {
    #[serde(default, rename = "timeRemaining")]
    pub time_remaining: Option<i64>,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

/// Session metadata as written by the backend. `images` keeps the backend's
/// key order (serde_json is built with `preserve_order`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub images: Map<String, Value>,
    #[serde(default)]
    pub last_activity: Option<String>,
}

/// Body of `POST /api/move-to-false-positive/`.
#[derive(Debug, Clone, Serialize)]
pub struct MoveToFalsePositiveRequest {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "imageName")]
    pub image_name: String,
    #[serde(rename = "targetClass")]
    pub target_class: String,
}
