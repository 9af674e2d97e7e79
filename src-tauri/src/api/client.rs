use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::types::{
    LoginRequest, LoginResponse, MoveToFalsePositiveRequest, SessionStatus, UploadPayload,
    UploadResponse,
};
use super::{ApiError, ApiResult, DugongBackend, PendingBeacons};
use crate::config::ApiConfig;

/// Upper bound for a single cleanup beacon request.
const BEACON_TIMEOUT: Duration = Duration::from_secs(5);

/// reqwest client for the detection API.
pub struct HttpBackend {
    client: Client,
    config: ApiConfig,
    beacons: PendingBeacons,
}

impl HttpBackend {
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent("DugongWatch/0.1")
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            beacons: PendingBeacons::new(),
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        self.config.endpoint(path)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> ApiResult<Response> {
        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("{} failed: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            debug!("{} -> {}", what, status);
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&body, status),
        })
    }

    /// GET with a few retries on transport errors. HTTP errors are returned
    /// straight away.
    async fn get_with_retry(&self, path: &str, what: &str) -> ApiResult<Response> {
        let url = self.url(path);
        let attempts = self.config.retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.send(self.client.get(&url), what).await {
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!("{} attempt {}/{} failed: {}", what, attempt, attempts, e);
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl DugongBackend for HttpBackend {
    async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        info!("Logging in as {}", request.email);
        let builder = self
            .client
            .post(self.url("/auth/login"))
            .timeout(self.config.login_timeout)
            .json(request);
        let response = self.send(builder, "Login").await?;
        decode(response, "login response").await
    }

    async fn upload_images(
        &self,
        session_id: &str,
        files: Vec<UploadPayload>,
    ) -> ApiResult<UploadResponse> {
        let count = files.len();
        let mut form = Form::new();
        for file in files {
            let UploadPayload {
                name,
                mime_type,
                bytes,
            } = file;
            let part = Part::bytes(bytes)
                .file_name(name.clone())
                .mime_str(&mime_type)
                .map_err(|e| ApiError::Request(format!("Invalid MIME type for {}: {}", name, e)))?;
            form = form.part("files", part);
        }
        form = form.text("session_id", session_id.to_string());

        info!("Uploading {} files to session {}", count, session_id);
        let builder = self
            .client
            .post(self.url("/api/upload-multiple/"))
            .query(&[("session_id", session_id)])
            .multipart(form);
        let response = self.send(builder, "Upload").await?;

        // The reply is informational only.
        let body = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn session_status(&self, session_id: &str) -> ApiResult<SessionStatus> {
        let path = format!("/api/session-status/{}", segment(session_id));
        let response = self.get_with_retry(&path, "Session status").await?;
        decode(response, "session status").await
    }

    async fn backfill_detections(&self, session_id: &str) -> ApiResult<()> {
        let path = format!("/api/backfill-detections/{}", segment(session_id));
        self.send(self.client.post(self.url(&path)), "Backfill detections")
            .await
            .map(|_| ())
    }

    async fn cleanup_session(&self, session_id: &str) -> ApiResult<()> {
        let path = format!("/api/cleanup-session/{}", segment(session_id));
        self.send(self.client.delete(self.url(&path)), "Session cleanup")
            .await
            .map(|_| ())
    }

    async fn export_session_csv(&self, session_id: &str) -> ApiResult<Vec<u8>> {
        let path = format!("/api/export-session-csv/{}", segment(session_id));
        let response = self.get_with_retry(&path, "CSV export").await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to read CSV export: {}", e)))?;
        Ok(bytes.to_vec())
    }

    async fn move_to_false_positive(&self, request: &MoveToFalsePositiveRequest) -> ApiResult<()> {
        let builder = self
            .client
            .post(self.url("/api/move-to-false-positive/"))
            .json(request);
        self.send(builder, "Move to false positive").await.map(|_| ())
    }

    fn image_url(&self, session_id: &str, file_name: &str) -> String {
        image_url(&self.config, session_id, file_name)
    }

    fn send_cleanup_beacon(&self, session_id: &str, source: &str) -> bool {
        let form = Form::new()
            .text("session_id", session_id.to_string())
            .text("source", source.to_string());
        let request = self
            .client
            .post(self.url("/api/cleanup-session-beacon"))
            .timeout(BEACON_TIMEOUT)
            .multipart(form);

        let session = session_id.to_string();
        let source = source.to_string();
        let delivery = tauri::async_runtime::spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("Cleanup beacon for session {} delivered ({})", session, source)
                }
                Ok(resp) => warn!(
                    "Cleanup beacon for session {} returned {} ({})",
                    session,
                    resp.status(),
                    source
                ),
                Err(e) => warn!("Cleanup beacon for session {} failed: {}", session, e),
            }
        });
        self.beacons.track(delivery);
        true
    }

    async fn flush_beacons(&self, within: Duration) -> bool {
        self.beacons.flush(within).await
    }
}

/// `{base}/uploads/{session}/images/{file}` with both segments escaped.
pub fn image_url(config: &ApiConfig, session_id: &str, file_name: &str) -> String {
    config.endpoint(&format!(
        "/uploads/{}/images/{}",
        segment(session_id),
        segment(file_name)
    ))
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Pull a readable message out of an error body: `message`, then a string
/// `detail` (FastAPI), then the status reason.
fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(Value::as_str)
                .or_else(|| v.get("detail").and_then(Value::as_str))
                .map(str::to_string)
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string())
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> ApiResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(format!("Failed to parse {}: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ApiConfig {
        ApiConfig::resolve(Some("http://10.0.0.5:8000"), None)
    }

    #[test]
    fn test_image_url_layout() {
        assert_eq!(
            image_url(&config(), "20260105T101500Z_ab12", "DJI_0042.JPG"),
            "http://10.0.0.5:8000/uploads/20260105T101500Z_ab12/images/DJI_0042.JPG"
        );
    }

    #[test]
    fn test_image_url_escapes_names() {
        assert_eq!(
            image_url(&config(), "s1", "bay survey 1.png"),
            "http://10.0.0.5:8000/uploads/s1/images/bay%20survey%201.png"
        );
    }

    #[test]
    fn test_error_message_prefers_message_then_detail() {
        assert_eq!(
            error_message(r#"{"message":"Invalid credentials"}"#, StatusCode::UNAUTHORIZED),
            "Invalid credentials"
        );
        assert_eq!(
            error_message(r#"{"detail":"Session not found"}"#, StatusCode::NOT_FOUND),
            "Session not found"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_reason() {
        assert_eq!(
            error_message("<html>oops</html>", StatusCode::BAD_GATEWAY),
            "Bad Gateway"
        );
        // FastAPI validation errors carry a list in `detail`
        assert_eq!(
            error_message(
                r#"{"detail":[{"msg":"field required"}]}"#,
                StatusCode::UNPROCESSABLE_ENTITY
            ),
            "Unprocessable Entity"
        );
    }

    #[test]
    fn test_only_network_errors_retry() {
        assert!(ApiError::Network("reset".into()).is_retryable());
        assert!(!ApiError::Status {
            status: 500,
            message: "boom".into()
        }
        .is_retryable());
        assert!(!ApiError::Decode("bad json".into()).is_retryable());
    }
}
