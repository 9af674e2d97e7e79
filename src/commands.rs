use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["window", "__TAURI__", "core"], catch)]
    async fn invoke(cmd: &str, args: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["window", "__TAURI__", "event"], js_name = listen, catch)]
    async fn tauri_listen(
        event: &str,
        handler: &Closure<dyn FnMut(JsValue)>,
    ) -> Result<JsValue, JsValue>;
}

// -- Event names emitted by the backend --

pub const RESULTS_UPDATED: &str = "results-updated";
pub const POLLING_CHANGED: &str = "polling-changed";
pub const SESSION_TICK: &str = "session-tick";
pub const SESSION_EXPIRED: &str = "session-expired";
pub const CLOSE_REQUESTED: &str = "close-requested";

pub const BASE_URL_PREFERENCE: &str = "api_base_url";

// -- Arg structs for serialization --

#[derive(Serialize)]
struct GetPreferenceArgs<'a> {
    key: &'a str,
}

#[derive(Serialize)]
struct SetPreferenceArgs<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct CredentialArgs<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct FileMetaArgs<'a> {
    files: &'a [FileMeta],
}

#[derive(Serialize)]
struct StageFilesArgs<'a> {
    files: &'a [StagedFile],
}

#[derive(Serialize)]
struct SelectImageArgs {
    index: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkPoorArgs<'a> {
    image_name: &'a str,
}

// -- Types matching backend structs --

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSettings {
    pub active_base_url: String,
    pub saved_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoginFormErrors {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginFormErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
    pub username: String,
    pub email: String,
    pub session_id: Option<String>,
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginOutcome {
    pub route: String,
    pub auth: AuthSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub authenticated: bool,
    pub username: String,
    pub email: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFile {
    pub name: String,
    pub mime_type: String,
    pub data_base64: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
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

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSnapshot {
    pub session_id: Option<String>,
    pub session_start_time: Option<String>,
    pub files: Vec<UploadFileView>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub session_id: String,
    pub uploaded: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub image_id: String,
    pub image_url: String,
    pub image_name: String,
    pub dugong_count: u32,
    pub mother_calf_count: u32,
    pub image_class: String,
    pub created_at: String,
    pub captured_date: Option<String>,
}

impl ImageResult {
    pub fn total_count(&self) -> u32 {
        self.mother_calf_count
            .saturating_mul(2)
            .saturating_add(self.dugong_count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSnapshot {
    pub session_id: Option<String>,
    pub results: Vec<ImageResult>,
    pub current_index: usize,
    pub total: usize,
}

impl ResultsSnapshot {
    pub fn current(&self) -> Option<&ImageResult> {
        self.results.get(self.current_index)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    Warning,
    Urgent,
}

impl Urgency {
    pub fn css_class(self) -> &'static str {
        match self {
            Urgency::Normal => "timer timer-normal",
            Urgency::Warning => "timer timer-warning",
            Urgency::Urgent => "timer timer-urgent",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClock {
    pub active: bool,
    pub remaining_secs: i64,
    pub urgency: Urgency,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub session_id: Option<String>,
    pub results: ResultsSnapshot,
    pub is_polling: bool,
    pub clock: SessionClock,
}

// -- Typed invoke helpers --

fn js_error(e: JsValue) -> String {
    e.as_string().unwrap_or_else(|| "Unknown error".to_string())
}

async fn call<T: DeserializeOwned>(cmd: &str, args: JsValue) -> Result<T, String> {
    let result = invoke(cmd, args).await.map_err(js_error)?;
    serde_wasm_bindgen::from_value(result).map_err(|e| e.to_string())
}

async fn call_with<A: Serialize, T: DeserializeOwned>(cmd: &str, args: &A) -> Result<T, String> {
    let args = serde_wasm_bindgen::to_value(args).map_err(|e| e.to_string())?;
    call(cmd, args).await
}

async fn call_unit(cmd: &str, args: JsValue) -> Result<(), String> {
    invoke(cmd, args).await.map(|_| ()).map_err(js_error)
}

pub async fn get_preference(key: &str) -> Result<Option<String>, String> {
    call_with("get_preference", &GetPreferenceArgs { key }).await
}

pub async fn set_preference(key: &str, value: &str) -> Result<(), String> {
    let args = serde_wasm_bindgen::to_value(&SetPreferenceArgs { key, value })
        .map_err(|e| e.to_string())?;
    call_unit("set_preference", args).await
}

pub async fn api_settings() -> Result<ApiSettings, String> {
    call("api_settings", JsValue::NULL).await
}

pub async fn validate_login_form(email: &str, password: &str) -> Result<LoginFormErrors, String> {
    call_with("validate_login_form", &CredentialArgs { email, password }).await
}

pub async fn login(email: &str, password: &str) -> Result<LoginOutcome, String> {
    call_with("login", &CredentialArgs { email, password }).await
}

/// Returns the route to show next.
pub async fn logout() -> Result<String, String> {
    call("logout", JsValue::NULL).await
}

pub async fn auth_state() -> Result<AuthState, String> {
    call("auth_state", JsValue::NULL).await
}

pub async fn check_file_selection(files: &[FileMeta]) -> Result<(), String> {
    let args = serde_wasm_bindgen::to_value(&FileMetaArgs { files }).map_err(|e| e.to_string())?;
    call_unit("check_file_selection", args).await
}

pub async fn stage_files(files: &[StagedFile]) -> Result<UploadSnapshot, String> {
    call_with("stage_files", &StageFilesArgs { files }).await
}

pub async fn discard_pending_files() -> Result<UploadSnapshot, String> {
    call("discard_pending_files", JsValue::NULL).await
}

pub async fn upload_staged_files() -> Result<UploadSummary, String> {
    call("upload_staged_files", JsValue::NULL).await
}

pub async fn upload_state() -> Result<UploadSnapshot, String> {
    call("upload_state", JsValue::NULL).await
}

pub async fn dashboard_state() -> Result<DashboardState, String> {
    call("dashboard_state", JsValue::NULL).await
}

pub async fn refresh_results() -> Result<ResultsSnapshot, String> {
    call("refresh_results", JsValue::NULL).await
}

pub async fn next_image() -> Result<ResultsSnapshot, String> {
    call("next_image", JsValue::NULL).await
}

pub async fn previous_image() -> Result<ResultsSnapshot, String> {
    call("previous_image", JsValue::NULL).await
}

pub async fn select_image(index: usize) -> Result<ResultsSnapshot, String> {
    call_with("select_image", &SelectImageArgs { index }).await
}

/// Returns the class the image was moved to.
pub async fn mark_poor_quality(image_name: &str) -> Result<String, String> {
    call_with("mark_poor_quality", &MarkPoorArgs { image_name }).await
}

/// Returns the path the CSV was saved to.
pub async fn export_results_csv() -> Result<String, String> {
    call("export_results_csv", JsValue::NULL).await
}

pub async fn session_clock() -> Result<SessionClock, String> {
    call("session_clock", JsValue::NULL).await
}

pub async fn confirm_close() -> Result<(), String> {
    call_unit("confirm_close", JsValue::NULL).await
}

/// Subscribe to a backend event for the life of the app. The handler gets the
/// decoded payload; the returned function unsubscribes.
pub async fn listen<T, F>(event: &str, on_event: F) -> Result<js_sys::Function, String>
where
    T: DeserializeOwned + 'static,
    F: Fn(T) + 'static,
{
    let name = event.to_string();
    let handler = Closure::<dyn FnMut(JsValue)>::new(move |raw: JsValue| {
        let payload = js_sys::Reflect::get(&raw, &JsValue::from_str("payload"))
            .unwrap_or(JsValue::NULL);
        match serde_wasm_bindgen::from_value::<T>(payload) {
            Ok(value) => on_event(value),
            Err(e) => web_sys::console::error_1(
                &format!("Bad payload for '{}': {}", name, e).into(),
            ),
        }
    });

    let unlisten = tauri_listen(event, &handler).await.map_err(js_error)?;
    handler.forget();
    unlisten
        .dyn_into::<js_sys::Function>()
        .map_err(|_| format!("No unlisten handle for '{}'", event))
}
