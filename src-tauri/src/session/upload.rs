use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::{polling, SessionContext};
use crate::error::DugongError;
use crate::store::UploadStatus;

pub const MISSING_SESSION: &str = "Session ID not found. Please log in again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub session_id: String,
    pub uploaded: usize,
}

/// Send every pending file in one multipart request under the signed-in
/// session, restart the session window and kick off result polling.
pub async fn upload_pending(ctx: &Arc<SessionContext>) -> Result<UploadSummary, DugongError> {
    let session_id = ctx
        .credentials
        .session_id()
        .ok_or_else(|| DugongError::Auth(MISSING_SESSION.to_string()))?;

    let pending = ctx.uploads.pending_payloads();
    if pending.is_empty() {
        return Err(DugongError::Validation("No files selected".to_string()));
    }

    ctx.uploads.set_session_id(session_id.clone());
    ctx.uploads.reset_session_timer(ctx.clock.now())?;

    let (ids, payloads): (Vec<String>, Vec<_>) = pending.into_iter().unzip();
    let names: Vec<String> = payloads.iter().map(|p| p.name.clone()).collect();
    for id in &ids {
        ctx.uploads
            .update_file_status(id, UploadStatus::Uploading, None, None);
        ctx.uploads.update_file_progress(id, 10);
    }

    match ctx.api.upload_images(&session_id, payloads).await {
        Ok(response) => {
            if let Some(message) = response.message {
                info!("Upload accepted: {}", message);
            }
            for (id, name) in ids.iter().zip(&names) {
                let url = ctx.api.image_url(&session_id, name);
                ctx.uploads
                    .update_file_status(id, UploadStatus::Success, Some(url), None);
            }
        }
        Err(e) => {
            warn!("Upload of {} files failed: {}", ids.len(), e);
            let message = e.to_string();
            for id in &ids {
                ctx.uploads.update_file_status(
                    id,
                    UploadStatus::Error,
                    None,
                    Some(message.clone()),
                );
            }
            return Err(DugongError::Upload(message));
        }
    }

    info!("Uploaded {} files to session {}", ids.len(), session_id);
    // The poll runs on its own; its outcome is only logged.
    drop(polling::after_upload(ctx, &session_id).await);

    Ok(UploadSummary {
        session_id,
        uploaded: ids.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use crate::store::NewFile;
    use crate::testing::{test_context, MockBackend, StatusStep};
    use crate::validation::FileMeta;
    use chrono::Utc;
    use std::time::Duration;

    fn files(n: usize) -> Vec<NewFile> {
        (0..n)
            .map(|i| NewFile {
                meta: FileMeta {
                    name: format!("DJI_{:04}.JPG", i),
                    mime_type: "image/jpeg".into(),
                    size: 4,
                },
                payload: vec![0xFF, 0xD8, 0xFF, 0xE0],
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_requires_signed_in_session() {
        let api = Arc::new(MockBackend::new());
        let (ctx, _notifier) = test_context(api.clone(), Arc::new(TokioClock::new(Utc::now())));
        ctx.uploads.add_files(files(1)).unwrap();

        let err = upload_pending(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Session ID not found. Please log in again.");
        assert!(api.uploads().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_starts_session_and_polls() {
        let api = Arc::new(MockBackend::new());
        api.set_status_fallback(StatusStep::Images(2));
        let (ctx, _notifier) = test_context(api.clone(), Arc::new(TokioClock::new(Utc::now())));
        ctx.credentials.set_token("tok");
        ctx.credentials.set_session_id("s1");
        ctx.uploads.add_files(files(2)).unwrap();

        let summary = upload_pending(&ctx).await.unwrap();

        assert_eq!(summary.uploaded, 2);
        assert_eq!(ctx.uploads.session_id().as_deref(), Some("s1"));
        assert!(ctx.uploads.session_start_time().is_some());
        assert_eq!(
            api.uploads(),
            vec![("s1".to_string(), vec!["DJI_0000.JPG".to_string(), "DJI_0001.JPG".to_string()])]
        );
        let snap = ctx.uploads.snapshot();
        assert!(snap
            .files
            .iter()
            .all(|f| f.status == UploadStatus::Success && f.progress == 100 && f.url.is_some()));
        assert_eq!(api.backfill_calls(), vec!["s1".to_string()]);
        assert!(ctx.polling.is_polling());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(!ctx.polling.is_polling());
        assert_eq!(ctx.images.total(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_upload_marks_files() {
        let api = Arc::new(MockBackend::new());
        api.fail_uploads();
        let (ctx, _notifier) = test_context(api.clone(), Arc::new(TokioClock::new(Utc::now())));
        ctx.credentials.set_session_id("s1");
        ctx.uploads.add_files(files(2)).unwrap();

        let err = upload_pending(&ctx).await.unwrap_err();
        assert!(err.to_string().starts_with("Upload failed:"));

        let snap = ctx.uploads.snapshot();
        assert!(snap
            .files
            .iter()
            .all(|f| f.status == UploadStatus::Error && f.error.is_some()));
        assert!(api.backfill_calls().is_empty());
        assert!(!ctx.polling.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_pending_is_rejected() {
        let api = Arc::new(MockBackend::new());
        let (ctx, _notifier) = test_context(api, Arc::new(TokioClock::new(Utc::now())));
        ctx.credentials.set_session_id("s1");
        let err = upload_pending(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "No files selected");
        assert_eq!(ctx.uploads.session_start_time(), None);
    }
}
