use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SessionContext;
use crate::api::{ApiResult, DugongBackend, SessionMetadata};
use crate::notifier::UiEvent;
use crate::store::ImageResult;

/// How long to keep re-fetching after an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 15,
            interval: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Sleep-then-fetch rounds completed after the immediate fetch.
    pub iterations: u32,
    pub latest_count: usize,
    pub cancelled: bool,
}

fn count_field(data: &Value, keys: &[&str]) -> u32 {
    keys.iter()
        .find_map(|key| {
            let value = data.get(*key)?;
            value
                .as_u64()
                .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        })
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

fn text_field<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| data.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

/// Turn `metadata.images` into results, in the order the backend wrote them.
pub fn map_session_images(
    api: &dyn DugongBackend,
    session_id: &str,
    metadata: &SessionMetadata,
) -> Vec<ImageResult> {
    metadata
        .images
        .iter()
        .enumerate()
        .map(|(idx, (file_name, data))| ImageResult {
            image_id: idx.to_string(),
            image_url: api.image_url(session_id, file_name),
            image_name: file_name.clone(),
            dugong_count: count_field(data, &["dugongCount"]),
            mother_calf_count: count_field(data, &["motherCalfCount", "calfCount"]),
            image_class: text_field(data, &["imageClass"])
                .unwrap_or("N/A")
                .to_string(),
            created_at: text_field(data, &["uploadedAt"])
                .or(metadata.last_activity.as_deref())
                .unwrap_or_default()
                .to_string(),
            captured_date: text_field(data, &["capturedDate", "captured_date"]).map(str::to_string),
        })
        .collect()
}

pub async fn fetch_session_images(
    api: &dyn DugongBackend,
    session_id: &str,
) -> ApiResult<Vec<ImageResult>> {
    let status = api.session_status(session_id).await?;
    Ok(map_session_images(api, session_id, &status.metadata))
}

/// Fetch once and replace the stored results. Returns the new count.
pub async fn refresh_results(ctx: &SessionContext, session_id: &str) -> ApiResult<usize> {
    let results = fetch_session_images(ctx.api.as_ref(), session_id).await?;
    let count = ctx.images.replace_all(session_id, results);
    ctx.publish_results();
    Ok(count)
}

/// Fetch right away, then `policy.attempts` more times `policy.interval`
/// apart. Always runs the full budget unless cancelled. The store only
/// moves when a fetch returns at least as many images as the best so far.
pub async fn poll_for_images(
    ctx: &SessionContext,
    session_id: &str,
    initial_count: usize,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> PollOutcome {
    let mut outcome = PollOutcome {
        iterations: 0,
        latest_count: initial_count,
        cancelled: false,
    };

    for attempt in 0..=policy.attempts {
        if attempt > 0 {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome.cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(policy.interval) => {}
            }
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                outcome.cancelled = true;
                break;
            }
            fetched = fetch_session_images(ctx.api.as_ref(), session_id) => fetched,
        };
        outcome.iterations = attempt;

        match fetched {
            Ok(results) if cancel.is_cancelled() => {
                debug!("Dropping {} results fetched after cancellation", results.len());
                outcome.cancelled = true;
                break;
            }
            Ok(results) => {
                let count = results.len();
                if count >= outcome.latest_count {
                    if count > outcome.latest_count {
                        debug!("Session {} now has {} images", session_id, count);
                    }
                    outcome.latest_count = count;
                    ctx.images.replace_all(session_id, results);
                    ctx.publish_results();
                }
            }
            Err(e) => warn!(
                "Poll {}/{} for session {} failed: {}",
                attempt, policy.attempts, session_id, e
            ),
        }
    }

    info!(
        "Polling for session {} finished: {} rounds, {} images{}",
        session_id,
        outcome.iterations,
        outcome.latest_count,
        if outcome.cancelled { " (cancelled)" } else { "" }
    );
    outcome
}

/// Owns the single in-flight poll and the "polling in progress" flag.
pub struct PollingController {
    generation: AtomicU64,
    active: AtomicBool,
    current: Mutex<Option<CancellationToken>>,
}

impl Default for PollingController {
    fn default() -> Self {
        Self::new()
    }
}

impl PollingController {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            active: AtomicBool::new(false),
            current: Mutex::new(None),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        let mut slot = self.slot();
        if let Some(previous) = slot.replace(token.clone()) {
            previous.cancel();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.active.store(true, Ordering::SeqCst);
        (generation, token)
    }

    /// Clear the flag if no newer poll has started since `generation`.
    fn finish(&self, generation: u64) -> bool {
        let mut slot = self.slot();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        *slot = None;
        self.active.store(false, Ordering::SeqCst);
        true
    }

    pub fn is_polling(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop the in-flight poll, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.slot().as_ref() {
            debug!("Cancelling in-flight poll");
            token.cancel();
        }
    }

    /// Spawn a poll for `session_id`, cancelling whichever one was running.
    pub fn start(
        ctx: &Arc<SessionContext>,
        session_id: String,
        initial_count: usize,
    ) -> JoinHandle<PollOutcome> {
        let (generation, token) = ctx.polling.begin();
        ctx.notifier.notify(UiEvent::PollingChanged(true));

        let ctx = Arc::clone(ctx);
        tokio::spawn(async move {
            let policy = ctx.poll_policy;
            let outcome = poll_for_images(&ctx, &session_id, initial_count, policy, &token).await;
            if ctx.polling.finish(generation) {
                ctx.notifier.notify(UiEvent::PollingChanged(false));
            }
            outcome
        })
    }
}

/// After an upload: ask the backend to backfill detections, then poll.
pub async fn after_upload(ctx: &Arc<SessionContext>, session_id: &str) -> JoinHandle<PollOutcome> {
    if let Err(e) = ctx.api.backfill_detections(session_id).await {
        warn!("Backfill for session {} failed: {}", session_id, e);
    }

    let snapshot = ctx.images.snapshot();
    let initial_count = if snapshot.session_id.as_deref() == Some(session_id) {
        snapshot.total
    } else {
        0
    };
    PollingController::start(ctx, session_id.to_string(), initial_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use crate::testing::{test_context, MockBackend, StatusStep};
    use chrono::Utc;
    use serde_json::json;

    fn metadata(value: Value) -> SessionMetadata {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_mapping_defaults_and_aliases() {
        let api = MockBackend::new();
        let meta = metadata(json!({
            "images": {
                "b.jpg": {"calfCount": 2, "dugongCount": 3, "imageClass": "feeding", "uploadedAt": "2026-01-05T10:01:00"},
                "a.jpg": {},
                "c.png": {"motherCalfCount": 1, "calfCount": 9, "dugongCount": 1.0, "capturedDate": "2025-11-30"}
            },
            "last_activity": "2026-01-05T10:05:00"
        }));

        let results = map_session_images(&api, "s1", &meta);
        let names: Vec<&str> = results.iter().map(|r| r.image_name.as_str()).collect();
        assert_eq!(names, vec!["b.jpg", "a.jpg", "c.png"]);

        assert_eq!(results[0].image_id, "0");
        assert_eq!(results[0].mother_calf_count, 2);
        assert_eq!(results[0].image_class, "feeding");
        assert_eq!(results[0].created_at, "2026-01-05T10:01:00");
        assert_eq!(results[0].image_url, "http://mock/uploads/s1/images/b.jpg");

        assert_eq!(results[1].dugong_count, 0);
        assert_eq!(results[1].mother_calf_count, 0);
        assert_eq!(results[1].image_class, "N/A");
        assert_eq!(results[1].created_at, "2026-01-05T10:05:00");

        assert_eq!(results[2].mother_calf_count, 1);
        assert_eq!(results[2].dugong_count, 1);
        assert_eq!(results[2].captured_date.as_deref(), Some("2025-11-30"));
    }

    #[test]
    fn test_mapping_empty_metadata() {
        let api = MockBackend::new();
        assert!(map_session_images(&api, "s1", &SessionMetadata::default()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_runs_full_budget_and_keeps_highest() {
        let api = Arc::new(MockBackend::new());
        api.set_status_fallback(StatusStep::Growing);
        let (ctx, _notifier) = test_context(api.clone(), Arc::new(TokioClock::new(Utc::now())));

        let started = tokio::time::Instant::now();
        let outcome =
            poll_for_images(&ctx, "s1", 0, PollPolicy::default(), &CancellationToken::new()).await;

        assert_eq!(outcome.iterations, 15);
        assert!(!outcome.cancelled);
        assert_eq!(api.status_calls(), 16);
        assert_eq!(outcome.latest_count, 16);
        assert_eq!(ctx.images.total(), 16);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_ignores_failures_and_smaller_lists() {
        let api = Arc::new(MockBackend::new());
        api.script_status(vec![
            StatusStep::Images(2),
            StatusStep::Fail,
            StatusStep::Images(5),
            StatusStep::Images(3),
            StatusStep::Fail,
        ]);
        api.set_status_fallback(StatusStep::Images(4));
        let (ctx, _notifier) = test_context(api.clone(), Arc::new(TokioClock::new(Utc::now())));

        let policy = PollPolicy {
            attempts: 6,
            interval: Duration::from_millis(2000),
        };
        let outcome = poll_for_images(&ctx, "s1", 0, policy, &CancellationToken::new()).await;

        assert_eq!(outcome.iterations, 6);
        assert_eq!(outcome.latest_count, 5);
        assert_eq!(ctx.images.total(), 5);
        assert_eq!(api.status_calls(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_poll_early() {
        let api = Arc::new(MockBackend::new());
        api.set_status_fallback(StatusStep::Growing);
        let (ctx, _notifier) = test_context(api.clone(), Arc::new(TokioClock::new(Utc::now())));

        let handle = PollingController::start(&ctx, "s1".to_string(), 0);
        tokio::time::sleep(Duration::from_millis(5000)).await;
        ctx.polling.cancel();
        let outcome = handle.await.unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(api.status_calls(), 3);
        assert!(!ctx.polling.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_flag_events() {
        let api = Arc::new(MockBackend::new());
        let (ctx, notifier) = test_context(api, Arc::new(TokioClock::new(Utc::now())));

        let handle = PollingController::start(&ctx, "s1".to_string(), 0);
        assert!(ctx.polling.is_polling());
        handle.await.unwrap();
        assert!(!ctx.polling.is_polling());

        let flags: Vec<bool> = notifier
            .events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::PollingChanged(active) => Some(active),
                _ => None,
            })
            .collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_previous_poll() {
        let api = Arc::new(MockBackend::new());
        let (ctx, notifier) = test_context(api, Arc::new(TokioClock::new(Utc::now())));

        let first = PollingController::start(&ctx, "s1".to_string(), 0);
        tokio::time::sleep(Duration::from_millis(3000)).await;
        let second = PollingController::start(&ctx, "s1".to_string(), 0);

        assert!(first.await.unwrap().cancelled);
        assert!(ctx.polling.is_polling());
        let outcome = second.await.unwrap();
        assert!(!outcome.cancelled);
        assert!(!ctx.polling.is_polling());

        // The cancelled poll must not clear the flag under the running one
        let flags: Vec<bool> = notifier
            .events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::PollingChanged(active) => Some(active),
                _ => None,
            })
            .collect();
        assert_eq!(flags, vec![true, true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_upload_backfills_then_polls() {
        let api = Arc::new(MockBackend::new());
        api.fail_backfill();
        let (ctx, _notifier) = test_context(api.clone(), Arc::new(TokioClock::new(Utc::now())));

        let handle = after_upload(&ctx, "s1").await;
        let outcome = handle.await.unwrap();

        assert_eq!(api.backfill_calls(), vec!["s1".to_string()]);
        assert_eq!(outcome.iterations, 15);
        assert_eq!(ctx.images.total(), outcome.latest_count);
    }
}
