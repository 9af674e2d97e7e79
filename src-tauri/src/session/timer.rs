//! The 15-minute session countdown.
//!
//! [`SessionTimer`] is the pure calculation; [`run_session_clock`] drives it
//! once a second for the lifetime of the app and ends the session when the
//! window runs out.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{auth, SessionContext};
use crate::notifier::UiEvent;

pub const SESSION_WINDOW_SECS: i64 = 15 * 60;
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

const WARNING_SECS: i64 = 10 * 60;
const URGENT_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Normal,
    Warning,
    Urgent,
}

impl Urgency {
    pub fn from_remaining(remaining_secs: i64) -> Self {
        if remaining_secs <= URGENT_SECS {
            Urgency::Urgent
        } else if remaining_secs <= WARNING_SECS {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// No session has started.
    Idle,
    Running { remaining_secs: i64 },
    /// The window ran out. Reported once per start time.
    Expired,
}

pub struct SessionTimer {
    window_secs: i64,
    expired_for: Option<DateTime<Utc>>,
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::with_window(SESSION_WINDOW_SECS)
    }

    pub fn with_window(window_secs: i64) -> Self {
        Self {
            window_secs,
            expired_for: None,
        }
    }

    /// Whole seconds left, never negative and never above the window.
    pub fn remaining(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - start).num_seconds();
        (self.window_secs - elapsed).clamp(0, self.window_secs)
    }

    pub fn tick(&mut self, start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> TimerTick {
        let Some(start) = start else {
            self.expired_for = None;
            return TimerTick::Idle;
        };

        let remaining_secs = self.remaining(start, now);
        if remaining_secs > 0 {
            return TimerTick::Running { remaining_secs };
        }
        if self.expired_for == Some(start) {
            return TimerTick::Running { remaining_secs: 0 };
        }
        self.expired_for = Some(start);
        TimerTick::Expired
    }
}

/// `m:ss`
pub fn format_remaining(remaining_secs: i64) -> String {
    let secs = remaining_secs.max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// What the navbar countdown shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClock {
    pub active: bool,
    pub remaining_secs: i64,
    pub urgency: Urgency,
    pub label: String,
}

impl SessionClock {
    pub fn idle() -> Self {
        Self {
            active: false,
            remaining_secs: 0,
            urgency: Urgency::Normal,
            label: String::new(),
        }
    }

    pub fn running(remaining_secs: i64) -> Self {
        Self {
            active: true,
            remaining_secs,
            urgency: Urgency::from_remaining(remaining_secs),
            label: format_remaining(remaining_secs),
        }
    }
}

/// The clock as of now, for a UI that just mounted.
pub fn current_clock(ctx: &SessionContext) -> SessionClock {
    match ctx.uploads.session_start_time() {
        Some(start) => SessionClock::running(SessionTimer::new().remaining(start, ctx.clock.now())),
        None => SessionClock::idle(),
    }
}

/// End the session: stop polling, tell the backend, clear everything local
/// and let the UI return to the landing page.
pub async fn expire_session(ctx: &SessionContext) {
    info!("Session window elapsed, ending session");
    auth::logout(ctx).await;
    ctx.notifier.notify(UiEvent::SessionExpired);
}

/// Tick once a second until cancelled.
pub async fn run_session_clock(ctx: Arc<SessionContext>, shutdown: CancellationToken) {
    let mut timer = SessionTimer::new();
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut was_active = false;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        match timer.tick(ctx.uploads.session_start_time(), ctx.clock.now()) {
            TimerTick::Idle => {
                if was_active {
                    ctx.notifier.notify(UiEvent::SessionTick(SessionClock::idle()));
                    was_active = false;
                }
            }
            TimerTick::Running { remaining_secs } => {
                ctx.notifier
                    .notify(UiEvent::SessionTick(SessionClock::running(remaining_secs)));
                was_active = true;
            }
            TimerTick::Expired => {
                ctx.notifier.notify(UiEvent::SessionTick(SessionClock::running(0)));
                expire_session(&ctx).await;
                was_active = true;
            }
        }
    }
    info!("Session clock stopped");
}
