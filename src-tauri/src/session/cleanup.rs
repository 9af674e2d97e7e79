use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::SessionContext;
use crate::api::beacon_source;

/// Ways the app learns it is going away. Either one may fire, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// The main window was destroyed.
    WindowClosed,
    /// The event loop is exiting.
    AppExit,
}

impl TerminationSignal {
    pub fn source(self) -> &'static str {
        match self {
            TerminationSignal::WindowClosed => beacon_source::WINDOW_CLOSE,
            TerminationSignal::AppExit => beacon_source::APP_EXIT,
        }
    }
}

pub const CLOSE_WARNING: &str =
    "You have uploaded images in this session. Closing the app ends the session and its results will be removed.";

/// Remembers that the user already agreed to close.
#[derive(Default)]
pub struct CloseGuard {
    confirmed: AtomicBool,
}

impl CloseGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirm(&self) {
        self.confirmed.store(true, Ordering::SeqCst);
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed.load(Ordering::SeqCst)
    }
}

/// Queue a cleanup beacon without waiting on it. Sends only with both a session id and a
/// token; returns whether a beacon was queued.
pub fn on_terminating(ctx: &SessionContext, signal: TerminationSignal) -> bool {
    let Some(session_id) = ctx.current_session_id() else {
        debug!("No session to clean up on {:?}", signal);
        return false;
    };
    if !ctx.credentials.is_authenticated() {
        debug!("No token, skipping cleanup beacon for {}", session_id);
        return false;
    }

    let queued = ctx.api.send_cleanup_beacon(&session_id, signal.source());
    if queued {
        info!("Queued cleanup beacon for session {} ({})", session_id, signal.source());
    } else {
        warn!("Cleanup beacon for session {} was not queued", session_id);
    }
    queued
}

/// How long exit holds the process open for queued beacons. A browser hands
/// the same request to the page after unload; a desktop process has to wait.
pub const BEACON_GRACE: Duration = Duration::from_millis(1500);

/// Wait, bounded by [`BEACON_GRACE`], for beacons queued by
/// [`on_terminating`] to finish.
pub async fn flush_beacons(ctx: &SessionContext) -> bool {
    ctx.api.flush_beacons(BEACON_GRACE).await
}

/// True when closing now would throw away uploaded work the user has not
/// agreed to lose.
pub fn close_requires_confirmation(ctx: &SessionContext) -> bool {
    !ctx.close_guard.is_confirmed()
        && ctx.current_session_id().is_some()
        && ctx.uploads.has_files()
}
