use serde::Serialize;
use tauri::{AppHandle, Emitter};
use tracing::{debug, warn};

use crate::session::cleanup::CLOSE_WARNING;
use crate::session::timer::SessionClock;
use crate::store::ResultsSnapshot;

/// State changes the UI needs to hear about without asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    ResultsUpdated(ResultsSnapshot),
    PollingChanged(bool),
    SessionTick(SessionClock),
    SessionExpired,
    CloseRequested,
}

impl UiEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::ResultsUpdated(_) => "results-updated",
            UiEvent::PollingChanged(_) => "polling-changed",
            UiEvent::SessionTick(_) => "session-tick",
            UiEvent::SessionExpired => "session-expired",
            UiEvent::CloseRequested => "close-requested",
        }
    }
}

pub trait UiNotifier: Send + Sync {
    fn notify(&self, event: UiEvent);
}

/// Broadcasts events to every webview window.
pub struct TauriNotifier {
    app: AppHandle,
}

impl TauriNotifier {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn emit<S: Serialize + Clone>(&self, name: &str, payload: S) {
        if let Err(e) = self.app.emit(name, payload) {
            warn!("Failed to emit '{}': {}", name, e);
        }
    }
}

impl UiNotifier for TauriNotifier {
    fn notify(&self, event: UiEvent) {
        let name = event.name();
        match event {
            UiEvent::ResultsUpdated(snapshot) => self.emit(name, snapshot),
            UiEvent::PollingChanged(active) => self.emit(name, active),
            UiEvent::SessionTick(clock) => self.emit(name, clock),
            UiEvent::SessionExpired => {
                debug!("Emitting {}", name);
                self.emit(name, ())
            }
            UiEvent::CloseRequested => self.emit(name, CLOSE_WARNING),
        }
    }
}

/// Drops every event. For contexts with no window attached.
pub struct NullNotifier;

impl UiNotifier for NullNotifier {
    fn notify(&self, _event: UiEvent) {}
}
