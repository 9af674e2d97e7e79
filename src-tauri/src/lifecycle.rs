//! Window and process events that end or guard a session.

use std::sync::Arc;

use tauri::{AppHandle, Manager, RunEvent, Window, WindowEvent};
use tracing::{info, warn};

use crate::notifier::UiEvent;
use crate::session::cleanup::{self, TerminationSignal};
use crate::session::SessionContext;
use crate::SessionClockHandle;

pub fn handle_window_event(window: &Window, event: &WindowEvent) {
    let Some(ctx) = window.try_state::<Arc<SessionContext>>() else {
        return;
    };

    match event {
        WindowEvent::CloseRequested { api, .. } => {
            if cleanup::close_requires_confirmation(&ctx) {
                info!("Holding close of '{}' for confirmation", window.label());
                api.prevent_close();
                ctx.notifier.notify(UiEvent::CloseRequested);
            }
        }
        WindowEvent::Destroyed => {
            cleanup::on_terminating(&ctx, TerminationSignal::WindowClosed);
        }
        _ => {}
    }
}

pub fn handle_run_event(app: &AppHandle, event: &RunEvent) {
    if let RunEvent::Exit = event {
        if let Some(clock) = app.try_state::<SessionClockHandle>() {
            clock.0.cancel();
        }
        if let Some(ctx) = app.try_state::<Arc<SessionContext>>() {
            cleanup::on_terminating(&ctx, TerminationSignal::AppExit);
            if !tauri::async_runtime::block_on(cleanup::flush_beacons(&ctx)) {
                warn!("Exiting with cleanup beacons still in flight");
            }
        }
    }
}
