pub mod api;
pub mod clock;
mod commands;
pub mod config;
pub mod error;
pub mod export;
mod lifecycle;
pub mod notifier;
pub mod session;
pub mod storage;
pub mod store;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use error::DugongError;
pub use session::SessionContext;

/// Stops the background session clock.
pub struct SessionClockHandle(pub CancellationToken);

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_store::Builder::new().build())
        .invoke_handler(tauri::generate_handler![
            commands::config::get_preference,
            commands::config::set_preference,
            commands::config::api_settings,
            commands::auth::validate_login_form,
            commands::auth::login,
            commands::auth::logout,
            commands::auth::auth_state,
            commands::upload::check_file_selection,
            commands::upload::stage_files,
            commands::upload::discard_pending_files,
            commands::upload::upload_staged_files,
            commands::upload::upload_state,
            commands::results::dashboard_state,
            commands::results::refresh_results,
            commands::results::next_image,
            commands::results::previous_image,
            commands::results::select_image,
            commands::results::mark_poor_quality,
            commands::results::export_results_csv,
            commands::session::session_clock,
            commands::session::confirm_close,
        ])
        .setup(|app| {
            use tauri::Manager;

            let preference = commands::config::read_preference(
                app.handle(),
                config::BASE_URL_PREFERENCE,
            )
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to read saved API base URL: {}", e);
                None
            });
            let env = std::env::var(config::BASE_URL_ENV).ok();
            let api_config = config::ApiConfig::resolve(preference.as_deref(), env.as_deref());
            let backend = api::HttpBackend::new(api_config.clone())?;

            let clock: Arc<dyn clock::Clock> = Arc::new(clock::SystemClock);
            let data_dir = app.path().app_data_dir()?;
            let storage = Arc::new(storage::ClientStorage::open(
                &data_dir.join("client_storage.db"),
                clock.clone(),
            )?);
            let notifier = Arc::new(notifier::TauriNotifier::new(app.handle().clone()));
            let ctx = Arc::new(SessionContext::new(
                Arc::new(backend),
                storage,
                clock,
                notifier,
            ));

            let shutdown = CancellationToken::new();
            tauri::async_runtime::spawn(session::timer::run_session_clock(
                ctx.clone(),
                shutdown.clone(),
            ));

            app.manage(api_config);
            app.manage(ctx);
            app.manage(SessionClockHandle(shutdown));
            Ok(())
        })
        .on_window_event(lifecycle::handle_window_event)
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|handle, event| lifecycle::handle_run_event(handle, &event));
}
