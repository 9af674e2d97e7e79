//! Survey results for the signed-in session.

use leptos::prelude::*;
use leptos_router::hooks::use_navigate;
use leptos_router::NavigateOptions;
use wasm_bindgen_futures::spawn_local;

use crate::app::{use_session_events, LANDING_ROUTE};
use crate::commands::{self, ResultsSnapshot, UploadSummary};
use crate::components::confirm_dialog::ConfirmDialog;
use crate::components::empty_state::EmptyState;
use crate::components::image_viewer::ImageViewer;
use crate::components::navbar::Navbar;
use crate::components::results_sidebar::ResultsSidebar;
use crate::components::upload_dialog::UploadDialog;
use crate::nav_guard::{use_navigation_guard, GuardOptions};

const LEAVE_TITLE: &str = "Leave Dashboard?";
const LEAVE_MESSAGE: &str = "You have uploaded images in this session. Are you sure you want to leave? Your session data will be preserved.";

async fn sign_out() -> bool {
    match commands::logout().await {
        Ok(_) => true,
        Err(e) => {
            web_sys::console::error_1(&format!("Logout failed: {}", e).into());
            false
        }
    }
}

#[component]
pub fn DashboardPage() -> impl IntoView {
    let events = use_session_events();
    let navigate = use_navigate();
    let (session_id, set_session_id) = signal::<Option<String>>(None);
    let (marked_poor, set_marked_poor) = signal::<Vec<String>>(vec![]);
    let (upload_open, set_upload_open) = signal(false);
    let (notice, set_notice) = signal::<Option<String>>(None);

    // Without a live access cookie the dashboard is off limits.
    Effect::new(move |_| {
        let navigate = navigate.clone();
        spawn_local(async move {
            let authenticated = commands::auth_state()
                .await
                .map(|state| state.authenticated)
                .unwrap_or(false);
            if !authenticated {
                navigate(
                    LANDING_ROUTE,
                    NavigateOptions {
                        replace: true,
                        ..Default::default()
                    },
                );
                return;
            }

            match commands::dashboard_state().await {
                Ok(state) => {
                    let has_session = state.session_id.is_some();
                    set_session_id.set(state.session_id);
                    events.results.set(state.results);
                    events.polling.set(state.is_polling);
                    events.clock.set(state.clock);
                    if has_session {
                        match commands::refresh_results().await {
                            Ok(snapshot) => events.results.set(snapshot),
                            Err(e) => {
                                web_sys::console::error_1(
                                    &format!("Failed to load results: {}", e).into(),
                                );
                            }
                        }
                    }
                }
                Err(e) => {
                    web_sys::console::error_1(&format!("Failed to load dashboard: {}", e).into());
                }
            }
        });
    });

    let armed = Signal::derive(move || {
        session_id.with(Option::is_some) && events.results.with(|r| r.total > 0)
    });
    let guard = use_navigation_guard(
        armed,
        GuardOptions::new()
            .before_navigate(sign_out)
            .on_confirm(move || events.reset()),
    );

    let on_logout = Callback::new(move |_: ()| {
        if armed.get_untracked() {
            guard.navigate_with_guard(LANDING_ROUTE);
            return;
        }
        spawn_local(async move {
            if sign_out().await {
                events.reset();
                guard.navigate_without_guard(LANDING_ROUTE);
            }
        });
    });

    let apply = move |result: Result<ResultsSnapshot, String>| match result {
        Ok(snapshot) => events.results.set(snapshot),
        Err(e) => web_sys::console::error_1(&format!("Failed to move: {}", e).into()),
    };
    let on_previous = Callback::new(move |_: ()| {
        spawn_local(async move { apply(commands::previous_image().await) });
    });
    let on_next = Callback::new(move |_: ()| {
        spawn_local(async move { apply(commands::next_image().await) });
    });
    let on_select = Callback::new(move |index: usize| {
        spawn_local(async move { apply(commands::select_image(index).await) });
    });

    let on_mark_poor = Callback::new(move |image_name: String| {
        spawn_local(async move {
            match commands::mark_poor_quality(&image_name).await {
                Ok(target) => {
                    set_notice.set(Some(format!("Moved {} to {}", image_name, target)));
                    set_marked_poor.update(|marked| marked.push(image_name));
                }
                Err(e) => set_notice.set(Some(e)),
            }
        });
    });

    let on_refresh = move |_| {
        spawn_local(async move {
            match commands::refresh_results().await {
                Ok(snapshot) => events.results.set(snapshot),
                Err(e) => set_notice.set(Some(e)),
            }
        });
    };

    let on_export = move |_| {
        spawn_local(async move {
            match commands::export_results_csv().await {
                Ok(path) => set_notice.set(Some(format!("Saved to {}", path))),
                Err(e) => set_notice.set(Some(format!("Export failed: {}", e))),
            }
        });
    };

    let on_uploaded = Callback::new(move |summary: UploadSummary| {
        set_session_id.set(Some(summary.session_id));
        set_notice.set(Some(format!("Uploaded {} images", summary.uploaded)));
    });

    let open_upload = Callback::new(move |_: ()| set_upload_open.set(true));
    let current = Signal::derive(move || events.results.with(|r| r.current().cloned()));
    let has_results = move || events.results.with(|r| r.total > 0);

    view! {
        <div class="page dashboard-page">
            <Navbar
                image_count=Signal::derive(move || events.results.with(|r| r.total))
                on_logout=on_logout
            />

            <Show
                when=has_results
                fallback=move || view! {
                    <EmptyState on_upload_click=open_upload processing=events.polling />
                }
            >
                <div class="dashboard-header">
                    <h2>"Survey Results"</h2>
                    <div class="action-buttons">
                        <button class="btn btn-primary" on:click=move |_| open_upload.run(())>
                            "Upload Images"
                        </button>
                        <button class="btn btn-secondary" on:click=on_refresh>"Refresh"</button>
                        <button class="btn btn-secondary" on:click=on_export>"Export CSV"</button>
                    </div>
                </div>

                <Show when=move || events.polling.get()>
                    <div class="processing-banner">"Processing images... Please wait."</div>
                </Show>

                <div class="dashboard-grid">
                    <ImageViewer
                        results=events.results
                        on_previous=on_previous
                        on_next=on_next
                        on_select=on_select
                    />
                    <ResultsSidebar
                        current=current
                        marked_poor=marked_poor
                        on_mark_poor=on_mark_poor
                    />
                </div>
            </Show>

            {move || notice.get().map(|msg| view! { <p class="status-message">{msg}</p> })}

            <UploadDialog
                open=upload_open
                on_close=Callback::new(move |_: ()| set_upload_open.set(false))
                on_uploaded=on_uploaded
            />

            <ConfirmDialog
                open=Signal::derive(move || guard.show_confirm())
                title=LEAVE_TITLE
                message=Signal::derive(|| LEAVE_MESSAGE.to_string())
                confirm_text="Leave"
                cancel_text="Stay"
                on_confirm=Callback::new(move |_: ()| guard.confirm())
                on_cancel=Callback::new(move |_: ()| guard.cancel())
            />
        </div>
    }
}
