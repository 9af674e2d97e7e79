use leptos::prelude::*;
use leptos_router::components::*;
use leptos_router::hooks::use_navigate;
use leptos_router::path;
use leptos_router::NavigateOptions;
use wasm_bindgen_futures::spawn_local;

use crate::commands::{self, ResultsSnapshot, SessionClock};
use crate::components::confirm_dialog::ConfirmDialog;
use crate::pages::dashboard::DashboardPage;
use crate::pages::landing::LandingPage;

pub const LANDING_ROUTE: &str = "/";
pub const DASHBOARD_ROUTE: &str = "/dashboard";

/// Backend state pushed over Tauri events, shared by every page.
#[derive(Clone, Copy)]
pub struct SessionEvents {
    pub results: RwSignal<ResultsSnapshot>,
    pub polling: RwSignal<bool>,
    pub clock: RwSignal<SessionClock>,
}

impl SessionEvents {
    fn new() -> Self {
        Self {
            results: RwSignal::new(ResultsSnapshot::default()),
            polling: RwSignal::new(false),
            clock: RwSignal::new(SessionClock::default()),
        }
    }

    pub fn reset(&self) {
        self.results.set(ResultsSnapshot::default());
        self.polling.set(false);
        self.clock.set(SessionClock::default());
    }
}

pub fn use_session_events() -> SessionEvents {
    expect_context::<SessionEvents>()
}

#[component]
pub fn App() -> impl IntoView {
    provide_context(SessionEvents::new());

    view! {
        <Router>
            <EventBridge />
            <main class="content">
                <Routes fallback=|| view! { <p>"Page not found"</p> }>
                    <Route path=path!("/") view=LandingPage />
                    <Route path=path!("/dashboard") view=DashboardPage />
                </Routes>
            </main>
        </Router>
    }
}

/// Subscribes once to backend events and owns the window-close prompt.
#[component]
fn EventBridge() -> impl IntoView {
    let events = use_session_events();
    let navigate = use_navigate();
    let (close_warning, set_close_warning) = signal::<Option<String>>(None);

    Effect::new(move |_| {
        let navigate = navigate.clone();
        spawn_local(async move {
            let subscriptions = [
                commands::listen(commands::RESULTS_UPDATED, move |snapshot: ResultsSnapshot| {
                    events.results.set(snapshot);
                })
                .await,
                commands::listen(commands::POLLING_CHANGED, move |active: bool| {
                    events.polling.set(active);
                })
                .await,
                commands::listen(commands::SESSION_TICK, move |clock: SessionClock| {
                    events.clock.set(clock);
                })
                .await,
                commands::listen(commands::SESSION_EXPIRED, move |_: ()| {
                    events.reset();
                    navigate(LANDING_ROUTE, NavigateOptions::default());
                })
                .await,
                commands::listen(commands::CLOSE_REQUESTED, move |warning: String| {
                    set_close_warning.set(Some(warning));
                })
                .await,
            ];
            for failed in subscriptions.into_iter().filter_map(Result::err) {
                web_sys::console::error_1(&format!("Failed to subscribe: {}", failed).into());
            }
        });
    });

    let on_leave = Callback::new(move |_: ()| {
        set_close_warning.set(None);
        spawn_local(async move {
            if let Err(e) = commands::confirm_close().await {
                web_sys::console::error_1(&format!("Failed to close window: {}", e).into());
            }
        });
    });
    let on_stay = Callback::new(move |_: ()| set_close_warning.set(None));

    view! {
        <ConfirmDialog
            open=Signal::derive(move || close_warning.get().is_some())
            title="Are you sure you want to leave?"
            message=Signal::derive(move || close_warning.get().unwrap_or_default())
            confirm_text="Leave Page"
            cancel_text="Stay"
            on_confirm=on_leave
            on_cancel=on_stay
        />
    }
}
