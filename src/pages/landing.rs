use leptos::prelude::*;
use leptos_router::hooks::use_navigate;
use leptos_router::NavigateOptions;
use wasm_bindgen_futures::spawn_local;

use crate::app::DASHBOARD_ROUTE;
use crate::commands;
use crate::components::server_settings::ServerSettings;
use crate::components::sign_in::SignInForm;

#[component]
pub fn LandingPage() -> impl IntoView {
    let navigate = use_navigate();

    // A live access cookie skips the sign-in screen.
    Effect::new(move |_| {
        let navigate = navigate.clone();
        spawn_local(async move {
            if let Ok(state) = commands::auth_state().await {
                if state.authenticated {
                    navigate(
                        DASHBOARD_ROUTE,
                        NavigateOptions {
                            replace: true,
                            ..Default::default()
                        },
                    );
                }
            }
        });
    });

    view! {
        <div class="page landing-page">
            <section class="hero">
                <h1 class="hero-title">"Dugong Detection System"</h1>
                <p class="hero-subtitle">
                    "Upload aerial survey images and review dugong and mother-calf detections."
                </p>
            </section>
            <div class="landing-side">
                <SignInForm />
                <ServerSettings />
            </div>
        </div>
    }
}
