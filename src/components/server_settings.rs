use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::commands::{self, BASE_URL_PREFERENCE};

/// Where the detection API lives. A saved change applies on next launch.
#[component]
pub fn ServerSettings() -> impl IntoView {
    let (active_url, set_active_url) = signal(String::new());
    let (base_url, set_base_url) = signal(String::new());
    let (status, set_status) = signal::<Option<String>>(None);
    let (expanded, set_expanded) = signal(false);

    Effect::new(move |_| {
        spawn_local(async move {
            match commands::api_settings().await {
                Ok(settings) => {
                    set_base_url.set(
                        settings
                            .saved_base_url
                            .unwrap_or_else(|| settings.active_base_url.clone()),
                    );
                    set_active_url.set(settings.active_base_url);
                }
                Err(e) => {
                    set_status.set(Some(format!("Failed to load settings: {}", e)));
                }
            }
        });
    });

    let save_base_url = move |_| {
        let url = base_url.get();
        spawn_local(async move {
            match commands::set_preference(BASE_URL_PREFERENCE, &url).await {
                Ok(()) => {
                    set_status.set(Some("Saved. Restart the app to use it.".to_string()));
                }
                Err(e) => {
                    set_status.set(Some(format!("Failed to save: {}", e)));
                }
            }
        });
    };

    view! {
        <section class="server-settings">
            <button class="btn-link" on:click=move |_| set_expanded.update(|e| *e = !*e)>
                {move || format!("Server: {}", active_url.get())}
            </button>
            <Show when=move || expanded.get()>
                <div class="input-row">
                    <input
                        id="api-base-url"
                        type="text"
                        placeholder="http://localhost:8000"
                        class="input"
                        prop:value=move || base_url.get()
                        on:input=move |ev| {
                            set_base_url.set(event_target_value(&ev));
                        }
                    />
                    <button class="btn btn-save" on:click=save_base_url>"Save"</button>
                </div>
                <Show when=move || status.get().is_some()>
                    <span class="status-text">{move || status.get().unwrap_or_default()}</span>
                </Show>
            </Show>
        </section>
    }
}
