use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::app::use_session_events;
use crate::commands;

/// Up to two initials from a display name.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

#[component]
pub fn Navbar(
    #[prop(into)] image_count: Signal<usize>,
    #[prop(into)] on_logout: Callback<()>,
) -> impl IntoView {
    let events = use_session_events();
    let (username, set_username) = signal(String::new());
    let (email, set_email) = signal(String::new());
    let (menu_open, set_menu_open) = signal(false);

    Effect::new(move |_| {
        spawn_local(async move {
            match commands::auth_state().await {
                Ok(state) => {
                    set_username.set(state.username);
                    set_email.set(state.email);
                }
                Err(e) => {
                    web_sys::console::error_1(&format!("Failed to load user: {}", e).into());
                }
            }
            if let Ok(clock) = commands::session_clock().await {
                events.clock.set(clock);
            }
        });
    });

    view! {
        <nav class="navbar">
            <div class="navbar-brand">
                <img src="/icon.png" class="navbar-logo" alt="Dugong" />
                <h1 class="navbar-title">"Dugong Detection System"</h1>
            </div>

            <div class="navbar-status">
                <Show when=move || { image_count.get() > 0 }>
                    <span class="status-pill">{move || format!("{} Active", image_count.get())}</span>
                </Show>

                <Show when=move || events.clock.get().active>
                    <span
                        class=move || events.clock.get().urgency.css_class()
                        title="Time left in this session"
                    >
                        {move || events.clock.get().label}
                    </span>
                </Show>

                <div class="user-menu">
                    <button
                        class="user-avatar"
                        on:click=move |_| set_menu_open.update(|open| *open = !*open)
                    >
                        {move || initials(&username.get())}
                    </button>
                    <Show when=move || menu_open.get()>
                        <div class="user-dropdown">
                            <p class="user-name">{move || username.get()}</p>
                            <p class="user-email">{move || email.get()}</p>
                            <hr />
                            <button
                                class="btn-link"
                                on:click=move |_| {
                                    set_menu_open.set(false);
                                    on_logout.run(());
                                }
                            >
                                "Log out"
                            </button>
                        </div>
                    </Show>
                </div>
            </div>
        </nav>
    }
}
