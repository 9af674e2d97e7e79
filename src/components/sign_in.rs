use leptos::prelude::*;
use leptos_router::hooks::use_navigate;
use leptos_router::NavigateOptions;
use wasm_bindgen_futures::spawn_local;

use crate::commands::{self, LoginFormErrors};

#[component]
pub fn SignInForm() -> impl IntoView {
    let navigate = use_navigate();
    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (show_password, set_show_password) = signal(false);
    let (errors, set_errors) = signal(LoginFormErrors::default());
    let (status, set_status) = signal::<Option<String>>(None);
    let (signing_in, set_signing_in) = signal(false);

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if signing_in.get_untracked() {
            return;
        }
        let email_val = email.get_untracked();
        let password_val = password.get_untracked();
        let navigate = navigate.clone();
        spawn_local(async move {
            match commands::validate_login_form(&email_val, &password_val).await {
                Ok(found) if !found.is_empty() => {
                    set_errors.set(found);
                    return;
                }
                Ok(_) => set_errors.set(LoginFormErrors::default()),
                Err(e) => {
                    set_status.set(Some(e));
                    return;
                }
            }

            set_signing_in.set(true);
            set_status.set(None);
            match commands::login(&email_val, &password_val).await {
                Ok(outcome) => {
                    set_status.set(Some("Logged in successfully".to_string()));
                    navigate(&outcome.route, NavigateOptions::default());
                }
                Err(e) => set_status.set(Some(e)),
            }
            set_signing_in.set(false);
        });
    };

    view! {
        <form class="sign-in" on:submit=on_submit>
            <h2 class="sign-in-title">"Sign In"</h2>

            <div class="form-field">
                <input
                    type="email"
                    class="input"
                    placeholder="Enter your email"
                    prop:value=move || email.get()
                    on:input=move |ev| set_email.set(event_target_value(&ev))
                />
                <Show when=move || errors.get().email.is_some()>
                    <p class="field-error">{move || errors.get().email.unwrap_or_default()}</p>
                </Show>
            </div>

            <div class="form-field">
                <div class="password-row">
                    <input
                        type=move || if show_password.get() { "text" } else { "password" }
                        class="input"
                        placeholder="Enter your password"
                        prop:value=move || password.get()
                        on:input=move |ev| set_password.set(event_target_value(&ev))
                    />
                    <button
                        type="button"
                        class="btn-link"
                        aria-label=move || if show_password.get() { "Hide password" } else { "Show password" }
                        on:click=move |_| set_show_password.update(|s| *s = !*s)
                    >
                        {move || if show_password.get() { "Hide" } else { "Show" }}
                    </button>
                </div>
                <Show when=move || errors.get().password.is_some()>
                    <p class="field-error">{move || errors.get().password.unwrap_or_default()}</p>
                </Show>
            </div>

            <button type="submit" class="btn btn-primary" disabled=move || signing_in.get()>
                {move || if signing_in.get() { "Signing In..." } else { "Sign In" }}
            </button>

            {move || status.get().map(|msg| view! { <p class="status-message">{msg}</p> })}
        </form>
    }
}
