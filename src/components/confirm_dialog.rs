use leptos::prelude::*;

/// Modal yes/no prompt. Hidden while `open` is false.
#[component]
pub fn ConfirmDialog(
    #[prop(into)] open: Signal<bool>,
    #[prop(into)] title: String,
    #[prop(into)] message: Signal<String>,
    #[prop(into)] confirm_text: String,
    #[prop(into)] cancel_text: String,
    #[prop(into)] on_confirm: Callback<()>,
    #[prop(into)] on_cancel: Callback<()>,
) -> impl IntoView {
    view! {
        <Show when=move || open.get()>
            <div class="dialog-backdrop" on:click=move |_| on_cancel.run(())>
                <div
                    class="dialog"
                    role="alertdialog"
                    on:click=|ev| ev.stop_propagation()
                >
                    <h3 class="dialog-title">{title.clone()}</h3>
                    <p class="dialog-message">{move || message.get()}</p>
                    <div class="dialog-actions">
                        <button class="btn btn-secondary" on:click=move |_| on_cancel.run(())>
                            {cancel_text.clone()}
                        </button>
                        <button class="btn btn-danger" on:click=move |_| on_confirm.run(())>
                            {confirm_text.clone()}
                        </button>
                    </div>
                </div>
            </div>
        </Show>
    }
}
