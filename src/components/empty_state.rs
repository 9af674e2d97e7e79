use leptos::prelude::*;

#[component]
pub fn EmptyState(
    #[prop(into)] on_upload_click: Callback<()>,
    #[prop(into)] processing: Signal<bool>,
) -> impl IntoView {
    view! {
        <div class="empty-state">
            <h2>"No images yet"</h2>
            <p class="empty-hint">
                "Upload aerial survey images to count dugongs and mother-calf pairs."
            </p>
            <Show
                when=move || processing.get()
                fallback=move || view! {
                    <button class="btn btn-primary" on:click=move |_| on_upload_click.run(())>
                        "Upload Images"
                    </button>
                }
            >
                <p class="processing-banner">"Processing images... Please wait."</p>
            </Show>
        </div>
    }
}
