use leptos::prelude::*;

use crate::commands::ResultsSnapshot;

/// "Image i of n" with i counted from one.
pub fn position_label(current_index: usize, total: usize) -> String {
    if total == 0 {
        return "Image 0 of 0".to_string();
    }
    format!("Image {} of {}", current_index + 1, total)
}

#[component]
pub fn ImageViewer(
    #[prop(into)] results: Signal<ResultsSnapshot>,
    #[prop(into)] on_previous: Callback<()>,
    #[prop(into)] on_next: Callback<()>,
    #[prop(into)] on_select: Callback<usize>,
) -> impl IntoView {
    let at_start = move || results.with(|r| r.current_index == 0);
    let at_end = move || results.with(|r| r.current_index + 1 >= r.total);

    view! {
        <div class="image-viewer">
            <div class="viewer-header">
                <button class="btn btn-ghost" disabled=at_start on:click=move |_| on_previous.run(())>
                    "Previous"
                </button>
                <span class="viewer-position">
                    {move || results.with(|r| position_label(r.current_index, r.total))}
                </span>
                <button class="btn btn-ghost" disabled=at_end on:click=move |_| on_next.run(())>
                    "Next"
                </button>
            </div>

            <div class="viewer-frame">
                {move || results.with(|r| r.current().map(|image| view! {
                    <img
                        src=image.image_url.clone()
                        alt=image.image_name.clone()
                        class="viewer-image"
                    />
                }))}
            </div>

            <div class="viewer-strip">
                {move || results.with(|r| {
                    let current = r.current_index;
                    r.results.iter().enumerate().map(|(index, image)| {
                        view! {
                            <button
                                class="strip-item"
                                class:strip-item-active=index == current
                                title=image.image_name.clone()
                                on:click=move |_| on_select.run(index)
                            >
                                {index + 1}
                            </button>
                        }
                    }).collect::<Vec<_>>()
                })}
            </div>
        </div>
    }
}
