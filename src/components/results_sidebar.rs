use leptos::prelude::*;
use wasm_bindgen::JsValue;

use crate::commands::ImageResult;

/// Display text for a behaviour class.
pub fn behaviour_label(image_class: &str) -> String {
    let normalized = image_class.trim().to_lowercase();
    match normalized.as_str() {
        "" => "N/A".to_string(),
        "resting" => "Resting".to_string(),
        "feeding" => "Feeding".to_string(),
        _ => image_class.to_string(),
    }
}

fn local_date(timestamp: &str) -> String {
    let date = if timestamp.is_empty() {
        js_sys::Date::new_0()
    } else {
        js_sys::Date::new(&JsValue::from_str(timestamp))
    };
    date.to_locale_date_string("default", &JsValue::UNDEFINED).into()
}

fn text_of(
    current: Signal<Option<ImageResult>>,
    read: fn(&ImageResult) -> String,
    fallback: &'static str,
) -> impl Fn() -> String + Copy + Send + Sync + 'static {
    move || {
        current.with(|c| {
            c.as_ref()
                .map(read)
                .unwrap_or_else(|| fallback.to_string())
        })
    }
}

fn count_of(
    current: Signal<Option<ImageResult>>,
    read: fn(&ImageResult) -> u32,
) -> impl Fn() -> u32 + Copy + Send + Sync + 'static {
    move || current.with(|c| c.as_ref().map(read).unwrap_or(0))
}

#[component]
pub fn ResultsSidebar(
    #[prop(into)] current: Signal<Option<ImageResult>>,
    #[prop(into)] marked_poor: Signal<Vec<String>>,
    #[prop(into)] on_mark_poor: Callback<String>,
) -> impl IntoView {
    let is_marked = move || {
        current.with(|c| {
            c.as_ref()
                .is_some_and(|img| marked_poor.with(|m| m.contains(&img.image_name)))
        })
    };

    let mark_current = move |_| {
        if let Some(image) = current.get_untracked() {
            on_mark_poor.run(image.image_name);
        }
    };

    view! {
        <aside class="results-sidebar">
            <section class="card">
                <h3 class="card-title">"Detection Results"</h3>
                <div class="result-row">
                    <span>"Dugong Count"</span>
                    <span class="badge">{count_of(current, |r| r.dugong_count)}</span>
                </div>
                <div class="result-row">
                    <span>"Mother Calf Count"</span>
                    <span class="badge">{count_of(current, |r| r.mother_calf_count)}</span>
                </div>
                <div class="result-row">
                    <span title="(2 x Mother Calf Count) + Dugong Count">"Total Count"</span>
                    <span class="badge">{count_of(current, ImageResult::total_count)}</span>
                </div>
                <div class="result-row">
                    <span>"Behaviour"</span>
                    <span class="badge badge-behaviour">
                        {text_of(current, |r| behaviour_label(&r.image_class), "N/A")}
                    </span>
                </div>
            </section>

            <section class="card">
                <h3 class="card-title">"Meta Data"</h3>
                <div class="result-row">
                    <span>"Captured Date"</span>
                    <span class="badge">
                        {text_of(current, |r| r.captured_date.clone().unwrap_or_else(|| "N/A".to_string()), "N/A")}
                    </span>
                </div>
                <div class="result-row">
                    <span>"Processed Date"</span>
                    <span class="badge">{text_of(current, |r| local_date(&r.created_at), "")}</span>
                </div>
                <div class="result-row">
                    <span>"Image Name"</span>
                    <span class="badge badge-name" title=text_of(current, |r| r.image_name.clone(), "")>
                        {text_of(current, |r| r.image_name.clone(), "image.jpg")}
                    </span>
                </div>
            </section>

            <section class="card">
                <h3 class="card-title">"Legend"</h3>
                <div class="legend-row"><span>"Dugong"</span><span class="swatch swatch-dugong"></span></div>
                <div class="legend-row"><span>"Mother Calf"</span><span class="swatch swatch-calf"></span></div>
            </section>

            <button
                class="btn btn-secondary"
                disabled=move || current.with(Option::is_none) || is_marked()
                on:click=mark_current
            >
                {move || if is_marked() { "Marked as Poor Quality" } else { "Mark as Poor Quality" }}
            </button>
        </aside>
    }
}
