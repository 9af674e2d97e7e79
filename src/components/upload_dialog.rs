//! Image picker and upload step for a survey session.
//!
//! Files are checked by name, type and size before any bytes are read, then
//! staged with the backend, which owns the upload itself.

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use crate::commands::{
    self, FileMeta, StagedFile, UploadSnapshot, UploadStatus, UploadSummary,
};

const ACCEPTED_TYPES: &str = "image/png,image/jpg,image/jpeg";

#[component]
pub fn UploadDialog(
    #[prop(into)] open: Signal<bool>,
    #[prop(into)] on_close: Callback<()>,
    #[prop(into)] on_uploaded: Callback<UploadSummary>,
) -> impl IntoView {
    let (snapshot, set_snapshot) = signal(UploadSnapshot::default());
    let (error, set_error) = signal::<Option<String>>(None);
    let (is_over, set_is_over) = signal(false);
    let (is_reading, set_is_reading) = signal(false);
    let (is_uploading, set_is_uploading) = signal(false);
    let file_input_id = "survey-file-input";

    Effect::new(move |_| {
        if !open.get() {
            return;
        }
        spawn_local(async move {
            match commands::upload_state().await {
                Ok(state) => set_snapshot.set(state),
                Err(e) => set_error.set(Some(e)),
            }
        });
    });

    let pending_count = move || {
        snapshot
            .get()
            .files
            .iter()
            .filter(|f| f.status == UploadStatus::Pending)
            .count()
    };

    let handle_files = move |files: Vec<web_sys::File>| {
        if files.is_empty() {
            return;
        }
        set_error.set(None);
        set_is_reading.set(true);
        spawn_local(async move {
            match stage(files).await {
                Ok(state) => set_snapshot.set(state),
                Err(e) => set_error.set(Some(e)),
            }
            set_is_reading.set(false);
        });
    };

    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        set_is_over.set(false);
        if let Some(files) = ev.data_transfer().and_then(|dt| dt.files()) {
            handle_files(collect_files(&files));
        }
    };

    let on_input_change = move |ev: web_sys::Event| {
        let input: web_sys::HtmlInputElement = event_target(&ev);
        if let Some(files) = input.files() {
            handle_files(collect_files(&files));
        }
        input.set_value("");
    };

    let on_cancel = move |_| {
        spawn_local(async move {
            match commands::discard_pending_files().await {
                Ok(state) => set_snapshot.set(state),
                Err(e) => {
                    web_sys::console::error_1(&format!("Failed to discard files: {}", e).into());
                }
            }
            set_error.set(None);
            on_close.run(());
        });
    };

    let on_predict = move |_| {
        set_is_uploading.set(true);
        set_error.set(None);
        spawn_local(async move {
            let result = commands::upload_staged_files().await;
            if let Ok(state) = commands::upload_state().await {
                set_snapshot.set(state);
            }
            set_is_uploading.set(false);
            match result {
                Ok(summary) => {
                    on_uploaded.run(summary);
                    on_close.run(());
                }
                Err(e) => set_error.set(Some(e)),
            }
        });
    };

    view! {
        <Show when=move || open.get()>
            <div class="dialog-backdrop">
                <div class="dialog upload-dialog">
                    <h3 class="dialog-title">"Upload Images"</h3>

                    <div
                        class="drop-zone"
                        class:drop-zone-active=move || is_over.get()
                        class:drop-zone-loading=move || is_reading.get()
                        on:dragover=move |ev: web_sys::DragEvent| {
                            ev.prevent_default();
                            set_is_over.set(true);
                        }
                        on:dragleave=move |_| set_is_over.set(false)
                        on:drop=on_drop
                    >
                        <Show
                            when=move || is_reading.get()
                            fallback=move || view! {
                                <div class="drop-zone-content">
                                    <p class="drop-main">"Drop survey images here"</p>
                                    <p class="drop-hint">"or"</p>
                                    <label for=file_input_id class="btn btn-secondary">
                                        "Browse Files"
                                    </label>
                                    <input
                                        type="file"
                                        id=file_input_id
                                        accept=ACCEPTED_TYPES
                                        multiple=true
                                        style="display: none"
                                        on:change=on_input_change
                                    />
                                    <p class="drop-formats">"PNG, JPG or JPEG, up to 25MB each, 150 per session"</p>
                                </div>
                            }
                        >
                            <div class="drop-zone-loading-content">
                                <div class="spinner"></div>
                                <p>"Reading images..."</p>
                            </div>
                        </Show>
                    </div>

                    {move || error.get().map(|msg| view! { <div class="error-banner">{msg}</div> })}

                    <ul class="upload-list">
                        {move || snapshot.get().files.into_iter().map(|file| {
                            let status_class = match file.status {
                                UploadStatus::Pending => "upload-item pending",
                                UploadStatus::Uploading => "upload-item uploading",
                                UploadStatus::Success => "upload-item success",
                                UploadStatus::Error => "upload-item error",
                            };
                            view! {
                                <li class=status_class title=file.error.clone().unwrap_or_default()>
                                    <span class="upload-name">{file.name.clone()}</span>
                                    <span class="upload-size">{format_size(file.size)}</span>
                                    <progress max="100" value=file.progress.to_string()></progress>
                                </li>
                            }
                        }).collect::<Vec<_>>()}
                    </ul>

                    <div class="dialog-actions">
                        <button
                            class="btn btn-secondary"
                            disabled=move || is_uploading.get()
                            on:click=on_cancel
                        >
                            "Cancel"
                        </button>
                        <button
                            class="btn btn-primary"
                            disabled=move || is_uploading.get() || is_reading.get() || pending_count() == 0
                            on:click=on_predict
                        >
                            {move || {
                                if is_uploading.get() {
                                    "Predicting...".to_string()
                                } else {
                                    predict_label(pending_count())
                                }
                            }}
                        </button>
                    </div>
                </div>
            </div>
        </Show>
    }
}

fn predict_label(count: usize) -> String {
    if count == 1 {
        "Predict 1 Image with AI".to_string()
    } else {
        format!("Predict {} Images with AI", count)
    }
}

fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f >= MB {
        format!("{:.1} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.0} KB", bytes_f / KB)
    } else {
        format!("{} B", bytes)
    }
}

fn collect_files(list: &web_sys::FileList) -> Vec<web_sys::File> {
    (0..list.length()).filter_map(|i| list.get(i)).collect()
}

fn file_meta(file: &web_sys::File) -> FileMeta {
    FileMeta {
        name: file.name(),
        mime_type: file.type_(),
        size: file.size() as u64,
    }
}

/// Check the whole batch, then read and stage it.
async fn stage(files: Vec<web_sys::File>) -> Result<UploadSnapshot, String> {
    let metas: Vec<FileMeta> = files.iter().map(file_meta).collect();
    commands::check_file_selection(&metas).await?;

    let mut staged = Vec::with_capacity(files.len());
    for (file, meta) in files.into_iter().zip(metas) {
        staged.push(StagedFile {
            name: meta.name,
            mime_type: meta.mime_type,
            data_base64: read_file_as_base64(file).await?,
        });
    }
    commands::stage_files(&staged).await
}

async fn read_file_as_base64(file: web_sys::File) -> Result<String, String> {
    use js_sys::{ArrayBuffer, Uint8Array};
    use wasm_bindgen_futures::JsFuture;

    let name = file.name();
    let array_buffer: ArrayBuffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| format!("Failed to read {}: {:?}", name, e))?
        .dyn_into()
        .map_err(|_| format!("Failed to read {}", name))?;

    let bytes = Uint8Array::new(&array_buffer).to_vec();
    Ok(base64_encode(&bytes))
}

/// Standard alphabet, padded.
fn base64_encode(bytes: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    let mut result = String::with_capacity(bytes.len().div_ceil(3) * 4);

    for chunk in bytes.chunks(3) {
        let b0 = chunk[0] as usize;
        let b1 = chunk.get(1).copied().unwrap_or(0) as usize;
        let b2 = chunk.get(2).copied().unwrap_or(0) as usize;

        result.push(ALPHABET[b0 >> 2] as char);
        result.push(ALPHABET[((b0 & 0x03) << 4) | (b1 >> 4)] as char);

        if chunk.len() > 1 {
            result.push(ALPHABET[((b1 & 0x0f) << 2) | (b2 >> 6)] as char);
        } else {
            result.push('=');
        }

        if chunk.len() > 2 {
            result.push(ALPHABET[b2 & 0x3f] as char);
        } else {
            result.push('=');
        }
    }

    result
}
