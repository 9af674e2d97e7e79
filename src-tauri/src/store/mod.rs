//! The three client-side state containers. Each owns its state behind a
//! short-lived mutex and is shared through the session context.

pub mod credentials;
pub mod images;
pub mod upload;

use std::sync::{Mutex, MutexGuard};

pub use credentials::{AuthSnapshot, CredentialRecord, CredentialStore};
pub use images::{ImageResult, ImageResultStore, ResultsSnapshot};
pub use upload::{
    NewFile, PersistedUpload, UploadFileView, UploadSessionStore, UploadSnapshot, UploadStatus,
};

/// Lock a store's state, recovering it if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
