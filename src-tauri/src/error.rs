use thiserror::Error;

#[derive(Debug, Error)]
pub enum DugongError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error(transparent)]
    Api(#[from] crate::api::ApiError),
}

impl From<DugongError> for String {
    fn from(err: DugongError) -> Self {
        err.to_string()
    }
}
