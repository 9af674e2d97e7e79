use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::DugongError;
use crate::session::SessionContext;

/// `{session_id}.csv`, with characters that would leave the directory
/// replaced.
pub fn csv_file_name(session_id: &str) -> String {
    let safe: String = session_id
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let safe = safe.trim_matches('.');
    if safe.is_empty() {
        "session.csv".to_string()
    } else {
        format!("{}.csv", safe)
    }
}

/// Write the bytes to `target_path` through a temp file in the same
/// directory, so a reader never sees a partial CSV.
pub fn write_csv_atomic(bytes: &[u8], target_path: &Path) -> Result<()> {
    let parent = target_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Target path has no parent directory: {:?}", target_path))?;
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.persist(target_path)?;

    info!("Wrote {} bytes of CSV to {:?}", bytes.len(), target_path);
    Ok(())
}

/// Download the session CSV into `target_dir`, or the user's download
/// directory when none is given. Returns where it was saved.
pub async fn export_results_csv(
    ctx: &SessionContext,
    target_dir: Option<PathBuf>,
) -> Result<PathBuf, DugongError> {
    let session_id = ctx
        .current_session_id()
        .ok_or_else(|| DugongError::Session("No active session to export".to_string()))?;

    let bytes = ctx.api.export_session_csv(&session_id).await?;

    let dir = target_dir
        .or_else(dirs::download_dir)
        .or_else(dirs::home_dir)
        .ok_or_else(|| DugongError::Export("No download directory available".to_string()))?;
    let path = dir.join(csv_file_name(&session_id));

    write_csv_atomic(&bytes, &path).map_err(|e| DugongError::Export(e.to_string()))?;
    Ok(path)
}
