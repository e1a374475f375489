//! Staged file replacement shared by the filesystem stores.

use std::{io::ErrorKind, path::Path};

use tokio::fs;
use tracing::warn;

/// Write `contents` to `staging`, then move it over `target`.
pub(crate) async fn replace_file(
    staging: &Path,
    target: &Path,
    contents: &[u8],
) -> std::io::Result<()> {
    fs::write(staging, contents).await?;
    fs::rename(staging, target).await
}

/// Best-effort removal of a staging file left by a failed [`replace_file`].
pub(crate) async fn discard_staging(staging: &Path) {
    match fs::remove_file(staging).await {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(
            path = %staging.display(),
            error = %err,
            "failed to remove staging file"
        ),
    }
}
