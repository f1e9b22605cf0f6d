//! Filesystem helpers shared across modules.
//!
//! All helpers attach the operation and path to IO errors.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::{Error, Result};

/// Ensure a directory exists, creating it (recursively) if needed.
pub async fn ensure_dir_all(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Error::io_path("creating directory", path, e))
}

/// Remove a file, treating "already absent" as success.
///
/// Returns whether a file was actually removed.
pub async fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io_path("removing", path, e)),
    }
}

/// Move `source` onto `target`, deleting any existing `target` first.
///
/// Rename cannot overwrite an existing file on every filesystem, so the old
/// target is deleted before the move. Not transactional: if the process dies
/// between the two steps, `target` is absent while `source` is still intact.
/// A missing `source` is reported before `target` is touched.
pub async fn replace_file(source: &Path, target: &Path) -> Result<()> {
    tokio::fs::metadata(source)
        .await
        .map_err(|e| Error::io_path("reading", source, e))?;

    if remove_file_if_exists(target).await? {
        debug!(path = %target.display(), "Removed stale output before replace");
    }

    tokio::fs::rename(source, target)
        .await
        .map_err(|e| Error::io_path("renaming into", target, e))
}
