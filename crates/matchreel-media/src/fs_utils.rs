//! Filesystem helpers for staging and publishing media files.
//!
//! FFmpeg writes into a `.partial` sibling of the final path, which is only
//! renamed into place once the encode succeeded, so a crashed encode never
//! leaves a truncated file under a real name.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::MediaResult;

/// Staging path used while a file is being written.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Create the parent directory of `path` if it is missing.
pub async fn ensure_parent(path: &Path) -> MediaResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Rename `src` onto `dst`, replacing any existing file.
///
/// Callers stage `src` next to `dst`, so this is a same-directory rename.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let dst = dst.as_ref();
    ensure_parent(dst).await?;
    fs::rename(src.as_ref(), dst).await?;
    Ok(())
}

/// Remove a file, ignoring a missing one.
pub async fn remove_if_exists(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}
