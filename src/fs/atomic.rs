//! Atomic filesystem writes.
//!
//! All atomic writes follow this pattern:
//! 1. Write content to a temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename it over the target
//!
//! `rename` replaces the destination in one step on both POSIX and Windows as
//! long as source and destination share a filesystem, which is why the
//! temporary file lives next to the target. If any step fails the target is
//! left untouched.
//!
//! On crash a temporary file may remain (named `.{filename}.{pid}.tmp`). It is
//! truncated and reused by the next write from a process with the same pid.

use crate::error::{Result, StoreError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Atomically write bytes to a file.
///
/// Parent directories are created if needed. On failure the previous content
/// of `path` (or its absence) is preserved.
///
/// # Example
///
/// ```no_run
/// use docstore::fs::atomic_write;
/// use std::path::Path;
///
/// atomic_write(Path::new("store.xml"), b"<github/>")?;
/// # Ok::<(), docstore::error::StoreError>(())
/// ```
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            StoreError::PersistError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;
    replace(&temp_path, path)
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Temporary sibling path used while writing `target`.
pub(crate) fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            StoreError::PersistError(format!("invalid file path '{}'", target.display()))
        })?;

    Ok(parent.join(format!(".{}.{}.tmp", filename, std::process::id())))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        StoreError::PersistError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let written = file.write_all(content).and_then(|()| file.sync_all());
    if let Err(e) = written {
        discard(path);
        return Err(StoreError::PersistError(format!(
            "failed to write temporary file '{}': {}",
            path.display(),
            e
        )));
    }

    Ok(())
}

fn replace(source: &Path, target: &Path) -> Result<()> {
    if let Err(e) = fs::rename(source, target) {
        discard(source);
        return Err(StoreError::PersistError(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        )));
    }

    // Persist the directory entry as well.
    #[cfg(unix)]
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        })
        && let Err(e) = dir.sync_all()
    {
        warn!("failed to sync directory '{}': {}", parent.display(), e);
    }

    Ok(())
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("failed to remove temporary file '{}': {}", path.display(), e);
    }
}
