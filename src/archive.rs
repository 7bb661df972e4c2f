//! Soft delete of workspace directories.
//!
//! Archiving is a rename into `archive/<name>_<millis>/`; nothing is erased
//! and there is no automated restore.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::Result;
use crate::storage::Storage;

/// Move a workspace directory into the archive.
///
/// Returns the archive path, or `None` if the workspace directory is
/// already gone.
pub fn archive_workspace(storage: &Storage, name: &str) -> Result<Option<PathBuf>> {
    let source = storage.workspace_dir(name);
    if !source.exists() {
        return Ok(None);
    }

    let archive_root = storage.archive_dir();
    fs::create_dir_all(&archive_root)?;

    let target = unique_archive_path(&archive_root, name, Utc::now().timestamp_millis());
    fs::rename(&source, &target)?;
    tracing::info!(workspace = name, archive = %target.display(), "archived workspace");
    Ok(Some(target))
}

/// First free `<name>_<millis>` path, bumping the suffix on collision.
fn unique_archive_path(archive_root: &Path, name: &str, millis: i64) -> PathBuf {
    let mut suffix = millis;
    loop {
        let candidate = archive_root.join(format!("{name}_{suffix}"));
        if !candidate.exists() {
            return candidate;
        }
        suffix += 1;
    }
}
