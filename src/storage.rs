//! Storage layer for tmw
//!
//! All state lives under the TaskMaster state directory (`.taskmaster/` by
//! default), which is created by the parent tool and must already exist.
//!
//! # Directory Structure
//!
//! ```text
//! .taskmaster/
//!   config.json                 # Parent tool config; tmw owns the `workspaces` key
//!   tasks/
//!     tasks.json                # Mirror of the active workspace (engine reads this)
//!   workspaces/
//!     <name>/
//!       tasks.json              # Task list store
//!       metadata.json           # Description, timestamps, cached stats, tags
//!       reports/                # Reserved for the task engine
//!   archive/
//!     <name>_<millis>/          # Soft-deleted workspace directories
//! ```

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

/// Default name of the state directory under the project root
pub const STATE_DIR: &str = ".taskmaster";

const CONFIG_FILE: &str = "config.json";
const WORKSPACES_DIR: &str = "workspaces";
const TASKS_DIR: &str = "tasks";
const ARCHIVE_DIR: &str = "archive";
const TASKS_FILE: &str = "tasks.json";
const METADATA_FILE: &str = "metadata.json";
const REPORTS_DIR: &str = "reports";

/// Path layout and file I/O for the state directory
#[derive(Debug, Clone)]
pub struct Storage {
    /// Project root the state directory belongs to
    project_root: PathBuf,
    /// Path to the state directory
    state_dir: PathBuf,
}

impl Storage {
    /// Create a storage manager for an explicit state directory
    pub fn new(project_root: PathBuf, state_dir: PathBuf) -> Self {
        Self {
            project_root,
            state_dir,
        }
    }

    /// Create storage using the default `.taskmaster/` state directory
    pub fn for_project(project_root: PathBuf) -> Self {
        let state_dir = project_root.join(STATE_DIR);
        Self::new(project_root, state_dir)
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Path to the shared `config.json`
    pub fn config_file(&self) -> PathBuf {
        self.state_dir.join(CONFIG_FILE)
    }

    pub fn workspaces_dir(&self) -> PathBuf {
        self.state_dir.join(WORKSPACES_DIR)
    }

    pub fn workspace_dir(&self, name: &str) -> PathBuf {
        self.workspaces_dir().join(name)
    }

    pub fn workspace_tasks_file(&self, name: &str) -> PathBuf {
        self.workspace_dir(name).join(TASKS_FILE)
    }

    pub fn workspace_metadata_file(&self, name: &str) -> PathBuf {
        self.workspace_dir(name).join(METADATA_FILE)
    }

    pub fn workspace_reports_dir(&self, name: &str) -> PathBuf {
        self.workspace_dir(name).join(REPORTS_DIR)
    }

    /// Path to the mirrored active task file
    ///
    /// Before workspaces existed this was the only task list, so it doubles
    /// as the legacy location picked up by the one-time migration.
    pub fn mirror_file(&self) -> PathBuf {
        self.state_dir.join(TASKS_DIR).join(TASKS_FILE)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.state_dir.join(ARCHIVE_DIR)
    }

    // =========================================================================
    // Directory initialization
    // =========================================================================

    /// Check if the parent tool has created the state directory
    pub fn is_initialized(&self) -> bool {
        self.state_dir.is_dir()
    }

    /// Ensure the state directory exists and has a `workspaces/` subdirectory
    pub fn ensure_layout(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized(self.state_dir.clone()));
        }
        fs::create_dir_all(self.workspaces_dir())?;
        Ok(())
    }

    /// Create a workspace directory and its reports subdirectory
    pub fn init_workspace_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.workspace_dir(name);
        fs::create_dir_all(self.workspace_reports_dir(name))?;
        Ok(dir)
    }

    // =========================================================================
    // File I/O helpers (atomic writes for safety)
    // =========================================================================

    /// Write JSON data atomically (write to temp, then rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        write_atomic(path, json.as_bytes())
    }

    /// Read and validate JSON data from a file
    ///
    /// A file that exists but does not match the expected schema is reported
    /// as `CorruptState` rather than a bare parse error.
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|err| Error::corrupt(path, err))
    }

    /// Read JSON data, returning `None` when the file does not exist
    pub fn read_json_opt<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|err| Error::corrupt(path, err)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Contents and modification time of a file, both `None` when missing
    pub fn snapshot(&self, path: &Path) -> Result<FileSnapshot> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(FileSnapshot::default()),
            Err(err) => return Err(Error::Io(err)),
        };
        Ok(FileSnapshot {
            bytes: Some(bytes),
            modified: Some(fs::metadata(path)?.modified()?),
        })
    }

    /// Copy a file byte-for-byte onto `dest` atomically
    ///
    /// Returns `false` without touching `dest` when `src` does not exist.
    pub fn copy_atomic(&self, src: &Path, dest: &Path) -> Result<bool> {
        let bytes = match fs::read(src) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(Error::Io(err)),
        };
        write_atomic(dest, &bytes)?;
        Ok(true)
    }
}

/// Point-in-time view of a file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSnapshot {
    pub bytes: Option<Vec<u8>>,
    pub modified: Option<SystemTime>,
}

impl FileSnapshot {
    /// Whether this file holds different content written after `other`
    /// (or `other` is missing)
    pub fn is_newer_than(&self, other: &FileSnapshot) -> bool {
        if self.bytes == other.bytes {
            return false;
        }
        match (self.modified, other.modified) {
            (Some(mine), Some(theirs)) => mine > theirs,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Atomically write data to a file
///
/// Writes to a temporary sibling file, then renames it over the target. The
/// file is either fully written or not modified at all.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Temp file must be in the same directory for the rename to be atomic
    let temp_path = path.with_extension(format!(
        "{}.tmp.{}",
        path.extension().and_then(|e| e.to_str()).unwrap_or(""),
        std::process::id()
    ));

    let mut temp_file = File::create(&temp_path)?;
    temp_file.write_all(data)?;
    temp_file.sync_all()?;
    drop(temp_file);

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::Io(err));
    }

    Ok(())
}
