#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;
use tmw::storage::Storage;
use tmw::workspace::Registry;

/// A throwaway project with an initialized `.taskmaster` directory
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn init() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join(".taskmaster"))?;
        Ok(Self { dir })
    }

    /// A project whose state directory was never created
    pub fn uninitialized() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join(".taskmaster")
    }

    pub fn storage(&self) -> Storage {
        Storage::for_project(self.dir.path().to_path_buf())
    }

    pub fn open(&self) -> tmw::Result<Registry> {
        Registry::open(self.storage())
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Write the pre-workspace task list at `.taskmaster/tasks/tasks.json`
    pub fn write_legacy_tasks(&self, tasks: Value) -> std::io::Result<PathBuf> {
        let body = serde_json::json!({ "tasks": tasks });
        self.write_file(".taskmaster/tasks/tasks.json", &body.to_string())
    }

    pub fn write_config(&self, config: Value) -> std::io::Result<PathBuf> {
        self.write_file(".taskmaster/config.json", &config.to_string())
    }

    pub fn read_json(&self, rel_path: &str) -> Result<Value, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(self.dir.path().join(rel_path))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn read_bytes(&self, rel_path: &str) -> std::io::Result<Vec<u8>> {
        fs::read(self.dir.path().join(rel_path))
    }

    pub fn mirror(&self) -> std::io::Result<Vec<u8>> {
        self.read_bytes(".taskmaster/tasks/tasks.json")
    }

    /// Entries of `.taskmaster/archive`, sorted
    pub fn archived(&self) -> std::io::Result<Vec<String>> {
        let dir = self.state_dir().join("archive");
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
