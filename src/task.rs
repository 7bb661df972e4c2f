//! Task list model for a workspace's `tasks.json`.
//!
//! The core never edits individual tasks. It reads them to aggregate by
//! status and to render them; any field it does not know is carried along
//! in `extra` so a typed read never drops data written by the task engine.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::storage::Storage;

/// Task status as written by the task engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
    Blocked,
    Deferred,
    Cancelled,
    /// Any status string this tool does not recognise
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Deferred => "deferred",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Other(raw) => raw,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "⏳",
            TaskStatus::InProgress => "🔄",
            TaskStatus::Done => "✅",
            TaskStatus::Blocked => "🚫",
            TaskStatus::Deferred => "⏸️",
            TaskStatus::Cancelled => "❌",
            TaskStatus::Other(_) => "📌",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl From<String> for TaskStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => TaskStatus::Pending,
            "in-progress" => TaskStatus::InProgress,
            "done" => TaskStatus::Done,
            "blocked" => TaskStatus::Blocked,
            "deferred" => TaskStatus::Deferred,
            "cancelled" => TaskStatus::Cancelled,
            _ => TaskStatus::Other(raw),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Numeric in task-master, but kept loose so string ids survive
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Task id as display text (`7`, not `"7"`)
    pub fn display_id(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            Value::Null => "?".to_string(),
            other => other.to_string(),
        }
    }
}

/// Contents of a `tasks.json` file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskList {
    /// Load a task list, returning `None` if the file does not exist
    pub fn load(storage: &Storage, path: &Path) -> Result<Option<Self>> {
        storage.read_json_opt(path)
    }
}

/// Cached aggregate counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub in_progress: usize,
    pub pending: usize,
}

/// Count tasks by status.
///
/// Only done, in-progress and pending are tracked individually; every other
/// status contributes to the total alone.
pub fn calculate_stats(tasks: &[Task]) -> TaskStats {
    let mut stats = TaskStats {
        total_tasks: tasks.len(),
        ..TaskStats::default()
    };

    for task in tasks {
        match task.status {
            TaskStatus::Done => stats.completed_tasks += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Pending => stats.pending += 1,
            _ => {}
        }
    }

    stats
}
