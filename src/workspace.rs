//! Workspace registry.
//!
//! The registry owns the `workspaces` key of `config.json`: which workspaces
//! exist, where each one keeps its task list, and which one is current. The
//! current workspace's task list is mirrored into `tasks/tasks.json`, the
//! only file the external task engine is expected to touch.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::archive;
use crate::engine::{EngineAction, EngineRequest, EngineResponse, TaskEngine};
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::task::{calculate_stats, Task, TaskList, TaskStats};

/// Name of the protected fallback workspace
pub const DEFAULT_WORKSPACE: &str = "default";

const MIGRATED_DESCRIPTION: &str = "Default workspace (migrated from original tasks)";
const MIGRATED_DISPLAY_NAME: &str = "Default workspace";

// =============================================================================
// Persisted registry state
// =============================================================================

/// Key of `config.json` owned by the registry
const CONFIG_KEY: &str = "workspaces";

/// The `workspaces` value of `config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspacesRegistry {
    #[serde(default = "default_current")]
    pub current: String,
    #[serde(default)]
    pub available: WorkspaceMap,
}

fn default_current() -> String {
    DEFAULT_WORKSPACE.to_string()
}

impl Default for WorkspacesRegistry {
    fn default() -> Self {
        Self {
            current: default_current(),
            available: WorkspaceMap::default(),
        }
    }
}

/// Registry entry for a single workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    /// Display name (the description, or the key when none was given)
    pub name: String,
    #[serde(rename = "tasksFile")]
    pub tasks_file: PathBuf,
}

/// Insertion-ordered map from workspace name to entry.
///
/// Serialized as a JSON object; key order in the file is the listing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceMap(Vec<(String, WorkspaceEntry)>);

impl WorkspaceMap {
    pub fn get(&self, name: &str) -> Option<&WorkspaceEntry> {
        self.0.iter().find(|(key, _)| key == name).map(|(_, entry)| entry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace, keeping the original position on replace
    pub fn insert(&mut self, name: String, entry: WorkspaceEntry) {
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = entry,
            None => self.0.push((name, entry)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<WorkspaceEntry> {
        let idx = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WorkspaceEntry)> {
        self.0.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for WorkspaceMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, entry) in &self.0 {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WorkspaceMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct MapVisitor;

        impl<'de> Visitor<'de> for MapVisitor {
            type Value = WorkspaceMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of workspace name to entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<WorkspaceMap, A::Error> {
                let mut map = WorkspaceMap::default();
                while let Some((key, entry)) = access.next_entry::<String, WorkspaceEntry>()? {
                    map.insert(key, entry);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

/// Contents of a workspace's `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub stats: TaskStats,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkspaceMetadata {
    fn new(name: &str, description: &str, stats: TaskStats, tags: Vec<String>) -> Self {
        let now = now_timestamp();
        Self {
            name: name.to_string(),
            description: description.to_string(),
            created: now.clone(),
            last_modified: now,
            stats,
            tags,
            extra: Map::new(),
        }
    }
}

/// RFC 3339 UTC with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// Operation results
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreatedWorkspace {
    pub name: String,
    pub display_name: String,
    pub tasks_file: PathBuf,
    /// Stats of the `default` workspace if legacy tasks were imported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrated_default: Option<TaskStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchOutcome {
    pub name: String,
    pub mirror: PathBuf,
    /// False when the target's task file was missing and the mirror was left as-is
    pub mirror_synced: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_to: Option<PathBuf>,
    /// Set when the deleted workspace was current
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switched_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSummary {
    pub name: String,
    pub display_name: String,
    pub stats: TaskStats,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceStatistics {
    pub name: String,
    pub stats: TaskStats,
    pub last_modified: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentSummary {
    pub name: String,
    pub stats: TaskStats,
}

// =============================================================================
// Registry handle
// =============================================================================

/// Handle over the registry state of one state directory
#[derive(Debug)]
pub struct Registry {
    storage: Storage,
    state: WorkspacesRegistry,
    /// Whole `config.json`; every key but `workspaces` belongs to the parent
    /// tool and is written back untouched, in its original order
    config: Map<String, Value>,
}

impl Registry {
    /// Open the registry, bootstrapping the `workspaces` key if absent.
    ///
    /// Fails with `NotInitialized` if the state directory does not exist and
    /// with `CorruptState` if `config.json` is present but malformed; a
    /// malformed file is never overwritten.
    pub fn open(storage: Storage) -> Result<Self> {
        storage.ensure_layout()?;

        let config_path = storage.config_file();
        let config: Map<String, Value> = storage.read_json_opt(&config_path)?.unwrap_or_default();

        let (state, bootstrap) = match config.get(CONFIG_KEY) {
            Some(value) => {
                let state = WorkspacesRegistry::deserialize(value)
                    .map_err(|err| Error::corrupt(&config_path, err))?;
                (state, false)
            }
            None => (WorkspacesRegistry::default(), true),
        };

        let mut registry = Self {
            storage,
            state,
            config,
        };
        if bootstrap {
            tracing::debug!(path = %config_path.display(), "initializing workspaces registry");
            registry.save()?;
        }
        Ok(registry)
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Name of the active workspace
    pub fn current(&self) -> &str {
        &self.state.current
    }

    pub fn available(&self) -> &WorkspaceMap {
        &self.state.available
    }

    pub fn entry(&self, name: &str) -> Option<&WorkspaceEntry> {
        self.available().get(name)
    }

    fn save(&mut self) -> Result<()> {
        let value = serde_json::to_value(&self.state)?;
        self.config.insert(CONFIG_KEY.to_string(), value);
        self.storage.write_json(&self.storage.config_file(), &self.config)
    }

    /// Resolve an entry's task file, relative paths being project-relative
    fn tasks_file(&self, name: &str) -> Option<PathBuf> {
        let entry = self.entry(name)?;
        if entry.tasks_file.is_absolute() {
            Some(entry.tasks_file.clone())
        } else {
            Some(self.storage.project_root().join(&entry.tasks_file))
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a workspace with an empty task list.
    ///
    /// Does not change the current workspace. The first workspace ever
    /// created also imports a pre-existing `tasks/tasks.json` as `default`.
    pub fn create(&mut self, name: &str, description: &str) -> Result<CreatedWorkspace> {
        validate_name(name)?;
        if self.available().contains(name) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        let first_workspace = self.available().is_empty();

        if self.storage.workspace_dir(name).exists() {
            tracing::warn!(workspace = name, "reusing unregistered workspace directory");
        }
        self.storage.init_workspace_dir(name)?;

        let tasks_file = self.storage.workspace_tasks_file(name);
        self.storage.write_json(&tasks_file, &TaskList::default())?;

        let metadata = WorkspaceMetadata::new(name, description, TaskStats::default(), Vec::new());
        self.storage
            .write_json(&self.storage.workspace_metadata_file(name), &metadata)?;

        let display_name = if description.is_empty() {
            name.to_string()
        } else {
            description.to_string()
        };
        self.state.available.insert(
            name.to_string(),
            WorkspaceEntry {
                name: display_name.clone(),
                tasks_file: tasks_file.clone(),
            },
        );

        let migrated_default = if first_workspace {
            self.migrate_default()?
        } else {
            None
        };

        self.save()?;
        tracing::info!(workspace = name, "created workspace");

        Ok(CreatedWorkspace {
            name: name.to_string(),
            display_name,
            tasks_file,
            migrated_default,
        })
    }

    /// Import the pre-workspace task list as the `default` workspace.
    ///
    /// No-op (returns `None`) when there is no legacy task file. Does not
    /// persist the registry or change the current workspace.
    fn migrate_default(&mut self) -> Result<Option<TaskStats>> {
        let legacy = self.storage.mirror_file();
        if !legacy.exists() {
            return Ok(None);
        }

        self.storage.init_workspace_dir(DEFAULT_WORKSPACE)?;
        let tasks_file = self.storage.workspace_tasks_file(DEFAULT_WORKSPACE);
        self.storage.copy_atomic(&legacy, &tasks_file)?;

        let stats = match TaskList::load(&self.storage, &tasks_file) {
            Ok(list) => calculate_stats(&list.unwrap_or_default().tasks),
            Err(err) => {
                tracing::warn!(error = %err, "legacy task list unreadable; migrated with empty stats");
                TaskStats::default()
            }
        };

        let metadata = WorkspaceMetadata::new(
            DEFAULT_WORKSPACE,
            MIGRATED_DESCRIPTION,
            stats,
            vec![DEFAULT_WORKSPACE.to_string(), "migrated".to_string()],
        );
        self.storage.write_json(
            &self.storage.workspace_metadata_file(DEFAULT_WORKSPACE),
            &metadata,
        )?;

        self.state.available.insert(
            DEFAULT_WORKSPACE.to_string(),
            WorkspaceEntry {
                name: MIGRATED_DISPLAY_NAME.to_string(),
                tasks_file,
            },
        );

        tracing::info!(tasks = stats.total_tasks, "migrated existing tasks to default workspace");
        Ok(Some(stats))
    }

    /// Make `name` the current workspace and refresh the mirror.
    pub fn switch(&mut self, name: &str) -> Result<SwitchOutcome> {
        if !self.available().contains(name) {
            return Err(Error::NotFound(name.to_string()));
        }

        self.state.current = name.to_string();
        self.save()?;
        let mirror_synced = self.sync_mirror(name)?;
        tracing::info!(workspace = name, "switched workspace");

        Ok(SwitchOutcome {
            name: name.to_string(),
            mirror: self.storage.mirror_file(),
            mirror_synced,
        })
    }

    /// Copy a workspace's task list onto the mirror.
    ///
    /// Returns `false` and leaves the mirror untouched when the workspace
    /// has no task file.
    pub fn sync_mirror(&self, name: &str) -> Result<bool> {
        let Some(source) = self.tasks_file(name) else {
            tracing::warn!(workspace = name, "no registry entry; mirror left as-is");
            return Ok(false);
        };

        let synced = self.storage.copy_atomic(&source, &self.storage.mirror_file())?;
        if !synced {
            tracing::warn!(
                workspace = name,
                file = %source.display(),
                "task file missing; mirror left as-is"
            );
        }
        Ok(synced)
    }

    /// Archive a workspace and drop it from the registry.
    ///
    /// `default` can never be deleted. Deleting the current workspace makes
    /// `default` current again.
    pub fn delete(&mut self, name: &str) -> Result<DeleteOutcome> {
        if name == DEFAULT_WORKSPACE {
            return Err(Error::Protected(name.to_string()));
        }
        if !self.available().contains(name) {
            return Err(Error::NotFound(name.to_string()));
        }

        let archived_to = archive::archive_workspace(&self.storage, name)?;
        if archived_to.is_none() {
            tracing::warn!(workspace = name, "workspace directory missing; nothing archived");
        }

        self.state.available.remove(name);

        let was_current = self.current() == name;
        if was_current {
            self.state.current = DEFAULT_WORKSPACE.to_string();
        }
        self.save()?;

        if was_current {
            self.sync_mirror(DEFAULT_WORKSPACE)?;
        }

        Ok(DeleteOutcome {
            name: name.to_string(),
            archived_to,
            switched_to: was_current.then(|| DEFAULT_WORKSPACE.to_string()),
        })
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Recompute a workspace's stats from its task file into its metadata.
    ///
    /// Only `stats` and `lastModified` change. Returns `None` without
    /// writing when the workspace, its task file or its metadata is missing.
    pub fn update_workspace_stats(&self, name: &str) -> Result<Option<TaskStats>> {
        let Some(tasks_file) = self.tasks_file(name) else {
            return Ok(None);
        };
        let Some(list) = TaskList::load(&self.storage, &tasks_file)? else {
            return Ok(None);
        };

        let metadata_path = self.storage.workspace_metadata_file(name);
        let Some(mut metadata) = self
            .storage
            .read_json_opt::<WorkspaceMetadata>(&metadata_path)?
        else {
            return Ok(None);
        };

        let stats = calculate_stats(&list.tasks);
        metadata.stats = stats;
        metadata.last_modified = now_timestamp();
        self.storage.write_json(&metadata_path, &metadata)?;
        tracing::debug!(workspace = name, total = stats.total_tasks, "updated workspace stats");

        Ok(Some(stats))
    }

    fn read_metadata(&self, name: &str) -> Option<WorkspaceMetadata> {
        let path = self.storage.workspace_metadata_file(name);
        match self.storage.read_json_opt(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(workspace = name, error = %err, "unreadable metadata");
                None
            }
        }
    }

    // =========================================================================
    // Listing / inspection
    // =========================================================================

    /// All workspaces in registry order with their cached stats.
    ///
    /// Never recomputes stats; missing or unreadable metadata shows zeros.
    pub fn list(&self) -> Vec<WorkspaceSummary> {
        let current = self.current();
        self.available()
            .iter()
            .map(|(name, entry)| WorkspaceSummary {
                name: name.to_string(),
                display_name: entry.name.clone(),
                stats: self
                    .read_metadata(name)
                    .map(|metadata| metadata.stats)
                    .unwrap_or_default(),
                current: name == current,
            })
            .collect()
    }

    /// Cached stats and modification time for workspaces with readable metadata
    pub fn statistics(&self) -> Vec<WorkspaceStatistics> {
        self.available()
            .iter()
            .filter_map(|(name, _)| {
                let metadata = self.read_metadata(name)?;
                Some(WorkspaceStatistics {
                    name: name.to_string(),
                    stats: metadata.stats,
                    last_modified: metadata.last_modified,
                })
            })
            .collect()
    }

    /// Tasks of the current workspace; empty if none can be resolved
    pub fn current_tasks(&self) -> Vec<Task> {
        let current = self.current();
        let Some(tasks_file) = self.tasks_file(current) else {
            return Vec::new();
        };

        match TaskList::load(&self.storage, &tasks_file) {
            Ok(list) => list.map(|list| list.tasks).unwrap_or_default(),
            Err(err) => {
                tracing::warn!(workspace = current, error = %err, "unreadable task list");
                Vec::new()
            }
        }
    }

    /// Current workspace with stats computed from its task file
    pub fn current_summary(&self) -> CurrentSummary {
        CurrentSummary {
            name: self.current().to_string(),
            stats: calculate_stats(&self.current_tasks()),
        }
    }

    // =========================================================================
    // Task engine
    // =========================================================================

    /// Run the task engine against the mirror of the current workspace.
    ///
    /// The mirror is used as it is; edits made to it with the engine directly
    /// are never overwritten here. After a successful mutating action the
    /// mirror is copied back into the workspace and its stats recomputed,
    /// unless the workspace file is newer than the mirror the engine saw.
    pub fn run_engine(
        &self,
        engine: &dyn TaskEngine,
        action: EngineAction,
        timeout: Duration,
    ) -> Result<EngineResponse> {
        let current = self.current().to_string();
        let Some(store) = self.tasks_file(&current) else {
            return Err(Error::NotFound(current));
        };

        let mirror = self.storage.mirror_file();
        let store_before = self.storage.snapshot(&store)?;
        let mirror_before = self.storage.snapshot(&mirror)?;

        let request = EngineRequest {
            action,
            tasks_file: mirror,
            project_root: self.storage.project_root().to_path_buf(),
            timeout,
        };
        let response = engine.run(&request)?;

        if request.action.mutates() {
            let store_now = self.storage.snapshot(&store)?;
            if store_now.bytes != store_before.bytes || store_before.is_newer_than(&mirror_before) {
                tracing::warn!(
                    workspace = %current,
                    store = %store.display(),
                    "workspace task file is newer than the mirror; not overwriting it"
                );
            } else if reconcile(&self.storage, &request.tasks_file, &store)? {
                self.update_workspace_stats(&current)?;
            }
        }

        Ok(response)
    }

    pub fn next_task(&self, engine: &dyn TaskEngine, timeout: Duration) -> Result<EngineResponse> {
        self.run_engine(engine, EngineAction::Next, timeout)
    }

    pub fn add_task(
        &self,
        engine: &dyn TaskEngine,
        prompt: &str,
        timeout: Duration,
    ) -> Result<EngineResponse> {
        self.run_engine(
            engine,
            EngineAction::Add {
                prompt: prompt.to_string(),
            },
            timeout,
        )
    }
}

/// Copy the engine's edits from the mirror back into the workspace store
fn reconcile(storage: &Storage, mirror: &Path, store: &Path) -> Result<bool> {
    let copied = storage.copy_atomic(mirror, store)?;
    if copied {
        tracing::debug!(store = %store.display(), "reconciled mirror into workspace");
    }
    Ok(copied)
}

/// Workspace names double as directory names
fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name cannot be empty")
    } else if name == "." || name == ".." {
        Some("name cannot be '.' or '..'")
    } else if name.contains(['/', '\\', '\0']) {
        Some("name cannot contain path separators")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidName(format!("{name:?}: {reason}"))),
        None => Ok(()),
    }
}
