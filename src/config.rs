//! Configuration loading and management
//!
//! Handles parsing of the optional `.tmw.toml` file at the project root.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::STATE_DIR;

/// Name of the tool configuration file
pub const CONFIG_FILE: &str = ".tmw.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// State directory relative to the project root
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// External task engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            engine: EngineConfig::default(),
        }
    }
}

fn default_state_dir() -> String {
    STATE_DIR.to_string()
}

/// How to invoke the external task engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Program to execute
    #[serde(default = "default_engine_program")]
    pub program: String,

    /// Arguments placed before the engine action
    #[serde(default = "default_engine_args")]
    pub args: Vec<String>,

    /// Seconds to wait before killing the engine
    #[serde(default = "default_engine_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_engine_program() -> String {
    "npx".to_string()
}

fn default_engine_args() -> Vec<String> {
    vec!["-y".to_string(), "task-master-ai".to_string()]
}

fn default_engine_timeout_secs() -> u64 {
    120
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_engine_program(),
            args: default_engine_args(),
            timeout_secs: default_engine_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a `.tmw.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the project root, or return defaults
    pub fn load_from_project(project_root: &Path) -> Self {
        let config_path = project_root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.state_dir.trim().is_empty() {
            return Err(Error::InvalidConfig("state_dir cannot be empty".to_string()));
        }
        self.engine.validate()
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "engine.program cannot be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 3600 {
            return Err(Error::InvalidConfig(
                "engine.timeout_secs must be between 1 and 3600".to_string(),
            ));
        }
        Ok(())
    }
}
