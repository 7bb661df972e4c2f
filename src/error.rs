//! Error types for tmw
//!
//! Exit codes:
//! - 0: Success, or an in-band failure recovered at the operation boundary
//!   (workspace exists, workspace missing, protected workspace, engine failure)
//! - 1: Usage error (missing argument, unknown command)
//! - 2: Fatal (state directory missing, corrupt state file, I/O failure)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tmw CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USAGE_ERROR: i32 = 1;
    pub const FATAL: i32 = 2;
}

/// Main error type for workspace operations
#[derive(Error, Debug)]
pub enum Error {
    // Fatal (exit code 2)
    #[error("TaskMaster not initialized: {0} does not exist")]
    NotInitialized(PathBuf),

    #[error("Corrupt state file {path}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // Recovered at the operation boundary (exit code 0)
    #[error("Workspace '{0}' already exists")]
    AlreadyExists(String),

    #[error("Workspace '{0}' does not exist")]
    NotFound(String),

    #[error("Cannot delete {0} workspace")]
    Protected(String),

    #[error("Invalid workspace name: {0}")]
    InvalidName(String),

    #[error("Task engine `{program}` failed{}", exit_suffix(.code))]
    ExternalToolFailure { program: String, code: Option<i32> },

    #[error("Task engine `{program}` timed out after {secs}s")]
    ExternalToolTimeout { program: String, secs: u64 },
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => String::new(),
    }
}

impl Error {
    /// Whether the caller should keep running after reporting this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::AlreadyExists(_)
                | Error::NotFound(_)
                | Error::Protected(_)
                | Error::InvalidName(_)
                | Error::ExternalToolFailure { .. }
                | Error::ExternalToolTimeout { .. }
        )
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_recoverable() {
            exit_codes::SUCCESS
        } else {
            exit_codes::FATAL
        }
    }

    /// Stable machine-readable kind, used in JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotInitialized(_) => "not_initialized",
            Error::CorruptState { .. } => "corrupt_state",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Io(_) | Error::Json(_) | Error::TomlParse(_) => "io",
            Error::AlreadyExists(_) => "already_exists",
            Error::NotFound(_) => "not_found",
            Error::Protected(_) => "protected",
            Error::InvalidName(_) => "invalid_name",
            Error::ExternalToolFailure { .. } => "external_tool_failure",
            Error::ExternalToolTimeout { .. } => "external_tool_timeout",
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::CorruptState {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for tmw operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error body of the `--json` error envelope
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub message: String,
    pub code: i32,
    pub kind: &'static str,
    pub recoverable: bool,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            message: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            recoverable: err.is_recoverable(),
        }
    }
}
