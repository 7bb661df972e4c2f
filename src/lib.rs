//! tmw - TaskMaster workspace manager library
//!
//! Several isolated task lists ("workspaces") live side by side in the
//! TaskMaster state directory. Exactly one is current, and its task list is
//! mirrored into the single file the external task engine works on.
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface and interactive menu
//! - `config`: Tool configuration loaded from `.tmw.toml`
//! - `error`: Error types, exit codes and result alias
//! - `storage`: State directory layout and atomic file I/O
//! - `task`: Task list model and status statistics
//! - `workspace`: The workspace registry (create, switch, delete, list, stats)
//! - `archive`: Soft delete of workspace directories
//! - `engine`: Boundary to the external task engine
//! - `output`: Human and JSON output

pub mod archive;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod storage;
pub mod task;
pub mod workspace;

pub use error::{Error, Result};
