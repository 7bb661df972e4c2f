//! Command-line interface for tmw
//!
//! This module defines the CLI structure using clap derive macros.
//! Command bodies live in the submodules.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::engine::CommandEngine;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::storage::Storage;
use crate::workspace::Registry;

mod menu;
mod render;
mod task;
mod ws;

/// tmw - TaskMaster workspace manager
///
/// Keeps several isolated task lists side by side and mirrors the active one
/// into the file the task-master engine works on.
#[derive(Parser, Debug)]
#[command(name = "tmw")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root containing the state directory (defaults to current directory)
    #[arg(long, global = true, env = "TMW_ROOT")]
    pub root: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show current workspace and task counts
    Current,

    /// List all workspaces
    #[command(visible_alias = "ls")]
    List,

    /// Switch to a workspace
    Switch {
        /// Workspace name
        name: String,
    },

    /// Create a new workspace
    Create {
        /// Workspace name
        name: String,

        /// Optional description (remaining words)
        #[arg(trailing_var_arg = true)]
        description: Vec<String>,
    },

    /// Archive a workspace
    Delete {
        /// Workspace name
        name: String,
    },

    /// Show tasks in the current workspace
    Tasks,

    /// Ask the task engine for the next task in the current workspace
    Next,

    /// Add a task to the current workspace through the task engine
    Add {
        /// Task description
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Show cached statistics for every workspace
    Stats,

    /// Open the interactive menu
    Menu,
}

/// Everything a command needs, built once per invocation
pub(crate) struct Context {
    pub registry: Registry,
    pub engine: CommandEngine,
    pub timeout: Duration,
    pub output: OutputOptions,
}

impl Context {
    fn open(root: Option<PathBuf>, output: OutputOptions) -> Result<Self> {
        let root = match root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let config = Config::load_from_project(&root);
        let state_dir = root.join(&config.state_dir);
        let registry = Registry::open(Storage::new(root, state_dir))?;

        Ok(Self {
            registry,
            engine: CommandEngine::from_config(&config.engine),
            timeout: Duration::from_secs(config.engine.timeout_secs),
            output,
        })
    }
}

impl Cli {
    /// Run the parsed command. `None` (no subcommand) is handled by the caller.
    pub fn run(self) -> Result<()> {
        let Some(command) = self.command else {
            return Ok(());
        };

        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let mut ctx = Context::open(self.root, output)?;

        match command {
            Commands::Current => ws::run_current(&ctx),
            Commands::List => ws::run_list(&ctx),
            Commands::Switch { name } => ws::run_switch(&mut ctx, &name),
            Commands::Create { name, description } => {
                ws::run_create(&mut ctx, &name, &description.join(" "))
            }
            Commands::Delete { name } => ws::run_delete(&mut ctx, &name),
            Commands::Tasks => task::run_tasks(&ctx),
            Commands::Next => task::run_next(&ctx),
            Commands::Add { text } => task::run_add(&ctx, &text.join(" ")),
            Commands::Stats => ws::run_stats(&ctx),
            Commands::Menu => {
                let stdin = std::io::stdin();
                let stdout = std::io::stdout();
                menu::run(&mut ctx, stdin.lock(), stdout.lock())
            }
        }
    }
}
