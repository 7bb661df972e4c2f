//! tmw - TaskMaster workspace manager CLI
//!
//! Manages isolated named task lists and keeps the active one mirrored into
//! the file the task-master engine works on.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tmw::cli::Cli;
use tmw::error::exit_codes;
use tmw::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let command = infer_command_name_from_args();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit_codes::SUCCESS,
                _ => exit_codes::USAGE_ERROR,
            };
            std::process::exit(code);
        }
    };

    init_tracing(cli.verbose);

    if cli.command.is_none() {
        let _ = Cli::command().print_help();
        return;
    }

    let json = cli.json;
    if let Err(err) = cli.run() {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}

fn init_tracing(verbose: bool) {
    // Tracing is opt-in via RUST_LOG (or --verbose).
    // Ignore invalid/huge filters rather than failing startup.
    let fallback = if verbose { "debug" } else { "off" };
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
