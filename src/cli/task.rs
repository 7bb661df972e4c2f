//! Task commands for the current workspace
//!
//! `tmw tasks` reads the workspace directly; `tmw next` and `tmw add` go
//! through the task engine.

use std::io::{self, Write};

use serde::Serialize;

use crate::engine::EngineResponse;
use crate::error::Result;
use crate::output::emit_success;
use crate::task::Task;

use super::{render, Context};

#[derive(Debug, Serialize)]
struct TasksOutput<'a> {
    workspace: &'a str,
    tasks: &'a [Task],
}

#[derive(Debug, Serialize)]
struct EngineOutput<'a> {
    workspace: &'a str,
    stdout: &'a str,
    stderr: &'a str,
}

pub(crate) fn run_tasks(ctx: &Context) -> Result<()> {
    let workspace = ctx.registry.current();
    let tasks = ctx.registry.current_tasks();
    if ctx.output.json {
        let data = TasksOutput {
            workspace,
            tasks: &tasks,
        };
        return emit_success(ctx.output, "tasks", &data, None);
    }
    render::tasks(&mut io::stdout().lock(), workspace, &tasks)?;
    Ok(())
}

pub(crate) fn run_next(ctx: &Context) -> Result<()> {
    let workspace = ctx.registry.current();
    if !ctx.output.json && !ctx.output.quiet {
        println!("🎯 Next task in {workspace}:\n");
    }
    let response = ctx.registry.next_task(&ctx.engine, ctx.timeout)?;
    emit_engine(ctx, "next", workspace, &response)
}

pub(crate) fn run_add(ctx: &Context, prompt: &str) -> Result<()> {
    let workspace = ctx.registry.current();
    if !ctx.output.json && !ctx.output.quiet {
        println!("➕ Adding task to {workspace}...");
    }
    let response = ctx.registry.add_task(&ctx.engine, prompt, ctx.timeout)?;
    emit_engine(ctx, "add", workspace, &response)
}

fn emit_engine(ctx: &Context, command: &str, workspace: &str, response: &EngineResponse) -> Result<()> {
    if ctx.output.json {
        let data = EngineOutput {
            workspace,
            stdout: &response.stdout,
            stderr: &response.stderr,
        };
        return emit_success(ctx.output, command, &data, None);
    }
    let mut out = io::stdout().lock();
    render::engine_output(&mut out, &response.stdout, &response.stderr)?;
    out.flush()?;
    Ok(())
}
