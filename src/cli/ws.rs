//! Workspace management commands
//!
//! Implements `tmw current`, `tmw list`, `tmw switch`, `tmw create`,
//! `tmw delete` and `tmw stats`.

use std::io;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::workspace::DEFAULT_WORKSPACE;

use super::{render, Context};

pub(crate) fn run_current(ctx: &Context) -> Result<()> {
    let summary = ctx.registry.current_summary();
    if ctx.output.json {
        return emit_success(ctx.output, "current", &summary, None);
    }
    render::current(&mut io::stdout().lock(), &summary)?;
    Ok(())
}

pub(crate) fn run_list(ctx: &Context) -> Result<()> {
    let list = ctx.registry.list();
    if ctx.output.json {
        return emit_success(ctx.output, "list", &list, None);
    }
    render::workspaces(&mut io::stdout().lock(), &list)?;
    Ok(())
}

pub(crate) fn run_stats(ctx: &Context) -> Result<()> {
    let stats = ctx.registry.statistics();
    if ctx.output.json {
        return emit_success(ctx.output, "stats", &stats, None);
    }
    render::statistics(&mut io::stdout().lock(), &stats)?;
    Ok(())
}

pub(crate) fn run_create(ctx: &mut Context, name: &str, description: &str) -> Result<()> {
    let created = ctx.registry.create(name, description)?;

    let mut human = HumanOutput::new(format!("✅ Created workspace: {}", created.name));
    human.push_summary("tasks file", created.tasks_file.display().to_string());
    if let Some(stats) = created.migrated_default {
        human.push_summary(
            format!("migrated to {DEFAULT_WORKSPACE}"),
            format!("{} tasks", stats.total_tasks),
        );
    }
    human.push_next_step(format!("tmw switch {}", created.name));

    emit_success(ctx.output, "create", &created, Some(&human))
}

pub(crate) fn run_switch(ctx: &mut Context, name: &str) -> Result<()> {
    let outcome = ctx.registry.switch(name)?;

    let mut human = HumanOutput::new(format!("✅ Switched to workspace: {}", outcome.name));
    human.push_summary("mirror", outcome.mirror.display().to_string());
    if !outcome.mirror_synced {
        human.push_warning("workspace has no task file; mirror left unchanged");
    }

    emit_success(ctx.output, "switch", &outcome, Some(&human))
}

pub(crate) fn run_delete(ctx: &mut Context, name: &str) -> Result<()> {
    let outcome = ctx.registry.delete(name)?;

    let mut human = HumanOutput::new(format!("✅ Archived workspace: {}", outcome.name));
    if let Some(path) = &outcome.archived_to {
        human.push_summary("archive", path.display().to_string());
    } else {
        human.push_warning("workspace directory was missing; nothing archived");
    }
    if let Some(current) = &outcome.switched_to {
        human.push_summary("current", current.clone());
    }

    emit_success(ctx.output, "delete", &outcome, Some(&human))
}
