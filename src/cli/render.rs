//! Human-readable rendering shared by direct commands and the menu.

use std::io::{self, Write};

use crate::task::Task;
use crate::workspace::{CurrentSummary, WorkspaceStatistics, WorkspaceSummary};

pub fn current<W: Write>(out: &mut W, summary: &CurrentSummary) -> io::Result<()> {
    let stats = &summary.stats;
    writeln!(out, "📍 Current workspace: {}", summary.name)?;
    writeln!(
        out,
        "   Tasks: {} ({} in-progress, {} done, {} pending)",
        stats.total_tasks, stats.in_progress, stats.completed_tasks, stats.pending
    )
}

pub fn workspaces<W: Write>(out: &mut W, list: &[WorkspaceSummary]) -> io::Result<()> {
    writeln!(out, "\n📂 Available Workspaces:\n")?;
    if list.is_empty() {
        writeln!(out, "  No workspaces yet. Create one with: tmw create <name>")?;
        return Ok(());
    }

    for ws in list {
        let (marker, tag) = if ws.current {
            ("➤", " [CURRENT]")
        } else {
            (" ", "")
        };
        writeln!(out, "  {marker} {}{tag}", ws.name)?;
        writeln!(out, "    {}", ws.display_name)?;
        writeln!(
            out,
            "    {} tasks ({} in-progress, {} done)",
            ws.stats.total_tasks, ws.stats.in_progress, ws.stats.completed_tasks
        )?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn tasks<W: Write>(out: &mut W, workspace: &str, tasks: &[Task]) -> io::Result<()> {
    if tasks.is_empty() {
        return writeln!(out, "No tasks in workspace {workspace}");
    }

    writeln!(out, "\n📋 Tasks in {workspace}:\n")?;
    for task in tasks {
        writeln!(
            out,
            "{} [{}] {} ({})",
            task.status.emoji(),
            task.display_id(),
            task.title,
            task.status
        )?;
        if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
            writeln!(out, "   {description}")?;
        }
    }
    Ok(())
}

pub fn statistics<W: Write>(out: &mut W, stats: &[WorkspaceStatistics]) -> io::Result<()> {
    writeln!(out, "\n📊 Workspace Statistics:\n")?;
    for ws in stats {
        writeln!(out, "📂 {}:", ws.name)?;
        writeln!(out, "   Total tasks: {}", ws.stats.total_tasks)?;
        writeln!(out, "   ✅ Completed: {}", ws.stats.completed_tasks)?;
        writeln!(out, "   🔄 In Progress: {}", ws.stats.in_progress)?;
        writeln!(out, "   ⏳ Pending: {}", ws.stats.pending)?;
        writeln!(out, "   📅 Last modified: {}", ws.last_modified)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Pass the engine's captured output through unchanged
pub fn engine_output<W: Write>(out: &mut W, stdout: &str, stderr: &str) -> io::Result<()> {
    out.write_all(stdout.as_bytes())?;
    if !stderr.is_empty() {
        out.write_all(stderr.as_bytes())?;
    }
    Ok(())
}
