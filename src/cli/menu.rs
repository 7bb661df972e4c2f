//! Interactive menu (`tmw menu`).
//!
//! Reads choices line by line, so it runs the same against a terminal or a
//! scripted input. End of input leaves the menu.

use std::io::{BufRead, Write};

use crate::error::{Error, Result};

use super::{render, Context};

const OPTIONS: [&str; 8] = [
    "📋 Show current workspace tasks",
    "📂 List all workspaces",
    "🔄 Switch workspace",
    "➕ Create new workspace",
    "🗑️  Delete workspace",
    "🎯 Next task in current workspace",
    "📊 Workspace statistics",
    "🚪 Exit",
];

pub(crate) fn run<R: BufRead, W: Write>(ctx: &mut Context, mut input: R, mut out: W) -> Result<()> {
    writeln!(out, "╔════════════════════════════════════════╗")?;
    writeln!(out, "║     TaskMaster Workspace Manager       ║")?;
    writeln!(out, "╚════════════════════════════════════════╝")?;

    loop {
        writeln!(out, "\n📍 Current workspace: {}\n", ctx.registry.current())?;
        writeln!(out, "Choose an option:\n")?;
        for (idx, label) in OPTIONS.iter().enumerate() {
            writeln!(out, "  {}. {label}", idx + 1)?;
        }

        let Some(choice) = prompt(&mut input, &mut out, "\nSelect option (1-8): ")? else {
            break;
        };

        match choice.as_str() {
            "1" => {
                let tasks = ctx.registry.current_tasks();
                render::tasks(&mut out, ctx.registry.current(), &tasks)?;
            }
            "2" => render::workspaces(&mut out, &ctx.registry.list())?,
            "3" => switch_menu(ctx, &mut input, &mut out)?,
            "4" => create_menu(ctx, &mut input, &mut out)?,
            "5" => delete_menu(ctx, &mut input, &mut out)?,
            "6" => {
                writeln!(out, "\n🎯 Getting next task from current workspace...\n")?;
                let result = ctx.registry.next_task(&ctx.engine, ctx.timeout);
                if let Some(response) = report(&mut out, result)? {
                    render::engine_output(&mut out, &response.stdout, &response.stderr)?;
                }
            }
            "7" => render::statistics(&mut out, &ctx.registry.statistics())?,
            "8" => {
                writeln!(out, "\n👋 Goodbye!\n")?;
                return Ok(());
            }
            _ => {
                writeln!(out, "\n❌ Invalid option")?;
                continue;
            }
        }

        if prompt(&mut input, &mut out, "\nPress Enter to continue...")?.is_none() {
            break;
        }
    }

    Ok(())
}

fn switch_menu<R: BufRead, W: Write>(ctx: &mut Context, input: &mut R, out: &mut W) -> Result<()> {
    writeln!(out, "\n🔄 Switch to workspace:\n")?;
    let names = ctx.registry.available().names();
    for (idx, name) in names.iter().enumerate() {
        let marker = if name == ctx.registry.current() {
            " (current)"
        } else {
            ""
        };
        writeln!(out, "  {}. {name}{marker}", idx + 1)?;
    }

    let Some(answer) = prompt(input, out, "\nSelect workspace number (or 0 to cancel): ")? else {
        return Ok(());
    };
    if answer == "0" {
        return Ok(());
    }

    let selected = answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| names.get(idx));
    match selected {
        Some(name) => {
            if let Some(outcome) = report(out, ctx.registry.switch(name))? {
                writeln!(out, "✅ Switched to workspace: {}", outcome.name)?;
            }
        }
        None => writeln!(out, "❌ Invalid selection")?,
    }
    Ok(())
}

fn create_menu<R: BufRead, W: Write>(ctx: &mut Context, input: &mut R, out: &mut W) -> Result<()> {
    let Some(name) = prompt(input, out, "\n➕ Enter workspace name: ")? else {
        return Ok(());
    };
    if name.is_empty() {
        return Ok(());
    }
    let description = prompt(input, out, "Enter description (optional): ")?.unwrap_or_default();

    if let Some(created) = report(out, ctx.registry.create(&name, &description))? {
        if created.migrated_default.is_some() {
            writeln!(out, "📦 Migrated existing tasks to default workspace")?;
        }
        writeln!(out, "✅ Created workspace: {}", created.name)?;
    }
    Ok(())
}

fn delete_menu<R: BufRead, W: Write>(ctx: &mut Context, input: &mut R, out: &mut W) -> Result<()> {
    let Some(name) = prompt(input, out, "\n🗑️  Enter workspace name to delete: ")? else {
        return Ok(());
    };
    if name.is_empty() {
        return Ok(());
    }

    let question = format!("Are you sure you want to delete '{name}'? (y/N): ");
    let confirmed = prompt(input, out, &question)?
        .map(|answer| answer.eq_ignore_ascii_case("y"))
        .unwrap_or(false);
    if !confirmed {
        return Ok(());
    }

    if let Some(outcome) = report(out, ctx.registry.delete(&name))? {
        writeln!(out, "✅ Archived workspace: {}", outcome.name)?;
    }
    Ok(())
}

/// Print recoverable failures and keep the menu running; fatal ones propagate
fn report<T, W: Write>(out: &mut W, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_recoverable() => {
            writeln!(out, "❌ {err}")?;
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Read one trimmed line; `None` at end of input
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, text: &str) -> Result<Option<String>> {
    write!(out, "{text}")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line).map_err(Error::Io)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
