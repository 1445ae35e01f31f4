mod modifiers;
mod task_ops;
mod views;

use std::io::Write;

use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::cli::Invocation;
use crate::config::Config;
use crate::render::Renderer;
use crate::session::Session;
use crate::storage::KeyValueStore;
use crate::task::{Task, TaskId};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "list",
        "toggle",
        "delete",
        "edit",
        "clear",
        "stats",
        "theme",
        "export",
        "_commands",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &str, known: &[&'a str]) -> Option<&'a str> {
    if let Some(exact) = known.iter().copied().find(|name| *name == token) {
        return Some(exact);
    }
    if token.is_empty() {
        return None;
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(session, cfg, renderer, inv))]
pub fn dispatch<S: KeyValueStore, W: Write>(
    session: &mut Session<S>,
    cfg: &Config,
    renderer: &mut Renderer<W>,
    inv: Invocation,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    let args = inv.command_args.as_slice();
    debug!(command, ?args, "dispatching command");

    match command {
        "add" => task_ops::cmd_add(session, renderer, args, today),
        "list" => views::cmd_list(session, cfg, renderer, args, today),
        "toggle" => task_ops::cmd_toggle(session, renderer, args),
        "delete" => task_ops::cmd_delete(session, renderer, args),
        "edit" => task_ops::cmd_edit(session, renderer, args),
        "clear" => task_ops::cmd_clear(session, renderer),
        "stats" => views::cmd_stats(session, renderer, today),
        "theme" => views::cmd_theme(session, renderer, args),
        "export" => views::cmd_export(session, renderer),
        "_commands" => {
            for name in known_command_names() {
                renderer.line(name)?;
            }
            Ok(())
        }
        "_show" => views::cmd_show(cfg, renderer),
        "help" => views::cmd_help(renderer),
        "version" => renderer.line(env!("CARGO_PKG_VERSION")),
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// Resolves a task reference: an exact id, a 1-based list position, or
/// a unique id prefix, in that order.
fn resolve_task_ref(tasks: &[Task], token: &str) -> anyhow::Result<TaskId> {
    let token = token.trim();
    if let Some(task) = tasks.iter().find(|t| t.id.as_str() == token) {
        return Ok(task.id.clone());
    }

    if let Ok(position) = token.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|idx| tasks.get(idx))
            .map(|t| t.id.clone())
            .ok_or_else(|| anyhow!("no task at position {position}"));
    }

    if token.is_empty() {
        return Err(anyhow!("empty task reference"));
    }
    let mut matches = tasks.iter().filter(|t| t.id.as_str().starts_with(token));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id.clone()),
        (Some(_), Some(_)) => Err(anyhow!("task reference {token} is ambiguous")),
        _ => Err(anyhow!("no task matches {token}")),
    }
}

fn position_of(tasks: &[Task], id: &TaskId) -> usize {
    tasks.iter().position(|t| &t.id == id).map(|idx| idx + 1).unwrap_or(0)
}
