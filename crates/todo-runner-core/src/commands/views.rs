use std::io::Write;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::config::Config;
use crate::filter::Filter;
use crate::render::Renderer;
use crate::session::Session;
use crate::storage::KeyValueStore;

#[instrument(skip_all)]
pub(super) fn cmd_list<S: KeyValueStore, W: Write>(
    session: &mut Session<S>,
    cfg: &Config,
    renderer: &mut Renderer<W>,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command list");

    let filter = match args {
        [] => cfg.default_filter()?,
        [name] => name.parse::<Filter>()?,
        _ => return Err(anyhow!("list takes at most one filter")),
    };
    session.set_filter(filter);

    let store = session.store();
    let rows: Vec<(usize, _)> = store
        .tasks()
        .iter()
        .enumerate()
        .filter(|(_, task)| filter.matches(task))
        .map(|(idx, task)| (idx + 1, task))
        .collect();

    if rows.is_empty() {
        renderer.print_empty(filter)?;
    } else {
        renderer.print_task_table(&rows, today)?;
    }
    renderer.print_stats(store.stats(), store.overdue(today).len())?;
    Ok(())
}

pub(super) fn cmd_stats<S: KeyValueStore, W: Write>(
    session: &Session<S>,
    renderer: &mut Renderer<W>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let store = session.store();
    renderer.print_stats(store.stats(), store.overdue(today).len())
}

#[instrument(skip_all)]
pub(super) fn cmd_theme<S: KeyValueStore, W: Write>(
    session: &mut Session<S>,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command theme");

    let changed = match args.first().map(|s| s.to_ascii_lowercase()).as_deref() {
        None => false,
        Some("dark") => {
            session.set_dark_mode(true)?;
            true
        }
        Some("light") => {
            session.set_dark_mode(false)?;
            true
        }
        Some("toggle") => {
            session.toggle_theme()?;
            true
        }
        Some(other) => {
            return Err(anyhow!(
                "unknown theme: {other} (expected dark, light or toggle)"
            ));
        }
    };

    let name = if session.dark_mode() { "dark" } else { "light" };
    renderer.set_dark(session.dark_mode());
    if changed {
        renderer.line(&format!("Theme set to {name}."))?;
    } else {
        renderer.line(&format!("Theme: {name}"))?;
    }
    Ok(())
}

/// Prints the task list exactly as it sits in storage.
pub(super) fn cmd_export<S: KeyValueStore, W: Write>(
    session: &Session<S>,
    renderer: &mut Renderer<W>,
) -> anyhow::Result<()> {
    let raw = session
        .persistence()
        .raw_tasks()
        .context("failed to read stored task list")?;
    renderer.line(raw.as_deref().unwrap_or("[]"))
}

pub(super) fn cmd_show<W: Write>(cfg: &Config, renderer: &mut Renderer<W>) -> anyhow::Result<()> {
    for (key, value) in cfg.iter() {
        renderer.line(&format!("{key}={value}"))?;
    }
    Ok(())
}

pub(super) fn cmd_help<W: Write>(renderer: &mut Renderer<W>) -> anyhow::Result<()> {
    renderer.line(
        "Usage: todo [options] <command> [args]\n\
         \n\
         Commands:\n\
         \x20 add <text> [priority:low|medium|high] [due:<date>]\n\
         \x20 list [all|active|completed]\n\
         \x20 toggle <ref>\n\
         \x20 delete <ref>\n\
         \x20 edit <ref> <text>\n\
         \x20 clear\n\
         \x20 stats\n\
         \x20 theme [dark|light|toggle]\n\
         \x20 export\n\
         \n\
         A <ref> is a row number from `list` or a unique id prefix.\n\
         Dates: YYYY-MM-DD, today, tomorrow, +3d, +2w, friday",
    )
}
