use std::io::Write;

use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use super::modifiers::{apply_mods, parse_desc_and_mods};
use super::{position_of, resolve_task_ref};
use crate::render::Renderer;
use crate::session::Session;
use crate::storage::KeyValueStore;

#[instrument(skip_all)]
pub(super) fn cmd_add<S: KeyValueStore, W: Write>(
    session: &mut Session<S>,
    renderer: &mut Renderer<W>,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command add");

    let (text, mods) = parse_desc_and_mods(args, today)?;
    let draft = session.draft_mut();
    draft.text = text;
    apply_mods(draft, &mods);

    let id = session
        .add_draft()?
        .ok_or_else(|| anyhow!("task text cannot be empty"))?;
    debug!(id = %id, total = session.store().tasks().len(), "task added");

    renderer.line(&format!("Created task 1 ({}).", short_id(id.as_str())))?;
    Ok(())
}

#[instrument(skip_all)]
pub(super) fn cmd_toggle<S: KeyValueStore, W: Write>(
    session: &mut Session<S>,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command toggle");

    let token = single_ref(args, "toggle")?;
    let id = resolve_task_ref(session.store().tasks(), token)?;
    session.toggle(&id)?;

    let store = session.store();
    let Some(task) = store.get(&id) else {
        return Err(anyhow!("task vanished while toggling: {id}"));
    };
    let verb = if task.completed { "Completed" } else { "Reopened" };
    let position = position_of(store.tasks(), &id);
    renderer.line(&format!("{verb} task {position} '{}'.", task.text))?;

    if session.poll_celebration() {
        renderer.print_celebration(session.store().stats())?;
    }
    Ok(())
}

#[instrument(skip_all)]
pub(super) fn cmd_delete<S: KeyValueStore, W: Write>(
    session: &mut Session<S>,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command delete");

    let token = single_ref(args, "delete")?;
    let id = resolve_task_ref(session.store().tasks(), token)?;
    let text = session
        .store()
        .get(&id)
        .map(|t| t.text.clone())
        .unwrap_or_default();

    if session.remove(&id)? {
        renderer.line(&format!("Deleted task '{text}'."))?;
    }
    Ok(())
}

#[instrument(skip_all)]
pub(super) fn cmd_edit<S: KeyValueStore, W: Write>(
    session: &mut Session<S>,
    renderer: &mut Renderer<W>,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command edit");

    let Some((token, words)) = args.split_first() else {
        return Err(anyhow!("edit requires a task reference and new text"));
    };
    if words.is_empty() {
        return Err(anyhow!("edit requires new text"));
    }

    let id = resolve_task_ref(session.store().tasks(), token)?;
    if !session.replace_text(&id, &words.join(" "))? {
        return Err(anyhow!("task text cannot be empty"));
    }

    let position = position_of(session.store().tasks(), &id);
    renderer.line(&format!("Updated task {position}."))?;
    Ok(())
}

#[instrument(skip_all)]
pub(super) fn cmd_clear<S: KeyValueStore, W: Write>(
    session: &mut Session<S>,
    renderer: &mut Renderer<W>,
) -> anyhow::Result<()> {
    info!("command clear");

    let removed = session.clear_completed()?;
    let noun = if removed == 1 { "task" } else { "tasks" };
    renderer.line(&format!("Removed {removed} completed {noun}."))?;
    Ok(())
}

fn single_ref<'a>(args: &'a [String], command: &str) -> anyhow::Result<&'a str> {
    match args {
        [token] => Ok(token.as_str()),
        [] => Err(anyhow!("{command} requires a task reference")),
        _ => Err(anyhow!("{command} takes exactly one task reference")),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
