use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveDate;
use tracing::{
  debug,
  instrument
};

use crate::datetime::parse_due_date;
use crate::store::Draft;
use crate::task::Priority;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Mod {
  Priority(Priority),
  Due(Option<NaiveDate>)
}

/// Splits `add` arguments into the
/// task text and `key:value`
/// modifiers. Everything after `--`
/// is text.
#[instrument(skip(args, today))]
pub(super) fn parse_desc_and_mods(
  args: &[String],
  today: NaiveDate
) -> anyhow::Result<(String, Vec<Mod>)>
{
  let mut desc_parts = Vec::new();
  let mut mods = Vec::new();

  let mut literal = false;
  for arg in args {
    if arg == "--" && !literal {
      literal = true;
      continue;
    }

    if !literal
      && let Some(one_mod) =
        parse_one_mod(arg, today)?
    {
      mods.push(one_mod);
      continue;
    }

    desc_parts.push(arg.as_str());
  }

  if desc_parts.is_empty() {
    return Err(anyhow!(
      "add: task text is required"
    ));
  }

  Ok((desc_parts.join(" "), mods))
}

fn parse_one_mod(
  tok: &str,
  today: NaiveDate
) -> anyhow::Result<Option<Mod>> {
  let Some((key, value)) =
    tok.split_once(':')
  else {
    return Ok(None);
  };

  let parsed = match key
    .to_ascii_lowercase()
    .as_str()
  {
    | "priority" | "pri" => {
      let priority = if value.is_empty()
      {
        Priority::default()
      } else {
        value.parse::<Priority>().with_context(
          || format!("bad modifier {tok}")
        )?
      };
      Mod::Priority(priority)
    }
    | "due" => {
      let due = if value.is_empty() {
        None
      } else {
        Some(
          parse_due_date(value, today)
            .with_context(|| {
              format!(
                "bad modifier {tok}"
              )
            })?
        )
      };
      Mod::Due(due)
    }
    | _ => return Ok(None)
  };

  debug!(token = %tok, ?parsed, "parsed modifier");
  Ok(Some(parsed))
}

pub(super) fn apply_mods(
  draft: &mut Draft,
  mods: &[Mod]
) {
  for one_mod in mods {
    match one_mod {
      | Mod::Priority(priority) => {
        draft.priority = *priority;
      }
      | Mod::Due(due) => {
        draft.due_date = *due;
      }
    }
  }
}
