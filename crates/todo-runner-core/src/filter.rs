use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::trace;

use crate::task::Task;

/// View selector over the task list.
/// Never changes the list itself.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq
)]
pub enum Filter {
  #[default]
  All,
  Active,
  Completed
}

impl Filter {
  pub const ALL: [Filter; 3] = [
    Filter::All,
    Filter::Active,
    Filter::Completed
  ];

  #[must_use]
  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    let matched = match self {
      | Filter::All => true,
      | Filter::Active => {
        !task.completed
      }
      | Filter::Completed => {
        task.completed
      }
    };
    trace!(
      filter = %self,
      id = %task.id,
      matched,
      "evaluated filter"
    );
    matched
  }

  #[must_use]
  pub fn as_str(self) -> &'static str {
    match self {
      | Filter::All => "all",
      | Filter::Active => "active",
      | Filter::Completed => {
        "completed"
      }
    }
  }

  /// Message shown when the view is
  /// empty.
  #[must_use]
  pub fn empty_message(
    self
  ) -> &'static str {
    match self {
      | Filter::Completed => {
        "No completed tasks yet"
      }
      | _ => "Your canvas awaits..."
    }
  }
}

impl fmt::Display for Filter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Filter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let lowered =
      s.trim().to_ascii_lowercase();
    if let Some(exact) = Filter::ALL
      .into_iter()
      .find(|f| f.as_str() == lowered)
    {
      return Ok(exact);
    }

    let mut matches = Filter::ALL
      .into_iter()
      .filter(|f| {
        !lowered.is_empty()
          && f
            .as_str()
            .starts_with(&lowered)
      });
    match (matches.next(), matches.next())
    {
      | (Some(only), None) => Ok(only),
      | _ => {
        Err(anyhow!(
          "invalid filter: {s} \
           (expected all, active or \
           completed)"
        ))
      }
    }
  }
}
