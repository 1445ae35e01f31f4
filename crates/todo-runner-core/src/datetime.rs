use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Days,
  Local,
  NaiveDate,
  Weekday
};
use regex::Regex;
use tracing::trace;

/// Today's calendar date on the local
/// clock.
#[must_use]
pub fn today_local() -> NaiveDate {
  Local::now().date_naive()
}

/// Short label such as `Oct 20` for
/// table cells.
#[must_use]
pub fn short_due_label(
  date: NaiveDate
) -> String {
  date.format("%b %-d").to_string()
}

/// Resolves a due-date expression
/// against `today`.
pub fn parse_due_date(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower = token.to_ascii_lowercase();

  let resolved = match lower.as_str() {
    | "today" => Some(today),
    | "tomorrow" => {
      today.checked_add_days(Days::new(1))
    }
    | "yesterday" => {
      today.checked_sub_days(Days::new(1))
    }
    | _ => None
  };
  if let Some(date) = resolved {
    trace!(input = %token, %date, "parsed named day");
    return Ok(date);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    trace!(input = %token, %date, "parsed iso date");
    return Ok(date);
  }

  if let Some(captures) =
    relative_re().captures(&lower)
  {
    let num: u64 = captures["num"]
      .parse()
      .context(
        "invalid relative offset"
      )?;
    let days = match &captures["unit"] {
      | "w" => num.saturating_mul(7),
      | _ => num
    };
    return today
      .checked_add_days(Days::new(days))
      .ok_or_else(|| {
        anyhow!(
          "relative date out of range: \
           {token}"
        )
      });
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  Err(anyhow!(
    "unrecognized due date: {input}"
  ))
  .with_context(|| {
    "supported formats: YYYY-MM-DD, \
     today/tomorrow/yesterday, \
     +Nd/+Nw, weekday names (e.g. \
     friday)"
  })
}

fn relative_re() -> &'static Regex {
  static RELATIVE: OnceLock<Regex> =
    OnceLock::new();
  RELATIVE.get_or_init(|| {
    Regex::new(
      r"^\+?(?P<num>\d{1,5})(?P<unit>[dw])$"
    )
    .unwrap_or_else(|_| {
      unreachable!(
        "relative date pattern is \
         valid"
      )
    })
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

/// Next date falling on `target`,
/// strictly after `from`.
fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = u64::from(
    from.weekday().num_days_from_monday()
  );
  let target_idx = u64::from(
    target.num_days_from_monday()
  );
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_days(Days::new(delta))
    .unwrap_or(from)
}
