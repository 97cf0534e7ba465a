use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Days,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "crm-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "CRM_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "CRM_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

pub fn project_timezone() -> &'static Tz
{
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  PROJECT_TZ.get_or_init(
    resolve_project_timezone
  )
}

/// Calendar day of `now` in the
/// project timezone.
#[must_use]
pub fn project_today(
  now: DateTime<Utc>
) -> NaiveDate {
  now
    .with_timezone(project_timezone())
    .date_naive()
}

fn resolve_project_timezone() -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  chrono_tz::UTC
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured project timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Resolves a date expression against
/// the project-local day of `now`.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let today = project_today(now);

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return shift_days(today, 1);
    }
    | "yesterday" => {
      return shift_days(today, -1);
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  if let Some(month) =
    parse_month_name(&lower)
  {
    let mut year = today.year();
    if month <= today.month() {
      year = year.saturating_add(1);
    }
    return NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month/year \
         candidate"
      )
    });
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let days = match caps
      .name("unit")
      .map(|m| m.as_str())
    {
      | Some("w") => {
        num.checked_mul(7).ok_or_else(|| {
          anyhow!(
            "relative offset too large: \
             {input}"
          )
        })?
      }
      | _ => num
    };
    let signed = match caps
      .name("sign")
      .map(|m| m.as_str())
    {
      | Some("-") => -days,
      | _ => days
    };
    return shift_days(today, signed);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(project_today(
      dt.with_timezone(&Utc)
    ));
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, weekday \
     names (e.g. monday), month names \
     (e.g. march), +Nd/-Nd/+Nw, \
     YYYY-MM-DD, RFC3339"
  })
}

fn shift_days(
  day: NaiveDate,
  delta: i64
) -> anyhow::Result<NaiveDate> {
  let shifted = if delta >= 0 {
    day.checked_add_days(Days::new(
      delta.unsigned_abs()
    ))
  } else {
    day.checked_sub_days(Days::new(
      delta.unsigned_abs()
    ))
  };
  shifted.ok_or_else(|| {
    anyhow!(
      "date out of range: {day} \
       shifted by {delta} days"
    )
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

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as u64;
  let target_idx = target
    .num_days_from_monday()
    as u64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_days(Days::new(delta))
    .unwrap_or(from)
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}

/// `Jun 25, 2023`
#[must_use]
pub fn format_long_date(
  date: NaiveDate
) -> String {
  date.format("%b %-d, %Y").to_string()
}

/// `Jun 25`
#[must_use]
pub fn format_short_date(
  date: NaiveDate
) -> String {
  date.format("%b %-d").to_string()
}

/// Coarse distance phrase such as `3
/// days ago` or `in 2 months`.
#[must_use]
pub fn relative_phrase(
  date: NaiveDate,
  today: NaiveDate
) -> String {
  let delta =
    (today - date).num_days();
  let days = delta.unsigned_abs();

  let amount = if days == 0 {
    return "today".to_string();
  } else if days < 30 {
    plural(days, "day")
  } else if days < 365 {
    plural(days / 30, "month")
  } else {
    plural(days / 365, "year")
  };

  if delta > 0 {
    format!("{amount} ago")
  } else {
    format!("in {amount}")
  }
}

fn plural(n: u64, unit: &str) -> String {
  if n == 1 {
    format!("1 {unit}")
  } else {
    format!("{n} {unit}s")
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    format_long_date,
    parse_date_expr,
    relative_phrase
  };

  fn now() -> chrono::DateTime<Utc> {
    // A Wednesday at noon.
    Utc
      .with_ymd_and_hms(
        2023, 6, 21, 12, 0, 0
      )
      .single()
      .expect("valid now")
  }

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parses_iso_dates() {
    let parsed =
      parse_date_expr("2023-07-04", now())
        .expect("parse iso");
    assert_eq!(parsed, ymd(2023, 7, 4));
  }

  #[test]
  fn parses_relative_offsets() {
    assert_eq!(
      parse_date_expr("+2d", now())
        .expect("plus days"),
      ymd(2023, 6, 23)
    );
    assert_eq!(
      parse_date_expr("-1w", now())
        .expect("minus week"),
      ymd(2023, 6, 14)
    );
  }

  #[test]
  fn rejects_relative_offsets_out_of_range()
  {
    let err = parse_date_expr(
      "+2000000000000000000w",
      now()
    )
    .expect_err("week overflow");
    assert!(
      err
        .to_string()
        .contains("too large")
    );
    assert!(
      parse_date_expr(
        "-9000000000000000000d",
        now()
      )
      .is_err()
    );
  }

  #[test]
  fn parses_weekday_name_as_next_occurrence()
  {
    assert_eq!(
      parse_date_expr("wednesday", now())
        .expect("parse weekday"),
      ymd(2023, 6, 28)
    );
    assert_eq!(
      parse_date_expr("fri", now())
        .expect("parse weekday"),
      ymd(2023, 6, 23)
    );
  }

  #[test]
  fn parses_month_name_as_next_first_day()
  {
    assert_eq!(
      parse_date_expr("march", now())
        .expect("parse month"),
      ymd(2024, 3, 1)
    );
    assert_eq!(
      parse_date_expr("july", now())
        .expect("parse month"),
      ymd(2023, 7, 1)
    );
  }

  #[test]
  fn rejects_garbage() {
    assert!(
      parse_date_expr("someday", now())
        .is_err()
    );
  }

  #[test]
  fn formats_dashboard_dates() {
    assert_eq!(
      format_long_date(ymd(2023, 6, 5)),
      "Jun 5, 2023"
    );
  }

  #[test]
  fn relative_phrases() {
    let today = ymd(2023, 6, 21);
    assert_eq!(
      relative_phrase(today, today),
      "today"
    );
    assert_eq!(
      relative_phrase(
        ymd(2023, 6, 20),
        today
      ),
      "1 day ago"
    );
    assert_eq!(
      relative_phrase(
        ymd(2023, 4, 30),
        today
      ),
      "1 month ago"
    );
    assert_eq!(
      relative_phrase(
        ymd(2023, 6, 24),
        today
      ),
      "in 3 days"
    );
  }
}
