use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

const TIMEZONE_ENV_VAR: &str =
  "SOULCAL_TIMEZONE";
pub const DEFAULT_PROJECT_TIMEZONE:
  &str = "Europe/Madrid";

/// Picks the timezone event dates are
/// interpreted in: the env var wins,
/// then the configured value, then the
/// project default.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_PROJECT_TIMEZONE,
    "DEFAULT_PROJECT_TIMEZONE"
  )
  .unwrap_or_else(|| {
    tracing::error!(
      "failed to parse fallback \
       timezone; using UTC"
    );
    chrono_tz::UTC
  })
}

pub fn parse_timezone(
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
      tracing::debug!(
        source,
        timezone = %trimmed,
        "resolved project timezone"
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

#[must_use]
pub fn today_in_timezone(
  timezone: Tz
) -> NaiveDate {
  Utc::now()
    .with_timezone(&timezone)
    .date_naive()
}

fn local_to_instant(
  local_naive: NaiveDateTime,
  timezone: Tz,
  context: &str
) -> anyhow::Result<DateTime<Tz>> {
  match timezone
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt)
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      Ok(if first <= second {
        first
      } else {
        second
      })
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in {timezone}: \
         {context}"
      ))
    }
  }
}

/// Parses an event date string as
/// delivered by the dashboard API.
/// Values without an offset are read as
/// wall-clock time in `timezone`.
#[tracing::instrument(skip(timezone))]
pub fn parse_event_instant(
  input: &str,
  timezone: Tz
) -> anyhow::Result<DateTime<Tz>> {
  let token = input.trim();

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(
      dt.with_timezone(&timezone)
    );
  }

  if let Ok(ndt) =
    NaiveDateTime::parse_from_str(
      token,
      "%Y%m%dT%H%M%SZ"
    )
  {
    return Ok(
      DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc)
        .with_timezone(&timezone)
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    let midnight = date
      .and_hms_opt(0, 0, 0)
      .ok_or_else(|| {
        anyhow!(
          "failed to construct \
           midnight for date"
        )
      })?;
    return local_to_instant(
      midnight, timezone, "date"
    );
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return local_to_instant(
        ndt, timezone, fmt
      );
    }
  }

  Err(anyhow!(
    "unrecognized event date: {input}"
  ))
  .with_context(|| {
    "supported formats: RFC3339, \
     YYYY-MM-DD, YYYY-MM-DDTHH:MM[:SS], \
     YYYY-MM-DD HH:MM[:SS], \
     YYYYMMDDTHHMMSSZ"
  })
}

/// Parses the `--month` argument: a
/// month name, a 1-based number or
/// `YYYY-MM`. Returns the year when one
/// was given and the zero-based month
/// index.
pub fn parse_month_arg(
  raw: &str
) -> anyhow::Result<(Option<i32>, u32)>
{
  let token = raw.trim();
  let lower =
    token.to_ascii_lowercase();

  if let Some(month) =
    parse_month_name(&lower)
  {
    return Ok((None, month - 1));
  }

  let year_month_re = Regex::new(r"^(?P<year>\d{4})-(?P<month>\d{1,2})$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    year_month_re.captures(token)
  {
    let year: i32 = caps["year"]
      .parse()
      .context("invalid year")?;
    let month: u32 = caps["month"]
      .parse()
      .context("invalid month")?;
    if !(1..=12).contains(&month) {
      return Err(anyhow!(
        "month out of range: {month}"
      ));
    }
    return Ok((Some(year), month - 1));
  }

  let month: u32 =
    token.parse().with_context(|| {
      format!(
        "unrecognized month: {raw} \
         (expected a name, 1-12 or \
         YYYY-MM)"
      )
    })?;
  if !(1..=12).contains(&month) {
    return Err(anyhow!(
      "month out of range: {month}"
    ));
  }
  Ok((None, month - 1))
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

/// Same calendar day, compared on
/// day-of-month and month only. Grids
/// never span more than six weeks, so
/// the year cannot collide inside one.
#[must_use]
pub fn is_same_date(
  a: NaiveDate,
  b: NaiveDate
) -> bool {
  a.day() == b.day()
    && a.month() == b.month()
}

/// Grid column of a weekday in a
/// Monday-first week: Monday is 1 and
/// Sunday wraps to 7.
#[must_use]
pub fn weekday_column(
  weekday: Weekday
) -> u32 {
  weekday.number_from_monday()
}

#[must_use]
pub fn is_date_in_month(
  date: NaiveDate,
  month_index: u32,
  year: i32
) -> bool {
  date.month0() == month_index
    && date.year() == year
}

/// Rolls an out-of-range month index
/// into the neighbouring years, so 12
/// is January of the next year and -1
/// is December of the previous one.
#[must_use]
pub fn normalize_month(
  year: i32,
  month_index: i32
) -> (i32, u32) {
  let year = year.saturating_add(
    month_index.div_euclid(12)
  );
  (year, month_index.rem_euclid(12) as u32)
}

pub(crate) fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub(crate) fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub(crate) fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    NaiveDate,
    Timelike,
    Weekday
  };

  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn sunday_wraps_to_last_column() {
    assert_eq!(
      weekday_column(Weekday::Mon),
      1
    );
    assert_eq!(
      weekday_column(Weekday::Thu),
      4
    );
    assert_eq!(
      weekday_column(Weekday::Sun),
      7
    );
  }

  #[test]
  fn same_date_ignores_year() {
    assert!(is_same_date(
      date(2024, 2, 5),
      date(2025, 2, 5)
    ));
    assert!(!is_same_date(
      date(2024, 2, 5),
      date(2024, 3, 5)
    ));
  }

  #[test]
  fn month_predicate_uses_zero_based_index()
  {
    assert!(is_date_in_month(
      date(2024, 2, 29),
      1,
      2024
    ));
    assert!(!is_date_in_month(
      date(2024, 2, 29),
      1,
      2023
    ));
  }

  #[test]
  fn normalizes_month_overflow() {
    assert_eq!(
      normalize_month(2024, 12),
      (2025, 0)
    );
    assert_eq!(
      normalize_month(2024, -1),
      (2023, 11)
    );
    assert_eq!(
      normalize_month(2024, 1),
      (2024, 1)
    );
  }

  #[test]
  fn parses_date_only_as_local_midnight()
  {
    let parsed = parse_event_instant(
      "2024-02-05",
      chrono_tz::Europe::Madrid
    )
    .expect("parse date");
    assert_eq!(
      parsed.date_naive(),
      date(2024, 2, 5)
    );
    assert_eq!(parsed.hour(), 0);
  }

  #[test]
  fn converts_rfc3339_into_project_zone()
  {
    let parsed = parse_event_instant(
      "2024-02-05T23:30:00Z",
      chrono_tz::Europe::Madrid
    )
    .expect("parse rfc3339");
    assert_eq!(
      parsed.date_naive(),
      date(2024, 2, 6)
    );
  }

  #[test]
  fn rejects_garbage_dates() {
    assert!(
      parse_event_instant(
        "next tuesday-ish",
        chrono_tz::UTC
      )
      .is_err()
    );
  }

  #[test]
  fn parses_month_arguments() {
    assert_eq!(
      parse_month_arg("February")
        .expect("name"),
      (None, 1)
    );
    assert_eq!(
      parse_month_arg("12")
        .expect("number"),
      (None, 11)
    );
    assert_eq!(
      parse_month_arg("2024-02")
        .expect("year-month"),
      (Some(2024), 1)
    );
    assert!(parse_month_arg("13").is_err());
  }

  #[test]
  fn last_day_handles_leap_february() {
    assert_eq!(
      last_day_of_month(2024, 2).day(),
      29
    );
    assert_eq!(
      last_day_of_month(2023, 12),
      date(2023, 12, 31)
    );
  }
}
