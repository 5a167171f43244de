use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Days,
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
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "metapilot-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "METAPILOT_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "METAPILOT_TIME_CONFIG";
const DEFAULT_DISPLAY_TIMEZONE: &str =
  "UTC";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Timezone every instant is rendered and
/// bucketed in. Resolved once per process.
pub fn display_timezone() -> &'static Tz
{
  static DISPLAY_TZ: OnceLock<Tz> =
    OnceLock::new();
  DISPLAY_TZ.get_or_init(
    resolve_display_timezone
  )
}

/// A calendar day. Day comparisons and
/// calendar keys go through this type
/// instead of formatted strings.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash
)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
  #[must_use]
  pub fn from_date(
    date: NaiveDate
  ) -> Self {
    Self(date)
  }

  pub fn from_ymd(
    year: i32,
    month: u32,
    day: u32
  ) -> anyhow::Result<Self> {
    NaiveDate::from_ymd_opt(
      year, month, day
    )
    .map(Self)
    .ok_or_else(|| {
      anyhow!(
        "invalid calendar day: \
         {year:04}-{month:02}-{day:02}"
      )
    })
  }

  /// Truncates an instant to its day in
  /// `tz`.
  #[must_use]
  pub fn of(
    instant: DateTime<Utc>,
    tz: &Tz
  ) -> Self {
    Self(
      instant
        .with_timezone(tz)
        .date_naive()
    )
  }

  #[must_use]
  pub fn date(&self) -> NaiveDate {
    self.0
  }

  /// `days` away from this day, or `None`
  /// past the representable range.
  #[must_use]
  pub fn offset(
    &self,
    days: i64
  ) -> Option<Self> {
    let delta = Duration::try_days(days)?;
    self
      .0
      .checked_add_signed(delta)
      .map(Self)
  }

  #[must_use]
  pub fn year(&self) -> i32 {
    self.0.year()
  }

  #[must_use]
  pub fn month(&self) -> u32 {
    self.0.month()
  }
}

impl fmt::Display for CalendarDay {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{}",
      self.0.format("%Y-%m-%d")
    )
  }
}

impl FromStr for CalendarDay {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    NaiveDate::parse_from_str(
      s.trim(),
      "%Y-%m-%d"
    )
    .map(Self)
    .with_context(|| {
      format!(
        "expected YYYY-MM-DD, got: {s}"
      )
    })
  }
}

/// Fixed display patterns used across the
/// dashboard views.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum DatePattern {
  /// `PP`: May 10, 2025
  Long,
  /// `p`: 2:32 PM
  Time,
  /// `PPp`: May 10, 2025 2:32 PM
  LongWithTime,
  /// `yyyy-MM-dd`
  IsoDay,
  /// `MMMM yyyy`: May 2025
  MonthYear
}

impl DatePattern {
  fn strftime(&self) -> &'static str {
    match self {
      | Self::Long => "%b %-d, %Y",
      | Self::Time => "%-I:%M %p",
      | Self::LongWithTime => {
        "%b %-d, %Y %-I:%M %p"
      }
      | Self::IsoDay => "%Y-%m-%d",
      | Self::MonthYear => "%B %Y"
    }
  }
}

#[must_use]
pub fn format_instant(
  instant: DateTime<Utc>,
  pattern: DatePattern,
  tz: &Tz
) -> String {
  instant
    .with_timezone(tz)
    .format(pattern.strftime())
    .to_string()
}

/// Formats a bare day. Time patterns
/// render midnight.
#[must_use]
pub fn format_day(
  day: CalendarDay,
  pattern: DatePattern
) -> String {
  day
    .date()
    .and_time(chrono::NaiveTime::MIN)
    .format(pattern.strftime())
    .to_string()
}

fn resolve_display_timezone() -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
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

  parse_timezone(
    DEFAULT_DISPLAY_TIMEZONE,
    "DEFAULT_DISPLAY_TIMEZONE"
  )
  .unwrap_or(chrono_tz::UTC)
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

  parse_timezone_config(&raw)
    .inspect_err(|err| {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
    })
    .ok()
    .flatten()
    .and_then(|timezone| {
      parse_timezone(
        timezone.as_str(),
        &format!(
          "file:{}",
          path.display()
        )
      )
    })
}

fn parse_timezone_config(
  raw: &str
) -> anyhow::Result<Option<String>> {
  let parsed =
    toml::from_str::<TimezoneConfig>(
      raw
    )?;
  Ok(parsed.timezone.or_else(|| {
    parsed
      .time
      .and_then(|section| {
        section.timezone
      })
  }))
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
        "configured display timezone"
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

/// Resolves a wall-clock time in `tz` to
/// an instant. Ambiguous times pick the
/// earlier instant.
pub fn to_utc_from_local(
  local_naive: NaiveDateTime,
  tz: &Tz,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
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
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Ok(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in timezone {tz}: \
         {context}"
      ))
    }
  }
}

/// Parses a day selector: `today`,
/// `yesterday`, `tomorrow`, a weekday name
/// (next occurrence), `+Nd` / `-Nd`, or
/// `YYYY-MM-DD`.
#[tracing::instrument(skip(now, tz), fields(input = input))]
pub fn parse_day_expr(
  input: &str,
  now: DateTime<Utc>,
  tz: &Tz
) -> anyhow::Result<CalendarDay> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let today = CalendarDay::of(now, tz);

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return shifted(today, 1, token);
    }
    | "yesterday" => {
      return shifted(today, -1, token);
    }
    | _ => {}
  }

  if let Some(weekday) =
    parse_weekday_name(&lower)
  {
    return next_weekday_date(
      today.date(),
      weekday
    )
    .map(CalendarDay::from_date)
    .ok_or_else(|| {
      anyhow!(
        "day out of range: {token}"
      )
    });
  }

  let relative_re = Regex::new(
    r"^(?P<sign>[+-])(?P<count>\d+)d$"
  )
  .context(
    "failed to compile relative day \
     regex"
  )?;
  if let Some(captures) =
    relative_re.captures(&lower)
  {
    let count = captures["count"]
      .parse::<i64>()
      .context(
        "invalid relative day count"
      )?;
    let signed =
      if &captures["sign"] == "-" {
        -count
      } else {
        count
      };
    return shifted(today, signed, token);
  }

  token.parse::<CalendarDay>().map_err(
    |_| {
      anyhow!(
        "unrecognized day '{token}'. \
         Supported: today, yesterday, \
         tomorrow, weekday names (e.g. \
         monday), +Nd/-Nd, YYYY-MM-DD"
      )
    }
  )
}

fn shifted(
  day: CalendarDay,
  days: i64,
  token: &str
) -> anyhow::Result<CalendarDay> {
  day.offset(days).ok_or_else(|| {
    anyhow!(
      "relative day out of range: \
       {token}"
    )
  })
}

/// Parses `YYYY-MM` into a year and
/// month.
pub fn parse_month_expr(
  input: &str
) -> anyhow::Result<(i32, u32)> {
  let token = input.trim();
  let (year, month) = token
    .split_once('-')
    .ok_or_else(|| {
      anyhow!(
        "expected YYYY-MM, got: \
         {token}"
      )
    })?;
  let year = year
    .parse::<i32>()
    .with_context(|| {
      format!("invalid year in {token}")
    })?;
  let month = month
    .parse::<u32>()
    .with_context(|| {
      format!(
        "invalid month in {token}"
      )
    })?;
  if !(1..=12).contains(&month) {
    return Err(anyhow!(
      "month out of range in {token}"
    ));
  }
  Ok((year, month))
}

pub(crate) fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
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

/// First `target` strictly after `from`;
/// `None` at the end of the calendar.
pub(crate) fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> Option<NaiveDate> {
  let from_idx =
    from.weekday().num_days_from_monday();
  let target_idx =
    target.num_days_from_monday();
  let delta = match (7 + target_idx
    - from_idx)
    % 7
  {
    | 0 => 7,
    | delta => delta
  };
  from.checked_add_days(Days::new(
    u64::from(delta)
  ))
}

/// Day `day` of the given month, clamped
/// to the month's last day.
pub(crate) fn month_day_clamped(
  year: i32,
  month: u32,
  day: u32
) -> Option<NaiveDate> {
  let last = (28..=31).rev().find_map(
    |candidate| {
      NaiveDate::from_ymd_opt(
        year, month, candidate
      )
    }
  )?;
  NaiveDate::from_ymd_opt(
    year,
    month,
    day.clamp(1, last.day())
  )
}

pub(crate) fn parse_clock_time(
  token: &str
) -> Option<(u32, u32)> {
  let clock_re = Regex::new(
    r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$",
  )
  .ok()?;
  let captures =
    clock_re.captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  if minute > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    let ampm = ampm_match
      .as_str()
      .to_ascii_lowercase();
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    match ampm.as_str() {
      | "am" => {
        if raw_hour == 12 {
          0
        } else {
          raw_hour
        }
      }
      | "pm" => {
        if raw_hour == 12 {
          12
        } else {
          raw_hour + 12
        }
      }
      | _ => return None
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  Some((hour, minute))
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    CalendarDay,
    DatePattern,
    format_day,
    format_instant,
    month_day_clamped,
    next_weekday_date,
    parse_clock_time,
    parse_day_expr,
    parse_month_expr,
    parse_timezone_config
  };

  #[test]
  fn calendar_day_truncates_in_timezone()
  {
    let instant = Utc
      .with_ymd_and_hms(
        2025, 5, 7, 2, 30, 0
      )
      .single()
      .expect("valid instant");

    let utc_day = CalendarDay::of(
      instant,
      &chrono_tz::UTC
    );
    let mexico_day = CalendarDay::of(
      instant,
      &chrono_tz::America::Mexico_City
    );

    assert_eq!(
      utc_day.to_string(),
      "2025-05-07"
    );
    assert_eq!(
      mexico_day.to_string(),
      "2025-05-06"
    );
  }

  #[test]
  fn offsets_within_calendar() {
    let day = CalendarDay::from_ymd(
      2025, 12, 31
    )
    .expect("valid day");
    assert_eq!(
      day
        .offset(1)
        .map(|d| d.to_string()),
      Some("2026-01-01".to_string())
    );
    assert_eq!(
      day.offset(i64::MAX),
      None
    );
    assert_eq!(
      day.offset(-400_000_000),
      None
    );
  }

  #[test]
  fn huge_relative_days_are_errors() {
    let now = Utc
      .with_ymd_and_hms(
        2025, 5, 14, 12, 0, 0
      )
      .single()
      .expect("valid now");
    let tz = chrono_tz::UTC;

    for input in [
      "+200000000000000d",
      "-200000000000000d",
      "+100000000d"
    ] {
      let err = parse_day_expr(
        input, now, &tz
      )
      .expect_err(input);
      assert!(
        err
          .to_string()
          .contains("out of range"),
        "{input}: {err}"
      );
    }

    let terms =
      vec!["date:+200000000000000d"
        .to_string()];
    assert!(
      crate::filter::TxFilter::parse(
        &terms, now, &tz
      )
      .is_err()
    );
  }

  #[test]
  fn weekday_at_calendar_end() {
    assert_eq!(
      next_weekday_date(
        NaiveDate::MAX,
        NaiveDate::MAX
          .weekday()
          .succ()
      ),
      None
    );
  }

  #[test]
  fn formats_fixed_patterns() {
    let instant = Utc
      .with_ymd_and_hms(
        2025, 5, 10, 14, 32, 0
      )
      .single()
      .expect("valid instant");
    let tz = chrono_tz::UTC;

    assert_eq!(
      format_instant(
        instant,
        DatePattern::Long,
        &tz
      ),
      "May 10, 2025"
    );
    assert_eq!(
      format_instant(
        instant,
        DatePattern::Time,
        &tz
      ),
      "2:32 PM"
    );
    assert_eq!(
      format_instant(
        instant,
        DatePattern::LongWithTime,
        &tz
      ),
      "May 10, 2025 2:32 PM"
    );
    assert_eq!(
      format_day(
        CalendarDay::of(instant, &tz),
        DatePattern::MonthYear
      ),
      "May 2025"
    );
  }

  #[test]
  fn parses_relative_and_named_days() {
    let now = Utc
      .with_ymd_and_hms(
        2025, 5, 14, 12, 0, 0
      )
      .single()
      .expect("valid now");
    let tz = chrono_tz::UTC;

    let parse = |input: &str| {
      parse_day_expr(input, now, &tz)
        .expect("parse day")
        .to_string()
    };

    assert_eq!(
      parse("today"),
      "2025-05-14"
    );
    assert_eq!(
      parse("yesterday"),
      "2025-05-13"
    );
    assert_eq!(parse("+3d"), "2025-05-17");
    assert_eq!(parse("-7d"), "2025-05-07");
    // 2025-05-14 is a Wednesday.
    assert_eq!(
      parse("friday"),
      "2025-05-16"
    );
    assert_eq!(
      parse("wednesday"),
      "2025-05-21"
    );
    assert_eq!(
      parse("2025-05-06"),
      "2025-05-06"
    );
    assert!(
      parse_day_expr(
        "someday", now, &tz
      )
      .is_err()
    );
  }

  #[test]
  fn parses_month_expr() {
    assert_eq!(
      parse_month_expr("2025-05")
        .expect("valid month"),
      (2025, 5)
    );
    assert!(
      parse_month_expr("2025-13")
        .is_err()
    );
    assert!(
      parse_month_expr("May").is_err()
    );
  }

  #[test]
  fn parses_clock_times() {
    assert_eq!(
      parse_clock_time("10:00 AM"),
      Some((10, 0))
    );
    assert_eq!(
      parse_clock_time("12:00 PM"),
      Some((12, 0))
    );
    assert_eq!(
      parse_clock_time("12:15 am"),
      Some((0, 15))
    );
    assert_eq!(
      parse_clock_time("18:45"),
      Some((18, 45))
    );
    assert_eq!(
      parse_clock_time("13:00 PM"),
      None
    );
  }

  #[test]
  fn clamps_month_days() {
    assert_eq!(
      month_day_clamped(2025, 2, 31),
      NaiveDate::from_ymd_opt(
        2025, 2, 28
      )
    );
    assert_eq!(
      month_day_clamped(2024, 2, 30),
      NaiveDate::from_ymd_opt(
        2024, 2, 29
      )
    );
    assert_eq!(
      month_day_clamped(2025, 6, 1),
      NaiveDate::from_ymd_opt(
        2025, 6, 1
      )
    );
  }

  #[test]
  fn reads_timezone_from_either_layout()
  {
    assert_eq!(
      parse_timezone_config(
        "timezone = \"Europe/Berlin\""
      )
      .expect("valid toml"),
      Some("Europe/Berlin".to_string())
    );
    assert_eq!(
      parse_timezone_config(
        "[time]\ntimezone = \"Asia/Tokyo\""
      )
      .expect("valid toml"),
      Some("Asia/Tokyo".to_string())
    );
    assert_eq!(
      parse_timezone_config("")
        .expect("valid toml"),
      None
    );
  }
}
