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
  NaiveTime,
  TimeZone,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

pub const TIMEZONE_ENV_VAR: &str =
  "CADENCE_TIMEZONE";

/// The current moment, both as an absolute
/// timestamp (for `createdAt`/`updatedAt`)
/// and as wall-clock time in the configured
/// timezone (for edit windows and "today").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
  pub utc:   DateTime<Utc>,
  pub local: NaiveDateTime
}

impl Moment {
  pub fn from_utc(
    utc: DateTime<Utc>,
    tz: Tz
  ) -> Self {
    Self {
      utc,
      local: local_now(tz, utc)
    }
  }

  pub fn from_local(
    local: NaiveDateTime,
    tz: Tz
  ) -> anyhow::Result<Self> {
    let utc =
      to_utc_from_local(tz, local)?;
    Ok(Self {
      utc,
      local
    })
  }

  pub fn today(&self) -> NaiveDate {
    self.local.date()
  }
}

pub fn local_now(
  tz: Tz,
  utc: DateTime<Utc>
) -> NaiveDateTime {
  utc.with_timezone(&tz).naive_local()
}

pub fn to_utc_from_local(
  tz: Tz,
  local: NaiveDateTime
) -> anyhow::Result<DateTime<Utc>> {
  match tz.from_local_datetime(&local) {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      Ok(
        first
          .min(second)
          .with_timezone(&Utc)
      )
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime {local} does \
         not exist in timezone {tz}"
      ))
    }
  }
}

/// Picks the timezone from
/// `CADENCE_TIMEZONE`, then the configured
/// value, falling back to UTC.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return tz;
  }

  chrono_tz::UTC
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
        "configured timezone"
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

pub(crate) fn at_time(
  date: NaiveDate,
  hour: u32,
  minute: u32,
  second: u32
) -> NaiveDateTime {
  date
    .and_hms_opt(hour, minute, second)
    .unwrap_or_else(|| {
      date.and_time(NaiveTime::MIN)
    })
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// Monday of the Monday-Sunday week
/// containing `date`.
pub fn monday_of(
  date: NaiveDate
) -> NaiveDate {
  let offset = date
    .weekday()
    .num_days_from_monday();
  date
    .checked_sub_days(Days::new(
      u64::from(offset)
    ))
    .unwrap_or(date)
}

pub fn week_start(
  date: NaiveDate
) -> NaiveDateTime {
  monday_of(date).and_time(NaiveTime::MIN)
}

pub fn week_end(
  date: NaiveDate
) -> NaiveDateTime {
  at_time(
    add_days(monday_of(date), 6),
    23,
    59,
    59
  )
}

/// The seven dates Monday..Sunday of the
/// week containing `date`.
pub fn week_days(
  date: NaiveDate
) -> impl Iterator<Item = NaiveDate> + Clone
{
  monday_of(date).iter_days().take(7)
}

pub fn iso_week_number(
  date: NaiveDate
) -> u32 {
  date.iso_week().week()
}

pub fn first_day_of_month(
  date: NaiveDate
) -> NaiveDate {
  date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_month(
  date: NaiveDate
) -> NaiveDate {
  let (year, month) = if date.month()
    == 12
  {
    (date.year().saturating_add(1), 1)
  } else {
    (date.year(), date.month() + 1)
  };

  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .and_then(|next| next.pred_opt())
  .unwrap_or(date)
}

pub fn days_in_month(
  date: NaiveDate
) -> u32 {
  last_day_of_month(date).day()
}

/// Every date from the 1st to the last day
/// of `date`'s month.
pub fn month_days(
  date: NaiveDate
) -> impl Iterator<Item = NaiveDate> + Clone
{
  first_day_of_month(date)
    .iter_days()
    .take(days_in_month(date) as usize)
}

pub fn same_month(
  a: NaiveDate,
  b: NaiveDate
) -> bool {
  a.year() == b.year()
    && a.month() == b.month()
}

/// Moves by whole months, clamping the day
/// to the length of the target month.
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let mut year = date.year();
  let mut month =
    date.month() as i32 + months;

  while month < 1 {
    month += 12;
    year = year.saturating_sub(1);
  }
  while month > 12 {
    month -= 12;
    year = year.saturating_add(1);
  }

  let Some(first) =
    NaiveDate::from_ymd_opt(
      year,
      month as u32,
      1
    )
  else {
    return date;
  };
  let day = date
    .day()
    .min(days_in_month(first));
  first.with_day(day).unwrap_or(first)
}

pub fn week_label(
  date: NaiveDate
) -> String {
  let iso = date.iso_week();
  format!(
    "{}-W{:02}",
    iso.year(),
    iso.week()
  )
}

pub fn month_label(
  date: NaiveDate
) -> String {
  date.format("%Y-%m").to_string()
}

#[tracing::instrument(skip(today))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
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

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let negative = caps
      .name("sign")
      .is_some_and(|m| m.as_str() == "-");
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
    let num =
      if negative { -num } else { num };

    return match caps
      .name("unit")
      .map(|m| m.as_str())
    {
      | Some("d") => {
        Ok(add_days(today, num))
      }
      | Some("w") => {
        Ok(add_days(today, num * 7))
      }
      | Some("m") => {
        let months = i32::try_from(num)
          .context(
            "relative month offset out \
             of range"
          )?;
        Ok(shift_months(today, months))
      }
      | other => {
        Err(anyhow!(
          "unknown relative unit: \
           {other:?}"
        ))
      }
    };
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, weekday \
     names (e.g. monday), +Nd/-Nd, \
     +Nw/-Nw, +Nm/-Nm, YYYY-MM-DD"
  })
}

/// Parses `YYYY-MM-DDTHH:MM[:SS]` or the
/// same with a space separator.
pub fn parse_local_datetime(
  input: &str
) -> anyhow::Result<NaiveDateTime> {
  let token = input.trim();
  for fmt in [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt);
    }
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(
      date.and_time(NaiveTime::MIN)
    );
  }

  Err(anyhow!(
    "unrecognized local datetime: \
     {input} (expected \
     YYYY-MM-DDTHH:MM[:SS])"
  ))
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
  let from_idx = i64::from(
    from.weekday().num_days_from_monday()
  );
  let target_idx = i64::from(
    target.num_days_from_monday()
  );
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}
