//! Calendar-day helpers anchored to a single fixed timezone (UTC+9).
//!
//! Every learner shares the same "today" no matter where the request comes
//! from. Days travel as zero-padded `YYYY-MM-DD` strings; `CalendarDay` only
//! accepts that shape and always renders it, so comparing the strings
//! lexicographically gives the same answer as comparing the dates.

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Offset used for all day-boundary decisions.
pub const FIXED_TZ_OFFSET_SECS: i32 = 9 * 3600;

const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
  #[error("expected a YYYY-MM-DD date, got '{0}'")]
  Malformed(String),
  #[error("{date} shifted by {days} days leaves the 0000-01-01..9999-12-31 range")]
  OutOfRange { date: CalendarDay, days: i64 },
}

/// A calendar day rendered as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarDay(NaiveDate);

/// First and last day with a four-digit year.
fn day_range() -> (NaiveDate, NaiveDate) {
  (
    NaiveDate::from_ymd_opt(0, 1, 1).unwrap_or(NaiveDate::MIN),
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX),
  )
}

impl CalendarDay {
  /// Day `n` days after (or before, for negative `n`) this one; None when the
  /// result has no four-digit year.
  pub fn checked_add_days(self, n: i64) -> Option<Self> {
    let (first, last) = day_range();
    let shifted = TimeDelta::try_days(n).and_then(|d| self.0.checked_add_signed(d))?;
    (first..=last).contains(&shifted).then_some(Self(shifted))
  }

  /// `checked_add_days`, clamped to the representable range.
  pub fn saturating_add_days(self, n: i64) -> Self {
    self.checked_add_days(n).unwrap_or_else(|| {
      let (first, last) = day_range();
      Self(if n < 0 { first } else { last })
    })
  }
}

impl FromStr for CalendarDay {
  type Err = DateError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let bytes = s.as_bytes();
    let shaped = bytes.len() == 10
      && bytes[4] == b'-'
      && bytes[7] == b'-'
      && bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
      return Err(DateError::Malformed(s.to_string()));
    }
    NaiveDate::parse_from_str(s, DAY_FORMAT)
      .map(Self)
      .map_err(|_| DateError::Malformed(s.to_string()))
  }
}

impl fmt::Display for CalendarDay {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.format(DAY_FORMAT))
  }
}

impl TryFrom<String> for CalendarDay {
  type Error = DateError;
  fn try_from(s: String) -> Result<Self, Self::Error> {
    s.parse()
  }
}

impl From<CalendarDay> for String {
  fn from(d: CalendarDay) -> Self {
    d.to_string()
  }
}

/// Today's calendar day in the fixed timezone.
pub fn today_in_fixed_tz(now: DateTime<Utc>) -> CalendarDay {
  let tz = FixedOffset::east_opt(FIXED_TZ_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
  CalendarDay(now.with_timezone(&tz).date_naive())
}

/// `today_in_fixed_tz` for the current wall clock.
pub fn today() -> CalendarDay {
  today_in_fixed_tz(Utc::now())
}

pub fn add_days(date: CalendarDay, n: i64) -> Result<CalendarDay, DateError> {
  date.checked_add_days(n).ok_or(DateError::OutOfRange { date, days: n })
}

pub fn compare_dates(a: CalendarDay, b: CalendarDay) -> Ordering {
  a.cmp(&b)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn day(s: &str) -> CalendarDay {
    s.parse().expect("valid day")
  }

  fn add_days_str(date: &str, n: i64) -> Result<String, DateError> {
    Ok(add_days(date.parse()?, n)?.to_string())
  }

  fn compare_date_strs(a: &str, b: &str) -> Result<Ordering, DateError> {
    Ok(compare_dates(a.parse()?, b.parse()?))
  }

  #[test]
  fn today_uses_fixed_offset_not_utc() {
    // 15:30 UTC is already the next day at UTC+9.
    let now = Utc.with_ymd_and_hms(2024, 1, 9, 15, 30, 0).unwrap();
    assert_eq!(today_in_fixed_tz(now).to_string(), "2024-01-10");

    let morning = Utc.with_ymd_and_hms(2024, 1, 9, 14, 59, 59).unwrap();
    assert_eq!(today_in_fixed_tz(morning).to_string(), "2024-01-09");
  }

  #[test]
  fn add_days_rolls_over_months_and_years() {
    assert_eq!(add_days_str("2024-01-31", 1).unwrap(), "2024-02-01");
    assert_eq!(add_days_str("2024-02-28", 1).unwrap(), "2024-02-29");
    assert_eq!(add_days_str("2023-02-28", 1).unwrap(), "2023-03-01");
    assert_eq!(add_days_str("2024-12-25", 30).unwrap(), "2025-01-24");
    assert_eq!(add_days_str("2024-01-01", -1).unwrap(), "2023-12-31");
    assert_eq!(add_days_str("2024-03-01", -1).unwrap(), "2024-02-29");
  }

  #[test]
  fn add_days_is_monotonic() {
    let base = day("2024-06-15");
    for n in -400..=400 {
      let expected = n.cmp(&0);
      assert_eq!(compare_dates(add_days(base, n).unwrap(), base), expected, "n={n}");
    }
  }

  #[test]
  fn string_order_matches_date_order() {
    let a = day("2024-01-09");
    let b = day("2024-01-10");
    let c = day("2024-10-01");
    assert_eq!(a.to_string().cmp(&b.to_string()), compare_dates(a, b));
    assert_eq!(b.to_string().cmp(&c.to_string()), compare_dates(b, c));
    assert_eq!(compare_date_strs("2024-01-10", "2024-01-10").unwrap(), Ordering::Equal);
  }

  #[test]
  fn rejects_malformed_days() {
    for bad in ["", "2024-1-10", "2024/01/10", "24-01-10", "2024-13-01", "2024-02-30", "2024-01-10T00:00"] {
      assert!(bad.parse::<CalendarDay>().is_err(), "{bad} should be rejected");
    }
    assert!(add_days_str("nope", 1).is_err());
  }

  #[test]
  fn huge_shifts_are_errors_not_panics() {
    for n in [1_000_000_000, -1_000_000_000, i64::MAX, i64::MIN, 3_000_000] {
      assert!(matches!(add_days(day("2024-01-01"), n), Err(DateError::OutOfRange { .. })), "n={n}");
    }
    assert!(add_days_str("2024-01-01", 1_000_000_000).is_err());
    assert_eq!(add_days_str("9999-12-30", 1).unwrap(), "9999-12-31");
    assert!(add_days_str("9999-12-31", 1).is_err());
    assert!(add_days_str("0000-01-01", -1).is_err());
  }

  #[test]
  fn saturating_shift_stays_renderable() {
    assert_eq!(day("9999-12-20").saturating_add_days(30).to_string(), "9999-12-31");
    assert_eq!(day("0001-01-05").saturating_add_days(-1_000_000).to_string(), "0000-01-01");
    assert_eq!(day("2024-02-28").saturating_add_days(2).to_string(), "2024-03-01");
  }

  #[test]
  fn serde_uses_plain_string() {
    let d = day("2024-02-08");
    assert_eq!(serde_json::to_string(&d).unwrap(), "\"2024-02-08\"");
    let back: CalendarDay = serde_json::from_str("\"2024-02-08\"").unwrap();
    assert_eq!(back, d);
    assert!(serde_json::from_str::<CalendarDay>("\"2024-2-8\"").is_err());
  }
}
