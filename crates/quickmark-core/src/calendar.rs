//! Month windows and the date → status calendar view.

use std::collections::BTreeMap;

use chrono::{Datelike as _, Months, NaiveDate};

use crate::{Error, Result, record::{AttendanceStatus, CalendarEntry}};

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

/// A student's attendance for one month, keyed by session date.
///
/// Serialises as a JSON object with `"YYYY-MM-DD"` keys. Days without a
/// session have no entry.
pub type AttendanceCalendar = BTreeMap<NaiveDate, AttendanceStatus>;

/// The inclusive `(first, last)` day of `month` in `year`.
pub fn month_window(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
  if !(1..=12).contains(&month) {
    return Err(Error::BadRequest("month must be between 1 and 12".into()));
  }
  if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
    return Err(Error::BadRequest(format!(
      "year must be between {MIN_YEAR} and {MAX_YEAR}"
    )));
  }

  let first = NaiveDate::from_ymd_opt(year, month, 1)
    .ok_or_else(|| Error::BadRequest(format!("invalid month {year}-{month:02}")))?;
  let last = first
    .checked_add_months(Months::new(1))
    .and_then(|next| next.pred_opt())
    .ok_or_else(|| Error::BadRequest(format!("invalid month {year}-{month:02}")))?;

  debug_assert_eq!(last.month(), month);
  Ok((first, last))
}

/// Fold history rows into a calendar. Rows are applied in order, so when two
/// sessions fall on the same date the later row wins.
pub fn fold_calendar(entries: impl IntoIterator<Item = CalendarEntry>) -> AttendanceCalendar {
  let mut calendar = AttendanceCalendar::new();
  for entry in entries {
    calendar.insert(entry.session_date, entry.status);
  }
  calendar
}
