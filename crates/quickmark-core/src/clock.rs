//! Time source for the attendance engine.
//!
//! All instants are UTC. Session dates and wall-clock times are derived from
//! the UTC instant, so a session opened at 23:30 UTC belongs to that UTC date
//! regardless of where the faculty member sits.

use chrono::{DateTime, NaiveTime, Timelike, Utc};

/// Something that can tell the current time.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock frozen at a single instant. Mostly useful in tests and seeding.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> { self.0 }
}

/// The wall-clock time of `instant`, truncated to whole seconds.
pub fn wall_clock(instant: DateTime<Utc>) -> NaiveTime {
  NaiveTime::from_hms_opt(instant.hour(), instant.minute(), instant.second())
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn wall_clock_drops_subsecond_precision() {
    let instant = Utc
      .with_ymd_and_hms(2024, 9, 5, 10, 4, 59)
      .unwrap()
      .with_nanosecond(987_654_321)
      .unwrap();
    assert_eq!(wall_clock(instant), NaiveTime::from_hms_opt(10, 4, 59).unwrap());
  }
}
