//! Attendance records: one student's outcome for one session.
//!
//! The `(session_id, student_id)` pair is a uniqueness key: writing again for
//! the same pair replaces the stored status and timestamp.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
  Present,
  Absent,
  Late,
}

impl AttendanceStatus {
  pub const ALL: [Self; 3] = [Self::Present, Self::Absent, Self::Late];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Present => "present",
      Self::Absent => "absent",
      Self::Late => "late",
    }
  }
}

impl fmt::Display for AttendanceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Case-insensitive; anything outside the enum is a [`Error::BadRequest`].
impl FromStr for AttendanceStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let lowered = s.trim().to_ascii_lowercase();
    Self::ALL
      .into_iter()
      .find(|status| status.as_str() == lowered)
      .ok_or_else(|| {
        Error::BadRequest(format!(
          "invalid attendance status {s:?}; must be one of: present, absent, late"
        ))
      })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub session_id:  Uuid,
  pub student_id:  Uuid,
  pub status:      AttendanceStatus,
  /// When the student was seen. `None` for an absence entered by hand.
  pub attended_at: Option<DateTime<Utc>>,
}

/// One row of a student's attendance history, joined with its session date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
  pub session_date: NaiveDate,
  pub status:       AttendanceStatus,
  pub attended_at:  Option<DateTime<Utc>>,
}
