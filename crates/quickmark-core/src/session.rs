//! Attendance sessions: one teaching instance for which attendance is taken.
//!
//! A session is created `open` and transitions to `closed` exactly once, by
//! the faculty member who opened it. There is no way back.

use chrono::{NaiveDate, NaiveTime};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
  Open,
  Closed,
}

impl SessionStatus {
  pub fn is_open(self) -> bool { matches!(self, Self::Open) }
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSession {
  pub session_id:   Uuid,
  pub subject_id:   Uuid,
  /// The faculty member who opened the session; the only one who may close it.
  pub faculty_id:   Uuid,
  /// UTC calendar date the session was opened on. Used as-is for grouping.
  pub session_date: NaiveDate,
  /// UTC wall-clock time, whole seconds.
  pub start_time:   NaiveTime,
  /// Set when the session is closed.
  pub end_time:     Option<NaiveTime>,
  /// Short token students type in to check themselves in.
  pub session_code: String,
  pub status:       SessionStatus,
}

/// Input to [`crate::store::AttendanceStore::insert_session`].
/// `session_id` is assigned by the store and the status is always `open`.
#[derive(Debug, Clone)]
pub struct NewSession {
  pub subject_id:   Uuid,
  pub faculty_id:   Uuid,
  pub session_date: NaiveDate,
  pub start_time:   NaiveTime,
  pub session_code: String,
}

// ─── Session codes ───────────────────────────────────────────────────────────

/// Length of a generated session code.
pub const SESSION_CODE_LEN: usize = 6;

/// Longest code a faculty member may choose by hand.
pub const MAX_SESSION_CODE_LEN: usize = 64;

const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random code of [`SESSION_CODE_LEN`] uppercase alphanumerics.
pub fn generate_session_code() -> String {
  // 252 is the largest multiple of 36 below 256; rejecting anything above it
  // keeps every character equally likely.
  let mut code = String::with_capacity(SESSION_CODE_LEN);
  let mut buf = [0u8; 16];
  while code.len() < SESSION_CODE_LEN {
    OsRng.fill_bytes(&mut buf);
    for byte in buf {
      if code.len() == SESSION_CODE_LEN {
        break;
      }
      if byte < 252 {
        code.push(CODE_ALPHABET[usize::from(byte % 36)] as char);
      }
    }
  }
  code
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generated_codes_are_short_uppercase_alphanumerics() {
    for _ in 0..200 {
      let code = generate_session_code();
      assert_eq!(code.len(), SESSION_CODE_LEN);
      assert!(
        code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()),
        "unexpected character in {code:?}"
      );
    }
  }

  #[test]
  fn generated_codes_vary() {
    let a = generate_session_code();
    let b = generate_session_code();
    let c = generate_session_code();
    assert!(a != b || b != c);
  }

  #[test]
  fn status_serialises_lowercase() {
    assert_eq!(serde_json::to_string(&SessionStatus::Open).unwrap(), "\"open\"");
    assert_eq!(
      serde_json::to_string(&SessionStatus::Closed).unwrap(),
      "\"closed\""
    );
  }
}
