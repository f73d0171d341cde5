//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Instants are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`,
//! wall-clock times as `HH:MM:SS`. UUIDs are stored as hyphenated lowercase
//! strings. Constraint failures are turned into [`WriteOutcome`] variants
//! here so callers never have to inspect SQLite error codes.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use quickmark_core::{
  directory::{
    Admin, Credentials, Department, Faculty, Student, Subject, WriteOutcome,
  },
  record::{AttendanceRecord, AttendanceStatus, CalendarEntry},
  session::{AttendanceSession, SessionStatus},
};
use rusqlite::{OptionalExtension as _, Row};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── NaiveDate / NaiveTime ────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

pub fn encode_time(t: NaiveTime) -> String { t.format(TIME_FORMAT).to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, TIME_FORMAT)
    .map_err(|e| Error::Decode(format!("time {s:?}: {e}")))
}

// ─── Statuses ─────────────────────────────────────────────────────────────────

pub fn decode_session_status(s: &str) -> Result<SessionStatus> {
  match s {
    "open" => Ok(SessionStatus::Open),
    "closed" => Ok(SessionStatus::Closed),
    other => Err(Error::Decode(format!("unknown session status: {other:?}"))),
  }
}

pub fn encode_attendance_status(s: AttendanceStatus) -> &'static str { s.as_str() }

pub fn decode_attendance_status(s: &str) -> Result<AttendanceStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown attendance status: {s:?}")))
}

// ─── Constraint handling ─────────────────────────────────────────────────────

enum Constraint {
  Unique,
  ForeignKey,
}

fn constraint_of(err: &rusqlite::Error) -> Option<Constraint> {
  let rusqlite::Error::SqliteFailure(e, _) = err else { return None };
  if e.code != rusqlite::ErrorCode::ConstraintViolation {
    return None;
  }
  match e.extended_code {
    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Some(Constraint::Unique),
    rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
    _ => None,
  }
}

/// Classify the result of a single-row `INSERT/UPDATE … RETURNING`.
/// `Ok(None)` means the statement matched no row.
pub fn classify_write<T>(
  result: rusqlite::Result<Option<T>>,
) -> rusqlite::Result<WriteOutcome<T>> {
  match result {
    Ok(Some(row)) => Ok(WriteOutcome::Written(row)),
    Ok(None) => Ok(WriteOutcome::NotFound),
    Err(e) => match constraint_of(&e) {
      Some(Constraint::Unique) => Ok(WriteOutcome::Duplicate),
      Some(Constraint::ForeignKey) => Ok(WriteOutcome::MissingReference),
      None => Err(e),
    },
  }
}

/// Run a `… RETURNING` statement expected to touch at most one row.
pub fn write_returning<T>(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
  map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<WriteOutcome<T>> {
  classify_write(conn.query_row(sql, params, map).optional())
}

/// Run a query and collect every mapped row.
pub fn select_all<T>(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
  map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query_map(params, map)?.collect();
  rows
}

/// `true` if a delete failed because other rows still reference the target.
pub fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
  matches!(constraint_of(err), Some(Constraint::ForeignKey))
}

/// Decode the payload of a raw outcome, keeping the other variants as-is.
pub fn decode_outcome<R, T>(
  outcome: WriteOutcome<R>,
  decode: impl FnOnce(R) -> Result<T>,
) -> Result<WriteOutcome<T>> {
  Ok(match outcome {
    WriteOutcome::Written(raw) => WriteOutcome::Written(decode(raw)?),
    WriteOutcome::NotFound => WriteOutcome::NotFound,
    WriteOutcome::Duplicate => WriteOutcome::Duplicate,
    WriteOutcome::MissingReference => WriteOutcome::MissingReference,
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const SESSION_COLUMNS: &str = "session_id, subject_id, faculty_id, session_date, \
                                   start_time, end_time, session_code, status";

/// Raw strings read directly from an `attendance_sessions` row.
pub struct RawSession {
  pub session_id:   String,
  pub subject_id:   String,
  pub faculty_id:   String,
  pub session_date: String,
  pub start_time:   String,
  pub end_time:     Option<String>,
  pub session_code: String,
  pub status:       String,
}

impl RawSession {
  /// Expects the columns in [`SESSION_COLUMNS`] order.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:   row.get(0)?,
      subject_id:   row.get(1)?,
      faculty_id:   row.get(2)?,
      session_date: row.get(3)?,
      start_time:   row.get(4)?,
      end_time:     row.get(5)?,
      session_code: row.get(6)?,
      status:       row.get(7)?,
    })
  }

  pub fn into_session(self) -> Result<AttendanceSession> {
    Ok(AttendanceSession {
      session_id:   decode_uuid(&self.session_id)?,
      subject_id:   decode_uuid(&self.subject_id)?,
      faculty_id:   decode_uuid(&self.faculty_id)?,
      session_date: decode_date(&self.session_date)?,
      start_time:   decode_time(&self.start_time)?,
      end_time:     self.end_time.as_deref().map(decode_time).transpose()?,
      session_code: self.session_code,
      status:       decode_session_status(&self.status)?,
    })
  }
}

pub const RECORD_COLUMNS: &str = "session_id, student_id, status, attended_at";

/// Raw strings read directly from an `attendance_records` row.
pub struct RawRecord {
  pub session_id:  String,
  pub student_id:  String,
  pub status:      String,
  pub attended_at: Option<String>,
}

impl RawRecord {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:  row.get(0)?,
      student_id:  row.get(1)?,
      status:      row.get(2)?,
      attended_at: row.get(3)?,
    })
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      session_id:  decode_uuid(&self.session_id)?,
      student_id:  decode_uuid(&self.student_id)?,
      status:      decode_attendance_status(&self.status)?,
      attended_at: self.attended_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// A record joined with its session date.
pub struct RawCalendarEntry {
  pub session_date: String,
  pub status:       String,
  pub attended_at:  Option<String>,
}

impl RawCalendarEntry {
  pub fn into_entry(self) -> Result<CalendarEntry> {
    Ok(CalendarEntry {
      session_date: decode_date(&self.session_date)?,
      status:       decode_attendance_status(&self.status)?,
      attended_at:  self.attended_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub const ADMIN_COLUMNS: &str = "admin_id, name, email, created_at";

pub struct RawAdmin {
  pub admin_id:   String,
  pub name:       String,
  pub email:      String,
  pub created_at: String,
}

impl RawAdmin {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      admin_id:   row.get(0)?,
      name:       row.get(1)?,
      email:      row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_admin(self) -> Result<Admin> {
    Ok(Admin {
      admin_id:   decode_uuid(&self.admin_id)?,
      name:       self.name,
      email:      self.email,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawDepartment {
  pub department_id: String,
  pub name:          String,
}

impl RawDepartment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { department_id: row.get(0)?, name: row.get(1)? })
  }

  pub fn into_department(self) -> Result<Department> {
    Ok(Department {
      department_id: decode_uuid(&self.department_id)?,
      name:          self.name,
    })
  }
}

pub const FACULTY_COLUMNS: &str = "faculty_id, name, email, department_id, created_at";

pub struct RawFaculty {
  pub faculty_id:    String,
  pub name:          String,
  pub email:         String,
  pub department_id: String,
  pub created_at:    String,
}

impl RawFaculty {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      faculty_id:    row.get(0)?,
      name:          row.get(1)?,
      email:         row.get(2)?,
      department_id: row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  pub fn into_faculty(self) -> Result<Faculty> {
    Ok(Faculty {
      faculty_id:    decode_uuid(&self.faculty_id)?,
      name:          self.name,
      email:         self.email,
      department_id: decode_uuid(&self.department_id)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const STUDENT_COLUMNS: &str = "student_id, roll_number, name, email, department_id, \
                                   current_year, section, created_at";

pub struct RawStudent {
  pub student_id:    String,
  pub roll_number:   String,
  pub name:          String,
  pub email:         String,
  pub department_id: String,
  pub current_year:  Option<i64>,
  pub section:       Option<String>,
  pub created_at:    String,
}

impl RawStudent {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:    row.get(0)?,
      roll_number:   row.get(1)?,
      name:          row.get(2)?,
      email:         row.get(3)?,
      department_id: row.get(4)?,
      current_year:  row.get(5)?,
      section:       row.get(6)?,
      created_at:    row.get(7)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id:    decode_uuid(&self.student_id)?,
      roll_number:   self.roll_number,
      name:          self.name,
      email:         self.email,
      department_id: decode_uuid(&self.department_id)?,
      current_year:  self.current_year,
      section:       self.section,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const SUBJECT_COLUMNS: &str =
  "subject_id, subject_name, department_id, year, section, batch_name";

pub struct RawSubject {
  pub subject_id:    String,
  pub subject_name:  String,
  pub department_id: String,
  pub year:          i64,
  pub section:       String,
  pub batch_name:    Option<String>,
}

impl RawSubject {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:    row.get(0)?,
      subject_name:  row.get(1)?,
      department_id: row.get(2)?,
      year:          row.get(3)?,
      section:       row.get(4)?,
      batch_name:    row.get(5)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id:    decode_uuid(&self.subject_id)?,
      subject_name:  self.subject_name,
      department_id: decode_uuid(&self.department_id)?,
      year:          self.year,
      section:       self.section,
      batch_name:    self.batch_name,
    })
  }
}

/// `(id, password_hash)` as stored.
pub struct RawCredentials {
  pub id:            String,
  pub password_hash: String,
}

impl RawCredentials {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { id: row.get(0)?, password_hash: row.get(1)? })
  }

  pub fn into_credentials(self) -> Result<Credentials> {
    Ok(Credentials {
      id:            decode_uuid(&self.id)?,
      password_hash: self.password_hash,
    })
  }
}
