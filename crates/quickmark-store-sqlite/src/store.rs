//! [`SqliteStore`]: the SQLite implementation of [`AttendanceStore`].

use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use quickmark_core::{
  directory::WriteOutcome,
  record::{AttendanceRecord, CalendarEntry},
  session::{AttendanceSession, NewSession},
  store::{AttendanceStore, AuthorizationFacts},
};

use crate::{
  Error, Result,
  encode::{
    RECORD_COLUMNS, RawCalendarEntry, RawRecord, RawSession, SESSION_COLUMNS,
    decode_outcome, encode_attendance_status, encode_date, encode_dt, encode_time,
    encode_uuid, select_all, write_returning,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A QuickMark store backed by a single SQLite file.
///
/// Clones share one reference-counted connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  pub(crate) async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// `true` if `(a, b)` exists in the two-column relation `table`.
  async fn relation_exists(
    &self,
    sql: &'static str,
    a: Uuid,
    b: Uuid,
  ) -> Result<bool> {
    let (a, b) = (encode_uuid(a), encode_uuid(b));
    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(sql, rusqlite::params![a, b], |_| Ok(()))
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(found)
  }
}

// ─── AuthorizationFacts impl ─────────────────────────────────────────────────

impl AuthorizationFacts for SqliteStore {
  type Error = Error;

  async fn is_faculty_assigned(&self, faculty_id: Uuid, subject_id: Uuid) -> Result<bool> {
    self
      .relation_exists(
        "SELECT 1 FROM faculty_subjects WHERE faculty_id = ?1 AND subject_id = ?2",
        faculty_id,
        subject_id,
      )
      .await
  }

  async fn is_student_enrolled(&self, student_id: Uuid, subject_id: Uuid) -> Result<bool> {
    self
      .relation_exists(
        "SELECT 1 FROM enrollments WHERE student_id = ?1 AND subject_id = ?2",
        student_id,
        subject_id,
      )
      .await
  }
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn insert_session(&self, input: NewSession) -> Result<WriteOutcome<AttendanceSession>> {
    let id_str      = encode_uuid(Uuid::new_v4());
    let subject_str = encode_uuid(input.subject_id);
    let faculty_str = encode_uuid(input.faculty_id);
    let date_str    = encode_date(input.session_date);
    let start_str   = encode_time(input.start_time);
    let code        = input.session_code;

    let outcome = self
      .conn
      .call(move |conn| {
        Ok(write_returning(
          conn,
          &format!(
            "INSERT INTO attendance_sessions
               (session_id, subject_id, faculty_id, session_date, start_time, session_code, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'open')
             RETURNING {SESSION_COLUMNS}"
          ),
          rusqlite::params![id_str, subject_str, faculty_str, date_str, start_str, code],
          RawSession::from_row,
        )?)
      })
      .await?;

    decode_outcome(outcome, RawSession::into_session)
  }

  async fn get_session(&self, session_id: Uuid) -> Result<Option<AttendanceSession>> {
    let id_str = encode_uuid(session_id);

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SESSION_COLUMNS} FROM attendance_sessions WHERE session_id = ?1"
              ),
              rusqlite::params![id_str],
              RawSession::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn find_open_session_by_code<'a>(
    &'a self,
    code: &'a str,
  ) -> Result<Option<AttendanceSession>> {
    let code = code.to_owned();

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SESSION_COLUMNS} FROM attendance_sessions
                 WHERE session_code = ?1 AND status = 'open'"
              ),
              rusqlite::params![code],
              RawSession::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn close_session(
    &self,
    session_id: Uuid,
    end_time: NaiveTime,
  ) -> Result<Option<AttendanceSession>> {
    let id_str  = encode_uuid(session_id);
    let end_str = encode_time(end_time);

    // The status guard makes the transition happen at most once.
    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE attendance_sessions
                 SET status = 'closed', end_time = ?2
                 WHERE session_id = ?1 AND status = 'open'
                 RETURNING {SESSION_COLUMNS}"
              ),
              rusqlite::params![id_str, end_str],
              RawSession::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn upsert_record(&self, record: AttendanceRecord) -> Result<AttendanceRecord> {
    let session_str  = encode_uuid(record.session_id);
    let student_str  = encode_uuid(record.student_id);
    let status_str   = encode_attendance_status(record.status);
    let attended_str = record.attended_at.map(encode_dt);

    let raw: RawRecord = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "INSERT INTO attendance_records (session_id, student_id, status, attended_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (session_id, student_id) DO UPDATE
               SET status = excluded.status, attended_at = excluded.attended_at
             RETURNING {RECORD_COLUMNS}"
          ),
          rusqlite::params![session_str, student_str, status_str, attended_str],
          RawRecord::from_row,
        )?)
      })
      .await?;

    raw.into_record()
  }

  async fn get_record(
    &self,
    session_id: Uuid,
    student_id: Uuid,
  ) -> Result<Option<AttendanceRecord>> {
    let session_str = encode_uuid(session_id);
    let student_str = encode_uuid(student_id);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RECORD_COLUMNS} FROM attendance_records
                 WHERE session_id = ?1 AND student_id = ?2"
              ),
              rusqlite::params![session_str, student_str],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn student_history(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<CalendarEntry>> {
    let student_str = encode_uuid(student_id);
    let subject_str = encode_uuid(subject_id);
    let from_str    = encode_date(from);
    let to_str      = encode_date(to);

    // Ordered so that, on a day with several sessions, the latest one is
    // folded last.
    let raws: Vec<RawCalendarEntry> = self
      .conn
      .call(move |conn| {
        Ok(select_all(
          conn,
          "SELECT s.session_date, r.status, r.attended_at
           FROM attendance_records r
           JOIN attendance_sessions s ON s.session_id = r.session_id
           WHERE r.student_id = ?1
             AND s.subject_id = ?2
             AND s.session_date BETWEEN ?3 AND ?4
           ORDER BY s.session_date ASC, s.start_time ASC",
          rusqlite::params![student_str, subject_str, from_str, to_str],
          |row| {
            Ok(RawCalendarEntry {
              session_date: row.get(0)?,
              status:       row.get(1)?,
              attended_at:  row.get(2)?,
            })
          },
        )?)
      })
      .await?;

    raws.into_iter().map(RawCalendarEntry::into_entry).collect()
  }
}
