//! The attendance engine: session lifecycle, record upsert, calendar view,
//! and the authorization gate in front of them.
//!
//! The engine holds no state between calls. Every operation is a short
//! sequence of reads followed by at most one write, and every permission or
//! validation check happens before that write. Races between concurrent
//! requests are settled by the store (conditional close, atomic upsert).

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error, Result,
  calendar::{AttendanceCalendar, fold_calendar, month_window},
  clock::{Clock, SystemClock, wall_clock},
  directory::WriteOutcome,
  record::{AttendanceRecord, AttendanceStatus},
  session::{
    AttendanceSession, MAX_SESSION_CODE_LEN, NewSession, generate_session_code,
  },
  store::AttendanceStore,
};

/// How many fresh codes to try before giving up on a crowded code space.
const CODE_ATTEMPTS: usize = 8;

// ─── Commands ────────────────────────────────────────────────────────────────

/// The authenticated identity performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
  Faculty(Uuid),
  Student(Uuid),
}

#[derive(Debug, Clone)]
pub struct OpenSession {
  pub subject_id:   Uuid,
  pub faculty_id:   Uuid,
  /// Generated when absent or blank.
  pub session_code: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct CloseSession {
  pub session_id: Uuid,
  pub faculty_id: Uuid,
}

#[derive(Debug, Clone)]
pub enum MarkAttendance {
  /// A faculty member records (or corrects) a student's status. Allowed on
  /// closed sessions too.
  Manual {
    session_id: Uuid,
    faculty_id: Uuid,
    student_id: Uuid,
    status:     AttendanceStatus,
  },
  /// A student checks themselves in with the code of an open session.
  CheckIn {
    session_code: String,
    student_id:   Uuid,
  },
}

#[derive(Debug, Clone, Copy)]
pub struct CalendarQuery {
  pub student_id: Uuid,
  pub subject_id: Uuid,
  pub month:      u32,
  pub year:       i32,
  pub actor:      Actor,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct AttendanceEngine<S, C = SystemClock> {
  store: Arc<S>,
  clock: C,
}

impl<S: AttendanceStore> AttendanceEngine<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store, clock: SystemClock } }
}

impl<S, C> AttendanceEngine<S, C>
where
  S: AttendanceStore,
  C: Clock,
{
  pub fn with_clock(store: Arc<S>, clock: C) -> Self { Self { store, clock } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Session lifecycle ─────────────────────────────────────────────────

  /// Open a new session for a subject the faculty member is assigned to.
  pub async fn open_session(&self, cmd: OpenSession) -> Result<AttendanceSession> {
    let supplied = normalise_code(cmd.session_code)?;

    self
      .require_assignment(
        cmd.faculty_id,
        cmd.subject_id,
        "you are not authorized to start attendance for this subject",
      )
      .await?;

    let now = self.clock.now();
    let template = NewSession {
      subject_id:   cmd.subject_id,
      faculty_id:   cmd.faculty_id,
      session_date: now.date_naive(),
      start_time:   wall_clock(now),
      session_code: String::new(),
    };

    let session = match supplied {
      Some(code) => self
        .insert_session(NewSession { session_code: code, ..template })
        .await?
        .ok_or_else(|| {
          Error::BadRequest(
            "session code is already in use by another open session".into(),
          )
        })?,
      None => self.insert_with_generated_code(template).await?,
    };

    tracing::info!(
      session_id = %session.session_id,
      subject_id = %session.subject_id,
      faculty_id = %session.faculty_id,
      "attendance session opened"
    );
    Ok(session)
  }

  /// Close an open session. Only its creator may do so, and only once.
  pub async fn close_session(&self, cmd: CloseSession) -> Result<AttendanceSession> {
    let session = self
      .store
      .get_session(cmd.session_id)
      .await
      .map_err(Error::store)?
      .filter(|s| s.status.is_open())
      .ok_or_else(not_open)?;

    if session.faculty_id != cmd.faculty_id {
      return Err(Error::Forbidden(
        "you are not authorized to end this session".into(),
      ));
    }

    let end_time = wall_clock(self.clock.now());
    let closed = self
      .store
      .close_session(cmd.session_id, end_time)
      .await
      .map_err(Error::store)?
      // Lost a race against another close.
      .ok_or_else(not_open)?;

    tracing::info!(session_id = %closed.session_id, "attendance session closed");
    Ok(closed)
  }

  // ── Records ───────────────────────────────────────────────────────────

  /// Record attendance, either by hand (faculty) or by self-check-in
  /// (student). The stored record always reflects the latest call.
  pub async fn mark_attendance(&self, cmd: MarkAttendance) -> Result<AttendanceRecord> {
    let record = match cmd {
      MarkAttendance::Manual { session_id, faculty_id, student_id, status } => {
        let session = self
          .store
          .get_session(session_id)
          .await
          .map_err(Error::store)?
          .ok_or_else(|| Error::NotFound("attendance session not found".into()))?;

        self
          .require_assignment(
            faculty_id,
            session.subject_id,
            "you are not authorized to mark attendance for this session",
          )
          .await?;
        self
          .require_enrollment_or(
            student_id,
            session.subject_id,
            Error::BadRequest("student is not enrolled in this subject".into()),
          )
          .await?;

        // A hand-entered absence has no check-in moment.
        let attended_at = match status {
          AttendanceStatus::Absent => None,
          AttendanceStatus::Present | AttendanceStatus::Late => Some(self.clock.now()),
        };
        AttendanceRecord { session_id, student_id, status, attended_at }
      }

      MarkAttendance::CheckIn { session_code, student_id } => {
        let code = session_code.trim();
        if code.is_empty() {
          return Err(Error::BadRequest("session code is required".into()));
        }

        let session = self
          .store
          .find_open_session_by_code(code)
          .await
          .map_err(Error::store)?
          .ok_or_else(|| {
            Error::NotFound("active attendance session not found with this code".into())
          })?;

        self
          .require_enrollment_or(
            student_id,
            session.subject_id,
            Error::BadRequest(
              "you are not enrolled in this subject for this session".into(),
            ),
          )
          .await?;

        AttendanceRecord {
          session_id: session.session_id,
          student_id,
          status: AttendanceStatus::Present,
          attended_at: Some(self.clock.now()),
        }
      }
    };

    let stored = self.store.upsert_record(record).await.map_err(Error::store)?;
    tracing::debug!(
      session_id = %stored.session_id,
      student_id = %stored.student_id,
      status = %stored.status,
      "attendance recorded"
    );
    Ok(stored)
  }

  /// A student's attendance for one subject and month, keyed by date.
  pub async fn attendance_calendar(&self, query: CalendarQuery) -> Result<AttendanceCalendar> {
    let (from, to) = month_window(query.year, query.month)?;

    match query.actor {
      Actor::Faculty(faculty_id) => {
        self
          .require_assignment(
            faculty_id,
            query.subject_id,
            "you are not authorized to view attendance for this subject",
          )
          .await?;
        self
          .require_enrollment_or(
            query.student_id,
            query.subject_id,
            Error::NotFound("student not found in this subject".into()),
          )
          .await?;
      }
      Actor::Student(student_id) => {
        if student_id != query.student_id {
          return Err(Error::Forbidden(
            "students may only view their own attendance".into(),
          ));
        }
        self
          .require_enrollment_or(
            student_id,
            query.subject_id,
            Error::Forbidden("you are not enrolled in this subject".into()),
          )
          .await?;
      }
    }

    let history = self
      .store
      .student_history(query.student_id, query.subject_id, from, to)
      .await
      .map_err(Error::store)?;
    Ok(fold_calendar(history))
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn require_assignment(
    &self,
    faculty_id: Uuid,
    subject_id: Uuid,
    message: &str,
  ) -> Result<()> {
    let assigned = self
      .store
      .is_faculty_assigned(faculty_id, subject_id)
      .await
      .map_err(Error::store)?;
    if assigned {
      Ok(())
    } else {
      tracing::warn!(%faculty_id, %subject_id, "faculty not assigned to subject");
      Err(Error::Forbidden(message.to_owned()))
    }
  }

  async fn require_enrollment_or(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
    otherwise: Error,
  ) -> Result<()> {
    let enrolled = self
      .store
      .is_student_enrolled(student_id, subject_id)
      .await
      .map_err(Error::store)?;
    if enrolled { Ok(()) } else { Err(otherwise) }
  }

  /// `Ok(None)` means the code collided with another open session.
  async fn insert_session(&self, input: NewSession) -> Result<Option<AttendanceSession>> {
    let subject_id = input.subject_id;
    match self.store.insert_session(input).await.map_err(Error::store)? {
      WriteOutcome::Written(session) => Ok(Some(session)),
      WriteOutcome::Duplicate => Ok(None),
      WriteOutcome::MissingReference | WriteOutcome::NotFound => {
        Err(Error::NotFound(format!("subject {subject_id} not found")))
      }
    }
  }

  async fn insert_with_generated_code(
    &self,
    template: NewSession,
  ) -> Result<AttendanceSession> {
    for _ in 0..CODE_ATTEMPTS {
      let input = NewSession { session_code: generate_session_code(), ..template.clone() };
      if let Some(session) = self.insert_session(input).await? {
        return Ok(session);
      }
    }
    Err(Error::Internal(
      "could not generate a session code that is not already in use".into(),
    ))
  }
}

fn not_open() -> Error {
  Error::NotFound("active attendance session not found or already closed".into())
}

/// Trim a caller-supplied code; blank means "generate one for me".
fn normalise_code(code: Option<String>) -> Result<Option<String>> {
  let Some(code) = code else { return Ok(None) };
  let code = code.trim();
  if code.is_empty() {
    return Ok(None);
  }
  if code.chars().count() > MAX_SESSION_CODE_LEN {
    return Err(Error::BadRequest(format!(
      "session code must be at most {MAX_SESSION_CODE_LEN} characters"
    )));
  }
  Ok(Some(code.to_owned()))
}

#[cfg(test)]
mod tests;
