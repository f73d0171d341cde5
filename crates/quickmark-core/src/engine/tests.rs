//! Engine tests against an in-memory fake store.
//!
//! The SQLite backend has its own end-to-end suite; these cover the gate and
//! lifecycle rules in isolation.

use std::{
  collections::HashSet,
  convert::Infallible,
  sync::{Arc, Mutex},
};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use super::*;
use crate::{
  clock::FixedClock,
  record::CalendarEntry,
  session::{SESSION_CODE_LEN, SessionStatus},
  store::AuthorizationFacts,
};

// ─── Fake store ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct Inner {
  assignments: HashSet<(Uuid, Uuid)>,
  enrollments: HashSet<(Uuid, Uuid)>,
  sessions:    Vec<AttendanceSession>,
  records:     Vec<AttendanceRecord>,
  /// Codes handed back as "taken" before any real insert happens.
  taken_codes: usize,
}

#[derive(Default)]
struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  fn assign(&self, faculty_id: Uuid, subject_id: Uuid) {
    self.inner.lock().unwrap().assignments.insert((faculty_id, subject_id));
  }

  fn enroll(&self, student_id: Uuid, subject_id: Uuid) {
    self.inner.lock().unwrap().enrollments.insert((student_id, subject_id));
  }

  fn session_count(&self) -> usize { self.inner.lock().unwrap().sessions.len() }

  fn records(&self) -> Vec<AttendanceRecord> { self.inner.lock().unwrap().records.clone() }
}

impl AuthorizationFacts for MemoryStore {
  type Error = Infallible;

  async fn is_faculty_assigned(&self, faculty_id: Uuid, subject_id: Uuid) -> Result<bool, Infallible> {
    Ok(self.inner.lock().unwrap().assignments.contains(&(faculty_id, subject_id)))
  }

  async fn is_student_enrolled(&self, student_id: Uuid, subject_id: Uuid) -> Result<bool, Infallible> {
    Ok(self.inner.lock().unwrap().enrollments.contains(&(student_id, subject_id)))
  }
}

impl AttendanceStore for MemoryStore {
  async fn insert_session(
    &self,
    input: NewSession,
  ) -> Result<WriteOutcome<AttendanceSession>, Infallible> {
    let mut inner = self.inner.lock().unwrap();
    if inner.taken_codes > 0 {
      inner.taken_codes -= 1;
      return Ok(WriteOutcome::Duplicate);
    }
    let clash = inner
      .sessions
      .iter()
      .any(|s| s.status.is_open() && s.session_code == input.session_code);
    if clash {
      return Ok(WriteOutcome::Duplicate);
    }
    let session = AttendanceSession {
      session_id:   Uuid::new_v4(),
      subject_id:   input.subject_id,
      faculty_id:   input.faculty_id,
      session_date: input.session_date,
      start_time:   input.start_time,
      end_time:     None,
      session_code: input.session_code,
      status:       SessionStatus::Open,
    };
    inner.sessions.push(session.clone());
    Ok(WriteOutcome::Written(session))
  }

  async fn get_session(&self, session_id: Uuid) -> Result<Option<AttendanceSession>, Infallible> {
    let inner = self.inner.lock().unwrap();
    Ok(inner.sessions.iter().find(|s| s.session_id == session_id).cloned())
  }

  async fn find_open_session_by_code<'a>(
    &'a self,
    code: &'a str,
  ) -> Result<Option<AttendanceSession>, Infallible> {
    let inner = self.inner.lock().unwrap();
    Ok(
      inner
        .sessions
        .iter()
        .find(|s| s.status.is_open() && s.session_code == code)
        .cloned(),
    )
  }

  async fn close_session(
    &self,
    session_id: Uuid,
    end_time: NaiveTime,
  ) -> Result<Option<AttendanceSession>, Infallible> {
    let mut inner = self.inner.lock().unwrap();
    let Some(session) = inner
      .sessions
      .iter_mut()
      .find(|s| s.session_id == session_id && s.status.is_open())
    else {
      return Ok(None);
    };
    session.status = SessionStatus::Closed;
    session.end_time = Some(end_time);
    Ok(Some(session.clone()))
  }

  async fn upsert_record(&self, record: AttendanceRecord) -> Result<AttendanceRecord, Infallible> {
    let mut inner = self.inner.lock().unwrap();
    inner
      .records
      .retain(|r| !(r.session_id == record.session_id && r.student_id == record.student_id));
    inner.records.push(record.clone());
    Ok(record)
  }

  async fn get_record(
    &self,
    session_id: Uuid,
    student_id: Uuid,
  ) -> Result<Option<AttendanceRecord>, Infallible> {
    let inner = self.inner.lock().unwrap();
    Ok(
      inner
        .records
        .iter()
        .find(|r| r.session_id == session_id && r.student_id == student_id)
        .cloned(),
    )
  }

  async fn student_history(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<CalendarEntry>, Infallible> {
    let inner = self.inner.lock().unwrap();
    let mut entries: Vec<CalendarEntry> = inner
      .records
      .iter()
      .filter(|r| r.student_id == student_id)
      .filter_map(|r| {
        let session = inner.sessions.iter().find(|s| s.session_id == r.session_id)?;
        (session.subject_id == subject_id
          && (from..=to).contains(&session.session_date))
          .then(|| CalendarEntry {
            session_date: session.session_date,
            status:       r.status,
            attended_at:  r.attended_at,
          })
      })
      .collect();
    entries.sort_by_key(|e| e.session_date);
    Ok(entries)
  }
}

// ─── Fixture ─────────────────────────────────────────────────────────────────

struct Fixture {
  store:   Arc<MemoryStore>,
  engine:  AttendanceEngine<MemoryStore, FixedClock>,
  faculty: Uuid,
  student: Uuid,
  subject: Uuid,
}

fn noon() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 9, 5, 12, 30, 15).unwrap() }

fn fixture() -> Fixture {
  let store = Arc::new(MemoryStore::default());
  let faculty = Uuid::new_v4();
  let student = Uuid::new_v4();
  let subject = Uuid::new_v4();
  store.assign(faculty, subject);
  store.enroll(student, subject);
  let engine = AttendanceEngine::with_clock(store.clone(), FixedClock(noon()));
  Fixture { store, engine, faculty, student, subject }
}

impl Fixture {
  async fn open(&self, code: Option<&str>) -> AttendanceSession {
    self
      .engine
      .open_session(OpenSession {
        subject_id:   self.subject,
        faculty_id:   self.faculty,
        session_code: code.map(str::to_owned),
      })
      .await
      .unwrap()
  }
}

// ─── OpenSession ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn open_session_stamps_date_and_time_from_clock() {
  let f = fixture();
  let session = f.open(None).await;

  assert_eq!(session.status, SessionStatus::Open);
  assert_eq!(session.session_date, NaiveDate::from_ymd_opt(2024, 9, 5).unwrap());
  assert_eq!(session.start_time, NaiveTime::from_hms_opt(12, 30, 15).unwrap());
  assert_eq!(session.end_time, None);
  assert_eq!(session.session_code.len(), SESSION_CODE_LEN);
}

#[tokio::test]
async fn open_session_keeps_supplied_code() {
  let f = fixture();
  let session = f.open(Some("  lecture-42 ")).await;
  assert_eq!(session.session_code, "lecture-42");
}

#[tokio::test]
async fn blank_code_is_generated() {
  let f = fixture();
  let session = f.open(Some("   ")).await;
  assert_eq!(session.session_code.len(), SESSION_CODE_LEN);
}

#[tokio::test]
async fn unassigned_faculty_cannot_open_session() {
  let f = fixture();
  let err = f
    .engine
    .open_session(OpenSession {
      subject_id:   f.subject,
      faculty_id:   Uuid::new_v4(),
      session_code: None,
    })
    .await
    .unwrap_err();

  assert!(matches!(err, Error::Forbidden(_)));
  assert_eq!(f.store.session_count(), 0);
}

#[tokio::test]
async fn supplied_code_clashing_with_open_session_is_rejected() {
  let f = fixture();
  f.open(Some("ROOM1")).await;

  let err = f
    .engine
    .open_session(OpenSession {
      subject_id:   f.subject,
      faculty_id:   f.faculty,
      session_code: Some("ROOM1".into()),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));
  assert_eq!(f.store.session_count(), 1);
}

#[tokio::test]
async fn generated_code_retries_after_collision() {
  let f = fixture();
  f.store.inner.lock().unwrap().taken_codes = 3;
  let session = f.open(None).await;
  assert_eq!(session.session_code.len(), SESSION_CODE_LEN);
  assert_eq!(f.store.session_count(), 1);
}

#[tokio::test]
async fn generated_code_gives_up_eventually() {
  let f = fixture();
  f.store.inner.lock().unwrap().taken_codes = usize::MAX;
  let err = f
    .engine
    .open_session(OpenSession {
      subject_id:   f.subject,
      faculty_id:   f.faculty,
      session_code: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Internal(_)));
}

#[tokio::test]
async fn overlong_code_is_rejected() {
  let f = fixture();
  let err = f
    .engine
    .open_session(OpenSession {
      subject_id:   f.subject,
      faculty_id:   f.faculty,
      session_code: Some("X".repeat(MAX_SESSION_CODE_LEN + 1)),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));
}

// ─── CloseSession ────────────────────────────────────────────────────────────

#[tokio::test]
async fn close_twice_second_is_not_found() {
  let f = fixture();
  let session = f.open(None).await;
  let cmd = CloseSession { session_id: session.session_id, faculty_id: f.faculty };

  let closed = f.engine.close_session(cmd).await.unwrap();
  assert_eq!(closed.status, SessionStatus::Closed);
  assert_eq!(closed.end_time, Some(NaiveTime::from_hms_opt(12, 30, 15).unwrap()));

  let err = f.engine.close_session(cmd).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn only_creator_may_close() {
  let f = fixture();
  let session = f.open(None).await;
  let colleague = Uuid::new_v4();
  f.store.assign(colleague, f.subject);

  let err = f
    .engine
    .close_session(CloseSession { session_id: session.session_id, faculty_id: colleague })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  let still = f.store.get_session(session.session_id).await.unwrap().unwrap();
  assert!(still.status.is_open());
}

#[tokio::test]
async fn closing_unknown_session_is_not_found() {
  let f = fixture();
  let err = f
    .engine
    .close_session(CloseSession { session_id: Uuid::new_v4(), faculty_id: f.faculty })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

// ─── MarkAttendance ──────────────────────────────────────────────────────────

#[tokio::test]
async fn manual_marks_are_last_write_wins() {
  let f = fixture();
  let session = f.open(None).await;

  let mark = |status| MarkAttendance::Manual {
    session_id: session.session_id,
    faculty_id: f.faculty,
    student_id: f.student,
    status,
  };

  f.engine.mark_attendance(mark(AttendanceStatus::Present)).await.unwrap();
  let second = f.engine.mark_attendance(mark(AttendanceStatus::Absent)).await.unwrap();

  assert_eq!(second.status, AttendanceStatus::Absent);
  assert_eq!(second.attended_at, None);
  assert_eq!(f.store.records(), vec![second]);
}

#[tokio::test]
async fn manual_mark_requires_enrollment() {
  let f = fixture();
  let session = f.open(None).await;
  let err = f
    .engine
    .mark_attendance(MarkAttendance::Manual {
      session_id: session.session_id,
      faculty_id: f.faculty,
      student_id: Uuid::new_v4(),
      status:     AttendanceStatus::Present,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));
  assert!(f.store.records().is_empty());
}

#[tokio::test]
async fn manual_mark_requires_assignment() {
  let f = fixture();
  let session = f.open(None).await;
  let err = f
    .engine
    .mark_attendance(MarkAttendance::Manual {
      session_id: session.session_id,
      faculty_id: Uuid::new_v4(),
      student_id: f.student,
      status:     AttendanceStatus::Late,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));
  assert!(f.store.records().is_empty());
}

#[tokio::test]
async fn manual_mark_allowed_after_close() {
  let f = fixture();
  let session = f.open(None).await;
  f.engine
    .close_session(CloseSession { session_id: session.session_id, faculty_id: f.faculty })
    .await
    .unwrap();

  let record = f
    .engine
    .mark_attendance(MarkAttendance::Manual {
      session_id: session.session_id,
      faculty_id: f.faculty,
      student_id: f.student,
      status:     AttendanceStatus::Late,
    })
    .await
    .unwrap();
  assert_eq!(record.status, AttendanceStatus::Late);
  assert_eq!(record.attended_at, Some(noon()));
}

#[tokio::test]
async fn check_in_marks_present_now() {
  let f = fixture();
  let session = f.open(Some("ABC123")).await;

  let record = f
    .engine
    .mark_attendance(MarkAttendance::CheckIn {
      session_code: "ABC123".into(),
      student_id:   f.student,
    })
    .await
    .unwrap();

  assert_eq!(record.session_id, session.session_id);
  assert_eq!(record.status, AttendanceStatus::Present);
  assert_eq!(record.attended_at, Some(noon()));
}

#[tokio::test]
async fn check_in_on_closed_session_is_not_found() {
  let f = fixture();
  let session = f.open(Some("ABC123")).await;
  f.engine
    .close_session(CloseSession { session_id: session.session_id, faculty_id: f.faculty })
    .await
    .unwrap();

  let err = f
    .engine
    .mark_attendance(MarkAttendance::CheckIn {
      session_code: "ABC123".into(),
      student_id:   f.student,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn check_in_by_unenrolled_student_is_rejected() {
  let f = fixture();
  f.open(Some("ABC123")).await;

  let err = f
    .engine
    .mark_attendance(MarkAttendance::CheckIn {
      session_code: "ABC123".into(),
      student_id:   Uuid::new_v4(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));
  assert!(f.store.records().is_empty());
}

#[tokio::test]
async fn blank_check_in_code_is_bad_request() {
  let f = fixture();
  let err = f
    .engine
    .mark_attendance(MarkAttendance::CheckIn { session_code: " ".into(), student_id: f.student })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));
}

// ─── Calendar ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn calendar_validates_month_before_authorization() {
  let f = fixture();
  let err = f
    .engine
    .attendance_calendar(CalendarQuery {
      student_id: f.student,
      subject_id: f.subject,
      month:      13,
      year:       2024,
      actor:      Actor::Faculty(Uuid::new_v4()),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn calendar_gate_per_actor() {
  let f = fixture();
  let query = |actor, student_id| CalendarQuery {
    student_id,
    subject_id: f.subject,
    month: 9,
    year: 2024,
    actor,
  };

  // Unassigned faculty.
  let err = f
    .engine
    .attendance_calendar(query(Actor::Faculty(Uuid::new_v4()), f.student))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  // Assigned faculty, unenrolled student.
  let err = f
    .engine
    .attendance_calendar(query(Actor::Faculty(f.faculty), Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));

  // A student peeking at someone else.
  let err = f
    .engine
    .attendance_calendar(query(Actor::Student(Uuid::new_v4()), f.student))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  // A student not enrolled in the subject.
  let stranger = Uuid::new_v4();
  let err = f
    .engine
    .attendance_calendar(query(Actor::Student(stranger), stranger))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  // Allowed both ways.
  assert!(f.engine.attendance_calendar(query(Actor::Faculty(f.faculty), f.student)).await.is_ok());
  assert!(f.engine.attendance_calendar(query(Actor::Student(f.student), f.student)).await.is_ok());
}

#[tokio::test]
async fn calendar_lists_only_days_with_records() {
  let f = fixture();
  let session = f.open(None).await;
  f.engine
    .mark_attendance(MarkAttendance::CheckIn {
      session_code: session.session_code.clone(),
      student_id:   f.student,
    })
    .await
    .unwrap();

  let calendar = f
    .engine
    .attendance_calendar(CalendarQuery {
      student_id: f.student,
      subject_id: f.subject,
      month:      9,
      year:       2024,
      actor:      Actor::Student(f.student),
    })
    .await
    .unwrap();

  assert_eq!(calendar.len(), 1);
  assert_eq!(
    calendar.get(&NaiveDate::from_ymd_opt(2024, 9, 5).unwrap()),
    Some(&AttendanceStatus::Present)
  );

  let october = f
    .engine
    .attendance_calendar(CalendarQuery {
      student_id: f.student,
      subject_id: f.subject,
      month:      10,
      year:       2024,
      actor:      Actor::Student(f.student),
    })
    .await
    .unwrap();
  assert!(october.is_empty());
}
