//! Demo fixtures: one department set, one faculty member teaching two
//! subjects, one enrolled student and three closed September sessions.
//!
//! Sessions are driven through [`AttendanceEngine`] with a pinned clock, so
//! the seeded rows obey the same rules as live traffic.

use std::sync::Arc;

use chrono::{DateTime, TimeZone as _, Utc};
use quickmark_api::{Backend, auth::hash_password, error::ApiError};
use quickmark_core::{
  AttendanceEngine,
  clock::FixedClock,
  directory::{NewAdmin, NewFaculty, NewStudent, NewSubject, WriteOutcome},
  engine::{CloseSession, MarkAttendance, OpenSession},
  record::AttendanceStatus,
};
use thiserror::Error;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@example.com";

#[derive(Debug, Error)]
pub enum SeedError {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error(transparent)]
  Engine(#[from] quickmark_core::Error),

  #[error("password hashing failed: {0}")]
  Hash(#[from] ApiError),

  #[error("{0} already exists")]
  Conflict(&'static str),
}

impl SeedError {
  fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

/// Ids of the seeded rows a caller may want to poke at.
#[derive(Debug, Clone, Copy)]
pub struct Seeded {
  pub faculty_id:        Uuid,
  pub student_id:        Uuid,
  pub data_structures:   Uuid,
  pub operating_systems: Uuid,
}

fn accept<T>(outcome: WriteOutcome<T>, what: &'static str) -> Result<T, SeedError> {
  outcome.written().ok_or(SeedError::Conflict(what))
}

fn at(date: (i32, u32, u32), hour: u32, minute: u32) -> DateTime<Utc> {
  Utc
    .with_ymd_and_hms(date.0, date.1, date.2, hour, minute, 0)
    .single()
    .unwrap_or_default()
}

/// Populate an empty database. Fails with [`SeedError::Conflict`] if any of
/// the fixture keys is already taken.
pub async fn seed<S: Backend>(store: &S) -> Result<Seeded, SeedError>
where
  S: Clone,
{
  let mut department_ids = Vec::new();
  for name in ["ECE", "IT", "IT-BI"] {
    let outcome = store.create_department(name.to_string()).await.map_err(SeedError::store)?;
    department_ids.push(accept(outcome, "department")?.department_id);
  }
  let ece = department_ids[0];

  let faculty = store
    .create_faculty(NewFaculty {
      name:          "Dr. Mukesh Adani".to_string(),
      email:         "mukesh.adani@example.com".to_string(),
      department_id: ece,
      password_hash: hash_password("testpassword")?,
    })
    .await
    .map_err(SeedError::store)?;
  let faculty_id = accept(faculty, "faculty")?.faculty_id;

  let mut subject_ids = Vec::new();
  for subject_name in ["Data Structures", "Operating Systems"] {
    let outcome = store
      .create_subject(NewSubject {
        subject_name:  subject_name.to_string(),
        department_id: ece,
        year:          3,
        section:       "A".to_string(),
        batch_name:    Some("3rd Year A Batch".to_string()),
      })
      .await
      .map_err(SeedError::store)?;
    let subject_id = accept(outcome, "subject")?.subject_id;
    let assigned = store.assign_faculty(faculty_id, subject_id).await.map_err(SeedError::store)?;
    accept(assigned, "faculty assignment")?;
    subject_ids.push(subject_id);
  }

  let student = store
    .create_student(NewStudent {
      roll_number:   "IEC2023021".to_string(),
      name:          "Student One".to_string(),
      email:         "student.one@example.com".to_string(),
      department_id: ece,
      current_year:  Some(3),
      section:       Some("A".to_string()),
      password_hash: Some(hash_password("studentpass")?),
    })
    .await
    .map_err(SeedError::store)?;
  let student_id = accept(student, "student")?.student_id;
  for &subject_id in &subject_ids {
    let enrolled = store.enroll_student(student_id, subject_id).await.map_err(SeedError::store)?;
    accept(enrolled, "enrollment")?;
  }

  let seeded = Seeded {
    faculty_id,
    student_id,
    data_structures: subject_ids[0],
    operating_systems: subject_ids[1],
  };

  let sessions = [
    ((2024, 9, 5), "CODE5ABC", Some(5)),
    ((2024, 9, 6), "CODE6DEF", Some(2)),
    ((2024, 9, 12), "CODE12GHI", None),
  ];
  let store = Arc::new(store.clone());
  for (date, code, checked_in_after) in sessions {
    let opening = AttendanceEngine::with_clock(store.clone(), FixedClock(at(date, 10, 0)));
    let session = opening
      .open_session(OpenSession {
        subject_id:   seeded.data_structures,
        faculty_id,
        session_code: Some(code.to_string()),
      })
      .await?;

    match checked_in_after {
      Some(minutes) => {
        let arriving = AttendanceEngine::with_clock(store.clone(), FixedClock(at(date, 10, minutes)));
        arriving
          .mark_attendance(MarkAttendance::CheckIn { session_code: code.to_string(), student_id })
          .await?;
      }
      None => {
        opening
          .mark_attendance(MarkAttendance::Manual {
            session_id: session.session_id,
            faculty_id,
            student_id,
            status: AttendanceStatus::Absent,
          })
          .await?;
      }
    }

    let closing = AttendanceEngine::with_clock(store.clone(), FixedClock(at(date, 11, 0)));
    closing
      .close_session(CloseSession { session_id: session.session_id, faculty_id })
      .await?;
    tracing::info!(%code, session_id = %session.session_id, "seeded session");
  }

  let admin = store
    .create_admin(NewAdmin {
      name:          "Super Admin".to_string(),
      email:         ADMIN_EMAIL.to_string(),
      password_hash: hash_password("adminpass")?,
    })
    .await
    .map_err(SeedError::store)?;
  accept(admin, "admin")?;

  tracing::info!(%faculty_id, %student_id, "demo data seeded");
  Ok(seeded)
}
