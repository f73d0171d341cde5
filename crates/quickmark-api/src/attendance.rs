//! Faculty-side attendance endpoints, each a thin adapter over
//! [`AttendanceEngine`](quickmark_core::AttendanceEngine).
//!
//! | Method | Path | Body / query |
//! |--------|------|--------------|
//! | `POST` | `/attendance/start` | `{subject_id, session_code?}` → 201 |
//! | `POST` | `/attendance/{id}/end` | |
//! | `POST` | `/attendance/{id}/mark` | `{student_id, status}` |
//! | `GET`  | `/attendance/subjects/{subject_id}/students/{student_id}/calendar` | `?month&year` |

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use quickmark_core::{
  calendar::AttendanceCalendar,
  engine::{Actor, CalendarQuery, CloseSession, MarkAttendance, OpenSession},
  record::{AttendanceRecord, AttendanceStatus},
  session::AttendanceSession,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, Backend,
  auth::FacultyUser,
  error::ApiError,
  extract::{Json, Path, Query},
  payload::{present, required},
};

#[derive(Debug, Deserialize)]
pub struct StartBody {
  pub subject_id:   Option<Uuid>,
  pub session_code: Option<String>,
}

/// `POST /attendance/start`
pub async fn start<S: Backend>(
  FacultyUser(faculty_id): FacultyUser,
  State(state): State<AppState<S>>,
  Json(body): Json<StartBody>,
) -> Result<impl IntoResponse, ApiError> {
  let subject_id = present(body.subject_id, "subject id is required")?;
  let session = state
    .engine
    .open_session(OpenSession { subject_id, faculty_id, session_code: body.session_code })
    .await?;
  Ok((StatusCode::CREATED, Json(session)))
}

/// `POST /attendance/{id}/end`
pub async fn end<S: Backend>(
  FacultyUser(faculty_id): FacultyUser,
  State(state): State<AppState<S>>,
  Path(session_id): Path<Uuid>,
) -> Result<Json<AttendanceSession>, ApiError> {
  let session = state
    .engine
    .close_session(CloseSession { session_id, faculty_id })
    .await?;
  Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct MarkBody {
  pub student_id: Option<Uuid>,
  pub status:     Option<String>,
}

/// `POST /attendance/{id}/mark`
pub async fn mark<S: Backend>(
  FacultyUser(faculty_id): FacultyUser,
  State(state): State<AppState<S>>,
  Path(session_id): Path<Uuid>,
  Json(body): Json<MarkBody>,
) -> Result<Json<AttendanceRecord>, ApiError> {
  let message = "student id and status are required";
  let student_id = present(body.student_id, message)?;
  let status: AttendanceStatus = required(body.status, message)?.parse()?;

  let record = state
    .engine
    .mark_attendance(MarkAttendance::Manual { session_id, faculty_id, student_id, status })
    .await?;
  Ok(Json(record))
}

/// `?month=9&year=2024`. Kept as text so a malformed value is reported like
/// a missing one.
#[derive(Debug, Deserialize)]
pub struct MonthParams {
  pub month: Option<String>,
  pub year:  Option<String>,
}

impl MonthParams {
  pub(crate) fn parse(&self) -> Result<(u32, i32), ApiError> {
    let message = "month and year are required numeric query parameters";
    let month = self.month.as_deref().and_then(|m| m.trim().parse().ok());
    let year = self.year.as_deref().and_then(|y| y.trim().parse().ok());
    Ok((present(month, message)?, present(year, message)?))
  }
}

/// `GET /attendance/subjects/{subject_id}/students/{student_id}/calendar`
pub async fn calendar<S: Backend>(
  FacultyUser(faculty_id): FacultyUser,
  State(state): State<AppState<S>>,
  Path((subject_id, student_id)): Path<(Uuid, Uuid)>,
  Query(params): Query<MonthParams>,
) -> Result<Json<AttendanceCalendar>, ApiError> {
  let (month, year) = params.parse()?;
  let calendar = state
    .engine
    .attendance_calendar(CalendarQuery {
      student_id,
      subject_id,
      month,
      year,
      actor: Actor::Faculty(faculty_id),
    })
    .await?;
  Ok(Json(calendar))
}
