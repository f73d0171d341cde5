//! Student self-service: profile, code check-in, own calendar.

use axum::extract::State;
use quickmark_core::{
  calendar::AttendanceCalendar,
  directory::Student,
  engine::{Actor, CalendarQuery, MarkAttendance},
  record::AttendanceRecord,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, Backend,
  attendance::MonthParams,
  auth::StudentUser,
  error::ApiError,
  extract::{Json, Query},
  payload::present,
};

/// `GET /student/me`
pub async fn me<S: Backend>(
  StudentUser(student_id): StudentUser,
  State(state): State<AppState<S>>,
) -> Result<Json<Student>, ApiError> {
  let student = state
    .store
    .get_student(student_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("student profile not found".into()))?;
  Ok(Json(student))
}

#[derive(Debug, Deserialize)]
pub struct CheckInBody {
  pub session_code: Option<String>,
}

/// `POST /student/attendance/mark`: body: `{"session_code":"CODE5ABC"}`
pub async fn mark<S: Backend>(
  StudentUser(student_id): StudentUser,
  State(state): State<AppState<S>>,
  Json(body): Json<CheckInBody>,
) -> Result<Json<AttendanceRecord>, ApiError> {
  let record = state
    .engine
    .mark_attendance(MarkAttendance::CheckIn {
      session_code: body.session_code.unwrap_or_default(),
      student_id,
    })
    .await?;
  tracing::info!(%student_id, session_id = %record.session_id, "student checked in");
  Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct CalendarParams {
  pub subject_id: Option<String>,
  #[serde(flatten)]
  pub month:      MonthParams,
}

/// `GET /student/attendance/calendar?subject_id&month&year`
pub async fn calendar<S: Backend>(
  StudentUser(student_id): StudentUser,
  State(state): State<AppState<S>>,
  Query(params): Query<CalendarParams>,
) -> Result<Json<AttendanceCalendar>, ApiError> {
  let subject_id = params
    .subject_id
    .as_deref()
    .and_then(|s| Uuid::parse_str(s.trim()).ok());
  let subject_id = present(subject_id, "a valid subject_id query parameter is required")?;
  let (month, year) = params.month.parse()?;

  let calendar = state
    .engine
    .attendance_calendar(CalendarQuery {
      student_id,
      subject_id,
      month,
      year,
      actor: Actor::Student(student_id),
    })
    .await?;
  Ok(Json(calendar))
}
