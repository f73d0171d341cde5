//! Faculty self-service: profile, password, assigned subjects and rosters.

use axum::{extract::State, http::StatusCode};
use quickmark_core::directory::{Faculty, FacultyPatch, Student, Subject};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, Backend,
  auth::{FacultyUser, hash_password, verify_password},
  error::ApiError,
  extract::{Json, Path},
  payload::{required, secret, written},
};

fn profile_not_found() -> ApiError { ApiError::NotFound("faculty profile not found".into()) }

/// `GET /faculty/me`
pub async fn me<S: Backend>(
  FacultyUser(faculty_id): FacultyUser,
  State(state): State<AppState<S>>,
) -> Result<Json<Faculty>, ApiError> {
  let faculty = state
    .store
    .get_faculty(faculty_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(profile_not_found)?;
  Ok(Json(faculty))
}

/// `PUT /faculty/me`: any of `name`, `email`, `department_id`.
pub async fn update_me<S: Backend>(
  FacultyUser(faculty_id): FacultyUser,
  State(state): State<AppState<S>>,
  Json(patch): Json<FacultyPatch>,
) -> Result<Json<Faculty>, ApiError> {
  if patch.is_empty() {
    return Err(ApiError::BadRequest("no valid fields provided for update".into()));
  }
  let outcome = state
    .store
    .update_faculty(faculty_id, patch)
    .await
    .map_err(ApiError::store)?;
  let faculty = written(outcome, "faculty profile", "faculty with this email already exists")?;
  Ok(Json(faculty))
}

#[derive(Debug, Deserialize)]
pub struct ChangePassword {
  pub current_password: Option<String>,
  pub new_password:     Option<String>,
}

/// `PUT /faculty/me/password`
pub async fn change_password<S: Backend>(
  FacultyUser(faculty_id): FacultyUser,
  State(state): State<AppState<S>>,
  Json(body): Json<ChangePassword>,
) -> Result<StatusCode, ApiError> {
  let message = "current and new passwords are required";
  let current = secret(body.current_password, message)?;
  let new = secret(body.new_password, message)?;

  let credentials = state
    .store
    .faculty_credentials_by_id(faculty_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(profile_not_found)?;
  if !verify_password(&current, &credentials.password_hash) {
    return Err(ApiError::Unauthorized("current password incorrect".into()));
  }

  let updated = state
    .store
    .set_faculty_password(faculty_id, hash_password(&new)?)
    .await
    .map_err(ApiError::store)?;
  if !updated {
    return Err(profile_not_found());
  }

  tracing::info!(%faculty_id, "faculty password changed");
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /faculty/me/subjects`
pub async fn my_subjects<S: Backend>(
  FacultyUser(faculty_id): FacultyUser,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Subject>>, ApiError> {
  let subjects = state
    .store
    .subjects_for_faculty(faculty_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subjects))
}

/// `GET /subjects/{id}/students`: only for a subject the caller teaches.
pub async fn roster<S: Backend>(
  FacultyUser(faculty_id): FacultyUser,
  State(state): State<AppState<S>>,
  Path(subject_id): Path<Uuid>,
) -> Result<Json<Vec<Student>>, ApiError> {
  let assigned = state
    .store
    .is_faculty_assigned(faculty_id, subject_id)
    .await
    .map_err(ApiError::store)?;
  if !assigned {
    return Err(ApiError::Forbidden(
      "you are not authorized to view students for this subject".into(),
    ));
  }

  let students = state.store.roster(subject_id).await.map_err(ApiError::store)?;
  Ok(Json(students))
}
