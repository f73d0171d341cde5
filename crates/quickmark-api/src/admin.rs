//! Handlers for `/admin/...` directory management. Every route requires an
//! admin token.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`/`POST` | `/admin/{departments,faculties,students,subjects}` | list / create (201) |
//! | `PUT`/`DELETE` | `/admin/{departments,faculties,students,subjects}/{id}` | partial update / delete (204) |
//! | `PUT`/`DELETE` | `/admin/subjects/{id}/faculty/{faculty_id}` | assign / unassign (204) |
//! | `PUT`/`DELETE` | `/admin/subjects/{id}/students/{student_id}` | enroll / unenroll (204) |
//!
//! Deleting a row that is still referenced (e.g. a faculty member who has
//! run sessions) answers 409.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use quickmark_core::directory::{
  Department, Faculty, FacultyPatch, NewFaculty, NewStudent, NewSubject, Student, StudentPatch,
  Subject, SubjectPatch, WriteOutcome,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, Backend,
  auth::{AdminUser, hash_password},
  error::ApiError,
  extract::{Json, Path},
  payload::{deleted, present, required, secret, written},
};

// ─── Departments ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DepartmentBody {
  pub name: Option<String>,
}

/// `GET /admin/departments`
pub async fn list_departments<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Department>>, ApiError> {
  let departments = state.store.list_departments().await.map_err(ApiError::store)?;
  Ok(Json(departments))
}

/// `POST /admin/departments`: body: `{"name":"IT"}`
pub async fn create_department<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Json(body): Json<DepartmentBody>,
) -> Result<impl IntoResponse, ApiError> {
  let name = required(body.name, "department name is required")?;
  let outcome = state.store.create_department(name).await.map_err(ApiError::store)?;
  let department = written(outcome, "department", "department with this name already exists")?;
  Ok((StatusCode::CREATED, Json(department)))
}

/// `PUT /admin/departments/{id}`
pub async fn update_department<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<DepartmentBody>,
) -> Result<Json<Department>, ApiError> {
  let name = required(body.name, "department name is required")?;
  let outcome = state
    .store
    .rename_department(id, name)
    .await
    .map_err(ApiError::store)?;
  let department = written(outcome, "department", "department with this name already exists")?;
  Ok(Json(department))
}

/// `DELETE /admin/departments/{id}`
pub async fn delete_department<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let outcome = state.store.delete_department(id).await.map_err(ApiError::store)?;
  deleted(outcome, "department")?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Faculty ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateFacultyBody {
  pub name:          Option<String>,
  pub email:         Option<String>,
  pub password:      Option<String>,
  pub department_id: Option<Uuid>,
}

/// `GET /admin/faculties`
pub async fn list_faculty<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Faculty>>, ApiError> {
  let faculty = state.store.list_faculty().await.map_err(ApiError::store)?;
  Ok(Json(faculty))
}

/// `POST /admin/faculties`
pub async fn create_faculty<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Json(body): Json<CreateFacultyBody>,
) -> Result<impl IntoResponse, ApiError> {
  let message = "all faculty fields are required";
  let input = NewFaculty {
    name:          required(body.name, message)?,
    email:         required(body.email, message)?,
    department_id: present(body.department_id, message)?,
    password_hash: hash_password(&secret(body.password, message)?)?,
  };
  let outcome = state.store.create_faculty(input).await.map_err(ApiError::store)?;
  let faculty = written(outcome, "faculty", "faculty with this email already exists")?;
  Ok((StatusCode::CREATED, Json(faculty)))
}

/// `PUT /admin/faculties/{id}`: any of `name`, `email`, `department_id`.
pub async fn update_faculty<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<FacultyPatch>,
) -> Result<Json<Faculty>, ApiError> {
  if patch.is_empty() {
    return Err(ApiError::BadRequest("no fields provided for update".into()));
  }
  let outcome = state
    .store
    .update_faculty(id, patch)
    .await
    .map_err(ApiError::store)?;
  let faculty = written(outcome, "faculty", "faculty with this email already exists")?;
  Ok(Json(faculty))
}

/// `DELETE /admin/faculties/{id}`
pub async fn delete_faculty<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let outcome = state.store.delete_faculty(id).await.map_err(ApiError::store)?;
  deleted(outcome, "faculty")?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Students ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateStudentBody {
  pub roll_number:   Option<String>,
  pub name:          Option<String>,
  pub email:         Option<String>,
  pub department_id: Option<Uuid>,
  pub current_year:  Option<i64>,
  pub section:       Option<String>,
  /// Without a password the student appears in rosters but cannot log in.
  pub password:      Option<String>,
}

/// `GET /admin/students`
pub async fn list_students<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Student>>, ApiError> {
  let students = state.store.list_students().await.map_err(ApiError::store)?;
  Ok(Json(students))
}

/// `POST /admin/students`
pub async fn create_student<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Json(body): Json<CreateStudentBody>,
) -> Result<impl IntoResponse, ApiError> {
  let message = "roll number, name, email and department are required";
  let password_hash = match body.password.filter(|p| !p.trim().is_empty()) {
    Some(password) => Some(hash_password(&password)?),
    None => None,
  };
  let input = NewStudent {
    roll_number: required(body.roll_number, message)?,
    name: required(body.name, message)?,
    email: required(body.email, message)?,
    department_id: present(body.department_id, message)?,
    current_year: body.current_year,
    section: body.section,
    password_hash,
  };
  let outcome = state.store.create_student(input).await.map_err(ApiError::store)?;
  let student = written(outcome, "student", "student with this roll number already exists")?;
  Ok((StatusCode::CREATED, Json(student)))
}

/// `PUT /admin/students/{id}`
pub async fn update_student<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<StudentPatch>,
) -> Result<Json<Student>, ApiError> {
  let outcome = state
    .store
    .update_student(id, patch)
    .await
    .map_err(ApiError::store)?;
  let student = written(outcome, "student", "student with this roll number already exists")?;
  Ok(Json(student))
}

/// `DELETE /admin/students/{id}`
pub async fn delete_student<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let outcome = state.store.delete_student(id).await.map_err(ApiError::store)?;
  deleted(outcome, "student")?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Subjects ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateSubjectBody {
  pub subject_name:  Option<String>,
  pub department_id: Option<Uuid>,
  pub year:          Option<i64>,
  pub section:       Option<String>,
  pub batch_name:    Option<String>,
}

/// `GET /admin/subjects`
pub async fn list_subjects<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Subject>>, ApiError> {
  let subjects = state.store.list_subjects().await.map_err(ApiError::store)?;
  Ok(Json(subjects))
}

/// `POST /admin/subjects`
pub async fn create_subject<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Json(body): Json<CreateSubjectBody>,
) -> Result<impl IntoResponse, ApiError> {
  let message = "subject name, department, year and section are required";
  let input = NewSubject {
    subject_name:  required(body.subject_name, message)?,
    department_id: present(body.department_id, message)?,
    year:          present(body.year, message)?,
    section:       required(body.section, message)?,
    batch_name:    body.batch_name,
  };
  let outcome = state.store.create_subject(input).await.map_err(ApiError::store)?;
  let subject = written(outcome, "subject", "subject already exists")?;
  Ok((StatusCode::CREATED, Json(subject)))
}

/// `PUT /admin/subjects/{id}`
pub async fn update_subject<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<SubjectPatch>,
) -> Result<Json<Subject>, ApiError> {
  let outcome = state
    .store
    .update_subject(id, patch)
    .await
    .map_err(ApiError::store)?;
  let subject = written(outcome, "subject", "subject already exists")?;
  Ok(Json(subject))
}

/// `DELETE /admin/subjects/{id}`: also removes the subject's sessions and
/// their records.
pub async fn delete_subject<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let outcome = state.store.delete_subject(id).await.map_err(ApiError::store)?;
  deleted(outcome, "subject")?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Relations ───────────────────────────────────────────────────────────────

fn linked(outcome: WriteOutcome<()>, message: &str) -> Result<StatusCode, ApiError> {
  match outcome {
    WriteOutcome::Written(()) => Ok(StatusCode::NO_CONTENT),
    _ => Err(ApiError::NotFound(message.to_owned())),
  }
}

fn unlinked(removed: bool, message: &str) -> Result<StatusCode, ApiError> {
  if removed {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(message.to_owned()))
  }
}

/// `PUT /admin/subjects/{id}/faculty/{faculty_id}`
pub async fn assign_faculty<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Path((subject_id, faculty_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
  let outcome = state
    .store
    .assign_faculty(faculty_id, subject_id)
    .await
    .map_err(ApiError::store)?;
  let status = linked(outcome, "faculty or subject not found")?;
  tracing::info!(%faculty_id, %subject_id, "faculty assigned");
  Ok(status)
}

/// `DELETE /admin/subjects/{id}/faculty/{faculty_id}`
pub async fn unassign_faculty<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Path((subject_id, faculty_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
  let removed = state
    .store
    .unassign_faculty(faculty_id, subject_id)
    .await
    .map_err(ApiError::store)?;
  unlinked(removed, "faculty is not assigned to this subject")
}

/// `PUT /admin/subjects/{id}/students/{student_id}`
pub async fn enroll_student<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Path((subject_id, student_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
  let outcome = state
    .store
    .enroll_student(student_id, subject_id)
    .await
    .map_err(ApiError::store)?;
  linked(outcome, "student or subject not found")
}

/// `DELETE /admin/subjects/{id}/students/{student_id}`
pub async fn unenroll_student<S: Backend>(
  _: AdminUser,
  State(state): State<AppState<S>>,
  Path((subject_id, student_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
  let removed = state
    .store
    .unenroll_student(student_id, subject_id)
    .await
    .map_err(ApiError::store)?;
  unlinked(removed, "student is not enrolled in this subject")
}
