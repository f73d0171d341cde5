//! Registration and login for the three account kinds.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/admin/auth/register` | `{name, email, password}` |
//! | `POST` | `/admin/auth/login` | `{email, password}` |
//! | `POST` | `/auth/register` | `{name, email, password, department_id}` |
//! | `POST` | `/auth/login` | `{email, password}` |
//! | `POST` | `/student/auth/register` | `{name, roll_number, email, password, department_id, current_year?, section?}` |
//! | `POST` | `/student/auth/login` | `{roll_number, password}` |
//!
//! Every success returns `{"token": "...", "<role>": {...}}`.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use quickmark_core::directory::{Credentials, NewAdmin, NewFaculty, NewStudent};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  AppState, Backend,
  auth::{Role, hash_password, verify_password},
  error::ApiError,
  extract::Json,
  payload::{present, required, secret, written},
};

fn invalid_credentials() -> ApiError { ApiError::Unauthorized("invalid credentials".into()) }

/// Check a password against looked-up credentials; unknown account and wrong
/// password are indistinguishable to the caller.
fn check_credentials(credentials: Option<Credentials>, password: &str) -> Result<Uuid, ApiError> {
  match credentials {
    Some(c) if verify_password(password, &c.password_hash) => Ok(c.id),
    _ => {
      tracing::warn!("login rejected");
      Err(invalid_credentials())
    }
  }
}

fn session<T: serde::Serialize>(key: &str, token: String, account: T) -> Json<Value> {
  Json(json!({ "token": token, key: account }))
}

// ─── Admin ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterAdmin {
  pub name:     Option<String>,
  pub email:    Option<String>,
  pub password: Option<String>,
}

/// `POST /admin/auth/register`
pub async fn register_admin<S: Backend>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterAdmin>,
) -> Result<impl IntoResponse, ApiError> {
  let message = "name, email, and password are required";
  let input = NewAdmin {
    name:          required(body.name, message)?,
    email:         required(body.email, message)?,
    password_hash: hash_password(&secret(body.password, message)?)?,
  };

  let outcome = state.store.create_admin(input).await.map_err(ApiError::store)?;
  let admin = written(outcome, "admin", "admin with this email already exists")?;
  let token = state.tokens.issue(admin.admin_id, Role::Admin)?;

  tracing::info!(admin_id = %admin.admin_id, "admin registered");
  Ok((StatusCode::CREATED, session("admin", token, admin)))
}

#[derive(Debug, Deserialize)]
pub struct EmailLogin {
  pub email:    Option<String>,
  pub password: Option<String>,
}

/// `POST /admin/auth/login`
pub async fn login_admin<S: Backend>(
  State(state): State<AppState<S>>,
  Json(body): Json<EmailLogin>,
) -> Result<Json<Value>, ApiError> {
  let message = "email and password are required";
  let email = required(body.email, message)?;
  let password = secret(body.password, message)?;

  let credentials = state
    .store
    .admin_credentials(&email)
    .await
    .map_err(ApiError::store)?;
  let admin_id = check_credentials(credentials, &password)?;

  let admin = state
    .store
    .get_admin(admin_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(invalid_credentials)?;
  let token = state.tokens.issue(admin_id, Role::Admin)?;
  Ok(session("admin", token, admin))
}

// ─── Faculty ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterFaculty {
  pub name:          Option<String>,
  pub email:         Option<String>,
  pub password:      Option<String>,
  pub department_id: Option<Uuid>,
}

/// `POST /auth/register`
pub async fn register_faculty<S: Backend>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterFaculty>,
) -> Result<impl IntoResponse, ApiError> {
  let message = "all fields are required";
  let input = NewFaculty {
    name:          required(body.name, message)?,
    email:         required(body.email, message)?,
    department_id: present(body.department_id, message)?,
    password_hash: hash_password(&secret(body.password, message)?)?,
  };

  let outcome = state.store.create_faculty(input).await.map_err(ApiError::store)?;
  let faculty = written(outcome, "faculty", "faculty with this email already exists")?;
  let token = state.tokens.issue(faculty.faculty_id, Role::Faculty)?;

  tracing::info!(faculty_id = %faculty.faculty_id, "faculty registered");
  Ok((StatusCode::CREATED, session("faculty", token, faculty)))
}

/// `POST /auth/login`
pub async fn login_faculty<S: Backend>(
  State(state): State<AppState<S>>,
  Json(body): Json<EmailLogin>,
) -> Result<Json<Value>, ApiError> {
  let message = "email and password are required";
  let email = required(body.email, message)?;
  let password = secret(body.password, message)?;

  let credentials = state
    .store
    .faculty_credentials(&email)
    .await
    .map_err(ApiError::store)?;
  let faculty_id = check_credentials(credentials, &password)?;

  let faculty = state
    .store
    .get_faculty(faculty_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(invalid_credentials)?;
  let token = state.tokens.issue(faculty_id, Role::Faculty)?;
  Ok(session("faculty", token, faculty))
}

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterStudent {
  pub name:          Option<String>,
  pub roll_number:   Option<String>,
  pub email:         Option<String>,
  pub password:      Option<String>,
  pub department_id: Option<Uuid>,
  pub current_year:  Option<i64>,
  pub section:       Option<String>,
}

/// `POST /student/auth/register`
pub async fn register_student<S: Backend>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterStudent>,
) -> Result<impl IntoResponse, ApiError> {
  let message = "name, roll number, email, password and department are required";
  let input = NewStudent {
    roll_number:   required(body.roll_number, message)?,
    name:          required(body.name, message)?,
    email:         required(body.email, message)?,
    department_id: present(body.department_id, message)?,
    current_year:  body.current_year,
    section:       body.section,
    password_hash: Some(hash_password(&secret(body.password, message)?)?),
  };

  let outcome = state.store.create_student(input).await.map_err(ApiError::store)?;
  let student = written(outcome, "student", "student with this roll number already exists")?;
  let token = state.tokens.issue(student.student_id, Role::Student)?;

  tracing::info!(student_id = %student.student_id, "student registered");
  Ok((StatusCode::CREATED, session("student", token, student)))
}

#[derive(Debug, Deserialize)]
pub struct RollNumberLogin {
  pub roll_number: Option<String>,
  pub password:    Option<String>,
}

/// `POST /student/auth/login`
pub async fn login_student<S: Backend>(
  State(state): State<AppState<S>>,
  Json(body): Json<RollNumberLogin>,
) -> Result<Json<Value>, ApiError> {
  let message = "roll number and password are required";
  let roll_number = required(body.roll_number, message)?;
  let password = secret(body.password, message)?;

  let credentials = state
    .store
    .student_credentials(&roll_number)
    .await
    .map_err(ApiError::store)?;
  let student_id = check_credentials(credentials, &password)?;

  let student = state
    .store
    .get_student(student_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(invalid_credentials)?;
  let token = state.tokens.issue(student_id, Role::Student)?;
  Ok(session("student", token, student))
}
