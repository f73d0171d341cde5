//! JSON REST API for QuickMark.
//!
//! Exposes an axum [`Router`] backed by any store that implements both
//! [`AttendanceStore`] and [`DirectoryStore`]. Every route lives under
//! `/api`; protected routes require an `Authorization: Bearer <token>` header
//! issued by one of the login endpoints.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = quickmark_api::AppState::new(Arc::new(store), tokens);
//! axum::serve(listener, quickmark_api::router(state)).await?;
//! ```

pub mod accounts;
pub mod admin;
pub mod attendance;
pub mod auth;
pub mod error;
pub mod extract;
pub mod faculty;
pub mod student;

mod payload;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use quickmark_core::{
  AttendanceEngine,
  store::{AttendanceStore, DirectoryStore},
};
use tower_http::trace::TraceLayer;

pub use auth::TokenIssuer;
pub use error::ApiError;

/// Everything a storage backend must provide to serve the API.
pub trait Backend: AttendanceStore + DirectoryStore + 'static {}

impl<T> Backend for T where T: AttendanceStore + DirectoryStore + 'static {}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub engine: Arc<AttendanceEngine<S>>,
  pub tokens: Arc<TokenIssuer>,
}

impl<S: Backend> AppState<S> {
  pub fn new(store: Arc<S>, tokens: TokenIssuer) -> Self {
    Self {
      engine: Arc::new(AttendanceEngine::new(store.clone())),
      store,
      tokens: Arc::new(tokens),
    }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      engine: self.engine.clone(),
      tokens: self.tokens.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete application router, with request tracing.
pub fn router<S: Backend>(state: AppState<S>) -> Router {
  Router::new()
    .nest("/api", api_routes::<S>())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

fn api_routes<S: Backend>() -> Router<AppState<S>> {
  Router::new()
    // Admin
    .route("/admin/auth/register", post(accounts::register_admin::<S>))
    .route("/admin/auth/login", post(accounts::login_admin::<S>))
    .route(
      "/admin/departments",
      get(admin::list_departments::<S>).post(admin::create_department::<S>),
    )
    .route(
      "/admin/departments/{id}",
      put(admin::update_department::<S>).delete(admin::delete_department::<S>),
    )
    .route(
      "/admin/faculties",
      get(admin::list_faculty::<S>).post(admin::create_faculty::<S>),
    )
    .route(
      "/admin/faculties/{id}",
      put(admin::update_faculty::<S>).delete(admin::delete_faculty::<S>),
    )
    .route(
      "/admin/students",
      get(admin::list_students::<S>).post(admin::create_student::<S>),
    )
    .route(
      "/admin/students/{id}",
      put(admin::update_student::<S>).delete(admin::delete_student::<S>),
    )
    .route(
      "/admin/subjects",
      get(admin::list_subjects::<S>).post(admin::create_subject::<S>),
    )
    .route(
      "/admin/subjects/{id}",
      put(admin::update_subject::<S>).delete(admin::delete_subject::<S>),
    )
    .route(
      "/admin/subjects/{id}/faculty/{faculty_id}",
      put(admin::assign_faculty::<S>).delete(admin::unassign_faculty::<S>),
    )
    .route(
      "/admin/subjects/{id}/students/{student_id}",
      put(admin::enroll_student::<S>).delete(admin::unenroll_student::<S>),
    )
    // Faculty
    .route("/auth/register", post(accounts::register_faculty::<S>))
    .route("/auth/login", post(accounts::login_faculty::<S>))
    .route("/faculty/me", get(faculty::me::<S>).put(faculty::update_me::<S>))
    .route("/faculty/me/password", put(faculty::change_password::<S>))
    .route("/faculty/me/subjects", get(faculty::my_subjects::<S>))
    .route("/subjects/{id}/students", get(faculty::roster::<S>))
    // Attendance (faculty side)
    .route("/attendance/start", post(attendance::start::<S>))
    .route("/attendance/{id}/end", post(attendance::end::<S>))
    .route("/attendance/{id}/mark", post(attendance::mark::<S>))
    .route(
      "/attendance/subjects/{subject_id}/students/{student_id}/calendar",
      get(attendance::calendar::<S>),
    )
    // Student
    .route("/student/auth/register", post(accounts::register_student::<S>))
    .route("/student/auth/login", post(accounts::login_student::<S>))
    .route("/student/me", get(student::me::<S>))
    .route("/student/attendance/mark", post(student::mark::<S>))
    .route("/student/attendance/calendar", get(student::calendar::<S>))
}

#[cfg(test)]
mod tests;
