//! Router-level tests: real SQLite store (in memory), real tokens, requests
//! driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use quickmark_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, TokenIssuer, auth::DEFAULT_EXPIRY_HOURS, router};

async fn make_state() -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  AppState::new(Arc::new(store), TokenIssuer::new(b"test-secret", DEFAULT_EXPIRY_HOURS))
}

async fn send(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };

  let resp = router(state.clone())
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn text(v: &Value) -> String { v.as_str().unwrap().to_owned() }

/// Tokens and ids for one admin, one faculty member assigned to one
/// subject, and one student enrolled in it.
struct Campus {
  admin:      String,
  faculty:    String,
  student:    String,
  subject_id: String,
  student_id: String,
  dept_id:    String,
}

async fn campus(state: &AppState<SqliteStore>) -> Campus {
  let (status, body) = send(
    state,
    "POST",
    "/api/admin/auth/register",
    None,
    Some(json!({ "name": "Super Admin", "email": "admin@example.com", "password": "adminpass" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let admin = text(&body["token"]);

  let (status, dept) = send(
    state,
    "POST",
    "/api/admin/departments",
    Some(&admin),
    Some(json!({ "name": "IT" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{dept}");
  let dept_id = text(&dept["department_id"]);

  let (status, body) = send(
    state,
    "POST",
    "/api/auth/register",
    None,
    Some(json!({
      "name": "Dr. Mukesh Adani",
      "email": "mukesh.adani@example.com",
      "password": "testpassword",
      "department_id": dept_id,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let faculty = text(&body["token"]);
  let faculty_id = text(&body["faculty"]["faculty_id"]);

  let (status, body) = send(
    state,
    "POST",
    "/api/student/auth/register",
    None,
    Some(json!({
      "name": "Student One",
      "roll_number": "IEC2023021",
      "email": "student.one@example.com",
      "password": "studentpass",
      "department_id": dept_id,
      "current_year": 3,
      "section": "A",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let student = text(&body["token"]);
  let student_id = text(&body["student"]["student_id"]);

  let (status, subject) = send(
    state,
    "POST",
    "/api/admin/subjects",
    Some(&admin),
    Some(json!({
      "subject_name": "Data Structures",
      "department_id": dept_id,
      "year": 3,
      "section": "A",
      "batch_name": "3rd Year A Batch",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{subject}");
  let subject_id = text(&subject["subject_id"]);

  let (status, _) = send(
    state,
    "PUT",
    &format!("/api/admin/subjects/{subject_id}/faculty/{faculty_id}"),
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = send(
    state,
    "PUT",
    &format!("/api/admin/subjects/{subject_id}/students/{student_id}"),
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  Campus { admin, faculty, student, subject_id, student_id, dept_id }
}

// ── Attendance flow ─────────────────────────────────────────────────────────

#[tokio::test]
async fn open_check_in_close_and_view_calendar() {
  let state = make_state().await;
  let c = campus(&state).await;

  let (status, session) = send(
    &state,
    "POST",
    "/api/attendance/start",
    Some(&c.faculty),
    Some(json!({ "subject_id": c.subject_id, "session_code": "CODE5ABC" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{session}");
  assert_eq!(session["status"], "open");
  assert_eq!(session["session_code"], "CODE5ABC");
  let session_id = text(&session["session_id"]);

  let (status, record) = send(
    &state,
    "POST",
    "/api/student/attendance/mark",
    Some(&c.student),
    Some(json!({ "session_code": "CODE5ABC" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{record}");
  assert_eq!(record["status"], "present");
  assert!(record["attended_at"].is_string());

  let (status, closed) = send(
    &state,
    "POST",
    &format!("/api/attendance/{session_id}/end"),
    Some(&c.faculty),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(closed["status"], "closed");
  assert!(closed["end_time"].is_string());

  // The code no longer resolves once the session is closed.
  let (status, _) = send(
    &state,
    "POST",
    "/api/student/attendance/mark",
    Some(&c.student),
    Some(json!({ "session_code": "CODE5ABC" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let date = text(&session["session_date"]);
  let (year, month) = (&date[0..4], &date[5..7]);

  let (status, calendar) = send(
    &state,
    "GET",
    &format!(
      "/api/student/attendance/calendar?subject_id={}&month={month}&year={year}",
      c.subject_id
    ),
    Some(&c.student),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{calendar}");
  assert_eq!(calendar.as_object().unwrap().len(), 1);
  assert_eq!(calendar[&date], "present");

  let (status, faculty_view) = send(
    &state,
    "GET",
    &format!(
      "/api/attendance/subjects/{}/students/{}/calendar?month={month}&year={year}",
      c.subject_id, c.student_id
    ),
    Some(&c.faculty),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(faculty_view, calendar);
}

#[tokio::test]
async fn manual_mark_overwrites_and_closing_twice_is_not_found() {
  let state = make_state().await;
  let c = campus(&state).await;

  let (_, session) = send(
    &state,
    "POST",
    "/api/attendance/start",
    Some(&c.faculty),
    Some(json!({ "subject_id": c.subject_id })),
  )
  .await;
  let session_id = text(&session["session_id"]);
  assert_eq!(text(&session["session_code"]).len(), 6);

  for (status, stamped) in [("present", true), ("absent", false)] {
    let (code, record) = send(
      &state,
      "POST",
      &format!("/api/attendance/{session_id}/mark"),
      Some(&c.faculty),
      Some(json!({ "student_id": c.student_id, "status": status })),
    )
    .await;
    assert_eq!(code, StatusCode::OK, "{record}");
    assert_eq!(record["status"], status);
    assert_eq!(record["attended_at"].is_string(), stamped);
  }

  let (status, body) = send(
    &state,
    "POST",
    &format!("/api/attendance/{session_id}/mark"),
    Some(&c.faculty),
    Some(json!({ "student_id": c.student_id, "status": "excused" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());

  let end = format!("/api/attendance/{session_id}/end");
  let (first, _) = send(&state, "POST", &end, Some(&c.faculty), None).await;
  let (second, _) = send(&state, "POST", &end, Some(&c.faculty), None).await;
  assert_eq!(first, StatusCode::OK);
  assert_eq!(second, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn faculty_outside_the_subject_is_forbidden() {
  let state = make_state().await;
  let c = campus(&state).await;

  let (_, other) = send(
    &state,
    "POST",
    "/api/auth/register",
    None,
    Some(json!({
      "name": "Dr. Other",
      "email": "other@example.com",
      "password": "pw",
      "department_id": c.dept_id,
    })),
  )
  .await;
  let other = text(&other["token"]);

  let (status, _) = send(
    &state,
    "POST",
    "/api/attendance/start",
    Some(&other),
    Some(json!({ "subject_id": c.subject_id })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = send(
    &state,
    "GET",
    &format!("/api/subjects/{}/students", c.subject_id),
    Some(&other),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, roster) = send(
    &state,
    "GET",
    &format!("/api/subjects/{}/students", c.subject_id),
    Some(&c.faculty),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(roster.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn calendar_rejects_bad_month() {
  let state = make_state().await;
  let c = campus(&state).await;

  for query in ["month=13&year=2024", "month=9&year=1999", "month=abc&year=2024", "year=2024"] {
    let (status, body) = send(
      &state,
      "GET",
      &format!("/api/student/attendance/calendar?subject_id={}&{query}", c.subject_id),
      Some(&c.student),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{query}: {body}");
  }
}

#[tokio::test]
async fn malformed_ids_are_json_bad_requests() {
  let state = make_state().await;
  let c = campus(&state).await;

  let (status, session) = send(
    &state,
    "POST",
    "/api/attendance/start",
    Some(&c.faculty),
    Some(json!({ "subject_id": c.subject_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{session}");
  let session_id = text(&session["session_id"]);

  let (status, body) = send(
    &state,
    "POST",
    &format!("/api/attendance/{session_id}/mark"),
    Some(&c.faculty),
    Some(json!({ "student_id": "not-a-uuid", "status": "present" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
  assert!(body["error"].is_string());

  let (status, body) = send(
    &state,
    "POST",
    "/api/attendance/not-a-uuid/end",
    Some(&c.faculty),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
  assert!(body["error"].is_string());

  let (status, body) = send(
    &state,
    "POST",
    "/api/attendance/start",
    Some(&c.faculty),
    Some(json!({ "subject_id": 42 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
  assert!(body["error"].is_string());
}

// ── Auth ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn protected_routes_need_the_right_token() {
  let state = make_state().await;
  let c = campus(&state).await;

  let (status, body) = send(&state, "GET", "/api/faculty/me", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["error"].is_string());

  let (status, _) = send(&state, "GET", "/api/faculty/me", Some("garbage"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = send(&state, "GET", "/api/admin/departments", Some(&c.student), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, me) = send(&state, "GET", "/api/student/me", Some(&c.student), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["roll_number"], "IEC2023021");
  assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn login_checks_password() {
  let state = make_state().await;
  campus(&state).await;

  let (status, body) = send(
    &state,
    "POST",
    "/api/student/auth/login",
    None,
    Some(json!({ "roll_number": "IEC2023021", "password": "studentpass" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(body["token"].is_string());

  let (wrong, _) = send(
    &state,
    "POST",
    "/api/auth/login",
    None,
    Some(json!({ "email": "mukesh.adani@example.com", "password": "nope" })),
  )
  .await;
  let (unknown, _) = send(
    &state,
    "POST",
    "/api/auth/login",
    None,
    Some(json!({ "email": "nobody@example.com", "password": "nope" })),
  )
  .await;
  assert_eq!(wrong, StatusCode::UNAUTHORIZED);
  assert_eq!(unknown, StatusCode::UNAUTHORIZED);

  let (missing, _) = send(
    &state,
    "POST",
    "/api/admin/auth/login",
    None,
    Some(json!({ "email": "admin@example.com" })),
  )
  .await;
  assert_eq!(missing, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn padded_password_is_a_different_password() {
  let state = make_state().await;
  campus(&state).await;

  let (status, _) = send(
    &state,
    "POST",
    "/api/student/auth/login",
    None,
    Some(json!({ "roll_number": "IEC2023021", "password": "   studentpass   " })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, body) = send(
    &state,
    "POST",
    "/api/admin/auth/register",
    None,
    Some(json!({ "name": "Second Admin", "email": "second@example.com", "password": " spaced " })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");

  let (trimmed, _) = send(
    &state,
    "POST",
    "/api/admin/auth/login",
    None,
    Some(json!({ "email": "second@example.com", "password": "spaced" })),
  )
  .await;
  let (exact, _) = send(
    &state,
    "POST",
    "/api/admin/auth/login",
    None,
    Some(json!({ "email": "second@example.com", "password": " spaced " })),
  )
  .await;
  assert_eq!(trimmed, StatusCode::UNAUTHORIZED);
  assert_eq!(exact, StatusCode::OK);
}

#[tokio::test]
async fn faculty_password_change() {
  let state = make_state().await;
  let c = campus(&state).await;

  let (status, _) = send(
    &state,
    "PUT",
    "/api/faculty/me/password",
    Some(&c.faculty),
    Some(json!({ "current_password": "wrong", "new_password": "fresh" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = send(
    &state,
    "PUT",
    "/api/faculty/me/password",
    Some(&c.faculty),
    Some(json!({ "current_password": "testpassword", "new_password": "fresh" })),
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = send(
    &state,
    "POST",
    "/api/auth/login",
    None,
    Some(json!({ "email": "mukesh.adani@example.com", "password": "fresh" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
}

// ── Directory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn directory_conflicts_map_to_409() {
  let state = make_state().await;
  let c = campus(&state).await;

  let (status, _) = send(
    &state,
    "POST",
    "/api/auth/register",
    None,
    Some(json!({
      "name": "Impostor",
      "email": "mukesh.adani@example.com",
      "password": "pw",
      "department_id": c.dept_id,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = send(
    &state,
    "DELETE",
    &format!("/api/admin/departments/{}", c.dept_id),
    Some(&c.admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn subject_batch_label_can_be_cleared() {
  let state = make_state().await;
  let c = campus(&state).await;
  let uri = format!("/api/admin/subjects/{}", c.subject_id);

  let (status, subject) =
    send(&state, "PUT", &uri, Some(&c.admin), Some(json!({ "section": "B" }))).await;
  assert_eq!(status, StatusCode::OK, "{subject}");
  assert_eq!(subject["batch_name"], "3rd Year A Batch");

  let (status, subject) =
    send(&state, "PUT", &uri, Some(&c.admin), Some(json!({ "batch_name": null }))).await;
  assert_eq!(status, StatusCode::OK, "{subject}");
  assert!(subject["batch_name"].is_null());
  assert_eq!(subject["section"], "B");
}

#[tokio::test]
async fn faculty_profile_update_and_subjects() {
  let state = make_state().await;
  let c = campus(&state).await;

  let (status, _) = send(&state, "PUT", "/api/faculty/me", Some(&c.faculty), Some(json!({}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, me) = send(
    &state,
    "PUT",
    "/api/faculty/me",
    Some(&c.faculty),
    Some(json!({ "name": "Dr. M. Adani" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["name"], "Dr. M. Adani");
  assert_eq!(me["email"], "mukesh.adani@example.com");

  let (status, subjects) = send(&state, "GET", "/api/faculty/me/subjects", Some(&c.faculty), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(subjects[0]["subject_name"], "Data Structures");
}

#[tokio::test]
async fn unenrolled_student_cannot_check_in() {
  let state = make_state().await;
  let c = campus(&state).await;

  let (status, _) = send(
    &state,
    "DELETE",
    &format!("/api/admin/subjects/{}/students/{}", c.subject_id, c.student_id),
    Some(&c.admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  send(
    &state,
    "POST",
    "/api/attendance/start",
    Some(&c.faculty),
    Some(json!({ "subject_id": c.subject_id, "session_code": "CODE6DEF" })),
  )
  .await;

  let (status, _) = send(
    &state,
    "POST",
    "/api/student/attendance/mark",
    Some(&c.student),
    Some(json!({ "session_code": "CODE6DEF" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = send(
    &state,
    "GET",
    &format!(
      "/api/student/attendance/calendar?subject_id={}&month=9&year=2024",
      c.subject_id
    ),
    Some(&c.student),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}
