//! QuickMark HTTP server: configuration, wiring and demo fixtures.
//!
//! The binary in `main.rs` only parses flags and loads [`ServerConfig`];
//! everything it serves is assembled by [`app`].

pub mod seed;

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use quickmark_api::{AppState, Backend, auth::TokenIssuer};
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `QUICKMARK_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  pub database_path:    PathBuf,
  /// HMAC key for issued bearer tokens.
  pub jwt_secret:       String,
  #[serde(default = "default_expiry_hours")]
  pub jwt_expiry_hours: i64,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 5000 }

fn default_expiry_hours() -> i64 { quickmark_api::auth::DEFAULT_EXPIRY_HOURS }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn token_issuer(&self) -> TokenIssuer {
    TokenIssuer::new(self.jwt_secret.as_bytes(), self.jwt_expiry_hours)
  }
}

// ─── Wiring ───────────────────────────────────────────────────────────────────

/// Build the full application over an opened store.
pub fn app<S: Backend>(store: Arc<S>, config: &ServerConfig) -> Router {
  quickmark_api::router(AppState::new(store, config.token_issuer()))
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use quickmark_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  fn test_config() -> ServerConfig {
    ServerConfig {
      host:             "127.0.0.1".to_string(),
      port:             5000,
      database_path:    PathBuf::from(":memory:"),
      jwt_secret:       "test-secret".to_string(),
      jwt_expiry_hours: 1,
    }
  }

  async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
  }

  #[test]
  fn config_defaults_fill_host_port_and_expiry() {
    let cfg: ServerConfig = config::Config::builder()
      .set_override("database_path", "quickmark.db")
      .unwrap()
      .set_override("jwt_secret", "s3cret")
      .unwrap()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.address(), "127.0.0.1:5000");
    assert_eq!(cfg.jwt_expiry_hours, 24);
    assert_eq!(cfg.database_path, PathBuf::from("quickmark.db"));
  }

  #[tokio::test]
  async fn seeded_student_sees_the_september_calendar() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let seeded = seed::seed(store.as_ref()).await.unwrap();
    let app = app(store, &test_config());

    let (status, body) = call(
      &app,
      Request::post("/api/student/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
          json!({ "roll_number": "IEC2023021", "password": "studentpass" }).to_string(),
        ))
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let uri = format!(
      "/api/student/attendance/calendar?subject_id={}&month=9&year=2024",
      seeded.data_structures
    );
    let (status, calendar) = call(
      &app,
      Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      calendar,
      json!({
        "2024-09-05": "present",
        "2024-09-06": "present",
        "2024-09-12": "absent",
      })
    );
  }
}
