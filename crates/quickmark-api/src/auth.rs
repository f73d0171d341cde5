//! Bearer-token authentication: password hashing, JWT issue/verify, and the
//! per-role extractors that guard protected routes.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, Backend, error::ApiError};

/// Lifetime of an issued token unless configured otherwise.
pub const DEFAULT_EXPIRY_HOURS: i64 = 24;

/// `iss` claim written into, and required on, every token.
pub const ISSUER: &str = "quickmark";

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}").into()))
}

/// `true` if `password` matches the PHC string `hash`. A malformed hash never
/// matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(hash) else { return false };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Faculty,
  Student,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  /// Account id.
  pub sub:  String,
  pub role: Role,
  pub iss:  String,
  pub exp:  usize,
  pub iat:  usize,
}

/// Signs and verifies HS256 tokens with a shared secret.
pub struct TokenIssuer {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  expiry:     Duration,
}

impl TokenIssuer {
  pub fn new(secret: &[u8], expiry_hours: i64) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      expiry: Duration::hours(expiry_hours),
    }
  }

  pub fn issue(&self, account_id: Uuid, role: Role) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
      sub:  account_id.to_string(),
      role,
      iss:  ISSUER.to_owned(),
      exp:  (now + self.expiry).timestamp().max(0) as usize,
      iat:  now.timestamp().max(0) as usize,
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(ApiError::store)
  }

  pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
    jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims)
      .map_err(|e| {
        tracing::debug!(error = %e, "rejected token");
        ApiError::Unauthorized("token is not valid".into())
      })
  }
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// Check the bearer token in `headers` and require `role`.
pub fn authorize(headers: &HeaderMap, tokens: &TokenIssuer, role: Role) -> Result<Uuid, ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| ApiError::Unauthorized("no token, authorization denied".into()))?;

  let token = value
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| ApiError::Unauthorized("token format is incorrect".into()))?;

  let claims = tokens.verify(token)?;
  if claims.role != role {
    tracing::warn!(sub = %claims.sub, role = ?claims.role, required = ?role, "role mismatch");
    return Err(ApiError::Forbidden("access denied for this role".into()));
  }

  Uuid::parse_str(&claims.sub)
    .map_err(|_| ApiError::Unauthorized("token is not valid".into()))
}

macro_rules! role_extractor {
  ($(#[$doc:meta])* $name:ident => $role:expr) => {
    $(#[$doc])*
    #[derive(Debug, Clone, Copy)]
    pub struct $name(pub Uuid);

    impl<S: Backend> FromRequestParts<AppState<S>> for $name {
      type Rejection = ApiError;

      async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
      ) -> Result<Self, Self::Rejection> {
        authorize(&parts.headers, &state.tokens, $role).map($name)
      }
    }
  };
}

role_extractor! {
  /// An authenticated admin.
  AdminUser => Role::Admin
}

role_extractor! {
  /// An authenticated faculty member.
  FacultyUser => Role::Faculty
}

role_extractor! {
  /// An authenticated student.
  StudentUser => Role::Student
}
