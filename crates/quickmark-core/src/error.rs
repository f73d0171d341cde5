//! Error types for `quickmark-core`.
//!
//! The four variants are the whole taxonomy the attendance engine reports.
//! Mapping them onto status codes is the HTTP layer's job.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or out-of-range input, or a data-integrity violation such as
  /// marking a student who is not enrolled.
  #[error("bad request: {0}")]
  BadRequest(String),

  /// The actor lacks the relation the operation requires.
  #[error("forbidden: {0}")]
  Forbidden(String),

  /// The referenced entity does not exist in the required state.
  #[error("not found: {0}")]
  NotFound(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a storage-backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Internal(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
