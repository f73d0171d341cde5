//! Request-field validation and store-outcome mapping shared by handlers.

use quickmark_core::directory::{DeleteOutcome, WriteOutcome};

use crate::error::ApiError;

/// A required text field: missing or blank is a 400 with `message`.
pub fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
    .ok_or_else(|| ApiError::BadRequest(message.to_owned()))
}

/// A required password: rejected when missing or blank, otherwise passed
/// through byte for byte.
pub fn secret(value: Option<String>, message: &str) -> Result<String, ApiError> {
  value
    .filter(|v| !v.trim().is_empty())
    .ok_or_else(|| ApiError::BadRequest(message.to_owned()))
}

/// A required non-text field.
pub fn present<T>(value: Option<T>, message: &str) -> Result<T, ApiError> {
  value.ok_or_else(|| ApiError::BadRequest(message.to_owned()))
}

/// Turn a create/update outcome into the written row or an API error.
pub fn written<T>(outcome: WriteOutcome<T>, entity: &str, duplicate: &str) -> Result<T, ApiError> {
  match outcome {
    WriteOutcome::Written(value) => Ok(value),
    WriteOutcome::NotFound => Err(ApiError::NotFound(format!("{entity} not found"))),
    WriteOutcome::Duplicate => Err(ApiError::Conflict(duplicate.to_owned())),
    WriteOutcome::MissingReference => Err(ApiError::BadRequest(format!(
      "{entity} refers to a record that does not exist"
    ))),
  }
}

pub fn deleted(outcome: DeleteOutcome, entity: &str) -> Result<(), ApiError> {
  match outcome {
    DeleteOutcome::Deleted => Ok(()),
    DeleteOutcome::NotFound => Err(ApiError::NotFound(format!("{entity} not found"))),
    DeleteOutcome::StillReferenced => Err(ApiError::Conflict(format!(
      "{entity} is still referenced by other records"
    ))),
  }
}
