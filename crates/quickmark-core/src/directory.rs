//! Directory entities owned by the administrative side: admins, departments,
//! faculty, students and subjects.
//!
//! The attendance engine only ever reads the two relations (faculty
//! assignment and enrollment); everything else here exists for the admin and
//! self-service surfaces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ─── Entities ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
  pub admin_id:   Uuid,
  pub name:       String,
  pub email:      String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
  pub department_id: Uuid,
  pub name:          String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faculty {
  pub faculty_id:    Uuid,
  pub name:          String,
  pub email:         String,
  pub department_id: Uuid,
  pub created_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub student_id:    Uuid,
  pub roll_number:   String,
  pub name:          String,
  pub email:         String,
  pub department_id: Uuid,
  pub current_year:  Option<i64>,
  pub section:       Option<String>,
  pub created_at:    DateTime<Utc>,
}

/// A course offering: one subject taught to one year/section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id:    Uuid,
  pub subject_name:  String,
  pub department_id: Uuid,
  pub year:          i64,
  pub section:       String,
  pub batch_name:    Option<String>,
}

/// The stored password hash for an account, looked up by its login key.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub id:            Uuid,
  /// argon2 PHC string.
  pub password_hash: String,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NewAdmin {
  pub name:          String,
  pub email:         String,
  pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewFaculty {
  pub name:          String,
  pub email:         String,
  pub department_id: Uuid,
  pub password_hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacultyPatch {
  pub name:          Option<String>,
  pub email:         Option<String>,
  pub department_id: Option<Uuid>,
}

impl FacultyPatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.email.is_none() && self.department_id.is_none()
  }
}

#[derive(Debug, Clone)]
pub struct NewStudent {
  pub roll_number:   String,
  pub name:          String,
  pub email:         String,
  pub department_id: Uuid,
  pub current_year:  Option<i64>,
  pub section:       Option<String>,
  /// Students created by an admin may have no password; they cannot log in.
  pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentPatch {
  pub roll_number:   Option<String>,
  pub name:          Option<String>,
  pub email:         Option<String>,
  pub department_id: Option<Uuid>,
  /// `Some(None)` clears the year.
  #[serde(default, deserialize_with = "nullable")]
  pub current_year:  Option<Option<i64>>,
  #[serde(default, deserialize_with = "nullable")]
  pub section:       Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubject {
  pub subject_name:  String,
  pub department_id: Uuid,
  pub year:          i64,
  pub section:       String,
  pub batch_name:    Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectPatch {
  pub subject_name:  Option<String>,
  pub department_id: Option<Uuid>,
  pub year:          Option<i64>,
  pub section:       Option<String>,
  /// `Some(None)` clears the batch label.
  #[serde(default, deserialize_with = "nullable")]
  pub batch_name:    Option<Option<String>>,
}

/// For optional columns in a patch: a missing key leaves the column alone,
/// an explicit `null` clears it.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of a create or update that can trip over a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<T> {
  Written(T),
  /// The row to update does not exist.
  NotFound,
  /// A unique key (email, roll number, open session code…) is already taken.
  Duplicate,
  /// A referenced row (department, subject, faculty…) does not exist.
  MissingReference,
}

impl<T> WriteOutcome<T> {
  pub fn written(self) -> Option<T> {
    match self {
      Self::Written(value) => Some(value),
      _ => None,
    }
  }
}

/// Result of a directory delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
  Deleted,
  NotFound,
  /// Other rows (sessions, faculty, subjects…) still point at this one.
  StillReferenced,
}
