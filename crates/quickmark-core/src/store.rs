//! Storage traits consumed by the attendance engine and the HTTP layer.
//!
//! Traits are implemented by storage backends (e.g. `quickmark-store-sqlite`).
//! Higher layers depend on these abstractions, not on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::{
  directory::{
    Admin, Credentials, DeleteOutcome, Department, Faculty, FacultyPatch,
    NewAdmin, NewFaculty, NewStudent, NewSubject, Student, StudentPatch,
    Subject, SubjectPatch, WriteOutcome,
  },
  record::{AttendanceRecord, CalendarEntry},
  session::{AttendanceSession, NewSession},
};

// ─── Authorization facts ─────────────────────────────────────────────────────

/// The two membership relations every permission check is built on.
///
/// This trait also carries the backend's error type, shared by
/// [`AttendanceStore`] and [`DirectoryStore`].
pub trait AuthorizationFacts: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Is `faculty_id` assigned to teach `subject_id`?
  fn is_faculty_assigned(
    &self,
    faculty_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Is `student_id` enrolled in `subject_id`?
  fn is_student_enrolled(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Sessions and records ────────────────────────────────────────────────────

/// Persistence for attendance sessions and records.
pub trait AttendanceStore: AuthorizationFacts {
  /// Persist a new open session. The store assigns `session_id`.
  ///
  /// Returns [`WriteOutcome::Duplicate`] if another *open* session already
  /// uses the same code.
  fn insert_session(
    &self,
    input: NewSession,
  ) -> impl Future<Output = Result<WriteOutcome<AttendanceSession>, Self::Error>>
  + Send
  + '_;

  /// Fetch a session in any state.
  fn get_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Option<AttendanceSession>, Self::Error>> + Send + '_;

  /// Resolve a session code to an open session. Closed sessions never match.
  fn find_open_session_by_code<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<AttendanceSession>, Self::Error>> + Send + 'a;

  /// Close `session_id` if, and only if, it is still open at the moment of
  /// the write. Returns `None` when no open session matched, so concurrent
  /// callers cannot both succeed.
  fn close_session(
    &self,
    session_id: Uuid,
    end_time: NaiveTime,
  ) -> impl Future<Output = Result<Option<AttendanceSession>, Self::Error>> + Send + '_;

  /// Atomically insert or replace the record for
  /// `(record.session_id, record.student_id)` and return the stored row.
  fn upsert_record(
    &self,
    record: AttendanceRecord,
  ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send + '_;

  /// Fetch a single record, if one exists.
  fn get_record(
    &self,
    session_id: Uuid,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send + '_;

  /// All records of `student_id` for sessions of `subject_id` whose date
  /// lies in `from..=to`, ordered by session date.
  fn student_history(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
  ) -> impl Future<Output = Result<Vec<CalendarEntry>, Self::Error>> + Send + '_;
}

// ─── Directory ───────────────────────────────────────────────────────────────

/// Identity store and administrative CRUD.
pub trait DirectoryStore: AuthorizationFacts {
  // ── Admins ────────────────────────────────────────────────────────────

  fn create_admin(
    &self,
    input: NewAdmin,
  ) -> impl Future<Output = Result<WriteOutcome<Admin>, Self::Error>> + Send + '_;

  fn admin_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  fn get_admin(
    &self,
    admin_id: Uuid,
  ) -> impl Future<Output = Result<Option<Admin>, Self::Error>> + Send + '_;

  // ── Departments ───────────────────────────────────────────────────────

  fn list_departments(
    &self,
  ) -> impl Future<Output = Result<Vec<Department>, Self::Error>> + Send + '_;

  fn create_department(
    &self,
    name: String,
  ) -> impl Future<Output = Result<WriteOutcome<Department>, Self::Error>> + Send + '_;

  fn rename_department(
    &self,
    department_id: Uuid,
    name: String,
  ) -> impl Future<Output = Result<WriteOutcome<Department>, Self::Error>> + Send + '_;

  fn delete_department(
    &self,
    department_id: Uuid,
  ) -> impl Future<Output = Result<DeleteOutcome, Self::Error>> + Send + '_;

  // ── Faculty ───────────────────────────────────────────────────────────

  fn list_faculty(&self) -> impl Future<Output = Result<Vec<Faculty>, Self::Error>> + Send + '_;

  fn get_faculty(
    &self,
    faculty_id: Uuid,
  ) -> impl Future<Output = Result<Option<Faculty>, Self::Error>> + Send + '_;

  fn create_faculty(
    &self,
    input: NewFaculty,
  ) -> impl Future<Output = Result<WriteOutcome<Faculty>, Self::Error>> + Send + '_;

  /// Apply the `Some` fields of `patch`; `None` fields are left untouched.
  fn update_faculty(
    &self,
    faculty_id: Uuid,
    patch: FacultyPatch,
  ) -> impl Future<Output = Result<WriteOutcome<Faculty>, Self::Error>> + Send + '_;

  fn delete_faculty(
    &self,
    faculty_id: Uuid,
  ) -> impl Future<Output = Result<DeleteOutcome, Self::Error>> + Send + '_;

  /// Credentials keyed by login email.
  fn faculty_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  /// Credentials keyed by id, for password changes.
  fn faculty_credentials_by_id(
    &self,
    faculty_id: Uuid,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + '_;

  /// Returns `false` if the faculty member does not exist.
  fn set_faculty_password(
    &self,
    faculty_id: Uuid,
    password_hash: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Students ──────────────────────────────────────────────────────────

  fn list_students(&self) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn create_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<WriteOutcome<Student>, Self::Error>> + Send + '_;

  fn update_student(
    &self,
    student_id: Uuid,
    patch: StudentPatch,
  ) -> impl Future<Output = Result<WriteOutcome<Student>, Self::Error>> + Send + '_;

  fn delete_student(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<DeleteOutcome, Self::Error>> + Send + '_;

  /// Credentials keyed by roll number. Students without a password are
  /// reported as `None`.
  fn student_credentials<'a>(
    &'a self,
    roll_number: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  // ── Subjects ──────────────────────────────────────────────────────────

  fn list_subjects(&self) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  fn get_subject(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  fn create_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<WriteOutcome<Subject>, Self::Error>> + Send + '_;

  fn update_subject(
    &self,
    subject_id: Uuid,
    patch: SubjectPatch,
  ) -> impl Future<Output = Result<WriteOutcome<Subject>, Self::Error>> + Send + '_;

  fn delete_subject(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<DeleteOutcome, Self::Error>> + Send + '_;

  /// Subjects assigned to `faculty_id`, ordered by year, section, name.
  fn subjects_for_faculty(
    &self,
    faculty_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  /// Students enrolled in `subject_id`, ordered by roll number.
  fn roster(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  // ── Relations ─────────────────────────────────────────────────────────

  /// Idempotent: assigning twice is not an error.
  fn assign_faculty(
    &self,
    faculty_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<WriteOutcome<()>, Self::Error>> + Send + '_;

  /// Returns `false` if there was no such assignment.
  fn unassign_faculty(
    &self,
    faculty_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Idempotent: enrolling twice is not an error.
  fn enroll_student(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<WriteOutcome<()>, Self::Error>> + Send + '_;

  /// Returns `false` if there was no such enrollment.
  fn unenroll_student(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
