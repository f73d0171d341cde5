//! [`DirectoryStore`] impl: accounts, departments, subjects and the two
//! membership relations.

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use quickmark_core::{
  directory::{
    Admin, Credentials, DeleteOutcome, Department, Faculty, FacultyPatch, NewAdmin,
    NewFaculty, NewStudent, NewSubject, Student, StudentPatch, Subject, SubjectPatch,
    WriteOutcome,
  },
  store::DirectoryStore,
};

use crate::{
  Result, SqliteStore,
  encode::{
    ADMIN_COLUMNS, FACULTY_COLUMNS, RawAdmin, RawCredentials, RawDepartment, RawFaculty,
    RawStudent, RawSubject, STUDENT_COLUMNS, SUBJECT_COLUMNS, classify_write,
    decode_outcome, encode_dt, encode_uuid, is_foreign_key_violation, select_all,
    write_returning,
  },
};

impl SqliteStore {
  /// Delete the single row of `table` keyed by `id`.
  async fn delete_row(&self, sql: &'static str, id: Uuid) -> Result<DeleteOutcome> {
    let id_str = encode_uuid(id);
    let outcome = self
      .conn
      .call(move |conn| match conn.execute(sql, rusqlite::params![id_str]) {
        Ok(0) => Ok(DeleteOutcome::NotFound),
        Ok(_) => Ok(DeleteOutcome::Deleted),
        Err(e) if is_foreign_key_violation(&e) => Ok(DeleteOutcome::StillReferenced),
        Err(e) => Err(e.into()),
      })
      .await?;
    Ok(outcome)
  }

  /// Look up `(id, password_hash)` with a single text key.
  async fn credentials(&self, sql: &'static str, key: String) -> Result<Option<Credentials>> {
    let raw: Option<RawCredentials> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(sql, rusqlite::params![key], RawCredentials::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawCredentials::into_credentials).transpose()
  }

  /// Insert into a two-column relation, ignoring an existing pair.
  async fn relate(&self, sql: &'static str, a: Uuid, b: Uuid) -> Result<WriteOutcome<()>> {
    let (a, b) = (encode_uuid(a), encode_uuid(b));
    let outcome = self
      .conn
      .call(move |conn| {
        let result = conn.execute(sql, rusqlite::params![a, b]).map(|_| Some(()));
        Ok(classify_write(result)?)
      })
      .await?;
    Ok(outcome)
  }

  async fn unrelate(&self, sql: &'static str, a: Uuid, b: Uuid) -> Result<bool> {
    let (a, b) = (encode_uuid(a), encode_uuid(b));
    let removed = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, rusqlite::params![a, b])? > 0))
      .await?;
    Ok(removed)
  }
}

impl DirectoryStore for SqliteStore {
  // ── Admins ────────────────────────────────────────────────────────────────

  async fn create_admin(&self, input: NewAdmin) -> Result<WriteOutcome<Admin>> {
    let id_str = encode_uuid(Uuid::new_v4());
    let at_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        Ok(write_returning(
          conn,
          &format!(
            "INSERT INTO admins (admin_id, name, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {ADMIN_COLUMNS}"
          ),
          rusqlite::params![id_str, input.name, input.email, input.password_hash, at_str],
          RawAdmin::from_row,
        )?)
      })
      .await?;

    decode_outcome(outcome, RawAdmin::into_admin)
  }

  async fn admin_credentials<'a>(&'a self, email: &'a str) -> Result<Option<Credentials>> {
    self
      .credentials(
        "SELECT admin_id, password_hash FROM admins WHERE email = ?1",
        email.to_owned(),
      )
      .await
  }

  async fn get_admin(&self, admin_id: Uuid) -> Result<Option<Admin>> {
    let id_str = encode_uuid(admin_id);
    let raw: Option<RawAdmin> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE admin_id = ?1"),
              rusqlite::params![id_str],
              RawAdmin::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawAdmin::into_admin).transpose()
  }

  // ── Departments ───────────────────────────────────────────────────────────

  async fn list_departments(&self) -> Result<Vec<Department>> {
    let raws: Vec<RawDepartment> = self
      .conn
      .call(|conn| {
        Ok(select_all(
          conn,
          "SELECT department_id, name FROM departments ORDER BY name",
          [],
          RawDepartment::from_row,
        )?)
      })
      .await?;
    raws.into_iter().map(RawDepartment::into_department).collect()
  }

  async fn create_department(&self, name: String) -> Result<WriteOutcome<Department>> {
    let id_str = encode_uuid(Uuid::new_v4());
    let outcome = self
      .conn
      .call(move |conn| {
        Ok(write_returning(
          conn,
          "INSERT INTO departments (department_id, name) VALUES (?1, ?2)
           RETURNING department_id, name",
          rusqlite::params![id_str, name],
          RawDepartment::from_row,
        )?)
      })
      .await?;
    decode_outcome(outcome, RawDepartment::into_department)
  }

  async fn rename_department(
    &self,
    department_id: Uuid,
    name: String,
  ) -> Result<WriteOutcome<Department>> {
    let id_str = encode_uuid(department_id);
    let outcome = self
      .conn
      .call(move |conn| {
        Ok(write_returning(
          conn,
          "UPDATE departments SET name = ?2 WHERE department_id = ?1
           RETURNING department_id, name",
          rusqlite::params![id_str, name],
          RawDepartment::from_row,
        )?)
      })
      .await?;
    decode_outcome(outcome, RawDepartment::into_department)
  }

  async fn delete_department(&self, department_id: Uuid) -> Result<DeleteOutcome> {
    self
      .delete_row("DELETE FROM departments WHERE department_id = ?1", department_id)
      .await
  }

  // ── Faculty ───────────────────────────────────────────────────────────────

  async fn list_faculty(&self) -> Result<Vec<Faculty>> {
    let raws: Vec<RawFaculty> = self
      .conn
      .call(|conn| {
        Ok(select_all(
          conn,
          &format!("SELECT {FACULTY_COLUMNS} FROM faculties ORDER BY name, email"),
          [],
          RawFaculty::from_row,
        )?)
      })
      .await?;
    raws.into_iter().map(RawFaculty::into_faculty).collect()
  }

  async fn get_faculty(&self, faculty_id: Uuid) -> Result<Option<Faculty>> {
    let id_str = encode_uuid(faculty_id);
    let raw: Option<RawFaculty> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {FACULTY_COLUMNS} FROM faculties WHERE faculty_id = ?1"),
              rusqlite::params![id_str],
              RawFaculty::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawFaculty::into_faculty).transpose()
  }

  async fn create_faculty(&self, input: NewFaculty) -> Result<WriteOutcome<Faculty>> {
    let id_str   = encode_uuid(Uuid::new_v4());
    let dept_str = encode_uuid(input.department_id);
    let at_str   = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        Ok(write_returning(
          conn,
          &format!(
            "INSERT INTO faculties (faculty_id, name, email, password_hash, department_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {FACULTY_COLUMNS}"
          ),
          rusqlite::params![
            id_str,
            input.name,
            input.email,
            input.password_hash,
            dept_str,
            at_str
          ],
          RawFaculty::from_row,
        )?)
      })
      .await?;

    decode_outcome(outcome, RawFaculty::into_faculty)
  }

  async fn update_faculty(
    &self,
    faculty_id: Uuid,
    patch: FacultyPatch,
  ) -> Result<WriteOutcome<Faculty>> {
    let id_str   = encode_uuid(faculty_id);
    let dept_str = patch.department_id.map(encode_uuid);

    let outcome = self
      .conn
      .call(move |conn| {
        Ok(write_returning(
          conn,
          &format!(
            "UPDATE faculties SET
               name          = COALESCE(?2, name),
               email         = COALESCE(?3, email),
               department_id = COALESCE(?4, department_id)
             WHERE faculty_id = ?1
             RETURNING {FACULTY_COLUMNS}"
          ),
          rusqlite::params![id_str, patch.name, patch.email, dept_str],
          RawFaculty::from_row,
        )?)
      })
      .await?;

    decode_outcome(outcome, RawFaculty::into_faculty)
  }

  async fn delete_faculty(&self, faculty_id: Uuid) -> Result<DeleteOutcome> {
    self
      .delete_row("DELETE FROM faculties WHERE faculty_id = ?1", faculty_id)
      .await
  }

  async fn faculty_credentials<'a>(&'a self, email: &'a str) -> Result<Option<Credentials>> {
    self
      .credentials(
        "SELECT faculty_id, password_hash FROM faculties WHERE email = ?1",
        email.to_owned(),
      )
      .await
  }

  async fn faculty_credentials_by_id(&self, faculty_id: Uuid) -> Result<Option<Credentials>> {
    self
      .credentials(
        "SELECT faculty_id, password_hash FROM faculties WHERE faculty_id = ?1",
        encode_uuid(faculty_id),
      )
      .await
  }

  async fn set_faculty_password(&self, faculty_id: Uuid, password_hash: String) -> Result<bool> {
    let id_str = encode_uuid(faculty_id);
    let updated = self
      .conn
      .call(move |conn| {
        Ok(
          conn.execute(
            "UPDATE faculties SET password_hash = ?2 WHERE faculty_id = ?1",
            rusqlite::params![id_str, password_hash],
          )? > 0,
        )
      })
      .await?;
    Ok(updated)
  }

  // ── Students ──────────────────────────────────────────────────────────────

  async fn list_students(&self) -> Result<Vec<Student>> {
    let raws: Vec<RawStudent> = self
      .conn
      .call(|conn| {
        Ok(select_all(
          conn,
          &format!("SELECT {STUDENT_COLUMNS} FROM students ORDER BY roll_number"),
          [],
          RawStudent::from_row,
        )?)
      })
      .await?;
    raws.into_iter().map(RawStudent::into_student).collect()
  }

  async fn get_student(&self, student_id: Uuid) -> Result<Option<Student>> {
    let id_str = encode_uuid(student_id);
    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = ?1"),
              rusqlite::params![id_str],
              RawStudent::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawStudent::into_student).transpose()
  }

  async fn create_student(&self, input: NewStudent) -> Result<WriteOutcome<Student>> {
    let id_str   = encode_uuid(Uuid::new_v4());
    let dept_str = encode_uuid(input.department_id);
    let at_str   = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        Ok(write_returning(
          conn,
          &format!(
            "INSERT INTO students (
               student_id, roll_number, name, email, password_hash,
               department_id, current_year, section, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             RETURNING {STUDENT_COLUMNS}"
          ),
          rusqlite::params![
            id_str,
            input.roll_number,
            input.name,
            input.email,
            input.password_hash,
            dept_str,
            input.current_year,
            input.section,
            at_str,
          ],
          RawStudent::from_row,
        )?)
      })
      .await?;

    decode_outcome(outcome, RawStudent::into_student)
  }

  async fn update_student(
    &self,
    student_id: Uuid,
    patch: StudentPatch,
  ) -> Result<WriteOutcome<Student>> {
    let id_str      = encode_uuid(student_id);
    let dept_str    = patch.department_id.map(encode_uuid);
    let set_year    = patch.current_year.is_some();
    let set_section = patch.section.is_some();
    let year        = patch.current_year.flatten();
    let section     = patch.section.flatten();

    let outcome = self
      .conn
      .call(move |conn| {
        Ok(write_returning(
          conn,
          &format!(
            "UPDATE students SET
               roll_number   = COALESCE(?2, roll_number),
               name          = COALESCE(?3, name),
               email         = COALESCE(?4, email),
               department_id = COALESCE(?5, department_id),
               current_year  = CASE WHEN ?6 THEN ?7 ELSE current_year END,
               section       = CASE WHEN ?8 THEN ?9 ELSE section END
             WHERE student_id = ?1
             RETURNING {STUDENT_COLUMNS}"
          ),
          rusqlite::params![
            id_str,
            patch.roll_number,
            patch.name,
            patch.email,
            dept_str,
            set_year,
            year,
            set_section,
            section,
          ],
          RawStudent::from_row,
        )?)
      })
      .await?;

    decode_outcome(outcome, RawStudent::into_student)
  }

  async fn delete_student(&self, student_id: Uuid) -> Result<DeleteOutcome> {
    self
      .delete_row("DELETE FROM students WHERE student_id = ?1", student_id)
      .await
  }

  async fn student_credentials<'a>(&'a self, roll_number: &'a str) -> Result<Option<Credentials>> {
    self
      .credentials(
        "SELECT student_id, password_hash FROM students
         WHERE roll_number = ?1 AND password_hash IS NOT NULL",
        roll_number.to_owned(),
      )
      .await
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn list_subjects(&self) -> Result<Vec<Subject>> {
    let raws: Vec<RawSubject> = self
      .conn
      .call(|conn| {
        Ok(select_all(
          conn,
          &format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects ORDER BY year, section, subject_name"
          ),
          [],
          RawSubject::from_row,
        )?)
      })
      .await?;
    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  async fn get_subject(&self, subject_id: Uuid) -> Result<Option<Subject>> {
    let id_str = encode_uuid(subject_id);
    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE subject_id = ?1"),
              rusqlite::params![id_str],
              RawSubject::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSubject::into_subject).transpose()
  }

  async fn create_subject(&self, input: NewSubject) -> Result<WriteOutcome<Subject>> {
    let id_str   = encode_uuid(Uuid::new_v4());
    let dept_str = encode_uuid(input.department_id);

    let outcome = self
      .conn
      .call(move |conn| {
        Ok(write_returning(
          conn,
          &format!(
            "INSERT INTO subjects (subject_id, subject_name, department_id, year, section, batch_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {SUBJECT_COLUMNS}"
          ),
          rusqlite::params![
            id_str,
            input.subject_name,
            dept_str,
            input.year,
            input.section,
            input.batch_name,
          ],
          RawSubject::from_row,
        )?)
      })
      .await?;

    decode_outcome(outcome, RawSubject::into_subject)
  }

  async fn update_subject(
    &self,
    subject_id: Uuid,
    patch: SubjectPatch,
  ) -> Result<WriteOutcome<Subject>> {
    let id_str    = encode_uuid(subject_id);
    let dept_str  = patch.department_id.map(encode_uuid);
    let set_batch = patch.batch_name.is_some();
    let batch     = patch.batch_name.flatten();

    let outcome = self
      .conn
      .call(move |conn| {
        Ok(write_returning(
          conn,
          &format!(
            "UPDATE subjects SET
               subject_name  = COALESCE(?2, subject_name),
               department_id = COALESCE(?3, department_id),
               year          = COALESCE(?4, year),
               section       = COALESCE(?5, section),
               batch_name    = CASE WHEN ?6 THEN ?7 ELSE batch_name END
             WHERE subject_id = ?1
             RETURNING {SUBJECT_COLUMNS}"
          ),
          rusqlite::params![
            id_str,
            patch.subject_name,
            dept_str,
            patch.year,
            patch.section,
            set_batch,
            batch,
          ],
          RawSubject::from_row,
        )?)
      })
      .await?;

    decode_outcome(outcome, RawSubject::into_subject)
  }

  async fn delete_subject(&self, subject_id: Uuid) -> Result<DeleteOutcome> {
    self
      .delete_row("DELETE FROM subjects WHERE subject_id = ?1", subject_id)
      .await
  }

  async fn subjects_for_faculty(&self, faculty_id: Uuid) -> Result<Vec<Subject>> {
    let id_str = encode_uuid(faculty_id);
    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(select_all(
          conn,
          "SELECT s.subject_id, s.subject_name, s.department_id, s.year, s.section, s.batch_name
           FROM subjects s
           JOIN faculty_subjects fs ON fs.subject_id = s.subject_id
           WHERE fs.faculty_id = ?1
           ORDER BY s.year, s.section, s.subject_name",
          rusqlite::params![id_str],
          RawSubject::from_row,
        )?)
      })
      .await?;
    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  async fn roster(&self, subject_id: Uuid) -> Result<Vec<Student>> {
    let id_str = encode_uuid(subject_id);
    let raws: Vec<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(select_all(
          conn,
          "SELECT st.student_id, st.roll_number, st.name, st.email, st.department_id,
                  st.current_year, st.section, st.created_at
           FROM students st
           JOIN enrollments e ON e.student_id = st.student_id
           WHERE e.subject_id = ?1
           ORDER BY st.roll_number",
          rusqlite::params![id_str],
          RawStudent::from_row,
        )?)
      })
      .await?;
    raws.into_iter().map(RawStudent::into_student).collect()
  }

  // ── Relations ─────────────────────────────────────────────────────────────

  async fn assign_faculty(&self, faculty_id: Uuid, subject_id: Uuid) -> Result<WriteOutcome<()>> {
    self
      .relate(
        "INSERT INTO faculty_subjects (faculty_id, subject_id) VALUES (?1, ?2)
         ON CONFLICT DO NOTHING",
        faculty_id,
        subject_id,
      )
      .await
  }

  async fn unassign_faculty(&self, faculty_id: Uuid, subject_id: Uuid) -> Result<bool> {
    self
      .unrelate(
        "DELETE FROM faculty_subjects WHERE faculty_id = ?1 AND subject_id = ?2",
        faculty_id,
        subject_id,
      )
      .await
  }

  async fn enroll_student(&self, student_id: Uuid, subject_id: Uuid) -> Result<WriteOutcome<()>> {
    self
      .relate(
        "INSERT INTO enrollments (student_id, subject_id) VALUES (?1, ?2)
         ON CONFLICT DO NOTHING",
        student_id,
        subject_id,
      )
      .await
  }

  async fn unenroll_student(&self, student_id: Uuid, subject_id: Uuid) -> Result<bool> {
    self
      .unrelate(
        "DELETE FROM enrollments WHERE student_id = ?1 AND subject_id = ?2",
        student_id,
        subject_id,
      )
      .await
  }
}
