//! SQL schema for the QuickMark SQLite store.
//!
//! Applied on every open. Each statement is idempotent, so reopening an
//! existing database leaves it unchanged.

/// Full schema DDL; idempotent thanks to `CREATE … IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS admins (
    admin_id      TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS departments (
    department_id TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS faculties (
    faculty_id    TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    department_id TEXT NOT NULL REFERENCES departments(department_id),
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    student_id    TEXT PRIMARY KEY,
    roll_number   TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL,
    password_hash TEXT,               -- NULL: created by an admin, cannot log in
    department_id TEXT NOT NULL REFERENCES departments(department_id),
    current_year  INTEGER,
    section       TEXT,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subjects (
    subject_id    TEXT PRIMARY KEY,
    subject_name  TEXT NOT NULL,
    department_id TEXT NOT NULL REFERENCES departments(department_id),
    year          INTEGER NOT NULL,
    section       TEXT NOT NULL,
    batch_name    TEXT
);

-- Which faculty may run sessions for which subject.
CREATE TABLE IF NOT EXISTS faculty_subjects (
    faculty_id TEXT NOT NULL REFERENCES faculties(faculty_id) ON DELETE CASCADE,
    subject_id TEXT NOT NULL REFERENCES subjects(subject_id)  ON DELETE CASCADE,
    PRIMARY KEY (faculty_id, subject_id)
);

-- Which students may check in to sessions of which subject.
CREATE TABLE IF NOT EXISTS enrollments (
    student_id TEXT NOT NULL REFERENCES students(student_id) ON DELETE CASCADE,
    subject_id TEXT NOT NULL REFERENCES subjects(subject_id) ON DELETE CASCADE,
    PRIMARY KEY (student_id, subject_id)
);

-- Sessions keep their creator; a faculty member with sessions cannot be
-- deleted.
CREATE TABLE IF NOT EXISTS attendance_sessions (
    session_id   TEXT PRIMARY KEY,
    subject_id   TEXT NOT NULL REFERENCES subjects(subject_id) ON DELETE CASCADE,
    faculty_id   TEXT NOT NULL REFERENCES faculties(faculty_id),
    session_date TEXT NOT NULL,   -- YYYY-MM-DD, UTC calendar date
    start_time   TEXT NOT NULL,   -- HH:MM:SS, UTC
    end_time     TEXT,            -- HH:MM:SS, UTC; set on close
    session_code TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'closed'))
);

-- A code resolves to at most one open session.
CREATE UNIQUE INDEX IF NOT EXISTS sessions_open_code_idx
    ON attendance_sessions(session_code) WHERE status = 'open';
CREATE INDEX IF NOT EXISTS sessions_subject_date_idx
    ON attendance_sessions(subject_id, session_date);

-- One row per (session, student); rewritten in place on every mark.
CREATE TABLE IF NOT EXISTS attendance_records (
    session_id  TEXT NOT NULL REFERENCES attendance_sessions(session_id) ON DELETE CASCADE,
    student_id  TEXT NOT NULL REFERENCES students(student_id) ON DELETE CASCADE,
    status      TEXT NOT NULL CHECK (status IN ('present', 'absent', 'late')),
    attended_at TEXT,             -- ISO 8601 UTC; NULL for a hand-entered absence
    PRIMARY KEY (session_id, student_id)
);

CREATE INDEX IF NOT EXISTS records_student_idx ON attendance_records(student_id);

PRAGMA user_version = 1;
";
