//! SQL schema for the Pulse SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id        TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    email          TEXT NOT NULL UNIQUE,
    role           TEXT NOT NULL,   -- 'student' | 'teacher' | 'parent'
    parent_of      TEXT REFERENCES users(user_id),
    student_number TEXT,
    class_name     TEXT,
    created_at     TEXT NOT NULL
);

-- One row per slot; re-marking updates the row in place.
CREATE TABLE IF NOT EXISTS attendance (
    attendance_id TEXT PRIMARY KEY,
    student_id    TEXT NOT NULL REFERENCES users(user_id),
    teacher_id    TEXT NOT NULL REFERENCES users(user_id),
    date          TEXT NOT NULL,   -- YYYY-MM-DD
    subject       TEXT NOT NULL DEFAULT 'General',
    status        TEXT NOT NULL,   -- 'present' | 'absent' | 'late' | 'excused'
    notes         TEXT NOT NULL DEFAULT '',
    marked_at     TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    UNIQUE (student_id, date, subject)
);

-- Append-only.
CREATE TABLE IF NOT EXISTS health_samples (
    sample_id      TEXT PRIMARY KEY,
    student_id     TEXT NOT NULL REFERENCES users(user_id),
    heart_rate     INTEGER NOT NULL CHECK (heart_rate BETWEEN 40 AND 200),
    sleep_hours    REAL NOT NULL    CHECK (sleep_hours BETWEEN 0 AND 24),
    stress_level   INTEGER NOT NULL CHECK (stress_level BETWEEN 0 AND 10),
    activity_level TEXT NOT NULL DEFAULT 'moderate',
    mood           TEXT NOT NULL DEFAULT 'neutral',
    notes          TEXT NOT NULL DEFAULT '',
    recorded_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS quizzes (
    quiz_id          TEXT PRIMARY KEY,
    title            TEXT NOT NULL,
    description      TEXT NOT NULL DEFAULT '',
    subject          TEXT NOT NULL DEFAULT '',
    questions        TEXT NOT NULL,   -- JSON array of questions
    duration_minutes INTEGER NOT NULL,
    total_points     INTEGER NOT NULL,
    created_by       TEXT NOT NULL REFERENCES users(user_id),
    is_active        INTEGER NOT NULL DEFAULT 1,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

-- Append-only. No foreign key on quiz_id: attempts outlive deleted quizzes.
CREATE TABLE IF NOT EXISTS quiz_attempts (
    attempt_id      TEXT PRIMARY KEY,
    quiz_id         TEXT NOT NULL,
    student_id      TEXT NOT NULL REFERENCES users(user_id),
    answers         TEXT NOT NULL,   -- JSON array of graded answers
    score           INTEGER NOT NULL,
    percentage      REAL NOT NULL,
    total_questions INTEGER NOT NULL,
    correct_answers INTEGER NOT NULL,
    time_taken      INTEGER NOT NULL DEFAULT 0,
    attempted_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS users_role_idx              ON users(role);
CREATE INDEX IF NOT EXISTS attendance_student_date_idx ON attendance(student_id, date);
CREATE INDEX IF NOT EXISTS attendance_teacher_date_idx ON attendance(teacher_id, date);
CREATE INDEX IF NOT EXISTS attendance_date_idx         ON attendance(date);
CREATE INDEX IF NOT EXISTS health_student_time_idx     ON health_samples(student_id, recorded_at DESC);
CREATE INDEX IF NOT EXISTS attempts_student_quiz_idx   ON quiz_attempts(student_id, quiz_id);
CREATE INDEX IF NOT EXISTS attempts_time_idx           ON quiz_attempts(attempted_at DESC);

PRAGMA user_version = 1;
";
