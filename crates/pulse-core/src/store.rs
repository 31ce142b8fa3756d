//! The `RecordStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `pulse-store-sqlite`).
//! Higher layers (`pulse-api`, `pulse-server`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  attendance::{AttendanceRecord, DateRange, MarkAttendance, UpsertOutcome},
  grading::{NewQuizAttempt, QuizAttempt},
  health::{HealthSample, NewHealthSample},
  quiz::{NewQuiz, Quiz},
  user::{NewUser, Role, User},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`RecordStore::list_attendance`]. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct AttendanceQuery {
  pub student_id: Option<Uuid>,
  /// Exact day; combined with `range` if both are set.
  pub date:       Option<NaiveDate>,
  pub range:      DateRange,
  pub subject:    Option<String>,
}

/// Parameters for [`RecordStore::list_health`]. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct HealthQuery {
  pub student_id: Option<Uuid>,
  /// Only samples recorded at or after this instant.
  pub since:      Option<DateTime<Utc>>,
  pub limit:      Option<usize>,
}

impl HealthQuery {
  /// The newest `limit` samples of one student.
  pub fn latest(student_id: Uuid, limit: usize) -> Self {
    Self { student_id: Some(student_id), since: None, limit: Some(limit) }
  }
}

/// Parameters for [`RecordStore::list_attempts`]. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct AttemptQuery {
  pub student_id: Option<Uuid>,
  pub quiz_id:    Option<Uuid>,
  pub limit:      Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the Pulse record store.
///
/// Health samples and quiz attempts are append-only. Attendance records are
/// unique per slot `(student, date, subject)` and are written through a single
/// atomic upsert.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create and persist a user.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by id. Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// List users ordered by name, optionally filtered by role.
  fn list_users(
    &self,
    role: Option<Role>,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  // ── Attendance ────────────────────────────────────────────────────────

  /// Create the record for the mark's slot, or overwrite status, notes,
  /// teacher and `marked_at` of the existing one, in one atomic write.
  fn upsert_attendance(
    &self,
    input: MarkAttendance,
  ) -> impl Future<Output = Result<(AttendanceRecord, UpsertOutcome), Self::Error>>
  + Send
  + '_;

  fn get_attendance(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Records matching `query`, newest day first.
  fn list_attendance<'a>(
    &'a self,
    query: &'a AttendanceQuery,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + 'a;

  /// Delete a record. Returns `false` if it did not exist.
  fn delete_attendance(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Health ────────────────────────────────────────────────────────────

  /// Append a sample. `recorded_at` is set by the store.
  fn record_health(
    &self,
    input: NewHealthSample,
  ) -> impl Future<Output = Result<HealthSample, Self::Error>> + Send + '_;

  fn list_health<'a>(
    &'a self,
    query: &'a HealthQuery,
  ) -> impl Future<Output = Result<Vec<HealthSample>, Self::Error>> + Send + 'a;

  // ── Quizzes ───────────────────────────────────────────────────────────

  fn create_quiz(
    &self,
    input: NewQuiz,
  ) -> impl Future<Output = Result<Quiz, Self::Error>> + Send + '_;

  fn get_quiz(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Quiz>, Self::Error>> + Send + '_;

  /// Quizzes newest first; `active_only` hides deactivated ones.
  fn list_quizzes(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<Quiz>, Self::Error>> + Send + '_;

  /// Persist every mutable field of `quiz`. Returns `false` if the quiz no
  /// longer exists.
  fn update_quiz<'a>(
    &'a self,
    quiz: &'a Quiz,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Delete a quiz. Its attempts are kept. Returns `false` if it did not
  /// exist.
  fn delete_quiz(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Attempts ──────────────────────────────────────────────────────────

  /// Append a graded attempt. `attempted_at` is set by the store.
  fn record_attempt(
    &self,
    input: NewQuizAttempt,
  ) -> impl Future<Output = Result<QuizAttempt, Self::Error>> + Send + '_;

  fn list_attempts<'a>(
    &'a self,
    query: &'a AttemptQuery,
  ) -> impl Future<Output = Result<Vec<QuizAttempt>, Self::Error>> + Send + 'a;
}
