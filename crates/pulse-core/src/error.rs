//! Error types for `pulse-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing or malformed input; rejected before touching the store.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("student not found: {0}")]
  StudentNotFound(Uuid),

  #[error("quiz not found: {0}")]
  QuizNotFound(Uuid),

  #[error("attendance record not found: {0}")]
  AttendanceNotFound(Uuid),

  /// A role or ownership check failed.
  #[error("forbidden: {0}")]
  Forbidden(String),
}

impl Error {
  pub(crate) fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
