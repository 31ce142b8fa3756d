//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with microsecond precision and a
//! `Z` suffix, so lexical order equals chronological order. Calendar days are
//! `YYYY-MM-DD`. Enums are stored by their lowercase name. Quiz questions and
//! graded answers are stored as compact JSON.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use pulse_core::{
  attendance::AttendanceRecord,
  grading::{Answer, QuizAttempt},
  health::HealthSample,
  quiz::{Question, Quiz},
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

/// Parse a lowercase enum name read from `column`.
pub fn decode_enum<T: FromStr>(column: &'static str, s: String) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownVariant { column, value: s })
}

/// Narrow an SQLite integer read from `column`.
pub fn decode_int<T: TryFrom<i64>>(column: &'static str, value: i64) -> Result<T> {
  T::try_from(value).map_err(|_| Error::OutOfRange { column, value })
}

/// Widen a count for storage or a `LIMIT` clause.
pub fn encode_count(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, name, email, role, parent_of, \
                                student_number, class_name, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:        String,
  pub name:           String,
  pub email:          String,
  pub role:           String,
  pub parent_of:      Option<String>,
  pub student_number: Option<String>,
  pub class_name:     Option<String>,
  pub created_at:     String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:        row.get(0)?,
      name:           row.get(1)?,
      email:          row.get(2)?,
      role:           row.get(3)?,
      parent_of:      row.get(4)?,
      student_number: row.get(5)?,
      class_name:     row.get(6)?,
      created_at:     row.get(7)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:        decode_uuid(&self.user_id)?,
      name:           self.name,
      email:          self.email,
      role:           decode_enum("role", self.role)?,
      parent_of:      self.parent_of.as_deref().map(decode_uuid).transpose()?,
      student_number: self.student_number,
      class_name:     self.class_name,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub const ATTENDANCE_COLUMNS: &str = "attendance_id, student_id, teacher_id, date, \
                                      subject, status, notes, marked_at, created_at";

/// Raw values read directly from an `attendance` row.
pub struct RawAttendance {
  pub attendance_id: String,
  pub student_id:    String,
  pub teacher_id:    String,
  pub date:          String,
  pub subject:       String,
  pub status:        String,
  pub notes:         String,
  pub marked_at:     String,
  pub created_at:    String,
}

impl RawAttendance {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      attendance_id: row.get(0)?,
      student_id:    row.get(1)?,
      teacher_id:    row.get(2)?,
      date:          row.get(3)?,
      subject:       row.get(4)?,
      status:        row.get(5)?,
      notes:         row.get(6)?,
      marked_at:     row.get(7)?,
      created_at:    row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      attendance_id: decode_uuid(&self.attendance_id)?,
      student_id:    decode_uuid(&self.student_id)?,
      teacher_id:    decode_uuid(&self.teacher_id)?,
      date:          decode_date(&self.date)?,
      subject:       self.subject,
      status:        decode_enum("status", self.status)?,
      notes:         self.notes,
      marked_at:     decode_dt(&self.marked_at)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const HEALTH_COLUMNS: &str = "sample_id, student_id, heart_rate, sleep_hours, \
                                  stress_level, activity_level, mood, notes, recorded_at";

/// Raw values read directly from a `health_samples` row.
pub struct RawHealthSample {
  pub sample_id:      String,
  pub student_id:     String,
  pub heart_rate:     i64,
  pub sleep_hours:    f64,
  pub stress_level:   i64,
  pub activity_level: String,
  pub mood:           String,
  pub notes:          String,
  pub recorded_at:    String,
}

impl RawHealthSample {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      sample_id:      row.get(0)?,
      student_id:     row.get(1)?,
      heart_rate:     row.get(2)?,
      sleep_hours:    row.get(3)?,
      stress_level:   row.get(4)?,
      activity_level: row.get(5)?,
      mood:           row.get(6)?,
      notes:          row.get(7)?,
      recorded_at:    row.get(8)?,
    })
  }

  pub fn into_sample(self) -> Result<HealthSample> {
    Ok(HealthSample {
      sample_id:      decode_uuid(&self.sample_id)?,
      student_id:     decode_uuid(&self.student_id)?,
      heart_rate:     decode_int("heart_rate", self.heart_rate)?,
      sleep_hours:    self.sleep_hours,
      stress_level:   decode_int("stress_level", self.stress_level)?,
      activity_level: decode_enum("activity_level", self.activity_level)?,
      mood:           decode_enum("mood", self.mood)?,
      notes:          self.notes,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}

pub const QUIZ_COLUMNS: &str = "quiz_id, title, description, subject, questions, \
                                duration_minutes, total_points, created_by, is_active, \
                                created_at, updated_at";

/// Raw values read directly from a `quizzes` row.
pub struct RawQuiz {
  pub quiz_id:          String,
  pub title:            String,
  pub description:      String,
  pub subject:          String,
  pub questions:        String,
  pub duration_minutes: i64,
  pub total_points:     i64,
  pub created_by:       String,
  pub is_active:        bool,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawQuiz {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      quiz_id:          row.get(0)?,
      title:            row.get(1)?,
      description:      row.get(2)?,
      subject:          row.get(3)?,
      questions:        row.get(4)?,
      duration_minutes: row.get(5)?,
      total_points:     row.get(6)?,
      created_by:       row.get(7)?,
      is_active:        row.get(8)?,
      created_at:       row.get(9)?,
      updated_at:       row.get(10)?,
    })
  }

  pub fn into_quiz(self) -> Result<Quiz> {
    let questions: Vec<Question> = serde_json::from_str(&self.questions)?;
    Ok(Quiz {
      quiz_id:          decode_uuid(&self.quiz_id)?,
      title:            self.title,
      description:      self.description,
      subject:          self.subject,
      questions,
      duration_minutes: decode_int("duration_minutes", self.duration_minutes)?,
      total_points:     decode_int("total_points", self.total_points)?,
      created_by:       decode_uuid(&self.created_by)?,
      is_active:        self.is_active,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

pub const ATTEMPT_COLUMNS: &str = "attempt_id, quiz_id, student_id, answers, score, \
                                   percentage, total_questions, correct_answers, \
                                   time_taken, attempted_at";

/// Raw values read directly from a `quiz_attempts` row.
pub struct RawAttempt {
  pub attempt_id:      String,
  pub quiz_id:         String,
  pub student_id:      String,
  pub answers:         String,
  pub score:           i64,
  pub percentage:      f64,
  pub total_questions: i64,
  pub correct_answers: i64,
  pub time_taken:      i64,
  pub attempted_at:    String,
}

impl RawAttempt {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      attempt_id:      row.get(0)?,
      quiz_id:         row.get(1)?,
      student_id:      row.get(2)?,
      answers:         row.get(3)?,
      score:           row.get(4)?,
      percentage:      row.get(5)?,
      total_questions: row.get(6)?,
      correct_answers: row.get(7)?,
      time_taken:      row.get(8)?,
      attempted_at:    row.get(9)?,
    })
  }

  pub fn into_attempt(self) -> Result<QuizAttempt> {
    let answers: Vec<Answer> = serde_json::from_str(&self.answers)?;
    Ok(QuizAttempt {
      attempt_id:      decode_uuid(&self.attempt_id)?,
      quiz_id:         decode_uuid(&self.quiz_id)?,
      student_id:      decode_uuid(&self.student_id)?,
      answers,
      score:           decode_int("score", self.score)?,
      percentage:      self.percentage,
      total_questions: decode_int("total_questions", self.total_questions)?,
      correct_answers: decode_int("correct_answers", self.correct_answers)?,
      time_taken:      decode_int("time_taken", self.time_taken)?,
      attempted_at:    decode_dt(&self.attempted_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use pulse_core::user::Role;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let early = "2024-03-01T08:00:00Z".parse::<DateTime<Utc>>().unwrap();
    let late = early + chrono::Duration::microseconds(1500);
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }

  #[test]
  fn dates_are_iso_days() {
    let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    assert_eq!(encode_date(d), "2024-01-05");
    assert!(decode_date("05/01/2024").is_err());
  }

  #[test]
  fn unknown_enum_names_the_column() {
    let err = decode_enum::<Role>("role", "admin".into()).unwrap_err();
    assert!(matches!(err, Error::UnknownVariant { column: "role", .. }));
    assert_eq!(decode_enum::<Role>("role", "parent".into()).unwrap(), Role::Parent);
  }

  #[test]
  fn out_of_range_integers_are_rejected() {
    assert!(matches!(
      decode_int::<u8>("stress_level", 300),
      Err(Error::OutOfRange { column: "stress_level", value: 300 })
    ));
    assert_eq!(decode_int::<u16>("heart_rate", 72).unwrap(), 72);
  }
}
