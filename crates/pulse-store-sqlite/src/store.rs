//! [`SqliteStore`] — the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use pulse_core::{
  attendance::{AttendanceRecord, MarkAttendance, UpsertOutcome},
  grading::{NewQuizAttempt, QuizAttempt},
  health::{HealthSample, NewHealthSample},
  quiz::{NewQuiz, Quiz},
  store::{AttemptQuery, AttendanceQuery, HealthQuery, RecordStore},
  user::{NewUser, Role, User},
};

use crate::{
  Error, Result,
  encode::{
    ATTEMPT_COLUMNS, ATTENDANCE_COLUMNS, HEALTH_COLUMNS, QUIZ_COLUMNS, RawAttempt,
    RawAttendance, RawHealthSample, RawQuiz, RawUser, USER_COLUMNS, encode_count,
    encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Pulse record store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    input.validate()?;

    if let Some(child_id) = input.parent_of {
      match self.get_user(child_id).await? {
        Some(child) if child.is_student() => {}
        _ => return Err(pulse_core::Error::StudentNotFound(child_id).into()),
      }
    }

    let user = User {
      user_id:        Uuid::new_v4(),
      name:           input.name,
      email:          input.email,
      role:           input.role,
      parent_of:      input.parent_of,
      student_number: input.student_number,
      class_name:     input.class_name,
      created_at:     Utc::now(),
    };

    let id_str         = encode_uuid(user.user_id);
    let name           = user.name.clone();
    let email          = user.email.clone();
    let role_str       = user.role.as_ref().to_owned();
    let parent_of_str  = user.parent_of.map(encode_uuid);
    let student_number = user.student_number.clone();
    let class_name     = user.class_name.clone();
    let at_str         = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             user_id, name, email, role, parent_of,
             student_number, class_name, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            name,
            email,
            role_str,
            parent_of_str,
            student_number,
            class_name,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
    let role_str = role.map(|r| r.as_ref().to_owned());

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users
           WHERE (?1 IS NULL OR role = ?1)
           ORDER BY name, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![role_str], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn upsert_attendance(
    &self,
    input: MarkAttendance,
  ) -> Result<(AttendanceRecord, UpsertOutcome)> {
    let new_id = Uuid::new_v4();

    let id_str         = encode_uuid(new_id);
    let student_id_str = encode_uuid(input.student_id);
    let teacher_id_str = encode_uuid(input.teacher_id);
    let date_str       = encode_date(input.date);
    let status_str     = input.status.as_ref().to_owned();
    let at_str         = encode_dt(Utc::now());
    let subject        = input.subject;
    let notes          = input.notes;

    // A single statement: concurrent marks of the same slot cannot both
    // insert.
    let raw: RawAttendance = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "INSERT INTO attendance (
               attendance_id, student_id, teacher_id, date, subject,
               status, notes, marked_at, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT (student_id, date, subject) DO UPDATE SET
               teacher_id = excluded.teacher_id,
               status     = excluded.status,
               notes      = excluded.notes,
               marked_at  = excluded.marked_at
             RETURNING {ATTENDANCE_COLUMNS}"
          ),
          rusqlite::params![
            id_str,
            student_id_str,
            teacher_id_str,
            date_str,
            subject,
            status_str,
            notes,
            at_str,
          ],
          RawAttendance::from_row,
        )?)
      })
      .await?;

    let record = raw.into_record()?;
    let outcome = if record.attendance_id == new_id {
      UpsertOutcome::Created
    } else {
      UpsertOutcome::Updated
    };
    Ok((record, outcome))
  }

  async fn get_attendance(&self, id: Uuid) -> Result<Option<AttendanceRecord>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAttendance> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE attendance_id = ?1"),
            rusqlite::params![id_str],
            RawAttendance::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAttendance::into_record).transpose()
  }

  async fn list_attendance(&self, query: &AttendanceQuery) -> Result<Vec<AttendanceRecord>> {
    let student_id_str = query.student_id.map(encode_uuid);
    let date_str       = query.date.map(encode_date);
    let start_str      = query.range.start.map(encode_date);
    let end_str        = query.range.end.map(encode_date);
    let subject        = query.subject.clone();

    let raws: Vec<RawAttendance> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTENDANCE_COLUMNS} FROM attendance
           WHERE (?1 IS NULL OR student_id = ?1)
             AND (?2 IS NULL OR date = ?2)
             AND (?3 IS NULL OR date >= ?3)
             AND (?4 IS NULL OR date <= ?4)
             AND (?5 IS NULL OR subject = ?5)
           ORDER BY date DESC, marked_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![student_id_str, date_str, start_str, end_str, subject],
            RawAttendance::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttendance::into_record).collect()
  }

  async fn delete_attendance(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM attendance WHERE attendance_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Health — append-only ──────────────────────────────────────────────────

  async fn record_health(&self, input: NewHealthSample) -> Result<HealthSample> {
    input.validate()?;

    let sample = HealthSample {
      sample_id:      Uuid::new_v4(),
      student_id:     input.student_id,
      heart_rate:     input.heart_rate,
      sleep_hours:    input.sleep_hours,
      stress_level:   input.stress_level,
      activity_level: input.activity_level,
      mood:           input.mood,
      notes:          input.notes,
      recorded_at:    Utc::now(),
    };

    let id_str         = encode_uuid(sample.sample_id);
    let student_id_str = encode_uuid(sample.student_id);
    let heart_rate     = i64::from(sample.heart_rate);
    let sleep_hours    = sample.sleep_hours;
    let stress_level   = i64::from(sample.stress_level);
    let activity_str   = sample.activity_level.as_ref().to_owned();
    let mood_str       = sample.mood.as_ref().to_owned();
    let notes          = sample.notes.clone();
    let at_str         = encode_dt(sample.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO health_samples (
             sample_id, student_id, heart_rate, sleep_hours, stress_level,
             activity_level, mood, notes, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            student_id_str,
            heart_rate,
            sleep_hours,
            stress_level,
            activity_str,
            mood_str,
            notes,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(sample)
  }

  async fn list_health(&self, query: &HealthQuery) -> Result<Vec<HealthSample>> {
    let student_id_str = query.student_id.map(encode_uuid);
    let since_str      = query.since.map(encode_dt);
    let limit_val      = query.limit.map_or(-1, encode_count);

    let raws: Vec<RawHealthSample> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {HEALTH_COLUMNS} FROM health_samples
           WHERE (?1 IS NULL OR student_id = ?1)
             AND (?2 IS NULL OR recorded_at >= ?2)
           ORDER BY recorded_at DESC, rowid DESC
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![student_id_str, since_str, limit_val],
            RawHealthSample::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHealthSample::into_sample).collect()
  }

  // ── Quizzes ───────────────────────────────────────────────────────────────

  async fn create_quiz(&self, input: NewQuiz) -> Result<Quiz> {
    input.validate()?;
    let quiz = input.into_quiz(Uuid::new_v4(), Utc::now());

    let id_str         = encode_uuid(quiz.quiz_id);
    let title          = quiz.title.clone();
    let description    = quiz.description.clone();
    let subject        = quiz.subject.clone();
    let questions_json = serde_json::to_string(&quiz.questions)?;
    let duration       = i64::from(quiz.duration_minutes);
    let total_points   = i64::from(quiz.total_points);
    let created_by_str = encode_uuid(quiz.created_by);
    let is_active      = quiz.is_active;
    let created_str    = encode_dt(quiz.created_at);
    let updated_str    = encode_dt(quiz.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO quizzes (
             quiz_id, title, description, subject, questions,
             duration_minutes, total_points, created_by, is_active,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id_str,
            title,
            description,
            subject,
            questions_json,
            duration,
            total_points,
            created_by_str,
            is_active,
            created_str,
            updated_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(quiz)
  }

  async fn get_quiz(&self, id: Uuid) -> Result<Option<Quiz>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawQuiz> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE quiz_id = ?1"),
            rusqlite::params![id_str],
            RawQuiz::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawQuiz::into_quiz).transpose()
  }

  async fn list_quizzes(&self, active_only: bool) -> Result<Vec<Quiz>> {
    let raws: Vec<RawQuiz> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {QUIZ_COLUMNS} FROM quizzes
           WHERE (?1 = 0 OR is_active = 1)
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![active_only], RawQuiz::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQuiz::into_quiz).collect()
  }

  async fn update_quiz(&self, quiz: &Quiz) -> Result<bool> {
    let id_str         = encode_uuid(quiz.quiz_id);
    let title          = quiz.title.clone();
    let description    = quiz.description.clone();
    let subject        = quiz.subject.clone();
    let questions_json = serde_json::to_string(&quiz.questions)?;
    let duration       = i64::from(quiz.duration_minutes);
    let total_points   = i64::from(quiz.total_points);
    let is_active      = quiz.is_active;
    let updated_str    = encode_dt(quiz.updated_at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE quizzes SET
             title            = ?2,
             description      = ?3,
             subject          = ?4,
             questions        = ?5,
             duration_minutes = ?6,
             total_points     = ?7,
             is_active        = ?8,
             updated_at       = ?9
           WHERE quiz_id = ?1",
          rusqlite::params![
            id_str,
            title,
            description,
            subject,
            questions_json,
            duration,
            total_points,
            is_active,
            updated_str,
          ],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn delete_quiz(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM quizzes WHERE quiz_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Attempts — append-only ────────────────────────────────────────────────

  async fn record_attempt(&self, input: NewQuizAttempt) -> Result<QuizAttempt> {
    let grade = input.grade;
    let attempt = QuizAttempt {
      attempt_id:      Uuid::new_v4(),
      quiz_id:         input.quiz_id,
      student_id:      input.student_id,
      answers:         grade.answers,
      score:           grade.score,
      percentage:      grade.percentage,
      total_questions: grade.total_questions,
      correct_answers: grade.correct_answers,
      time_taken:      input.time_taken,
      attempted_at:    Utc::now(),
    };

    let id_str          = encode_uuid(attempt.attempt_id);
    let quiz_id_str     = encode_uuid(attempt.quiz_id);
    let student_id_str  = encode_uuid(attempt.student_id);
    let answers_json    = serde_json::to_string(&attempt.answers)?;
    let score           = i64::from(attempt.score);
    let percentage      = attempt.percentage;
    let total_questions = encode_count(attempt.total_questions);
    let correct_answers = encode_count(attempt.correct_answers);
    let time_taken      = i64::from(attempt.time_taken);
    let at_str          = encode_dt(attempt.attempted_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO quiz_attempts (
             attempt_id, quiz_id, student_id, answers, score, percentage,
             total_questions, correct_answers, time_taken, attempted_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str,
            quiz_id_str,
            student_id_str,
            answers_json,
            score,
            percentage,
            total_questions,
            correct_answers,
            time_taken,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(attempt)
  }

  async fn list_attempts(&self, query: &AttemptQuery) -> Result<Vec<QuizAttempt>> {
    let student_id_str = query.student_id.map(encode_uuid);
    let quiz_id_str    = query.quiz_id.map(encode_uuid);
    let limit_val      = query.limit.map_or(-1, encode_count);

    let raws: Vec<RawAttempt> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts
           WHERE (?1 IS NULL OR student_id = ?1)
             AND (?2 IS NULL OR quiz_id = ?2)
           ORDER BY attempted_at DESC, rowid DESC
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![student_id_str, quiz_id_str, limit_val],
            RawAttempt::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttempt::into_attempt).collect()
  }
}
