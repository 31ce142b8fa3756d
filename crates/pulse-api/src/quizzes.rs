//! Handlers for `/quizzes` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/quizzes` | Active quizzes; students also get `attempted` / `last_score` |
//! | `POST`   | `/quizzes` | Teacher. Body: [`CreateBody`]; 201 |
//! | `GET`    | `/quizzes/{id}` | |
//! | `PUT`    | `/quizzes/{id}` | Owner. Body: [`QuizPatch`] |
//! | `DELETE` | `/quizzes/{id}` | Owner. Attempts are kept |
//! | `POST`   | `/quizzes/{id}/attempt` | Student. Body: [`AttemptBody`]; 201 |
//! | `GET`    | `/quizzes/{id}/attempts` | Teacher |
//! | `GET`    | `/quizzes/attempts/mine` | Student |

use std::collections::HashMap;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use pulse_core::{
  grading::{NewQuizAttempt, QuizAttempt, SubmittedAnswer, grade},
  quiz::{DEFAULT_DURATION_MINUTES, NewQuestion, NewQuiz, Quiz, QuizPatch},
  store::{AttemptQuery, RecordStore},
  user::Role,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  ApiState,
  caller::Caller,
  error::ApiError,
  extract::{JsonBody, PathParam},
};

async fn fetch_quiz<S>(store: &S, id: Uuid) -> Result<Quiz, ApiError>
where
  S: RecordStore,
{
  store
    .get_quiz(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| pulse_core::Error::QuizNotFound(id).into())
}

// ─── List / get ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct QuizListing {
  #[serde(flatten)]
  pub quiz:       Quiz,
  /// Student callers only.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub attempted:  Option<bool>,
  /// Percentage of the student's latest attempt, `null` if none.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_score: Option<Option<f64>>,
}

/// `GET /quizzes`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
) -> Result<Json<Vec<QuizListing>>, ApiError>
where
  S: RecordStore + 'static,
{
  let quizzes = state
    .store
    .list_quizzes(true)
    .await
    .map_err(ApiError::store)?;

  if !caller.0.is_student() {
    let listings = quizzes
      .into_iter()
      .map(|quiz| QuizListing { quiz, attempted: None, last_score: None })
      .collect();
    return Ok(Json(listings));
  }

  let query = AttemptQuery { student_id: Some(caller.id()), ..Default::default() };
  let attempts = state
    .store
    .list_attempts(&query)
    .await
    .map_err(ApiError::store)?;

  // Newest first, so the first attempt seen per quiz is the latest.
  let mut latest: HashMap<Uuid, f64> = HashMap::new();
  for attempt in &attempts {
    latest.entry(attempt.quiz_id).or_insert(attempt.percentage);
  }

  let listings = quizzes
    .into_iter()
    .map(|quiz| {
      let last = latest.get(&quiz.quiz_id).copied();
      QuizListing { quiz, attempted: Some(last.is_some()), last_score: Some(last) }
    })
    .collect();
  Ok(Json(listings))
}

/// `GET /quizzes/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  _caller: Caller,
  PathParam(id): PathParam<Uuid>,
) -> Result<Json<Quiz>, ApiError>
where
  S: RecordStore + 'static,
{
  Ok(Json(fetch_quiz(state.store.as_ref(), id).await?))
}

// ─── Create / update / delete ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:            String,
  #[serde(default)]
  pub description:      String,
  #[serde(default)]
  pub subject:          String,
  pub questions:        Vec<NewQuestion>,
  pub duration_minutes: Option<u32>,
}

/// `POST /quizzes`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + 'static,
{
  let teacher = caller.require(Role::Teacher)?;
  let input = NewQuiz {
    title:            body.title,
    description:      body.description,
    subject:          body.subject,
    questions:        body.questions,
    duration_minutes: body.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
    created_by:       teacher.user_id,
  };
  input.validate()?;

  let quiz = state
    .store
    .create_quiz(input)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(quiz_id = %quiz.quiz_id, created_by = %quiz.created_by, "quiz created");
  Ok((StatusCode::CREATED, Json(quiz)))
}

/// `PUT /quizzes/{id}`
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  PathParam(id): PathParam<Uuid>,
  JsonBody(patch): JsonBody<QuizPatch>,
) -> Result<Json<Quiz>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require(Role::Teacher)?;
  let mut quiz = fetch_quiz(state.store.as_ref(), id).await?;
  quiz.ensure_owner(caller.id())?;
  quiz.apply(patch, Utc::now())?;

  let updated = state
    .store
    .update_quiz(&quiz)
    .await
    .map_err(ApiError::store)?;
  if !updated {
    return Err(pulse_core::Error::QuizNotFound(id).into());
  }

  tracing::info!(quiz_id = %id, "quiz updated");
  Ok(Json(quiz))
}

/// `DELETE /quizzes/{id}`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  PathParam(id): PathParam<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require(Role::Teacher)?;
  let quiz = fetch_quiz(state.store.as_ref(), id).await?;
  quiz.ensure_owner(caller.id())?;

  let deleted = state.store.delete_quiz(id).await.map_err(ApiError::store)?;
  if !deleted {
    return Err(pulse_core::Error::QuizNotFound(id).into());
  }

  tracing::info!(quiz_id = %id, "quiz deleted");
  Ok(Json(json!({ "success": true, "deleted": id })))
}

// ─── Attempts ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AttemptBody {
  pub answers:    Vec<SubmittedAnswer>,
  /// Seconds.
  #[serde(default)]
  pub time_taken: u32,
}

#[derive(Debug, Serialize)]
pub struct AttemptResult {
  pub attempt_id:      Uuid,
  pub score:           u32,
  pub percentage:      f64,
  pub correct_answers: usize,
  pub total_questions: usize,
}

/// `POST /quizzes/{id}/attempt`
pub async fn submit<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  PathParam(id): PathParam<Uuid>,
  JsonBody(body): JsonBody<AttemptBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + 'static,
{
  let student = caller.require(Role::Student)?;
  let quiz = fetch_quiz(state.store.as_ref(), id).await?;
  if !quiz.is_active {
    return Err(ApiError::BadRequest(format!("quiz {id} is not active")));
  }

  let graded = grade(&quiz, &body.answers)?;
  let attempt = state
    .store
    .record_attempt(NewQuizAttempt {
      quiz_id:    quiz.quiz_id,
      student_id: student.user_id,
      grade:      graded,
      time_taken: body.time_taken,
    })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(
    attempt_id = %attempt.attempt_id,
    quiz_id = %attempt.quiz_id,
    student_id = %attempt.student_id,
    score = attempt.score,
    percentage = attempt.percentage,
    "quiz attempt graded"
  );

  let result = AttemptResult {
    attempt_id:      attempt.attempt_id,
    score:           attempt.score,
    percentage:      attempt.percentage,
    correct_answers: attempt.correct_answers,
    total_questions: attempt.total_questions,
  };
  Ok((StatusCode::CREATED, Json(result)))
}

/// `GET /quizzes/attempts/mine`
pub async fn my_attempts<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
) -> Result<Json<Vec<QuizAttempt>>, ApiError>
where
  S: RecordStore + 'static,
{
  let student = caller.require(Role::Student)?;
  let query = AttemptQuery { student_id: Some(student.user_id), ..Default::default() };
  let attempts = state
    .store
    .list_attempts(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(attempts))
}

/// `GET /quizzes/{id}/attempts`
pub async fn quiz_attempts<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  PathParam(id): PathParam<Uuid>,
) -> Result<Json<Vec<QuizAttempt>>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require(Role::Teacher)?;
  let query = AttemptQuery { quiz_id: Some(id), ..Default::default() };
  let attempts = state
    .store
    .list_attempts(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(attempts))
}
