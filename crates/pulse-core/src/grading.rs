//! Quiz grading and the immutable attempt records it produces.
//!
//! Grading walks the quiz's questions, not the submission. Each question takes
//! the answer addressed to it by `question_id`, or failing that the answer at
//! the same position that names no question. A question left without an answer
//! is recorded as unanswered and earns nothing; surplus positional answers are
//! ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, quiz::Quiz};

/// One answer as submitted by a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
  /// The question this answers; when absent the answer pairs by position.
  #[serde(default)]
  pub question_id:     Option<Uuid>,
  /// Index of the chosen option.
  pub selected_answer: i64,
}

impl SubmittedAnswer {
  pub fn positional(selected_answer: i64) -> Self {
    Self { question_id: None, selected_answer }
  }

  pub fn for_question(question_id: Uuid, selected_answer: i64) -> Self {
    Self { question_id: Some(question_id), selected_answer }
  }
}

/// One graded answer within an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
  pub question_id:     Uuid,
  /// `None` when the question was left unanswered.
  pub selected_answer: Option<i64>,
  pub is_correct:      bool,
  pub points_earned:   u32,
}

/// The result of grading one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
  pub answers:         Vec<Answer>,
  pub score:           u32,
  /// `score / total_points * 100`; 0 for a quiz worth no points.
  pub percentage:      f64,
  pub correct_answers: usize,
  pub total_questions: usize,
}

/// Grade `submitted` against `quiz`.
///
/// Fails with [`Error::Validation`] if an answer names a question the quiz
/// does not have, or if two answers land on the same question.
pub fn grade(quiz: &Quiz, submitted: &[SubmittedAnswer]) -> Result<Grade> {
  let mut selected: Vec<Option<i64>> = vec![None; quiz.questions.len()];

  for (position, answer) in submitted.iter().enumerate() {
    let index = match answer.question_id {
      Some(id) => quiz
        .questions
        .iter()
        .position(|q| q.question_id == id)
        .ok_or_else(|| {
          Error::validation(format!("quiz {} has no question {id}", quiz.quiz_id))
        })?,
      None if position < selected.len() => position,
      None => continue,
    };

    if selected[index].is_some() {
      return Err(Error::validation(format!(
        "more than one answer for question {}",
        quiz.questions[index].question_id
      )));
    }
    selected[index] = Some(answer.selected_answer);
  }

  let answers: Vec<Answer> = quiz
    .questions
    .iter()
    .zip(selected)
    .map(|(question, selected_answer)| {
      let is_correct = selected_answer
        .and_then(|s| usize::try_from(s).ok())
        .is_some_and(|s| s == question.correct_answer);
      Answer {
        question_id: question.question_id,
        selected_answer,
        is_correct,
        points_earned: if is_correct { question.points } else { 0 },
      }
    })
    .collect();

  let score = answers
    .iter()
    .fold(0u32, |acc, a| acc.saturating_add(a.points_earned));
  let correct_answers = answers.iter().filter(|a| a.is_correct).count();

  Ok(Grade {
    answers,
    score,
    percentage: percentage(score, quiz.total_points),
    correct_answers,
    total_questions: quiz.questions.len(),
  })
}

/// `score / total * 100`, defined as 0 when `total` is 0.
pub fn percentage(score: u32, total: u32) -> f64 {
  if total == 0 {
    0.0
  } else {
    f64::from(score) / f64::from(total) * 100.0
  }
}

// ─── Attempts ────────────────────────────────────────────────────────────────

/// A stored, immutable graded submission. Every submission creates a new
/// attempt; earlier attempts are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
  pub attempt_id:      Uuid,
  pub quiz_id:         Uuid,
  pub student_id:      Uuid,
  pub answers:         Vec<Answer>,
  pub score:           u32,
  pub percentage:      f64,
  pub total_questions: usize,
  pub correct_answers: usize,
  /// Seconds the student spent on the attempt.
  pub time_taken:      u32,
  pub attempted_at:    DateTime<Utc>,
}

/// Input to [`crate::store::RecordStore::record_attempt`].
/// `attempted_at` is always set by the store.
#[derive(Debug, Clone)]
pub struct NewQuizAttempt {
  pub quiz_id:    Uuid,
  pub student_id: Uuid,
  pub grade:      Grade,
  pub time_taken: u32,
}
