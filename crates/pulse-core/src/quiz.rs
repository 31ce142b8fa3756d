//! Quiz definitions. Attempts and grading live in [`crate::grading`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const DEFAULT_DURATION_MINUTES: u32 = 30;
pub const DEFAULT_QUESTION_POINTS: u32 = 1;

/// A multiple-choice question. `correct_answer` indexes into `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  pub question_id:    Uuid,
  pub text:           String,
  pub options:        Vec<String>,
  pub correct_answer: usize,
  pub points:         u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
  pub quiz_id:          Uuid,
  pub title:            String,
  pub description:      String,
  pub subject:          String,
  /// Order matters: positional answers pair with questions by index.
  pub questions:        Vec<Question>,
  pub duration_minutes: u32,
  /// Always the sum of the questions' points.
  pub total_points:     u32,
  pub created_by:       Uuid,
  pub is_active:        bool,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

impl Quiz {
  /// Only the teacher who created a quiz may change or delete it.
  pub fn ensure_owner(&self, actor_id: Uuid) -> Result<()> {
    if self.created_by == actor_id {
      Ok(())
    } else {
      Err(Error::Forbidden(format!(
        "quiz {} belongs to another teacher",
        self.quiz_id
      )))
    }
  }

  /// Apply a partial update. Replaced questions get fresh ids and
  /// `total_points` is recomputed.
  pub fn apply(&mut self, patch: QuizPatch, now: DateTime<Utc>) -> Result<()> {
    patch.validate()?;
    if let Some(title) = patch.title {
      self.title = title;
    }
    if let Some(description) = patch.description {
      self.description = description;
    }
    if let Some(subject) = patch.subject {
      self.subject = subject;
    }
    if let Some(questions) = patch.questions {
      self.questions = questions.into_iter().map(NewQuestion::into_question).collect();
      self.total_points = total_points(&self.questions);
    }
    if let Some(duration) = patch.duration_minutes {
      self.duration_minutes = duration;
    }
    if let Some(active) = patch.is_active {
      self.is_active = active;
    }
    self.updated_at = now;
    Ok(())
  }
}

pub fn total_points(questions: &[Question]) -> u32 {
  questions.iter().fold(0u32, |acc, q| acc.saturating_add(q.points))
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
  pub text:           String,
  pub options:        Vec<String>,
  pub correct_answer: usize,
  #[serde(default = "default_points")]
  pub points:         u32,
}

fn default_points() -> u32 { DEFAULT_QUESTION_POINTS }

impl NewQuestion {
  pub fn into_question(self) -> Question {
    Question {
      question_id:    Uuid::new_v4(),
      text:           self.text,
      options:        self.options,
      correct_answer: self.correct_answer,
      points:         self.points,
    }
  }

  fn validate(&self, index: usize) -> Result<()> {
    if self.text.trim().is_empty() {
      return Err(Error::validation(format!("question {index} has no text")));
    }
    if self.options.len() < 2 {
      return Err(Error::validation(format!(
        "question {index} needs at least two options"
      )));
    }
    if self.correct_answer >= self.options.len() {
      return Err(Error::validation(format!(
        "question {index}: correct_answer {} is not one of its {} options",
        self.correct_answer,
        self.options.len()
      )));
    }
    Ok(())
  }
}

fn validate_questions(questions: &[NewQuestion]) -> Result<()> {
  questions
    .iter()
    .enumerate()
    .try_for_each(|(i, q)| q.validate(i))?;

  // Totals and scores are stored as u32.
  questions
    .iter()
    .try_fold(0u32, |acc, q| acc.checked_add(q.points))
    .map(|_| ())
    .ok_or_else(|| Error::validation("total points overflow"))
}

/// Input to [`crate::store::RecordStore::create_quiz`].
#[derive(Debug, Clone)]
pub struct NewQuiz {
  pub title:            String,
  pub description:      String,
  pub subject:          String,
  pub questions:        Vec<NewQuestion>,
  pub duration_minutes: u32,
  pub created_by:       Uuid,
}

impl NewQuiz {
  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::validation("quiz title must not be empty"));
    }
    validate_questions(&self.questions)
  }

  /// Materialise the quiz with server-assigned ids and timestamps.
  pub fn into_quiz(self, quiz_id: Uuid, now: DateTime<Utc>) -> Quiz {
    let questions: Vec<Question> =
      self.questions.into_iter().map(NewQuestion::into_question).collect();
    Quiz {
      quiz_id,
      title: self.title,
      description: self.description,
      subject: self.subject,
      total_points: total_points(&questions),
      questions,
      duration_minutes: self.duration_minutes,
      created_by: self.created_by,
      is_active: true,
      created_at: now,
      updated_at: now,
    }
  }
}

/// A partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizPatch {
  pub title:            Option<String>,
  pub description:      Option<String>,
  pub subject:          Option<String>,
  pub questions:        Option<Vec<NewQuestion>>,
  pub duration_minutes: Option<u32>,
  pub is_active:        Option<bool>,
}

impl QuizPatch {
  pub fn validate(&self) -> Result<()> {
    if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
      return Err(Error::validation("quiz title must not be empty"));
    }
    match &self.questions {
      Some(questions) => validate_questions(questions),
      None => Ok(()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn question(correct: usize, points: u32) -> NewQuestion {
    NewQuestion {
      text: "Pick one".into(),
      options: vec!["a".into(), "b".into(), "c".into()],
      correct_answer: correct,
      points,
    }
  }

  fn new_quiz(owner: Uuid) -> NewQuiz {
    NewQuiz {
      title: "Fractions".into(),
      description: String::new(),
      subject: "Math".into(),
      questions: vec![question(1, 10), question(0, 5)],
      duration_minutes: DEFAULT_DURATION_MINUTES,
      created_by: owner,
    }
  }

  #[test]
  fn total_points_is_sum_of_questions() {
    let quiz = new_quiz(Uuid::new_v4()).into_quiz(Uuid::new_v4(), Utc::now());
    assert_eq!(quiz.total_points, 15);
    assert!(quiz.is_active);
    assert_ne!(quiz.questions[0].question_id, quiz.questions[1].question_id);
  }

  #[test]
  fn correct_answer_must_index_an_option() {
    let mut input = new_quiz(Uuid::new_v4());
    input.questions.push(question(3, 1));
    assert!(matches!(input.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn blank_title_is_rejected() {
    let mut input = new_quiz(Uuid::new_v4());
    input.title = "  ".into();
    assert!(input.validate().is_err());
  }

  #[test]
  fn only_owner_passes_ownership_check() {
    let owner = Uuid::new_v4();
    let quiz = new_quiz(owner).into_quiz(Uuid::new_v4(), Utc::now());
    assert!(quiz.ensure_owner(owner).is_ok());
    assert!(matches!(
      quiz.ensure_owner(Uuid::new_v4()),
      Err(Error::Forbidden(_))
    ));
  }

  #[test]
  fn patch_replaces_questions_and_recomputes_points() {
    let mut quiz = new_quiz(Uuid::new_v4()).into_quiz(Uuid::new_v4(), Utc::now());
    let patch = QuizPatch {
      questions: Some(vec![question(2, 4)]),
      is_active: Some(false),
      ..Default::default()
    };
    quiz.apply(patch, Utc::now()).unwrap();
    assert_eq!(quiz.questions.len(), 1);
    assert_eq!(quiz.total_points, 4);
    assert!(!quiz.is_active);
    assert_eq!(quiz.title, "Fractions");
  }

  #[test]
  fn invalid_patch_leaves_quiz_untouched() {
    let mut quiz = new_quiz(Uuid::new_v4()).into_quiz(Uuid::new_v4(), Utc::now());
    let before = quiz.clone();
    let patch = QuizPatch { title: Some(String::new()), ..Default::default() };
    assert!(quiz.apply(patch, Utc::now()).is_err());
    assert_eq!(quiz, before);
  }

  #[test]
  fn points_that_overflow_the_total_are_rejected() {
    let mut input = new_quiz(Uuid::new_v4());
    input.questions = vec![question(0, u32::MAX), question(1, 1)];
    assert!(matches!(input.validate(), Err(Error::Validation(_))));

    let mut quiz = new_quiz(Uuid::new_v4()).into_quiz(Uuid::new_v4(), Utc::now());
    let patch = QuizPatch {
      questions: Some(vec![question(0, u32::MAX), question(1, 1)]),
      ..Default::default()
    };
    assert!(quiz.apply(patch, Utc::now()).is_err());
    assert_eq!(quiz.total_points, 15);
  }

  #[test]
  fn largest_representable_total_is_accepted() {
    let mut input = new_quiz(Uuid::new_v4());
    input.questions = vec![question(0, u32::MAX - 1), question(1, 1)];
    assert!(input.validate().is_ok());
    let quiz = input.into_quiz(Uuid::new_v4(), Utc::now());
    assert_eq!(quiz.total_points, u32::MAX);
  }

  #[test]
  fn question_points_default_to_one() {
    let q: NewQuestion = serde_json::from_str(
      r#"{"text":"2+2?","options":["3","4"],"correct_answer":1}"#,
    )
    .unwrap();
    assert_eq!(q.points, DEFAULT_QUESTION_POINTS);
  }
}
