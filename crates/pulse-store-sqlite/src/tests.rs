//! Integration tests for `SqliteStore` against an in-memory database.

use std::time::Duration;

use chrono::NaiveDate;
use pulse_core::{
  attendance::{AttendanceStatus, DateRange, MarkAttendance, UpsertOutcome},
  grading::{NewQuizAttempt, SubmittedAnswer, grade},
  health::{ActivityLevel, Mood, NewHealthSample},
  quiz::{NewQuestion, NewQuiz, QuizPatch},
  store::{AttemptQuery, AttendanceQuery, HealthQuery, RecordStore},
  user::{NewUser, Role, User},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, name: &str, role: Role) -> User {
  let email = format!("{}@school.test", name.to_lowercase());
  s.add_user(NewUser::new(name, email, role)).await.unwrap()
}

fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, d).unwrap() }

fn mark(
  student: &User,
  teacher: &User,
  date: NaiveDate,
  subject: Option<&str>,
  status: AttendanceStatus,
) -> MarkAttendance {
  MarkAttendance::new(
    student.user_id,
    teacher.user_id,
    status,
    Some(date),
    subject,
    None,
  )
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_user() {
  let s = store().await;
  let mut input = NewUser::new("Ada", "ada@school.test", Role::Student);
  input.student_number = Some("S-001".into());
  input.class_name = Some("7B".into());
  let ada = s.add_user(input).await.unwrap();

  let fetched = s.get_user(ada.user_id).await.unwrap().unwrap();
  assert_eq!(fetched, ada);
  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_users_by_role_sorted_by_name() {
  let s = store().await;
  user(&s, "Zoe", Role::Student).await;
  user(&s, "Ben", Role::Student).await;
  user(&s, "Mr Hall", Role::Teacher).await;

  let students = s.list_users(Some(Role::Student)).await.unwrap();
  let names: Vec<_> = students.iter().map(|u| u.name.as_str()).collect();
  assert_eq!(names, ["Ben", "Zoe"]);
  assert_eq!(s.list_users(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn parent_must_link_to_existing_student() {
  let s = store().await;
  let teacher = user(&s, "Mr Hall", Role::Teacher).await;

  let mut input = NewUser::new("Pat", "pat@home.test", Role::Parent);
  input.parent_of = Some(teacher.user_id);
  let err = s.add_user(input).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(pulse_core::Error::StudentNotFound(_))
  ));

  let child = user(&s, "Kim", Role::Student).await;
  let mut input = NewUser::new("Pat", "pat@home.test", Role::Parent);
  input.parent_of = Some(child.user_id);
  let parent = s.add_user(input).await.unwrap();
  assert!(parent.is_parent_of(child.user_id));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  user(&s, "Ada", Role::Student).await;
  let result = s
    .add_user(NewUser::new("Other Ada", "ada@school.test", Role::Student))
    .await;
  assert!(matches!(result, Err(Error::Database(_))));
}

// ─── Attendance ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn remarking_a_slot_updates_in_place() {
  let s = store().await;
  let teacher = user(&s, "Mr Hall", Role::Teacher).await;
  let other_teacher = user(&s, "Ms Ray", Role::Teacher).await;
  let student = user(&s, "Ada", Role::Student).await;

  let (first, outcome) = s
    .upsert_attendance(mark(&student, &teacher, day(1), None, AttendanceStatus::Present))
    .await
    .unwrap();
  assert_eq!(outcome, UpsertOutcome::Created);
  assert_eq!(first.subject, "General");

  tokio::time::sleep(Duration::from_millis(2)).await;

  let mut again = mark(&student, &other_teacher, day(1), None, AttendanceStatus::Late);
  again.notes = "bus".into();
  let (second, outcome) = s.upsert_attendance(again).await.unwrap();
  assert_eq!(outcome, UpsertOutcome::Updated);
  assert_eq!(second.attendance_id, first.attendance_id);
  assert_eq!(second.status, AttendanceStatus::Late);
  assert_eq!(second.teacher_id, other_teacher.user_id);
  assert_eq!(second.notes, "bus");
  assert_eq!(second.created_at, first.created_at);
  assert!(second.marked_at > first.marked_at);

  let query = AttendanceQuery {
    student_id: Some(student.user_id),
    ..Default::default()
  };
  let all = s.list_attendance(&query).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].status, AttendanceStatus::Late);
}

#[tokio::test]
async fn concurrent_marks_on_one_slot_leave_one_record() {
  let s = store().await;
  let teacher = user(&s, "Mr Hall", Role::Teacher).await;
  let student = user(&s, "Ada", Role::Student).await;
  let submitted = [
    AttendanceStatus::Present,
    AttendanceStatus::Absent,
    AttendanceStatus::Late,
    AttendanceStatus::Excused,
  ];
  let slot = |status| mark(&student, &teacher, day(4), Some("Math"), status);

  let (a, b, c, d) = tokio::join!(
    s.upsert_attendance(slot(submitted[0])),
    s.upsert_attendance(slot(submitted[1])),
    s.upsert_attendance(slot(submitted[2])),
    s.upsert_attendance(slot(submitted[3])),
  );
  let marked = [a.unwrap(), b.unwrap(), c.unwrap(), d.unwrap()];

  let created = marked
    .iter()
    .filter(|(_, outcome)| *outcome == UpsertOutcome::Created)
    .count();
  assert_eq!(created, 1);
  assert!(
    marked
      .iter()
      .all(|(record, _)| record.attendance_id == marked[0].0.attendance_id)
  );

  let query = AttendanceQuery {
    student_id: Some(student.user_id),
    ..Default::default()
  };
  let all = s.list_attendance(&query).await.unwrap();
  assert_eq!(all.len(), 1);
  assert!(submitted.contains(&all[0].status));
  assert_eq!(all[0].subject, "Math");
}

#[tokio::test]
async fn subjects_are_separate_slots() {
  let s = store().await;
  let teacher = user(&s, "Mr Hall", Role::Teacher).await;
  let student = user(&s, "Ada", Role::Student).await;

  s.upsert_attendance(mark(&student, &teacher, day(1), Some("Math"), AttendanceStatus::Present))
    .await
    .unwrap();
  s.upsert_attendance(mark(&student, &teacher, day(1), Some("Art"), AttendanceStatus::Absent))
    .await
    .unwrap();

  let query = AttendanceQuery { date: Some(day(1)), ..Default::default() };
  assert_eq!(s.list_attendance(&query).await.unwrap().len(), 2);

  let query = AttendanceQuery {
    date: Some(day(1)),
    subject: Some("Art".into()),
    ..Default::default()
  };
  let art = s.list_attendance(&query).await.unwrap();
  assert_eq!(art.len(), 1);
  assert_eq!(art[0].status, AttendanceStatus::Absent);
}

#[tokio::test]
async fn list_attendance_filters_by_range_newest_first() {
  let s = store().await;
  let teacher = user(&s, "Mr Hall", Role::Teacher).await;
  let ada = user(&s, "Ada", Role::Student).await;
  let ben = user(&s, "Ben", Role::Student).await;

  for d in 1..=5 {
    s.upsert_attendance(mark(&ada, &teacher, day(d), None, AttendanceStatus::Present))
      .await
      .unwrap();
  }
  s.upsert_attendance(mark(&ben, &teacher, day(3), None, AttendanceStatus::Absent))
    .await
    .unwrap();

  let query = AttendanceQuery {
    student_id: Some(ada.user_id),
    range: DateRange::new(Some(day(2)), Some(day(4))).unwrap(),
    ..Default::default()
  };
  let records = s.list_attendance(&query).await.unwrap();
  let dates: Vec<_> = records.iter().map(|r| r.date).collect();
  assert_eq!(dates, [day(4), day(3), day(2)]);
}

#[tokio::test]
async fn delete_attendance_reports_existence() {
  let s = store().await;
  let teacher = user(&s, "Mr Hall", Role::Teacher).await;
  let student = user(&s, "Ada", Role::Student).await;
  let (record, _) = s
    .upsert_attendance(mark(&student, &teacher, day(1), None, AttendanceStatus::Excused))
    .await
    .unwrap();

  assert!(s.get_attendance(record.attendance_id).await.unwrap().is_some());
  assert!(s.delete_attendance(record.attendance_id).await.unwrap());
  assert!(s.get_attendance(record.attendance_id).await.unwrap().is_none());
  assert!(!s.delete_attendance(record.attendance_id).await.unwrap());
}

#[tokio::test]
async fn marking_unknown_student_fails() {
  let s = store().await;
  let teacher = user(&s, "Mr Hall", Role::Teacher).await;
  let input = MarkAttendance::new(
    Uuid::new_v4(),
    teacher.user_id,
    AttendanceStatus::Present,
    Some(day(1)),
    None,
    None,
  );
  assert!(s.upsert_attendance(input).await.is_err());
}

// ─── Health ──────────────────────────────────────────────────────────────────

fn sample(student: &User, heart_rate: u16) -> NewHealthSample {
  NewHealthSample {
    student_id: student.user_id,
    heart_rate,
    sleep_hours: 7.5,
    stress_level: 3,
    activity_level: ActivityLevel::High,
    mood: Mood::Happy,
    notes: String::new(),
  }
}

#[tokio::test]
async fn health_samples_list_newest_first_with_limit() {
  let s = store().await;
  let ada = user(&s, "Ada", Role::Student).await;
  let ben = user(&s, "Ben", Role::Student).await;

  for hr in [70, 71, 72] {
    s.record_health(sample(&ada, hr)).await.unwrap();
  }
  s.record_health(sample(&ben, 90)).await.unwrap();

  let latest = s.list_health(&HealthQuery::latest(ada.user_id, 2)).await.unwrap();
  let rates: Vec<_> = latest.iter().map(|h| h.heart_rate).collect();
  assert_eq!(rates, [72, 71]);
  assert_eq!(latest[0].activity_level, ActivityLevel::High);
  assert_eq!(latest[0].mood, Mood::Happy);

  let everyone = s.list_health(&HealthQuery::default()).await.unwrap();
  assert_eq!(everyone.len(), 4);
}

#[tokio::test]
async fn health_since_excludes_older_samples() {
  let s = store().await;
  let ada = user(&s, "Ada", Role::Student).await;

  let old = s.record_health(sample(&ada, 65)).await.unwrap();
  tokio::time::sleep(Duration::from_millis(2)).await;
  let new = s.record_health(sample(&ada, 66)).await.unwrap();

  let query = HealthQuery {
    student_id: Some(ada.user_id),
    since: Some(new.recorded_at),
    limit: None,
  };
  let samples = s.list_health(&query).await.unwrap();
  assert_eq!(samples.len(), 1);
  assert_eq!(samples[0].sample_id, new.sample_id);
  assert_ne!(samples[0].sample_id, old.sample_id);
}

#[tokio::test]
async fn out_of_range_sample_is_rejected() {
  let s = store().await;
  let ada = user(&s, "Ada", Role::Student).await;
  let err = s.record_health(sample(&ada, 250)).await.unwrap_err();
  assert!(matches!(err, Error::Core(pulse_core::Error::Validation(_))));
}

// ─── Quizzes and attempts ────────────────────────────────────────────────────

fn new_quiz(owner: &User) -> NewQuiz {
  NewQuiz {
    title: "Cells".into(),
    description: "Unit 3".into(),
    subject: "Biology".into(),
    questions: vec![
      NewQuestion {
        text: "Powerhouse?".into(),
        options: vec!["nucleus".into(), "mitochondria".into()],
        correct_answer: 1,
        points: 2,
      },
      NewQuestion {
        text: "Plant only?".into(),
        options: vec!["cell wall".into(), "membrane".into()],
        correct_answer: 0,
        points: 1,
      },
    ],
    duration_minutes: 15,
    created_by: owner.user_id,
  }
}

#[tokio::test]
async fn quiz_round_trips_through_storage() {
  let s = store().await;
  let teacher = user(&s, "Mr Hall", Role::Teacher).await;
  let quiz = s.create_quiz(new_quiz(&teacher)).await.unwrap();
  assert_eq!(quiz.total_points, 3);

  let fetched = s.get_quiz(quiz.quiz_id).await.unwrap().unwrap();
  assert_eq!(fetched, quiz);
}

#[tokio::test]
async fn update_and_deactivate_quiz() {
  let s = store().await;
  let teacher = user(&s, "Mr Hall", Role::Teacher).await;
  let mut quiz = s.create_quiz(new_quiz(&teacher)).await.unwrap();

  let patch = QuizPatch {
    title: Some("Cells, revised".into()),
    is_active: Some(false),
    ..Default::default()
  };
  quiz.apply(patch, chrono::Utc::now()).unwrap();
  assert!(s.update_quiz(&quiz).await.unwrap());

  let fetched = s.get_quiz(quiz.quiz_id).await.unwrap().unwrap();
  assert_eq!(fetched.title, "Cells, revised");
  assert!(!fetched.is_active);

  assert!(s.list_quizzes(true).await.unwrap().is_empty());
  assert_eq!(s.list_quizzes(false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_quiz_keeps_attempts() {
  let s = store().await;
  let teacher = user(&s, "Mr Hall", Role::Teacher).await;
  let student = user(&s, "Ada", Role::Student).await;
  let quiz = s.create_quiz(new_quiz(&teacher)).await.unwrap();

  let graded = grade(&quiz, &[SubmittedAnswer::positional(1)]).unwrap();
  s.record_attempt(NewQuizAttempt {
    quiz_id:    quiz.quiz_id,
    student_id: student.user_id,
    grade:      graded,
    time_taken: 120,
  })
  .await
  .unwrap();

  assert!(s.delete_quiz(quiz.quiz_id).await.unwrap());
  assert!(s.get_quiz(quiz.quiz_id).await.unwrap().is_none());
  assert!(!s.delete_quiz(quiz.quiz_id).await.unwrap());

  let attempts = s
    .list_attempts(&AttemptQuery { quiz_id: Some(quiz.quiz_id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(attempts.len(), 1);
}

#[tokio::test]
async fn attempts_accumulate_and_filter() {
  let s = store().await;
  let teacher = user(&s, "Mr Hall", Role::Teacher).await;
  let ada = user(&s, "Ada", Role::Student).await;
  let ben = user(&s, "Ben", Role::Student).await;
  let quiz = s.create_quiz(new_quiz(&teacher)).await.unwrap();

  for (student, answers) in [(&ada, [0, 1]), (&ada, [1, 0]), (&ben, [1, 1])] {
    let submitted: Vec<_> = answers.into_iter().map(SubmittedAnswer::positional).collect();
    s.record_attempt(NewQuizAttempt {
      quiz_id:    quiz.quiz_id,
      student_id: student.user_id,
      grade:      grade(&quiz, &submitted).unwrap(),
      time_taken: 60,
    })
    .await
    .unwrap();
  }

  let mine = s
    .list_attempts(&AttemptQuery { student_id: Some(ada.user_id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(mine.len(), 2);
  // Newest first: the perfect second attempt.
  assert_eq!(mine[0].score, 3);
  assert_eq!(mine[0].percentage, 100.0);
  assert_eq!(mine[0].answers.len(), 2);
  assert_eq!(mine[1].score, 0);

  let latest = s
    .list_attempts(&AttemptQuery { limit: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(latest.len(), 1);
  assert_eq!(latest[0].student_id, ben.user_id);
}
