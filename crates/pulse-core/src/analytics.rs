//! Read-side aggregation over attempts and health samples.
//!
//! Every function here is pure: callers fetch the (windowed, newest-first)
//! records and pass them in. Averages over empty input are 0.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  grading::QuizAttempt,
  health::{HealthSample, HealthSnapshot},
  user::{User, UserSummary},
};

/// Attempts scoring at least this percentage count as passed.
pub const PASS_THRESHOLD: f64 = 60.0;
/// Maximum number of low performers reported on the teacher dashboard.
pub const LOW_PERFORMER_LIMIT: usize = 10;
/// How many samples of the health window are echoed back as `recent_data`.
pub const RECENT_HEALTH_SHOWN: usize = 7;

// ─── Arithmetic ──────────────────────────────────────────────────────────────

/// Arithmetic mean; 0 for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
  let (sum, count) = values
    .into_iter()
    .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
  if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Round half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
  let factor = 10f64.powi(places);
  (value * factor).round() / factor
}

// ─── Windows ─────────────────────────────────────────────────────────────────

/// How many of the newest records each view scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsWindows {
  /// Attempts considered by the student and parent views.
  pub student_attempts: usize,
  /// Samples considered by the student view.
  pub student_health:   usize,
  /// Samples considered by the parent view.
  pub parent_health:    usize,
  /// Samples per student on the roster overview.
  pub roster_health:    usize,
  /// Samples considered by the per-student health analytics.
  pub health_analytics: usize,
  /// Recent attempts scanned for low performers on the teacher dashboard.
  pub recent_attempts:  usize,
}

impl Default for AnalyticsWindows {
  fn default() -> Self {
    Self {
      student_attempts: 10,
      student_health:   30,
      parent_health:    7,
      roster_health:    7,
      health_analytics: 30,
      recent_attempts:  50,
    }
  }
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Warning,
  Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  #[serde(rename = "type")]
  pub severity: Severity,
  pub message:  String,
  pub value:    f64,
}

impl Notification {
  fn new(severity: Severity, message: &str, value: f64) -> Self {
    Self { severity, message: message.to_owned(), value }
  }
}

// ─── Building blocks ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
  pub avg_score:       f64,
  pub total_quizzes:   usize,
  pub passed_quizzes:  usize,
  pub recent_attempts: Vec<QuizAttempt>,
}

impl PerformanceSummary {
  pub fn from_attempts(attempts: Vec<QuizAttempt>) -> Self {
    Self {
      avg_score:       round_to(mean(attempts.iter().map(|a| a.percentage)), 2),
      total_quizzes:   attempts.len(),
      passed_quizzes:  attempts.iter().filter(|a| a.percentage >= PASS_THRESHOLD).count(),
      recent_attempts: attempts,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
  pub avg_sleep:   f64,
  pub avg_stress:  f64,
  pub recent_data: Vec<HealthSample>,
  pub latest:      Option<HealthSample>,
}

impl HealthSummary {
  /// `samples` must be newest first.
  pub fn from_samples(mut samples: Vec<HealthSample>) -> Self {
    let avg_sleep = round_to(mean(samples.iter().map(|s| s.sleep_hours)), 1);
    let avg_stress = round_to(mean(samples.iter().map(|s| f64::from(s.stress_level))), 1);
    let latest = samples.first().cloned();
    samples.truncate(RECENT_HEALTH_SHOWN);
    Self { avg_sleep, avg_stress, recent_data: samples, latest }
  }
}

// ─── Student view ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAnalytics {
  pub student_id:  Uuid,
  pub performance: PerformanceSummary,
  pub health:      HealthSummary,
}

pub fn student_analytics(
  student_id: Uuid,
  attempts: Vec<QuizAttempt>,
  samples: Vec<HealthSample>,
) -> StudentAnalytics {
  StudentAnalytics {
    student_id,
    performance: PerformanceSummary::from_attempts(attempts),
    health: HealthSummary::from_samples(samples),
  }
}

// ─── Health analytics ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAnalytics {
  pub avg_heart_rate:   f64,
  pub avg_sleep_hours:  f64,
  pub avg_stress_level: f64,
  /// Raised from the latest sample only.
  pub alerts:           Vec<Notification>,
  pub latest:           Option<HealthSample>,
}

/// Averages over `samples` (newest first) plus alerts for the latest one.
pub fn health_analytics(samples: &[HealthSample]) -> HealthAnalytics {
  let latest = samples.first().cloned();
  let alerts = latest.as_ref().map(sample_alerts).unwrap_or_default();
  HealthAnalytics {
    avg_heart_rate: mean(samples.iter().map(|s| f64::from(s.heart_rate))).round(),
    avg_sleep_hours: round_to(mean(samples.iter().map(|s| s.sleep_hours)), 1),
    avg_stress_level: round_to(
      mean(samples.iter().map(|s| f64::from(s.stress_level))),
      1,
    ),
    alerts,
    latest,
  }
}

fn sample_alerts(sample: &HealthSample) -> Vec<Notification> {
  let mut alerts = Vec::new();
  if sample.heart_rate_abnormal() {
    alerts.push(Notification::new(
      Severity::Warning,
      "Abnormal heart rate detected",
      f64::from(sample.heart_rate),
    ));
  }
  if sample.sleep_insufficient() {
    alerts.push(Notification::new(
      Severity::Warning,
      "Insufficient sleep detected",
      sample.sleep_hours,
    ));
  }
  if sample.stress_high() {
    alerts.push(Notification::new(
      Severity::Danger,
      "High stress level detected",
      f64::from(sample.stress_level),
    ));
  }
  alerts
}

// ─── Teacher dashboard ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthConcern {
  pub student:     UserSummary,
  pub health_data: HealthSample,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherDashboard {
  pub total_students: usize,
  pub class_average:  f64,
  pub total_attempts: usize,
  /// Failing attempts among the most recent window only, not a full scan.
  pub low_performers: Vec<QuizAttempt>,
  pub health_concerns: Vec<HealthConcern>,
}

/// Build the teacher dashboard.
///
/// - `attempts`: every attempt on record; those by non-roster users are
///   ignored.
/// - `recent_attempts`: the newest attempts (already capped), newest first.
/// - `latest_samples`: each roster student's most recent sample, if any.
pub fn teacher_dashboard(
  roster: &[User],
  attempts: &[QuizAttempt],
  recent_attempts: Vec<QuizAttempt>,
  latest_samples: &[HealthSample],
) -> TeacherDashboard {
  let roster_ids: HashSet<Uuid> = roster.iter().map(|u| u.user_id).collect();
  let roster_attempts: Vec<&QuizAttempt> = attempts
    .iter()
    .filter(|a| roster_ids.contains(&a.student_id))
    .collect();

  let low_performers = recent_attempts
    .into_iter()
    .filter(|a| roster_ids.contains(&a.student_id) && a.percentage < PASS_THRESHOLD)
    .take(LOW_PERFORMER_LIMIT)
    .collect();

  let health_concerns = roster
    .iter()
    .filter_map(|student| {
      latest_samples
        .iter()
        .find(|s| s.student_id == student.user_id && s.is_abnormal())
        .map(|sample| HealthConcern {
          student:     student.summary(),
          health_data: sample.clone(),
        })
    })
    .collect();

  TeacherDashboard {
    total_students: roster.len(),
    class_average: round_to(mean(roster_attempts.iter().map(|a| a.percentage)), 2),
    total_attempts: roster_attempts.len(),
    low_performers,
    health_concerns,
  }
}

// ─── Parent dashboard ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentDashboard {
  pub child:         UserSummary,
  pub performance:   PerformanceSummary,
  pub health:        HealthSummary,
  pub notifications: Vec<Notification>,
}

pub fn parent_dashboard(
  child: &User,
  attempts: Vec<QuizAttempt>,
  samples: Vec<HealthSample>,
) -> ParentDashboard {
  let has_samples = !samples.is_empty();
  let has_attempts = !attempts.is_empty();
  let performance = PerformanceSummary::from_attempts(attempts);
  let health = HealthSummary::from_samples(samples);

  let mut notifications = Vec::new();
  if has_samples && health.avg_sleep < crate::health::MIN_HEALTHY_SLEEP {
    notifications.push(Notification::new(
      Severity::Warning,
      "Child is not getting enough sleep",
      health.avg_sleep,
    ));
  }
  if has_samples && health.avg_stress > crate::health::MAX_HEALTHY_STRESS {
    notifications.push(Notification::new(
      Severity::Danger,
      "Child is experiencing high stress levels",
      health.avg_stress,
    ));
  }
  if has_attempts && performance.avg_score < PASS_THRESHOLD {
    notifications.push(Notification::new(
      Severity::Warning,
      "Academic performance needs attention",
      round_to(performance.avg_score, 1),
    ));
  }

  ParentDashboard { child: child.summary(), performance, health, notifications }
}

// ─── Roster overview ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterStats {
  pub total_quizzes: usize,
  pub avg_score:     f64,
  pub avg_sleep:     f64,
  pub avg_stress:    f64,
  pub latest_health: Option<HealthSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
  pub student: UserSummary,
  pub stats:   RosterStats,
}

/// One roster line: all of the student's attempts and their newest samples.
pub fn roster_entry(
  student: &User,
  attempts: &[QuizAttempt],
  samples: &[HealthSample],
) -> RosterEntry {
  RosterEntry {
    student: student.summary(),
    stats:   RosterStats {
      total_quizzes: attempts.len(),
      avg_score:     round_to(mean(attempts.iter().map(|a| a.percentage)), 1),
      avg_sleep:     round_to(mean(samples.iter().map(|s| s.sleep_hours)), 1),
      avg_stress:    round_to(
        mean(samples.iter().map(|s| f64::from(s.stress_level))),
        1,
      ),
      latest_health: samples.first().map(HealthSample::snapshot),
    },
  }
}
