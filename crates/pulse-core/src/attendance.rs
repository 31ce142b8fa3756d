//! Attendance records and the reconciliation logic built on them.
//!
//! A record is keyed by its slot `(student, date, subject)`; the store keeps at
//! most one record per slot and re-marking overwrites it in place. Everything
//! in this module past the type definitions is a pure function over records
//! that have already been fetched.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  analytics::{mean, round_to},
  user::{User, UserSummary},
};

/// Subject used when a mark does not name one.
pub const DEFAULT_SUBJECT: &str = "General";

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
  Present,
  Absent,
  Late,
  Excused,
}

impl AttendanceStatus {
  /// Present and late both count towards the attendance rate.
  pub fn counts_as_attended(self) -> bool { matches!(self, Self::Present | Self::Late) }
}

/// One student's attendance for one subject on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub attendance_id: Uuid,
  pub student_id:    Uuid,
  /// The teacher who last marked this slot.
  pub teacher_id:    Uuid,
  pub date:          NaiveDate,
  pub subject:       String,
  pub status:        AttendanceStatus,
  pub notes:         String,
  /// When the slot was last marked; changes on every re-mark.
  pub marked_at:     DateTime<Utc>,
  /// When the slot was first marked; never changes.
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::RecordStore::upsert_attendance`].
#[derive(Debug, Clone)]
pub struct MarkAttendance {
  pub student_id: Uuid,
  pub teacher_id: Uuid,
  pub date:       NaiveDate,
  pub subject:    String,
  pub status:     AttendanceStatus,
  pub notes:      String,
}

impl MarkAttendance {
  /// Build a mark, applying the defaults: today (UTC) when no date is given,
  /// [`DEFAULT_SUBJECT`] when no subject is given, empty notes.
  pub fn new(
    student_id: Uuid,
    teacher_id: Uuid,
    status: AttendanceStatus,
    date: Option<NaiveDate>,
    subject: Option<&str>,
    notes: Option<String>,
  ) -> Self {
    Self {
      student_id,
      teacher_id,
      date: date.unwrap_or_else(|| Utc::now().date_naive()),
      subject: normalize_subject(subject),
      status,
      notes: notes.unwrap_or_default(),
    }
  }
}

/// Which branch of an upsert ran. Reported for logging; callers must not
/// depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
  Created,
  Updated,
}

/// Trim `subject`, falling back to [`DEFAULT_SUBJECT`] when it is missing or
/// blank.
pub fn normalize_subject(subject: Option<&str>) -> String {
  match subject.map(str::trim) {
    Some(s) if !s.is_empty() => s.to_owned(),
    _ => DEFAULT_SUBJECT.to_owned(),
  }
}

// ─── Date range ──────────────────────────────────────────────────────────────

/// An inclusive range of calendar days; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
  pub start: Option<NaiveDate>,
  pub end:   Option<NaiveDate>,
}

impl DateRange {
  pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
    if let (Some(s), Some(e)) = (start, end)
      && s > e
    {
      return Err(Error::validation(format!(
        "start date {s} is after end date {e}"
      )));
    }
    Ok(Self { start, end })
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
  }
}

// ─── Tallies ─────────────────────────────────────────────────────────────────

/// Counts of records per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTally {
  pub total:   usize,
  pub present: usize,
  pub absent:  usize,
  pub late:    usize,
  pub excused: usize,
}

impl StatusTally {
  pub fn from_statuses(statuses: impl IntoIterator<Item = AttendanceStatus>) -> Self {
    let mut tally = Self::default();
    for status in statuses {
      tally.record(status);
    }
    tally
  }

  pub fn record(&mut self, status: AttendanceStatus) {
    self.total += 1;
    match status {
      AttendanceStatus::Present => self.present += 1,
      AttendanceStatus::Absent => self.absent += 1,
      AttendanceStatus::Late => self.late += 1,
      AttendanceStatus::Excused => self.excused += 1,
    }
  }

  /// `(present + late) / total * 100`, rounded to one decimal; 0 when there
  /// are no records.
  pub fn attendance_rate(&self) -> f64 {
    if self.total == 0 {
      return 0.0;
    }
    round_to((self.present + self.late) as f64 / self.total as f64 * 100.0, 1)
  }
}

// ─── Daily view ──────────────────────────────────────────────────────────────

/// Roster coverage for one day.
///
/// `marked + unmarked == total` and `present + absent + late + excused ==
/// marked` always hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
  pub total:    usize,
  pub marked:   usize,
  pub unmarked: usize,
  pub present:  usize,
  pub absent:   usize,
  pub late:     usize,
  pub excused:  usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAttendance {
  pub date:     NaiveDate,
  pub marked:   Vec<AttendanceRecord>,
  pub unmarked: Vec<UserSummary>,
  pub summary:  DailySummary,
}

/// Merge one day's records with the roster.
///
/// Roster students with no record are reported as unmarked. A student with
/// several records that day (several subjects) is tallied once, under the
/// status of the record marked most recently. Records for ids outside the
/// roster are listed but not counted.
pub fn reconcile_day(
  date: NaiveDate,
  mut records: Vec<AttendanceRecord>,
  roster: &[User],
) -> DailyAttendance {
  let mut latest: HashMap<Uuid, &AttendanceRecord> = HashMap::new();
  for record in &records {
    latest
      .entry(record.student_id)
      .and_modify(|current| {
        if record.marked_at > current.marked_at {
          *current = record;
        }
      })
      .or_insert(record);
  }

  let mut tally = StatusTally::default();
  let mut unmarked = Vec::new();
  for student in roster {
    match latest.get(&student.user_id) {
      Some(record) => tally.record(record.status),
      None => unmarked.push(student.summary()),
    }
  }
  unmarked.sort_by(|a, b| a.name.cmp(&b.name));

  let summary = DailySummary {
    total:    roster.len(),
    marked:   tally.total,
    unmarked: unmarked.len(),
    present:  tally.present,
    absent:   tally.absent,
    late:     tally.late,
    excused:  tally.excused,
  };

  let names: HashMap<Uuid, &str> =
    roster.iter().map(|u| (u.user_id, u.name.as_str())).collect();
  records.sort_by(|a, b| {
    let name_a = names.get(&a.student_id).copied().unwrap_or_default();
    let name_b = names.get(&b.student_id).copied().unwrap_or_default();
    name_a.cmp(name_b).then_with(|| a.subject.cmp(&b.subject))
  });

  DailyAttendance { date, marked: records, unmarked, summary }
}

// ─── Student report ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
  #[serde(flatten)]
  pub tally:           StatusTally,
  pub attendance_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentReport {
  pub records: Vec<AttendanceRecord>,
  pub summary: ReportSummary,
}

/// Summarise one student's records, newest day first.
pub fn student_report(mut records: Vec<AttendanceRecord>) -> StudentReport {
  records.sort_by(|a, b| {
    b.date.cmp(&a.date).then_with(|| a.subject.cmp(&b.subject))
  });
  let tally = StatusTally::from_statuses(records.iter().map(|r| r.status));
  StudentReport {
    records,
    summary: ReportSummary { tally, attendance_rate: tally.attendance_rate() },
  }
}

// ─── Cohort statistics ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAttendanceStats {
  pub student_id:      Uuid,
  /// `None` when the id no longer resolves to a roster student.
  pub student:         Option<UserSummary>,
  #[serde(flatten)]
  pub tally:           StatusTally,
  pub attendance_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallAttendance {
  pub total_records:           usize,
  pub total_students:          usize,
  pub average_attendance_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceStatistics {
  /// Worst attendance first.
  pub statistics: Vec<StudentAttendanceStats>,
  pub overall:    OverallAttendance,
}

/// Per-student tallies over `records`, sorted ascending by attendance rate so
/// the students needing attention come first.
pub fn attendance_statistics(
  records: &[AttendanceRecord],
  roster: &[User],
) -> AttendanceStatistics {
  let mut per_student: BTreeMap<Uuid, StatusTally> = BTreeMap::new();
  for record in records {
    per_student.entry(record.student_id).or_default().record(record.status);
  }

  let mut statistics: Vec<StudentAttendanceStats> = per_student
    .into_iter()
    .map(|(student_id, tally)| StudentAttendanceStats {
      student_id,
      student: roster
        .iter()
        .find(|u| u.user_id == student_id)
        .map(User::summary),
      tally,
      attendance_rate: tally.attendance_rate(),
    })
    .collect();

  statistics.sort_by(|a, b| {
    a.attendance_rate
      .total_cmp(&b.attendance_rate)
      .then_with(|| a.student_id.cmp(&b.student_id))
  });

  let average = mean(statistics.iter().map(|s| s.attendance_rate));

  AttendanceStatistics {
    overall: OverallAttendance {
      total_records:           records.len(),
      total_students:          statistics.len(),
      average_attendance_rate: round_to(average, 1),
    },
    statistics,
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::user::Role;

  fn student(name: &str) -> User {
    User {
      user_id: Uuid::new_v4(),
      name: name.into(),
      email: format!("{}@example.com", name.to_lowercase()),
      role: Role::Student,
      parent_of: None,
      student_number: None,
      class_name: Some("7B".into()),
      created_at: Utc::now(),
    }
  }

  fn record(
    student_id: Uuid,
    date: NaiveDate,
    subject: &str,
    status: AttendanceStatus,
  ) -> AttendanceRecord {
    let now = Utc::now();
    AttendanceRecord {
      attendance_id: Uuid::new_v4(),
      student_id,
      teacher_id: Uuid::new_v4(),
      date,
      subject: subject.into(),
      status,
      notes: String::new(),
      marked_at: now,
      created_at: now,
    }
  }

  fn day() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() }

  #[test]
  fn subject_defaults_to_general() {
    assert_eq!(normalize_subject(None), "General");
    assert_eq!(normalize_subject(Some("   ")), "General");
    assert_eq!(normalize_subject(Some(" Math ")), "Math");
  }

  #[test]
  fn empty_tally_has_zero_rate() {
    let tally = StatusTally::default();
    assert_eq!(tally.attendance_rate(), 0.0);
  }

  #[test]
  fn rate_counts_late_and_rounds() {
    use AttendanceStatus::*;
    let tally = StatusTally::from_statuses([Present, Late, Absent]);
    assert_eq!(tally.total, 3);
    assert_eq!(tally.attendance_rate(), 66.7);
  }

  #[test]
  fn date_range_rejects_inverted_bounds() {
    let later = day() + Duration::days(3);
    assert!(matches!(
      DateRange::new(Some(later), Some(day())),
      Err(Error::Validation(_))
    ));

    let range = DateRange::new(Some(day()), Some(later)).unwrap();
    assert!(range.contains(day()));
    assert!(range.contains(later));
    assert!(!range.contains(later + Duration::days(1)));
    assert!(DateRange::default().contains(day()));
  }

  #[test]
  fn reconcile_day_reports_unmarked_students() {
    let ada = student("Ada");
    let ben = student("Ben");
    let cy = student("Cy");
    let roster = vec![ada.clone(), ben.clone(), cy.clone()];

    let records = vec![
      record(ada.user_id, day(), "General", AttendanceStatus::Present),
      record(cy.user_id, day(), "General", AttendanceStatus::Excused),
    ];

    let daily = reconcile_day(day(), records, &roster);
    assert_eq!(daily.unmarked.len(), 1);
    assert_eq!(daily.unmarked[0].user_id, ben.user_id);
    assert_eq!(
      daily.summary,
      DailySummary {
        total:    3,
        marked:   2,
        unmarked: 1,
        present:  1,
        absent:   0,
        late:     0,
        excused:  1,
      }
    );
  }

  #[test]
  fn reconcile_day_counts_each_student_once() {
    let ada = student("Ada");
    let roster = vec![ada.clone(), student("Ben")];

    let math = record(ada.user_id, day(), "Math", AttendanceStatus::Present);
    let mut art = record(ada.user_id, day(), "Art", AttendanceStatus::Late);
    art.marked_at = math.marked_at + Duration::minutes(5);

    let daily = reconcile_day(day(), vec![math, art], &roster);
    let s = daily.summary;
    assert_eq!(daily.marked.len(), 2);
    assert_eq!(s.marked + s.unmarked, s.total);
    assert_eq!(s.present + s.absent + s.late + s.excused, s.marked);
    assert_eq!(s.late, 1, "latest mark wins the tally");
  }

  #[test]
  fn report_sorts_newest_first() {
    let id = Uuid::new_v4();
    let records = vec![
      record(id, day(), "General", AttendanceStatus::Absent),
      record(id, day() + Duration::days(1), "General", AttendanceStatus::Present),
    ];
    let report = student_report(records);
    assert_eq!(report.records[0].date, day() + Duration::days(1));
    assert_eq!(report.summary.tally.total, 2);
    assert_eq!(report.summary.attendance_rate, 50.0);
  }

  #[test]
  fn statistics_sort_worst_first() {
    let ada = student("Ada");
    let ben = student("Ben");
    let roster = vec![ada.clone(), ben.clone()];
    let records = vec![
      record(ada.user_id, day(), "General", AttendanceStatus::Present),
      record(ben.user_id, day(), "General", AttendanceStatus::Absent),
      record(ben.user_id, day() + Duration::days(1), "General", AttendanceStatus::Late),
    ];

    let stats = attendance_statistics(&records, &roster);
    assert_eq!(stats.statistics[0].student_id, ben.user_id);
    assert_eq!(stats.statistics[0].attendance_rate, 50.0);
    assert_eq!(stats.statistics[1].attendance_rate, 100.0);
    assert_eq!(stats.overall.total_records, 3);
    assert_eq!(stats.overall.total_students, 2);
    assert_eq!(stats.overall.average_attendance_rate, 75.0);
    assert_eq!(
      stats.statistics[0].student.as_ref().map(|s| s.name.as_str()),
      Some("Ben")
    );
  }

  #[test]
  fn statistics_of_nothing_are_zero() {
    let stats = attendance_statistics(&[], &[]);
    assert!(stats.statistics.is_empty());
    assert_eq!(stats.overall.average_attendance_rate, 0.0);
  }
}
