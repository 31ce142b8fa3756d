//! Health samples — append-only wellness readings per student.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

pub const HEART_RATE_RANGE: RangeInclusive<u16> = 40..=200;
pub const SLEEP_HOURS_RANGE: RangeInclusive<f64> = 0.0..=24.0;
pub const STRESS_LEVEL_RANGE: RangeInclusive<u8> = 0..=10;

/// Heart rates outside `[60, 100]` bpm are flagged.
pub const NORMAL_HEART_RATE: RangeInclusive<u16> = 60..=100;
pub const MIN_HEALTHY_SLEEP: f64 = 6.0;
pub const MAX_HEALTHY_STRESS: f64 = 7.0;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActivityLevel {
  Low,
  #[default]
  Moderate,
  High,
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mood {
  Happy,
  #[default]
  Neutral,
  Sad,
  Anxious,
  Stressed,
}

/// One recorded reading. Never updated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
  pub sample_id:      Uuid,
  pub student_id:     Uuid,
  /// Beats per minute.
  pub heart_rate:     u16,
  pub sleep_hours:    f64,
  /// Self-reported, 0 (calm) to 10.
  pub stress_level:   u8,
  pub activity_level: ActivityLevel,
  pub mood:           Mood,
  pub notes:          String,
  pub recorded_at:    DateTime<Utc>,
}

impl HealthSample {
  pub fn heart_rate_abnormal(&self) -> bool {
    !NORMAL_HEART_RATE.contains(&self.heart_rate)
  }

  pub fn sleep_insufficient(&self) -> bool { self.sleep_hours < MIN_HEALTHY_SLEEP }

  pub fn stress_high(&self) -> bool { f64::from(self.stress_level) > MAX_HEALTHY_STRESS }

  /// Whether any reading in this sample warrants attention.
  pub fn is_abnormal(&self) -> bool {
    self.heart_rate_abnormal() || self.sleep_insufficient() || self.stress_high()
  }

  /// The compact view shown on roster overviews.
  pub fn snapshot(&self) -> HealthSnapshot {
    HealthSnapshot {
      heart_rate:   self.heart_rate,
      sleep_hours:  self.sleep_hours,
      stress_level: self.stress_level,
      mood:         self.mood,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
  pub heart_rate:   u16,
  pub sleep_hours:  f64,
  pub stress_level: u8,
  pub mood:         Mood,
}

/// Input to [`crate::store::RecordStore::record_health`].
/// `recorded_at` is always set by the store.
#[derive(Debug, Clone)]
pub struct NewHealthSample {
  pub student_id:     Uuid,
  pub heart_rate:     u16,
  pub sleep_hours:    f64,
  pub stress_level:   u8,
  pub activity_level: ActivityLevel,
  pub mood:           Mood,
  pub notes:          String,
}

impl NewHealthSample {
  pub fn validate(&self) -> Result<()> {
    if !HEART_RATE_RANGE.contains(&self.heart_rate) {
      return Err(Error::validation(format!(
        "heart_rate {} is outside {}..={}",
        self.heart_rate,
        HEART_RATE_RANGE.start(),
        HEART_RATE_RANGE.end()
      )));
    }
    if !SLEEP_HOURS_RANGE.contains(&self.sleep_hours) {
      return Err(Error::validation(format!(
        "sleep_hours {} is outside {}..={}",
        self.sleep_hours,
        SLEEP_HOURS_RANGE.start(),
        SLEEP_HOURS_RANGE.end()
      )));
    }
    if !STRESS_LEVEL_RANGE.contains(&self.stress_level) {
      return Err(Error::validation(format!(
        "stress_level {} is outside {}..={}",
        self.stress_level,
        STRESS_LEVEL_RANGE.start(),
        STRESS_LEVEL_RANGE.end()
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample(heart_rate: u16, sleep_hours: f64, stress_level: u8) -> HealthSample {
    HealthSample {
      sample_id: Uuid::new_v4(),
      student_id: Uuid::new_v4(),
      heart_rate,
      sleep_hours,
      stress_level,
      activity_level: ActivityLevel::default(),
      mood: Mood::default(),
      notes: String::new(),
      recorded_at: Utc::now(),
    }
  }

  fn input(heart_rate: u16, sleep_hours: f64, stress_level: u8) -> NewHealthSample {
    NewHealthSample {
      student_id: Uuid::new_v4(),
      heart_rate,
      sleep_hours,
      stress_level,
      activity_level: ActivityLevel::High,
      mood: Mood::Happy,
      notes: String::new(),
    }
  }

  #[test]
  fn normal_sample_is_not_abnormal() {
    assert!(!sample(72, 8.0, 3).is_abnormal());
    assert!(!sample(60, 6.0, 7).is_abnormal(), "bounds are healthy");
  }

  #[test]
  fn each_threshold_flags_abnormal() {
    assert!(sample(101, 8.0, 3).is_abnormal());
    assert!(sample(59, 8.0, 3).is_abnormal());
    assert!(sample(72, 5.9, 3).is_abnormal());
    assert!(sample(72, 8.0, 8).is_abnormal());
  }

  #[test]
  fn validation_enforces_ranges() {
    assert!(input(72, 8.0, 3).validate().is_ok());
    assert!(input(39, 8.0, 3).validate().is_err());
    assert!(input(201, 8.0, 3).validate().is_err());
    assert!(input(72, 24.5, 3).validate().is_err());
    assert!(input(72, -1.0, 3).validate().is_err());
    assert!(input(72, f64::NAN, 3).validate().is_err());
    assert!(input(72, 8.0, 11).validate().is_err());
  }

  #[test]
  fn enums_default_like_the_schema() {
    assert_eq!(ActivityLevel::default(), ActivityLevel::Moderate);
    assert_eq!(Mood::default(), Mood::Neutral);
    assert_eq!("anxious".parse::<Mood>().unwrap(), Mood::Anxious);
  }
}
