//! Handlers for `/health` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/health` | Body: [`RecordBody`]; 201 |
//! | `GET`  | `/health/{student_id}` | Optional `?days` (default 7) |
//! | `GET`  | `/health/{student_id}/analytics` | Averages and alerts |
//! | `POST` | `/health/simulate/{student_id}` | Teacher. Appends a random sample |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use pulse_core::{
  analytics::{HealthAnalytics, health_analytics},
  health::{ActivityLevel, HealthSample, Mood, NewHealthSample},
  store::{HealthQuery, RecordStore},
  user::Role,
};
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  ApiState,
  caller::Caller,
  error::ApiError,
  extract::{JsonBody, PathParam, QueryParams},
  require_student,
};

const DEFAULT_HISTORY_DAYS: i64 = 7;

async fn append<S>(store: &S, input: NewHealthSample) -> Result<HealthSample, ApiError>
where
  S: RecordStore,
{
  input.validate()?;
  let sample = store.record_health(input).await.map_err(ApiError::store)?;
  tracing::info!(
    sample_id = %sample.sample_id,
    student_id = %sample.student_id,
    abnormal = sample.is_abnormal(),
    "health sample recorded"
  );
  Ok(sample)
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecordBody {
  /// Ignored for students; required for teachers; optional for parents.
  pub student_id:     Option<Uuid>,
  pub heart_rate:     u16,
  pub sleep_hours:    f64,
  pub stress_level:   u8,
  #[serde(default)]
  pub activity_level: ActivityLevel,
  #[serde(default)]
  pub mood:           Mood,
  #[serde(default)]
  pub notes:          String,
}

/// `POST /health`
pub async fn record<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  JsonBody(body): JsonBody<RecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + 'static,
{
  let user = &caller.0;
  let student_id = match user.role {
    Role::Student => user.user_id,
    Role::Teacher => body.student_id.ok_or_else(|| {
      ApiError::BadRequest("student_id is required when a teacher records".into())
    })?,
    Role::Parent => {
      let target = body.student_id.or(user.parent_of).ok_or_else(|| {
        ApiError::BadRequest("student_id is required".into())
      })?;
      if !user.is_parent_of(target) {
        tracing::warn!(caller = %user.user_id, student_id = %target, "parent recording for another child");
        return Err(ApiError::Forbidden(
          "parents may only record health data for their own child".into(),
        ));
      }
      target
    }
  };
  require_student(state.store.as_ref(), student_id).await?;

  let input = NewHealthSample {
    student_id,
    heart_rate: body.heart_rate,
    sleep_hours: body.sleep_hours,
    stress_level: body.stress_level,
    activity_level: body.activity_level,
    mood: body.mood,
    notes: body.notes,
  };
  let sample = append(state.store.as_ref(), input).await?;
  Ok((StatusCode::CREATED, Json(sample)))
}

// ─── History ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub days: Option<i64>,
}

/// `GET /health/{student_id}[?days=N]`
pub async fn history<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  PathParam(student_id): PathParam<Uuid>,
  QueryParams(params): QueryParams<HistoryParams>,
) -> Result<Json<Vec<HealthSample>>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require_view(student_id)?;

  let days = params.days.unwrap_or(DEFAULT_HISTORY_DAYS);
  let window = Duration::try_days(days)
    .filter(|_| days > 0)
    .ok_or_else(|| ApiError::BadRequest(format!("days must be a positive count, got {days}")))?;

  let query = HealthQuery {
    student_id: Some(student_id),
    since:      Some(Utc::now() - window),
    limit:      None,
  };
  let samples = state
    .store
    .list_health(&query)
    .await
    .map_err(ApiError::store)?;

  tracing::debug!(%student_id, days, samples = samples.len(), "health history");
  Ok(Json(samples))
}

/// `GET /health/{student_id}/analytics`
pub async fn analytics<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  PathParam(student_id): PathParam<Uuid>,
) -> Result<Json<HealthAnalytics>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require_view(student_id)?;

  let query = HealthQuery::latest(student_id, state.windows.health_analytics);
  let samples = state
    .store
    .list_health(&query)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(health_analytics(&samples)))
}

// ─── Simulate ────────────────────────────────────────────────────────────────

const ACTIVITY_LEVELS: [ActivityLevel; 3] =
  [ActivityLevel::Low, ActivityLevel::Moderate, ActivityLevel::High];
const MOODS: [Mood; 5] = [Mood::Happy, Mood::Neutral, Mood::Sad, Mood::Anxious, Mood::Stressed];

/// Uniform-ish pick in `0..n`.
fn roll(rng: &mut impl RngCore, n: u32) -> u32 { rng.next_u32() % n }

/// A plausible wearable reading: heart rate 60–99, sleep 5–9 h, stress 0–9.
fn simulated_sample(student_id: Uuid, rng: &mut impl RngCore) -> NewHealthSample {
  NewHealthSample {
    student_id,
    heart_rate: 60 + roll(rng, 40) as u16,
    sleep_hours: 5.0 + f64::from(roll(rng, 41)) / 10.0,
    stress_level: roll(rng, 10) as u8,
    activity_level: ACTIVITY_LEVELS[roll(rng, 3) as usize],
    mood: MOODS[roll(rng, 5) as usize],
    notes: "Auto-generated IoT data".into(),
  }
}

/// `POST /health/simulate/{student_id}`
pub async fn simulate<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  PathParam(student_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require(Role::Teacher)?;
  require_student(state.store.as_ref(), student_id).await?;

  let input = simulated_sample(student_id, &mut OsRng);
  let sample = append(state.store.as_ref(), input).await?;
  Ok((StatusCode::CREATED, Json(sample)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn simulated_samples_stay_in_range() {
    let student_id = Uuid::new_v4();
    for _ in 0..200 {
      let sample = simulated_sample(student_id, &mut OsRng);
      assert!(sample.validate().is_ok());
      assert!((60..=99).contains(&sample.heart_rate));
      assert!((5.0..=9.0).contains(&sample.sleep_hours));
      assert!(sample.stress_level <= 9);
    }
  }
}
