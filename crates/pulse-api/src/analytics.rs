//! Handlers for `/analytics` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/analytics/student/{id}` | Student self, teacher, or parent of the student |
//! | `GET`  | `/analytics/teacher/dashboard` | Teacher |
//! | `GET`  | `/analytics/parent/{child_id}` | Parent of the child |
//! | `GET`  | `/analytics/students`, `/analytics/students/all` | Teacher. One line per roster student |

use axum::{Json, extract::State};
use pulse_core::{
  analytics::{
    ParentDashboard, RosterEntry, StudentAnalytics, TeacherDashboard, parent_dashboard,
    roster_entry, student_analytics, teacher_dashboard,
  },
  store::{AttemptQuery, HealthQuery, RecordStore},
  user::Role,
};
use uuid::Uuid;

use crate::{
  ApiState,
  caller::Caller,
  error::ApiError,
  extract::PathParam,
  require_student,
};

fn latest_attempts(student_id: Uuid, limit: usize) -> AttemptQuery {
  AttemptQuery { student_id: Some(student_id), quiz_id: None, limit: Some(limit) }
}

/// `GET /analytics/student/{id}`
pub async fn student<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  PathParam(student_id): PathParam<Uuid>,
) -> Result<Json<StudentAnalytics>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require_view(student_id)?;
  require_student(state.store.as_ref(), student_id).await?;

  let attempts = state
    .store
    .list_attempts(&latest_attempts(student_id, state.windows.student_attempts))
    .await
    .map_err(ApiError::store)?;
  let samples = state
    .store
    .list_health(&HealthQuery::latest(student_id, state.windows.student_health))
    .await
    .map_err(ApiError::store)?;

  Ok(Json(student_analytics(student_id, attempts, samples)))
}

/// `GET /analytics/teacher/dashboard`
pub async fn teacher<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
) -> Result<Json<TeacherDashboard>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require(Role::Teacher)?;

  let roster = state
    .store
    .list_users(Some(Role::Student))
    .await
    .map_err(ApiError::store)?;
  let attempts = state
    .store
    .list_attempts(&AttemptQuery::default())
    .await
    .map_err(ApiError::store)?;
  let recent = state
    .store
    .list_attempts(&AttemptQuery {
      limit: Some(state.windows.recent_attempts),
      ..Default::default()
    })
    .await
    .map_err(ApiError::store)?;

  let mut latest_samples = Vec::new();
  for student in &roster {
    let mut newest = state
      .store
      .list_health(&HealthQuery::latest(student.user_id, 1))
      .await
      .map_err(ApiError::store)?;
    latest_samples.append(&mut newest);
  }

  tracing::debug!(
    students = roster.len(),
    attempts = attempts.len(),
    "building teacher dashboard"
  );
  Ok(Json(teacher_dashboard(&roster, &attempts, recent, &latest_samples)))
}

/// `GET /analytics/parent/{child_id}`
pub async fn parent<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  PathParam(child_id): PathParam<Uuid>,
) -> Result<Json<ParentDashboard>, ApiError>
where
  S: RecordStore + 'static,
{
  if !caller.0.is_parent_of(child_id) {
    tracing::warn!(caller = %caller.id(), %child_id, "parent dashboard denied");
    return Err(ApiError::Forbidden(format!(
      "not authorized to view the dashboard of student {child_id}"
    )));
  }
  let child = require_student(state.store.as_ref(), child_id).await?;

  let attempts = state
    .store
    .list_attempts(&latest_attempts(child_id, state.windows.student_attempts))
    .await
    .map_err(ApiError::store)?;
  let samples = state
    .store
    .list_health(&HealthQuery::latest(child_id, state.windows.parent_health))
    .await
    .map_err(ApiError::store)?;

  Ok(Json(parent_dashboard(&child, attempts, samples)))
}

/// `GET /analytics/students` (also `/analytics/students/all`)
pub async fn roster<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
) -> Result<Json<Vec<RosterEntry>>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require(Role::Teacher)?;

  let students = state
    .store
    .list_users(Some(Role::Student))
    .await
    .map_err(ApiError::store)?;

  let mut entries = Vec::with_capacity(students.len());
  for student in &students {
    let attempts = state
      .store
      .list_attempts(&AttemptQuery {
        student_id: Some(student.user_id),
        ..Default::default()
      })
      .await
      .map_err(ApiError::store)?;
    let samples = state
      .store
      .list_health(&HealthQuery::latest(student.user_id, state.windows.roster_health))
      .await
      .map_err(ApiError::store)?;
    entries.push(roster_entry(student, &attempts, &samples));
  }

  Ok(Json(entries))
}
