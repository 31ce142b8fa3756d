//! Handlers for `/attendance` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/attendance/mark` | Teacher. Body: [`MarkBody`] |
//! | `POST`   | `/attendance/mark-bulk` | Teacher. Body: [`BulkBody`]; per-item errors |
//! | `GET`    | `/attendance/date/{date}` | Teacher. Optional `?subject` |
//! | `GET`    | `/attendance/student/{student_id}` | Optional `?start_date&end_date&subject` |
//! | `GET`    | `/attendance/statistics` | Teacher. Optional `?start_date&end_date` |
//! | `DELETE` | `/attendance/{id}` | Teacher |

use axum::{Json, extract::State};
use chrono::NaiveDate;
use pulse_core::{
  attendance::{
    AttendanceRecord, AttendanceStatistics, AttendanceStatus, DailyAttendance,
    DateRange, MarkAttendance, StudentReport, UpsertOutcome, attendance_statistics,
    normalize_subject, reconcile_day, student_report,
  },
  store::{AttendanceQuery, RecordStore},
  user::Role,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  ApiState,
  caller::Caller,
  error::ApiError,
  extract::{JsonBody, PathParam, QueryParams},
  require_student,
};

// ─── Mark ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MarkBody {
  pub student_id: Uuid,
  /// Defaults to today (UTC).
  pub date:       Option<NaiveDate>,
  /// Defaults to `"General"`.
  pub subject:    Option<String>,
  pub status:     AttendanceStatus,
  pub notes:      Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarkResponse {
  pub attendance: AttendanceRecord,
  /// Informational only.
  pub outcome:    UpsertOutcome,
}

/// Validate the student, then write the slot through the store's upsert.
async fn mark_one<S>(store: &S, input: MarkAttendance) -> Result<MarkResponse, ApiError>
where
  S: RecordStore,
{
  require_student(store, input.student_id).await?;

  let (attendance, outcome) = store
    .upsert_attendance(input)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(
    attendance_id = %attendance.attendance_id,
    student_id = %attendance.student_id,
    date = %attendance.date,
    subject = %attendance.subject,
    status = %attendance.status,
    ?outcome,
    "attendance marked"
  );
  Ok(MarkResponse { attendance, outcome })
}

/// `POST /attendance/mark`
pub async fn mark<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  JsonBody(body): JsonBody<MarkBody>,
) -> Result<Json<MarkResponse>, ApiError>
where
  S: RecordStore + 'static,
{
  let teacher = caller.require(Role::Teacher)?;
  let input = MarkAttendance::new(
    body.student_id,
    teacher.user_id,
    body.status,
    body.date,
    body.subject.as_deref(),
    body.notes,
  );
  Ok(Json(mark_one(state.store.as_ref(), input).await?))
}

// ─── Bulk mark ───────────────────────────────────────────────────────────────

/// One entry of [`BulkBody::records`]. Fields are kept as text so a
/// malformed id or status fails only its own item.
#[derive(Debug, Deserialize)]
pub struct BulkItem {
  #[serde(default)]
  pub student_id: String,
  #[serde(default)]
  pub status:     String,
  pub notes:      Option<String>,
}

impl BulkItem {
  fn parse(&self) -> Result<(Uuid, AttendanceStatus), ApiError> {
    let student_id = Uuid::parse_str(self.student_id.trim())
      .map_err(|e| ApiError::BadRequest(format!("invalid student id: {e}")))?;
    let status = self
      .status
      .trim()
      .parse::<AttendanceStatus>()
      .map_err(|_| ApiError::BadRequest(format!("invalid status: {:?}", self.status)))?;
    Ok((student_id, status))
  }
}

#[derive(Debug, Deserialize)]
pub struct BulkBody {
  /// Raw items; each is decoded on its own.
  #[serde(alias = "attendance_records", alias = "attendanceRecords")]
  pub records: Vec<Value>,
  pub date:    Option<NaiveDate>,
  pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkError {
  pub student_id: String,
  pub error:      String,
}

#[derive(Debug, Serialize)]
pub struct BulkResponse {
  pub results: Vec<MarkResponse>,
  pub errors:  Vec<BulkError>,
}

/// The `student_id` of a raw item as reported back in `errors`.
fn item_label(raw: &Value) -> String {
  match raw.get("student_id") {
    Some(Value::String(id)) => id.clone(),
    Some(other) => other.to_string(),
    None => String::new(),
  }
}

/// `POST /attendance/mark-bulk`
///
/// Items are applied one after another; a failing item is reported in
/// `errors` and does not undo or stop the others.
pub async fn mark_bulk<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  JsonBody(body): JsonBody<BulkBody>,
) -> Result<Json<BulkResponse>, ApiError>
where
  S: RecordStore + 'static,
{
  let teacher_id = caller.require(Role::Teacher)?.user_id;
  let date = body.date.unwrap_or_else(|| chrono::Utc::now().date_naive());

  let mut results = Vec::with_capacity(body.records.len());
  let mut errors = Vec::new();

  for raw in body.records {
    let label = item_label(&raw);
    let outcome = match serde_json::from_value::<BulkItem>(raw) {
      Ok(item) => match item.parse() {
        Ok((student_id, status)) => {
          let input = MarkAttendance::new(
            student_id,
            teacher_id,
            status,
            Some(date),
            body.subject.as_deref(),
            item.notes,
          );
          mark_one(state.store.as_ref(), input).await
        }
        Err(e) => Err(e),
      },
      Err(e) => Err(ApiError::BadRequest(format!("invalid record: {e}"))),
    };

    match outcome {
      Ok(marked) => results.push(marked),
      Err(e) => {
        tracing::warn!(student_id = %label, error = %e, "bulk mark item failed");
        errors.push(BulkError { student_id: label, error: e.to_string() });
      }
    }
  }

  Ok(Json(BulkResponse { results, errors }))
}

// ─── By date ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubjectParams {
  pub subject: Option<String>,
}

/// `GET /attendance/date/{date}[?subject=…]`
pub async fn by_date<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  PathParam(date): PathParam<NaiveDate>,
  QueryParams(params): QueryParams<SubjectParams>,
) -> Result<Json<DailyAttendance>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require(Role::Teacher)?;

  let query = AttendanceQuery {
    date: Some(date),
    subject: params.subject.map(|s| normalize_subject(Some(&s))),
    ..Default::default()
  };
  let records = state
    .store
    .list_attendance(&query)
    .await
    .map_err(ApiError::store)?;
  let roster = state
    .store
    .list_users(Some(Role::Student))
    .await
    .map_err(ApiError::store)?;

  tracing::debug!(%date, records = records.len(), roster = roster.len(), "reconciling day");
  Ok(Json(reconcile_day(date, records, &roster)))
}

// ─── Student report ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReportParams {
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
  pub subject:    Option<String>,
}

/// `GET /attendance/student/{student_id}[?start_date&end_date&subject]`
pub async fn student<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  PathParam(student_id): PathParam<Uuid>,
  QueryParams(params): QueryParams<ReportParams>,
) -> Result<Json<StudentReport>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require_view(student_id)?;
  let range = DateRange::new(params.start_date, params.end_date)?;
  require_student(state.store.as_ref(), student_id).await?;

  let query = AttendanceQuery {
    student_id: Some(student_id),
    range,
    subject: params.subject.map(|s| normalize_subject(Some(&s))),
    ..Default::default()
  };
  let records = state
    .store
    .list_attendance(&query)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(student_report(records)))
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RangeParams {
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
}

/// `GET /attendance/statistics[?start_date&end_date]`
pub async fn statistics<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  QueryParams(params): QueryParams<RangeParams>,
) -> Result<Json<AttendanceStatistics>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require(Role::Teacher)?;
  let range = DateRange::new(params.start_date, params.end_date)?;

  let query = AttendanceQuery { range, ..Default::default() };
  let records = state
    .store
    .list_attendance(&query)
    .await
    .map_err(ApiError::store)?;
  let roster = state
    .store
    .list_users(Some(Role::Student))
    .await
    .map_err(ApiError::store)?;

  Ok(Json(attendance_statistics(&records, &roster)))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /attendance/{id}`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  caller: Caller,
  PathParam(id): PathParam<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: RecordStore + 'static,
{
  caller.require(Role::Teacher)?;

  let record = state
    .store
    .get_attendance(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(pulse_core::Error::AttendanceNotFound(id))?;

  let deleted = state
    .store
    .delete_attendance(id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(pulse_core::Error::AttendanceNotFound(id).into());
  }

  tracing::info!(
    attendance_id = %id,
    student_id = %record.student_id,
    date = %record.date,
    teacher_id = %caller.id(),
    "attendance deleted"
  );
  Ok(Json(json!({ "success": true, "deleted": id })))
}
