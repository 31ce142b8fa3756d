//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user's id in the `X-User-Id` header. The extractor resolves it against the
//! store so handlers see the caller's role and parent link.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pulse_core::{
  store::RecordStore,
  user::{Role, User},
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

pub const USER_ID_HEADER: &str = "x-user-id";

/// The resolved user making the request.
#[derive(Debug, Clone)]
pub struct Caller(pub User);

impl Caller {
  pub fn id(&self) -> Uuid { self.0.user_id }

  /// Reject callers whose role is not `role`.
  pub fn require(&self, role: Role) -> Result<&User, ApiError> {
    if self.0.role == role {
      Ok(&self.0)
    } else {
      tracing::warn!(caller = %self.0.user_id, role = %self.0.role, "requires {role} role");
      Err(ApiError::Forbidden(format!("this action requires the {role} role")))
    }
  }

  /// Reject callers who may not read `student_id`'s records.
  pub fn require_view(&self, student_id: Uuid) -> Result<(), ApiError> {
    if self.0.can_view_student(student_id) {
      Ok(())
    } else {
      tracing::warn!(caller = %self.0.user_id, %student_id, "denied student view");
      Err(ApiError::Forbidden(format!(
        "not allowed to view records of student {student_id}"
      )))
    }
  }
}

impl<S> FromRequestParts<ApiState<S>> for Caller
where
  S: RecordStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    let id = parts
      .headers
      .get(USER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|s| Uuid::parse_str(s.trim()).ok())
      .ok_or(ApiError::Unauthorized)?;

    let user = state
      .store
      .get_user(id)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    Ok(Caller(user))
  }
}
