//! JSON REST API for Pulse.
//!
//! Exposes an axum [`Router`] backed by any [`pulse_core::store::RecordStore`].
//! The caller is identified by the `X-User-Id` header (see [`caller`]);
//! authentication and TLS are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", pulse_api::api_router(ApiState::new(store, windows)))
//! ```

pub mod analytics;
pub mod attendance;
pub mod caller;
pub mod error;
pub mod extract;
pub mod health;
pub mod quizzes;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use pulse_core::{analytics::AnalyticsWindows, store::RecordStore, user::User};
use uuid::Uuid;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:   Arc<S>,
  pub windows: AnalyticsWindows,
}

impl<S> ApiState<S> {
  pub fn new(store: Arc<S>, windows: AnalyticsWindows) -> Self { Self { store, windows } }
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), windows: self.windows }
  }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: RecordStore + 'static,
{
  Router::new()
    // Attendance
    .route("/attendance/mark", post(attendance::mark::<S>))
    .route("/attendance/mark-bulk", post(attendance::mark_bulk::<S>))
    .route("/attendance/date/{date}", get(attendance::by_date::<S>))
    .route("/attendance/student/{student_id}", get(attendance::student::<S>))
    .route("/attendance/statistics", get(attendance::statistics::<S>))
    .route("/attendance/{id}", delete(attendance::delete::<S>))
    // Quizzes
    .route("/quizzes", get(quizzes::list::<S>).post(quizzes::create::<S>))
    .route("/quizzes/attempts/mine", get(quizzes::my_attempts::<S>))
    .route(
      "/quizzes/{id}",
      get(quizzes::get_one::<S>)
        .put(quizzes::update::<S>)
        .delete(quizzes::delete::<S>),
    )
    .route("/quizzes/{id}/attempt", post(quizzes::submit::<S>))
    .route("/quizzes/{id}/attempts", get(quizzes::quiz_attempts::<S>))
    // Health
    .route("/health", post(health::record::<S>))
    .route("/health/simulate/{student_id}", post(health::simulate::<S>))
    .route("/health/{student_id}", get(health::history::<S>))
    .route("/health/{student_id}/analytics", get(health::analytics::<S>))
    // Analytics
    .route("/analytics/student/{id}", get(analytics::student::<S>))
    .route("/analytics/teacher/dashboard", get(analytics::teacher::<S>))
    .route("/analytics/parent/{child_id}", get(analytics::parent::<S>))
    .route("/analytics/students", get(analytics::roster::<S>))
    .route("/analytics/students/all", get(analytics::roster::<S>))
    .with_state(state)
}

/// Resolve `id` to a user with the student role.
pub(crate) async fn require_student<S>(store: &S, id: Uuid) -> Result<User, ApiError>
where
  S: RecordStore,
{
  match store.get_user(id).await.map_err(ApiError::store)? {
    Some(user) if user.is_student() => Ok(user),
    _ => Err(pulse_core::Error::StudentNotFound(id).into()),
  }
}
