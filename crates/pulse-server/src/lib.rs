//! HTTP server assembly for Pulse.
//!
//! Loads [`ServerConfig`], nests the JSON API under `/api` and wraps it in
//! request tracing. The binary in `main.rs` is a thin shell around this.

use std::path::{Path, PathBuf};

use axum::Router;
use pulse_api::{ApiState, api_router};
use pulse_core::{analytics::AnalyticsWindows, store::RecordStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PULSE_*` environment variables. Every field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// SQLite database file; a leading `~/` is expanded.
  pub store_path: PathBuf,
  pub analytics:  AnalyticsWindows,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       8080,
      store_path: PathBuf::from("~/.local/share/pulse/pulse.db"),
      analytics:  AnalyticsWindows::default(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Layer the optional TOML file at `path` under the environment.
///
/// Nested keys use a double underscore, e.g.
/// `PULSE_ANALYTICS__RECENT_ATTEMPTS=100`.
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("PULSE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()?
    .try_deserialize()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the API under `/api`, traced per request.
pub fn app<S>(state: ApiState<S>) -> Router
where
  S: RecordStore + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use pulse_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    assert_eq!(from_toml(""), ServerConfig::default());
  }

  #[test]
  fn partial_config_keeps_other_defaults() {
    let cfg = from_toml(
      r#"
        port = 9090
        store_path = "/var/lib/pulse/pulse.db"

        [analytics]
        recent_attempts = 200
      "#,
    );
    assert_eq!(cfg.port, 9090);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/pulse/pulse.db"));
    assert_eq!(cfg.analytics.recent_attempts, 200);
    assert_eq!(cfg.analytics.student_attempts, 10);
    assert_eq!(cfg.address(), "127.0.0.1:9090");
  }

  #[test]
  fn missing_file_is_not_an_error() {
    let cfg = load_config(Path::new("/nonexistent/pulse.toml")).unwrap();
    assert_eq!(cfg.analytics, AnalyticsWindows::default());
  }

  #[test]
  fn tilde_expands_to_home() {
    let home = std::env::var("HOME").unwrap_or_default();
    let expanded = expand_tilde(Path::new("~/pulse.db"));
    if !home.is_empty() {
      assert_eq!(expanded, PathBuf::from(home).join("pulse.db"));
    }
    assert_eq!(expand_tilde(Path::new("/tmp/pulse.db")), PathBuf::from("/tmp/pulse.db"));
  }

  #[tokio::test]
  async fn api_is_nested_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let state = ApiState::new(Arc::new(store), AnalyticsWindows::default());

    let req = Request::builder().uri("/api/quizzes").body(Body::empty()).unwrap();
    let resp = app(state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder().uri("/quizzes").body(Body::empty()).unwrap();
    let resp = app(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
