//! HTTP server wiring for the patrol scheduler.
//!
//! Mounts the JSON API from `patrol-api` under `/api` on top of a
//! [`SqliteStore`], with request tracing.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use patrol_core::window::SlotLength;
use patrol_store_sqlite::{SqliteStore, StoreOptions};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PATROL_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  /// Minutes every patrol is assumed to occupy from its start time.
  pub slot_minutes:    u32,
  pub busy_timeout_ms: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:            "127.0.0.1".to_string(),
      port:            8080,
      store_path:      PathBuf::from("~/.local/share/patrol/patrol.db"),
      slot_minutes:    SlotLength::DEFAULT_MINUTES,
      busy_timeout_ms: 5_000,
    }
  }
}

impl ServerConfig {
  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      slot:         SlotLength::minutes(self.slot_minutes),
      busy_timeout: Duration::from_millis(self.busy_timeout_ms),
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router(store: SqliteStore) -> Router {
  Router::new()
    .nest("/api", patrol_api::api_router(Arc::new(store)))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use config::{Config, File, FileFormat};
  use tower::ServiceExt as _;

  #[test]
  fn partial_config_keeps_defaults() {
    let cfg: ServerConfig = Config::builder()
      .add_source(File::from_str("port = 9000\nslot_minutes = 90", FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.address(), "127.0.0.1:9000");
    assert_eq!(cfg.store_options().slot, SlotLength::minutes(90));
    assert_eq!(cfg.store_options().busy_timeout, Duration::from_secs(5));
  }

  #[test]
  fn empty_config_is_valid() {
    let cfg: ServerConfig = Config::builder().build().unwrap().try_deserialize().unwrap();
    assert_eq!(cfg.slot_minutes, SlotLength::DEFAULT_MINUTES);
  }

  #[tokio::test]
  async fn api_is_nested() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let app = router(store);

    let resp = app
      .clone()
      .oneshot(Request::get("/api/staff").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&bytes).unwrap(), serde_json::json!([]));

    let resp = app
      .oneshot(Request::get("/staff").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
