//! HTTP and realtime front end for SendIt tracking.
//!
//! Assembles the JSON API (`/api`, from `sendit-api`) and the WebSocket
//! tracking endpoint (`/ws`) over one shared [`Tracker`], with bearer-token
//! authentication in front of both.

pub mod auth;
pub mod error;
pub mod ws;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware, routing::get};
use config::{ConfigError, Source};
use sendit_core::store::ShipmentStore;
use sendit_tracking::{
  CredentialVerifier, Geocoder, GeocoderConfig, Tracker, TrackingConfig,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SENDIT_*` environment variables (nested keys use `__`, e.g.
/// `SENDIT_GEOCODER__ENABLED=false`).
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub jwt_secret: String,
  #[serde(default)]
  pub geocoder:   GeocoderConfig,
  #[serde(default)]
  pub tracking:   TrackingConfig,
}

impl ServerConfig {
  /// Load from the TOML file at `path` (optional) layered under the
  /// environment.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
    Self::from_source(config::File::from(path.into()).required(false))
  }

  fn from_source<T>(file: T) -> Result<Self, ConfigError>
  where
    T: Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 3000)?
      .set_default("store_path", "~/.local/share/sendit/sendit.db")?
      .add_source(file)
      .add_source(
        config::Environment::with_prefix("SENDIT")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the realtime handler.
pub struct AppState<S, G> {
  pub tracker:      Arc<Tracker<S, G>>,
  pub verifier:     Arc<dyn CredentialVerifier>,
  /// Upper bound on a single socket write.
  pub send_timeout: Duration,
}

impl<S, G> Clone for AppState<S, G> {
  fn clone(&self) -> Self {
    Self {
      tracker:      self.tracker.clone(),
      verifier:     self.verifier.clone(),
      send_timeout: self.send_timeout,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S, G>(state: AppState<S, G>) -> Router
where
  S: ShipmentStore + 'static,
  G: Geocoder + 'static,
{
  let api = sendit_api::api_router(state.tracker.clone()).layer(
    middleware::from_fn_with_state(state.verifier.clone(), auth::attach_identity),
  );

  Router::new()
    .route("/ws", get(ws::handler::<S, G>))
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
