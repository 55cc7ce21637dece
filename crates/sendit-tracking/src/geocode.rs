//! Reverse geocoding of driver positions.
//!
//! Lookups are best effort. The location pipeline bounds every call with a
//! timeout and falls back to an empty address, so a slow or failing provider
//! never blocks a location update.

use std::{future::Future, time::Duration};

use reqwest::Client;
use sendit_core::{Coordinate, Error, Result};
use serde::Deserialize;

/// Resolves a coordinate to a human-readable address.
pub trait Geocoder: Send + Sync {
  /// Returns [`Error::UpstreamUnavailable`] when the provider cannot be
  /// reached or answers with an error.
  fn reverse_geocode(
    &self,
    at: Coordinate,
  ) -> impl Future<Output = Result<String>> + Send + '_;
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
  /// When false every lookup resolves to an empty address without a request.
  pub enabled:    bool,
  pub base_url:   String,
  /// Nominatim's usage policy requires an identifying user agent.
  pub user_agent: String,
  pub timeout_ms: u64,
}

impl Default for GeocoderConfig {
  fn default() -> Self {
    Self {
      enabled:    true,
      base_url:   "https://nominatim.openstreetmap.org/reverse".into(),
      user_agent: "SendItApp/1.0".into(),
      timeout_ms: 3000,
    }
  }
}

impl GeocoderConfig {
  pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
}

// ─── Nominatim ───────────────────────────────────────────────────────────────

/// Client for a Nominatim-compatible `/reverse` endpoint.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct NominatimGeocoder {
  client:   Client,
  base_url: String,
}

#[derive(Deserialize)]
struct ReverseResponse {
  #[serde(default)]
  display_name: Option<String>,
}

impl NominatimGeocoder {
  pub fn new(config: &GeocoderConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout())
      .user_agent(config.user_agent.clone())
      .build()
      .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;
    Ok(Self { client, base_url: config.base_url.clone() })
  }

  async fn lookup(&self, at: Coordinate) -> Result<String> {
    let unavailable = |e: reqwest::Error| Error::UpstreamUnavailable(e.to_string());

    let resp = self
      .client
      .get(&self.base_url)
      .query(&[
        ("format", "json".to_string()),
        ("lat", at.lat.to_string()),
        ("lon", at.lng.to_string()),
      ])
      .send()
      .await
      .map_err(unavailable)?;

    if !resp.status().is_success() {
      return Err(Error::UpstreamUnavailable(format!(
        "reverse geocode → {}",
        resp.status()
      )));
    }

    let body: ReverseResponse = resp.json().await.map_err(unavailable)?;
    Ok(body.display_name.unwrap_or_default())
  }
}

impl Geocoder for NominatimGeocoder {
  fn reverse_geocode(
    &self,
    at: Coordinate,
  ) -> impl Future<Output = Result<String>> + Send + '_ {
    self.lookup(at)
  }
}

// ─── Runtime selection ───────────────────────────────────────────────────────

/// The geocoder chosen by configuration.
#[derive(Clone)]
pub enum GeocodeClient {
  Nominatim(NominatimGeocoder),
  Disabled,
}

impl GeocodeClient {
  pub fn from_config(config: &GeocoderConfig) -> Result<Self> {
    if config.enabled {
      Ok(Self::Nominatim(NominatimGeocoder::new(config)?))
    } else {
      Ok(Self::Disabled)
    }
  }
}

impl Geocoder for GeocodeClient {
  fn reverse_geocode(
    &self,
    at: Coordinate,
  ) -> impl Future<Output = Result<String>> + Send + '_ {
    async move {
      match self {
        Self::Nominatim(g) => g.lookup(at).await,
        Self::Disabled => Ok(String::new()),
      }
    }
  }
}
