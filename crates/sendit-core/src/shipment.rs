//! Shipment — the tracked entity — and its location samples.
//!
//! The tracking core reads and writes only the fields it owns (status,
//! current location, delivered-at, ETA). Everything else a sender records
//! about a shipment travels through untouched in [`Shipment::details`].

use std::{borrow::Borrow, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, status::ParcelStatus};

// ─── Tracking identifier ─────────────────────────────────────────────────────

/// Public, stable handle for a shipment. Anyone holding it may watch the
/// shipment's progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  /// Generate a fresh identifier of the form `SEXP-254-<unix millis>`.
  pub fn generate() -> Self {
    Self(format!("SEXP-254-{}", Utc::now().timestamp_millis()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for TrackingId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl Borrow<str> for TrackingId {
  fn borrow(&self) -> &str { &self.0 }
}

impl From<&str> for TrackingId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for TrackingId {
  fn from(s: String) -> Self { Self(s) }
}

// ─── Coordinate ──────────────────────────────────────────────────────────────

/// A WGS 84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
  pub lat: f64,
  pub lng: f64,
}

impl Coordinate {
  /// Build a coordinate, rejecting non-finite or out-of-range values.
  pub fn new(lat: f64, lng: f64) -> Result<Self> {
    let valid = lat.is_finite()
      && lng.is_finite()
      && (-90.0..=90.0).contains(&lat)
      && (-180.0..=180.0).contains(&lng);
    if valid {
      Ok(Self { lat, lng })
    } else {
      Err(Error::InvalidCoordinate { lat, lng })
    }
  }
}

// ─── Route point ─────────────────────────────────────────────────────────────

/// One timestamped location sample. Append-only: never mutated or reordered
/// once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
  pub lat:       f64,
  pub lng:       f64,
  pub timestamp: DateTime<Utc>,
}

impl RoutePoint {
  pub fn new(at: Coordinate, timestamp: DateTime<Utc>) -> Self {
    Self { lat: at.lat, lng: at.lng, timestamp }
  }

  pub fn coordinate(&self) -> Coordinate {
    Coordinate { lat: self.lat, lng: self.lng }
  }
}

// ─── Shipment ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
  pub tracking_id:     TrackingId,
  pub status:          ParcelStatus,
  pub current:         Option<Coordinate>,
  /// Reverse-geocoded address of `current`; empty when the lookup failed.
  pub current_address: Option<String>,
  /// Subject of the carrier (driver) assigned to this shipment.
  pub carrier_id:      Option<String>,
  pub delivered_at:    Option<DateTime<Utc>>,
  pub eta:             Option<DateTime<Utc>>,
  /// Sender/recipient fields owned by the administrative surface.
  pub details:         serde_json::Value,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to [`crate::store::ShipmentStore::create_shipment`].
///
/// Every shipment starts `pending`; status is not accepted from callers.
#[derive(Debug, Clone, Default)]
pub struct NewShipment {
  /// Generated with [`TrackingId::generate`] when absent.
  pub tracking_id: Option<TrackingId>,
  pub carrier_id:  Option<String>,
  pub details:     serde_json::Value,
}

impl NewShipment {
  pub fn with_id(tracking_id: impl Into<TrackingId>) -> Self {
    Self { tracking_id: Some(tracking_id.into()), ..Self::default() }
  }

  pub fn carrier(mut self, carrier_id: impl Into<String>) -> Self {
    self.carrier_id = Some(carrier_id.into());
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn coordinate_bounds() {
    assert!(Coordinate::new(-1.2921, 36.8219).is_ok());
    assert!(Coordinate::new(90.0, -180.0).is_ok());
    assert!(matches!(
      Coordinate::new(91.0, 0.0),
      Err(Error::InvalidCoordinate { .. })
    ));
    assert!(Coordinate::new(0.0, 180.5).is_err());
    assert!(Coordinate::new(f64::NAN, 0.0).is_err());
  }

  #[test]
  fn generated_ids_carry_the_prefix() {
    let id = TrackingId::generate();
    assert!(id.as_str().starts_with("SEXP-254-"), "{id}");
  }

  #[test]
  fn shipment_serialises_camel_case() {
    let now = Utc::now();
    let s = Shipment {
      tracking_id:     "T1".into(),
      status:          ParcelStatus::InTransit,
      current:         Some(Coordinate { lat: 1.0, lng: 2.0 }),
      current_address: Some(String::new()),
      carrier_id:      None,
      delivered_at:    None,
      eta:             None,
      details:         serde_json::json!({ "recipientName": "Wanjiku" }),
      created_at:      now,
      updated_at:      now,
    };
    let v = serde_json::to_value(&s).unwrap();
    assert_eq!(v["trackingId"], "T1");
    assert_eq!(v["status"], "in_transit");
    assert_eq!(v["currentAddress"], "");
    assert_eq!(v["details"]["recipientName"], "Wanjiku");
  }
}
