//! Outbound tracking events — the wire messages subscribers receive.
//!
//! ```json
//! { "trackingId": "T1", "kind": "status",
//!   "payload": { "previous": "pending", "status": "assigned" },
//!   "emittedAt": "2025-01-01T00:00:00Z" }
//! ```
//!
//! Events are projections of a persisted change at the moment of emission;
//! they are never stored.

use chrono::{DateTime, Utc};
use sendit_core::{Coordinate, ParcelStatus, RoutePoint, TrackingId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
  pub tracking_id: TrackingId,
  #[serde(flatten)]
  pub payload:     EventPayload,
  pub emitted_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum EventPayload {
  Location(LocationPayload),
  Status(StatusPayload),
  Eta(EtaPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
  pub lat:     f64,
  pub lng:     f64,
  /// Empty when reverse geocoding failed.
  pub address: String,
  pub status:  ParcelStatus,
  /// Most recent route points, newest first.
  pub route:   Vec<RoutePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
  pub previous:     ParcelStatus,
  pub status:       ParcelStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtaPayload {
  pub eta: DateTime<Utc>,
}

impl TrackingEvent {
  fn now(tracking_id: TrackingId, payload: EventPayload) -> Self {
    Self { tracking_id, payload, emitted_at: Utc::now() }
  }

  pub fn location(
    tracking_id: TrackingId,
    at: Coordinate,
    address: String,
    status: ParcelStatus,
    route: Vec<RoutePoint>,
  ) -> Self {
    Self::now(
      tracking_id,
      EventPayload::Location(LocationPayload {
        lat: at.lat,
        lng: at.lng,
        address,
        status,
        route,
      }),
    )
  }

  pub fn status(
    tracking_id: TrackingId,
    previous: ParcelStatus,
    status: ParcelStatus,
    notes: Option<String>,
    delivered_at: Option<DateTime<Utc>>,
  ) -> Self {
    Self::now(
      tracking_id,
      EventPayload::Status(StatusPayload {
        previous,
        status,
        notes,
        delivered_at,
      }),
    )
  }

  pub fn eta(tracking_id: TrackingId, eta: DateTime<Utc>) -> Self {
    Self::now(tracking_id, EventPayload::Eta(EtaPayload { eta }))
  }

  /// The `kind` discriminant as it appears on the wire.
  pub fn kind(&self) -> &'static str {
    match self.payload {
      EventPayload::Location(_) => "location",
      EventPayload::Status(_) => "status",
      EventPayload::Eta(_) => "eta",
    }
  }
}
