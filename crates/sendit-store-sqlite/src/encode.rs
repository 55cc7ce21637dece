//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, statuses as their snake_case
//! names and the opaque shipment details as compact JSON.

use chrono::{DateTime, Utc};
use sendit_core::{Coordinate, ParcelStatus, RoutePoint, Shipment, TrackingId};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── ParcelStatus ────────────────────────────────────────────────────────────

pub fn encode_status(s: ParcelStatus) -> &'static str { s.as_str() }

pub fn decode_status(s: &str) -> Result<ParcelStatus> {
  Ok(ParcelStatus::parse(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawShipment::from_row`].
pub const SHIPMENT_COLUMNS: &str = "tracking_id, status, current_lat, \
                                    current_lng, current_address, carrier_id, \
                                    delivered_at, eta, details, created_at, \
                                    updated_at";

/// Raw values read directly from a `shipments` row.
pub struct RawShipment {
  pub tracking_id:     String,
  pub status:          String,
  pub current_lat:     Option<f64>,
  pub current_lng:     Option<f64>,
  pub current_address: Option<String>,
  pub carrier_id:      Option<String>,
  pub delivered_at:    Option<String>,
  pub eta:             Option<String>,
  pub details:         String,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawShipment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      tracking_id:     row.get(0)?,
      status:          row.get(1)?,
      current_lat:     row.get(2)?,
      current_lng:     row.get(3)?,
      current_address: row.get(4)?,
      carrier_id:      row.get(5)?,
      delivered_at:    row.get(6)?,
      eta:             row.get(7)?,
      details:         row.get(8)?,
      created_at:      row.get(9)?,
      updated_at:      row.get(10)?,
    })
  }

  pub fn into_shipment(self) -> Result<Shipment> {
    let current = match (self.current_lat, self.current_lng) {
      (Some(lat), Some(lng)) => Some(Coordinate { lat, lng }),
      _ => None,
    };

    Ok(Shipment {
      tracking_id: TrackingId::new(self.tracking_id),
      status: decode_status(&self.status)?,
      current,
      current_address: self.current_address,
      carrier_id: self.carrier_id,
      delivered_at: decode_opt_dt(self.delivered_at)?,
      eta: decode_opt_dt(self.eta)?,
      details: serde_json::from_str(&self.details)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `route_points` row.
pub struct RawRoutePoint {
  pub lat:         f64,
  pub lng:         f64,
  pub recorded_at: String,
}

impl RawRoutePoint {
  pub fn into_route_point(self) -> Result<RoutePoint> {
    Ok(RoutePoint {
      lat:       self.lat,
      lng:       self.lng,
      timestamp: decode_dt(&self.recorded_at)?,
    })
  }
}
