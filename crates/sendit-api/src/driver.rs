//! Handlers for driver report endpoints.
//!
//! | Method  | Path | Body |
//! |---------|------|------|
//! | `PATCH` | `/driver/shipments/{id}/location` | `{"lat":..,"lng":..}` |
//! | `PATCH` | `/driver/shipments/{id}/status`   | `{"status":"assigned","notes":".."}` |
//! | `PATCH` | `/driver/shipments/{id}/eta`      | `{"eta":"2025-01-01T12:00:00Z"}` |
//!
//! Every route requires the caller to be the shipment's assigned carrier.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::{DateTime, Utc};
use sendit_core::{
  Coordinate, Error, ParcelStatus, TrackingId, store::ShipmentStore,
};
use sendit_tracking::{
  EtaReport, Geocoder, Identity, LocationReport, StatusReport, Tracker,
};
use serde::Deserialize;

use crate::{caller::Caller, error::ApiError};

/// Reject unless `identity` is the carrier assigned to `id`.
async fn authorize_carrier<S, G>(
  tracker: &Tracker<S, G>,
  id: &TrackingId,
  identity: &Identity,
) -> Result<(), ApiError>
where
  S: ShipmentStore,
  G: Geocoder,
{
  let shipment = tracker
    .store()
    .get_shipment(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(id.clone()))?;

  if shipment.carrier_id.as_deref() == Some(identity.subject.as_str()) {
    Ok(())
  } else {
    tracing::info!(
      tracking_id = %id,
      subject = %identity.subject,
      "report from a driver not assigned to the shipment"
    );
    Err(
      Error::Unauthorized(format!(
        "{} is not the assigned carrier for {id}",
        identity.subject
      ))
      .into(),
    )
  }
}

// ─── Location ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LocationBody {
  pub lat: f64,
  pub lng: f64,
}

/// `PATCH /driver/shipments/{id}/location`
pub async fn location<S, G>(
  State(tracker): State<Arc<Tracker<S, G>>>,
  Path(id): Path<TrackingId>,
  Caller(identity): Caller,
  Json(body): Json<LocationBody>,
) -> Result<Json<LocationReport>, ApiError>
where
  S: ShipmentStore + 'static,
  G: Geocoder + 'static,
{
  let at = Coordinate::new(body.lat, body.lng)?;
  authorize_carrier(&tracker, &id, &identity).await?;
  let report = tracker.report_location(&id, at).await?;
  Ok(Json(report))
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  /// Wire name, e.g. `"out_for_delivery"`.
  pub status: String,
  pub notes:  Option<String>,
}

/// `PATCH /driver/shipments/{id}/status`
pub async fn status<S, G>(
  State(tracker): State<Arc<Tracker<S, G>>>,
  Path(id): Path<TrackingId>,
  Caller(identity): Caller,
  Json(body): Json<StatusBody>,
) -> Result<Json<StatusReport>, ApiError>
where
  S: ShipmentStore + 'static,
  G: Geocoder + 'static,
{
  let requested = ParcelStatus::parse(&body.status)?;
  authorize_carrier(&tracker, &id, &identity).await?;
  let report = tracker.report_status(&id, requested, body.notes).await?;
  Ok(Json(report))
}

// ─── ETA ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EtaBody {
  pub eta: DateTime<Utc>,
}

/// `PATCH /driver/shipments/{id}/eta`
pub async fn eta<S, G>(
  State(tracker): State<Arc<Tracker<S, G>>>,
  Path(id): Path<TrackingId>,
  Caller(identity): Caller,
  Json(body): Json<EtaBody>,
) -> Result<Json<EtaReport>, ApiError>
where
  S: ShipmentStore + 'static,
  G: Geocoder + 'static,
{
  authorize_carrier(&tracker, &id, &identity).await?;
  let report = tracker.report_eta(&id, body.eta).await?;
  Ok(Json(report))
}
