//! Public tracking lookups and room diagnostics.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::{DateTime, Utc};
use sendit_core::{
  Coordinate, Error, ParcelStatus, RoutePoint, TrackingId, store::ShipmentStore,
};
use sendit_tracking::{Geocoder, RoomSummary, Tracker};
use serde::Serialize;

use crate::{caller::Admin, error::ApiError};

/// What anyone holding a tracking id may see.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingView {
  pub tracking_id:     TrackingId,
  pub status:          ParcelStatus,
  pub current:         Option<Coordinate>,
  pub current_address: Option<String>,
  pub delivered_at:    Option<DateTime<Utc>>,
  pub eta:             Option<DateTime<Utc>>,
  /// Newest first.
  pub route:           Vec<RoutePoint>,
}

/// `GET /track/{id}`
pub async fn get_one<S, G>(
  State(tracker): State<Arc<Tracker<S, G>>>,
  Path(id): Path<TrackingId>,
) -> Result<Json<TrackingView>, ApiError>
where
  S: ShipmentStore + 'static,
  G: Geocoder + 'static,
{
  let shipment = tracker
    .store()
    .get_shipment(&id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(id.clone()))?;
  let route = tracker.recent_route(&id).await?;

  Ok(Json(TrackingView {
    tracking_id: shipment.tracking_id,
    status: shipment.status,
    current: shipment.current,
    current_address: shipment.current_address,
    delivered_at: shipment.delivered_at,
    eta: shipment.eta,
    route,
  }))
}

/// `GET /rooms` — admin only.
pub async fn rooms<S, G>(
  State(tracker): State<Arc<Tracker<S, G>>>,
  _admin: Admin,
) -> Json<Vec<RoomSummary>>
where
  S: ShipmentStore + 'static,
  G: Geocoder + 'static,
{
  Json(tracker.broadcaster().registry().rooms())
}
