use chrono::Utc;
use sendit_core::{
  Coordinate, Error, ParcelStatus, Result, RoutePoint, TrackingId,
  store::ShipmentStore,
};
use serde::Serialize;

use super::Tracker;
use crate::{broadcaster::EmitReport, event::TrackingEvent, geocode::Geocoder};

/// Outcome of a successful [`Tracker::report_location`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationReport {
  pub tracking_id: TrackingId,
  pub point:       RoutePoint,
  /// Empty when reverse geocoding failed or timed out.
  pub address:     String,
  pub status:      ParcelStatus,
  pub emitted:     EmitReport,
}

impl<S, G> Tracker<S, G>
where
  S: ShipmentStore,
  G: Geocoder,
{
  /// Record a driver's position and broadcast it to the shipment's room.
  ///
  /// Geocoding is best effort; a failed lookup leaves the address empty.
  /// A failed write aborts the report before anything is broadcast.
  pub async fn report_location(
    &self,
    id: &TrackingId,
    at: Coordinate,
  ) -> Result<LocationReport> {
    let at = Coordinate::new(at.lat, at.lng)?;

    if self
      .store
      .get_shipment_status(id)
      .await
      .map_err(Error::store)?
      .is_none()
    {
      return Err(Error::NotFound(id.clone()));
    }

    // Outside the lock: a slow provider must not hold up status updates.
    let address = self.resolve_address(id, at).await;

    let _guard = self.locks.lock(id).await;
    self.warm_ledger(id).await?;

    let point = self.ledger.stamp(id, at, Utc::now());
    let shipment = self
      .store
      .record_location(id, point, address.clone())
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(id.clone()))?;
    self.ledger.append(id, point);

    let event = TrackingEvent::location(
      id.clone(),
      at,
      address.clone(),
      shipment.status,
      self.ledger.recent(id),
    );
    let emitted = self.broadcaster.emit(&event);

    Ok(LocationReport {
      tracking_id: id.clone(),
      point,
      address,
      status: shipment.status,
      emitted,
    })
  }

  /// The most recent route points for `id`, newest first.
  pub async fn recent_route(&self, id: &TrackingId) -> Result<Vec<RoutePoint>> {
    if self.ledger.is_warm(id) {
      return Ok(self.ledger.recent(id));
    }
    self
      .store
      .route_points(id, self.ledger.window())
      .await
      .map_err(Error::store)
  }

  async fn resolve_address(&self, id: &TrackingId, at: Coordinate) -> String {
    match tokio::time::timeout(
      self.geocode_timeout,
      self.geocoder.reverse_geocode(at),
    )
    .await
    {
      Ok(Ok(address)) => address,
      Ok(Err(e)) => {
        tracing::warn!(tracking_id = %id, error = %e, "reverse geocode failed");
        String::new()
      }
      Err(_) => {
        tracing::warn!(
          tracking_id = %id,
          timeout_ms = self.geocode_timeout.as_millis() as u64,
          "reverse geocode timed out"
        );
        String::new()
      }
    }
  }

  async fn warm_ledger(&self, id: &TrackingId) -> Result<()> {
    if self.ledger.is_warm(id) {
      return Ok(());
    }
    let persisted = self
      .store
      .route_points(id, self.ledger.window())
      .await
      .map_err(Error::store)?;
    self.ledger.warm(id, persisted);
    Ok(())
  }
}
