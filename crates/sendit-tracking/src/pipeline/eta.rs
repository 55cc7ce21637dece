use chrono::{DateTime, Utc};
use sendit_core::{Error, Result, TrackingId, store::ShipmentStore};
use serde::Serialize;

use super::Tracker;
use crate::{broadcaster::EmitReport, event::TrackingEvent, geocode::Geocoder};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EtaReport {
  pub tracking_id: TrackingId,
  pub eta:         DateTime<Utc>,
  pub emitted:     EmitReport,
}

impl<S, G> Tracker<S, G>
where
  S: ShipmentStore,
  G: Geocoder,
{
  /// Record a new estimated arrival and broadcast it. Allowed in any status.
  pub async fn report_eta(
    &self,
    id: &TrackingId,
    eta: DateTime<Utc>,
  ) -> Result<EtaReport> {
    let _guard = self.locks.lock(id).await;

    let shipment = self
      .store
      .update_shipment_eta(id, eta)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(id.clone()))?;

    let eta = shipment.eta.unwrap_or(eta);
    let emitted = self.broadcaster.emit(&TrackingEvent::eta(id.clone(), eta));
    Ok(EtaReport { tracking_id: id.clone(), eta, emitted })
  }
}
