use chrono::Utc;
use sendit_core::{
  Error, ParcelStatus, Result, Shipment, TrackingId, Transition,
  store::{ShipmentStore, StatusChange, StatusWrite},
};
use serde::Serialize;

use super::Tracker;
use crate::{
  broadcaster::EmitReport,
  event::TrackingEvent,
  geocode::Geocoder,
  notify::Notice,
};

/// Outcome of a successful [`Tracker::report_status`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
  pub previous: ParcelStatus,
  pub shipment: Shipment,
  pub emitted:  EmitReport,
}

impl<S, G> Tracker<S, G>
where
  S: ShipmentStore,
  G: Geocoder,
{
  /// Move a shipment to `requested` and broadcast the change.
  ///
  /// Fails with [`Error::InvalidTransition`] naming both statuses when the
  /// lifecycle does not permit the move, and with
  /// [`Error::PersistenceConflict`] when another writer changed the status
  /// first. Neither case persists or broadcasts anything.
  pub async fn report_status(
    &self,
    id: &TrackingId,
    requested: ParcelStatus,
    notes: Option<String>,
  ) -> Result<StatusReport> {
    let _guard = self.locks.lock(id).await;

    let current = self
      .store
      .get_shipment_status(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(id.clone()))?;

    let transition = Transition::validate(current, requested).inspect_err(|_| {
      tracing::info!(
        tracking_id = %id,
        from = %current,
        to = %requested,
        "rejected status transition"
      );
    })?;

    let change = StatusChange::from_transition(transition, Utc::now());
    let shipment = match self
      .store
      .update_shipment_status(id, change)
      .await
      .map_err(Error::store)?
    {
      StatusWrite::Applied(shipment) => shipment,
      StatusWrite::Conflict { actual } => {
        return Err(Error::PersistenceConflict {
          tracking_id: id.clone(),
          expected: current,
          actual,
        });
      }
      StatusWrite::Missing => return Err(Error::NotFound(id.clone())),
    };

    if shipment.status.is_terminal() {
      self.ledger.forget(id);
    }

    let event = TrackingEvent::status(
      id.clone(),
      current,
      shipment.status,
      notes.clone(),
      shipment.delivered_at,
    );
    let emitted = self.broadcaster.emit(&event);

    if let Some(trigger) = transition.notification() {
      self.notifier.notify(Notice {
        tracking_id: id.clone(),
        trigger,
        status: shipment.status,
        at: shipment.updated_at,
        notes,
      });
    }

    tracing::info!(
      tracking_id = %id,
      from = %current,
      to = %shipment.status,
      "status updated"
    );
    Ok(StatusReport { previous: current, shipment, emitted })
  }
}
