//! The `ShipmentStore` trait and supporting write types.
//!
//! The trait is implemented by storage backends (e.g. `sendit-store-sqlite`).
//! The tracking pipelines and the HTTP layer depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  shipment::{Coordinate, NewShipment, RoutePoint, Shipment, TrackingId},
  status::{ParcelStatus, Transition},
};

// ─── Status writes ───────────────────────────────────────────────────────────

/// A conditional status write: applied only while the stored status still
/// equals `expected`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusChange {
  pub expected:     ParcelStatus,
  pub status:       ParcelStatus,
  /// Written only when `Some`; an existing delivered-at is never cleared.
  pub delivered_at: Option<DateTime<Utc>>,
}

impl StatusChange {
  /// Derive the write for a validated transition committed at `now`.
  pub fn from_transition(transition: Transition, now: DateTime<Utc>) -> Self {
    Self {
      expected:     transition.from(),
      status:       transition.to(),
      delivered_at: transition.stamps_delivered_at().then_some(now),
    }
  }
}

/// Outcome of [`ShipmentStore::update_shipment_status`].
#[derive(Debug, Clone)]
pub enum StatusWrite {
  /// The write landed; carries the shipment as stored afterwards.
  Applied(Shipment),
  /// The stored status was no longer the expected one.
  Conflict { actual: ParcelStatus },
  /// No shipment has this tracking id.
  Missing,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a shipment persistence backend.
///
/// Route points are append-only. Status writes are conditional on the prior
/// status, which makes the backend the arbiter between concurrent writers to
/// the same shipment.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ShipmentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create and persist a new `pending` shipment.
  ///
  /// Returns an error if the tracking id is already taken.
  fn create_shipment(
    &self,
    input: NewShipment,
  ) -> impl Future<Output = Result<Shipment, Self::Error>> + Send + '_;

  /// Retrieve a shipment. Returns `None` if not found.
  fn get_shipment<'a>(
    &'a self,
    id: &'a TrackingId,
  ) -> impl Future<Output = Result<Option<Shipment>, Self::Error>> + Send + 'a;

  /// Read only the current status. Returns `None` if not found.
  fn get_shipment_status<'a>(
    &'a self,
    id: &'a TrackingId,
  ) -> impl Future<Output = Result<Option<ParcelStatus>, Self::Error>> + Send + 'a;

  /// Overwrite the current coordinate and address. Returns the updated
  /// shipment, or `None` if not found.
  fn update_shipment_location<'a>(
    &'a self,
    id: &'a TrackingId,
    at: Coordinate,
    address: String,
  ) -> impl Future<Output = Result<Option<Shipment>, Self::Error>> + Send + 'a;

  /// Append a route point. Returns `false` if the shipment does not exist.
  fn append_route_point<'a>(
    &'a self,
    id: &'a TrackingId,
    point: RoutePoint,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Update the current location and append the matching route point as one
  /// unit. Returns the updated shipment, or `None` if not found.
  ///
  /// The default runs the two writes in sequence; backends with transactions
  /// should override it.
  fn record_location<'a>(
    &'a self,
    id: &'a TrackingId,
    point: RoutePoint,
    address: String,
  ) -> impl Future<Output = Result<Option<Shipment>, Self::Error>> + Send + 'a {
    async move {
      let Some(shipment) = self
        .update_shipment_location(id, point.coordinate(), address)
        .await?
      else {
        return Ok(None);
      };
      self.append_route_point(id, point).await?;
      Ok(Some(shipment))
    }
  }

  /// Conditionally move the shipment to a new status.
  fn update_shipment_status<'a>(
    &'a self,
    id: &'a TrackingId,
    change: StatusChange,
  ) -> impl Future<Output = Result<StatusWrite, Self::Error>> + Send + 'a;

  /// Set the estimated arrival. Returns the updated shipment, or `None` if
  /// not found.
  fn update_shipment_eta<'a>(
    &'a self,
    id: &'a TrackingId,
    eta: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Shipment>, Self::Error>> + Send + 'a;

  /// The most recent `limit` route points, newest first.
  fn route_points<'a>(
    &'a self,
    id: &'a TrackingId,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<RoutePoint>, Self::Error>> + Send + 'a;
}
