//! Error types for `sendit-core`.

use thiserror::Error;

use crate::{shipment::TrackingId, status::ParcelStatus};

#[derive(Debug, Error)]
pub enum Error {
  #[error("shipment not found: {0}")]
  NotFound(TrackingId),

  #[error("invalid status transition from {from} to {to}")]
  InvalidTransition { from: ParcelStatus, to: ParcelStatus },

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  /// An external lookup (reverse geocoding) failed or timed out. Pipelines
  /// absorb this; it is never the outcome of a report.
  #[error("upstream unavailable: {0}")]
  UpstreamUnavailable(String),

  /// Another writer changed the shipment's status between the read and the
  /// conditional write. Safe to retry.
  #[error(
    "concurrent update on {tracking_id}: expected status {expected}, found \
     {actual}"
  )]
  PersistenceConflict {
    tracking_id: TrackingId,
    expected:    ParcelStatus,
    actual:      ParcelStatus,
  },

  #[error("invalid coordinate: lat {lat}, lng {lng}")]
  InvalidCoordinate { lat: f64, lng: f64 },

  #[error("unknown parcel status: {0:?}")]
  UnknownStatus(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box any backend error into [`Error::Store`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Whether the caller may repeat the same request unchanged.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::PersistenceConflict { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
