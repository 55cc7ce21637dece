//! Per-shipment mutual exclusion for the update pipelines.
//!
//! Updates to one shipment run one at a time so that its persisted state and
//! the events emitted for it appear in the same order. Updates to different
//! shipments never contend.

use std::sync::Arc;

use dashmap::DashMap;
use sendit_core::TrackingId;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ShipmentLocks {
  locks: DashMap<TrackingId, Arc<Mutex<()>>>,
}

impl ShipmentLocks {
  pub fn new() -> Self { Self::default() }

  /// Wait for exclusive access to `id`. Access ends when the guard drops.
  pub async fn lock(&self, id: &TrackingId) -> ShipmentGuard<'_> {
    let mutex = self.locks.entry(id.clone()).or_default().clone();
    let guard = mutex.lock_owned().await;
    ShipmentGuard { locks: self, id: id.clone(), guard: Some(guard) }
  }

  /// Shipments with an entry, held or awaited.
  pub fn len(&self) -> usize { self.locks.len() }

  pub fn is_empty(&self) -> bool { self.locks.is_empty() }
}

pub struct ShipmentGuard<'a> {
  locks: &'a ShipmentLocks,
  id:    TrackingId,
  guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ShipmentGuard<'_> {
  fn drop(&mut self) {
    // The guard holds a clone of the mutex; release it first so an entry no
    // one else is waiting on can be pruned.
    drop(self.guard.take());
    self
      .locks
      .locks
      .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
  }
}
