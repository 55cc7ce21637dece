//! [`Tracker`] — the entry points driver reports flow through.
//!
//! Each report is validated, persisted through the [`ShipmentStore`] and only
//! then broadcast, so subscribers never hear about a change that failed to
//! persist. The persist and emit steps for one shipment run under that
//! shipment's lock; different shipments proceed in parallel.

mod eta;
mod location;
mod status;


use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use sendit_core::store::ShipmentStore;
use serde::Deserialize;

use crate::{
  broadcaster::{OutboundConfig, TrackingBroadcaster},
  geocode::Geocoder,
  ledger::RouteLedger,
  locks::ShipmentLocks,
  notify::{Notifier, TracingNotifier},
  queue::OverflowPolicy,
};

pub use eta::EtaReport;
pub use location::LocationReport;
pub use status::StatusReport;

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
  /// Route points carried by each location event.
  pub route_window:      usize,
  /// Frames buffered per connection before the overflow policy applies.
  pub outbound_capacity: usize,
  pub overflow:          OverflowPolicy,
  /// Upper bound on a single socket write.
  pub send_timeout_ms:   u64,
  /// Route windows untouched this long are dropped from memory.
  pub route_idle_secs:   u64,
}

impl Default for TrackingConfig {
  fn default() -> Self {
    Self {
      route_window:      10,
      outbound_capacity: 64,
      overflow:          OverflowPolicy::DropOldest,
      send_timeout_ms:   5000,
      route_idle_secs:   60 * 60,
    }
  }
}

impl TrackingConfig {
  pub fn outbound(&self) -> OutboundConfig {
    OutboundConfig {
      capacity: self.outbound_capacity,
      overflow: self.overflow,
    }
  }

  pub fn send_timeout(&self) -> Duration {
    Duration::from_millis(self.send_timeout_ms)
  }

  pub fn route_idle(&self) -> Duration {
    Duration::from_secs(self.route_idle_secs)
  }
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

pub struct Tracker<S, G> {
  store:           Arc<S>,
  geocoder:        Arc<G>,
  broadcaster:     Arc<TrackingBroadcaster>,
  ledger:          RouteLedger,
  locks:           ShipmentLocks,
  notifier:        Arc<dyn Notifier>,
  geocode_timeout: Duration,
}

impl<S, G> Tracker<S, G>
where
  S: ShipmentStore,
  G: Geocoder,
{
  /// Build a tracker that logs notifications via [`TracingNotifier`].
  pub fn new(
    store: Arc<S>,
    geocoder: Arc<G>,
    broadcaster: Arc<TrackingBroadcaster>,
    route_window: usize,
    geocode_timeout: Duration,
  ) -> Self {
    Self {
      store,
      geocoder,
      broadcaster,
      ledger: RouteLedger::new(route_window),
      locks: ShipmentLocks::new(),
      notifier: Arc::new(TracingNotifier),
      geocode_timeout,
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn with_route_idle(mut self, idle: Duration) -> Self {
    self.ledger = RouteLedger::new(self.ledger.window()).with_idle(idle);
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn broadcaster(&self) -> &Arc<TrackingBroadcaster> { &self.broadcaster }

  pub fn route_window(&self) -> usize { self.ledger.window() }

  /// Drop route windows for shipments that have gone quiet. The store still
  /// holds their full route; the next report warms the window again.
  pub fn prune_idle_routes(&self) -> usize {
    let pruned = self.ledger.prune_idle(Instant::now());
    if pruned > 0 {
      tracing::debug!(pruned, warm = self.ledger.len(), "pruned idle route windows");
    }
    pruned
  }
}
