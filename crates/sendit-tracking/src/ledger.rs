//! Hot window of recent route points per shipment.
//!
//! The store keeps the full route; the ledger keeps the last few points in
//! memory so location events can carry the recent route without a query, and
//! hands out timestamps that never run backwards within one shipment.
//! Windows untouched for longer than the idle limit are pruned; the next
//! report for that shipment warms the window again from the store.

use std::{
  collections::VecDeque,
  time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sendit_core::{Coordinate, RoutePoint, TrackingId};

/// How long a window may sit untouched before [`RouteLedger::prune_idle`]
/// drops it.
pub const DEFAULT_IDLE: Duration = Duration::from_secs(60 * 60);

struct Window {
  points:  VecDeque<RoutePoint>,
  touched: Instant,
}

impl Window {
  fn new(points: VecDeque<RoutePoint>) -> Self {
    Self { points, touched: Instant::now() }
  }
}

pub struct RouteLedger {
  window: usize,
  idle:   Duration,
  routes: DashMap<TrackingId, Window>,
}

impl RouteLedger {
  /// A ledger retaining at most `window` points per shipment (minimum 1).
  pub fn new(window: usize) -> Self {
    Self {
      window: window.max(1),
      idle:   DEFAULT_IDLE,
      routes: DashMap::new(),
    }
  }

  pub fn with_idle(mut self, idle: Duration) -> Self {
    self.idle = idle;
    self
  }

  pub fn window(&self) -> usize { self.window }

  pub fn idle(&self) -> Duration { self.idle }

  /// Number of shipments with a warm window.
  pub fn len(&self) -> usize { self.routes.len() }

  pub fn is_empty(&self) -> bool { self.routes.is_empty() }

  pub fn is_warm(&self, id: &TrackingId) -> bool {
    self.routes.contains_key(id)
  }

  /// Seed the window from persisted points, newest first. Ignored if the
  /// shipment is already warm.
  pub fn warm(&self, id: &TrackingId, newest_first: Vec<RoutePoint>) {
    self.routes.entry(id.clone()).or_insert_with(|| {
      Window::new(newest_first.into_iter().take(self.window).rev().collect())
    });
  }

  /// Build the next route point for `id`, stamped no earlier than the last
  /// one appended.
  pub fn stamp(
    &self,
    id: &TrackingId,
    at: Coordinate,
    now: DateTime<Utc>,
  ) -> RoutePoint {
    let last = self
      .routes
      .get(id)
      .and_then(|route| route.points.back().map(|p| p.timestamp));
    let timestamp = match last {
      Some(last) if last > now => last,
      _ => now,
    };
    RoutePoint::new(at, timestamp)
  }

  /// Record a point that has been persisted.
  pub fn append(&self, id: &TrackingId, point: RoutePoint) {
    let mut route = self
      .routes
      .entry(id.clone())
      .or_insert_with(|| Window::new(VecDeque::new()));
    debug_assert!(
      route.points.back().is_none_or(|last| last.timestamp <= point.timestamp),
      "route point appended out of order"
    );
    route.points.push_back(point);
    while route.points.len() > self.window {
      route.points.pop_front();
    }
    route.touched = Instant::now();
  }

  /// The retained window, newest first.
  pub fn recent(&self, id: &TrackingId) -> Vec<RoutePoint> {
    self
      .routes
      .get(id)
      .map(|route| route.points.iter().rev().copied().collect())
      .unwrap_or_default()
  }

  /// Drop the hot window for a shipment that will not move again.
  pub fn forget(&self, id: &TrackingId) { self.routes.remove(id); }

  /// Drop every window not appended to or warmed within the idle limit as of
  /// `now`. Returns how many were dropped.
  pub fn prune_idle(&self, now: Instant) -> usize {
    let before = self.routes.len();
    self.routes.retain(|_, route| {
      now.saturating_duration_since(route.touched) < self.idle
    });
    before.saturating_sub(self.routes.len())
  }
}
