//! [`TrackingBroadcaster`] — room membership plus fan-out.
//!
//! An emit serialises the event once and pushes the shared frame onto each
//! member's bounded outbound queue. Pushing never waits, so a slow or stalled
//! subscriber cannot hold up the emitter or the other members of the room.

use sendit_core::TrackingId;
use serde::Serialize;

use crate::{
  event::TrackingEvent,
  queue::{Frame, OutboundReceiver, OverflowPolicy, Push, outbound},
  registry::{ConnectionHandle, ConnectionId, RoomRegistry},
};

/// Per-connection queue settings applied to every connection opened through
/// the broadcaster.
#[derive(Debug, Clone, Copy)]
pub struct OutboundConfig {
  pub capacity: usize,
  pub overflow: OverflowPolicy,
}

impl Default for OutboundConfig {
  fn default() -> Self {
    Self { capacity: 64, overflow: OverflowPolicy::DropOldest }
  }
}

/// What happened to one emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitReport {
  /// Room size at the moment of the emit.
  pub members:        usize,
  pub queued:         usize,
  /// Queued after evicting that member's oldest pending frame.
  pub dropped_oldest: usize,
  /// Members cut off because their queue overflowed.
  pub overflowed:     usize,
  /// Members whose connection was already closing.
  pub closed:         usize,
}

impl EmitReport {
  /// Members that will see the event.
  pub fn delivered(&self) -> usize { self.queued + self.dropped_oldest }
}

#[derive(Default)]
pub struct TrackingBroadcaster {
  registry: RoomRegistry,
  outbound: OutboundConfig,
}

impl TrackingBroadcaster {
  pub fn new(outbound: OutboundConfig) -> Self {
    Self { registry: RoomRegistry::new(), outbound }
  }

  pub fn registry(&self) -> &RoomRegistry { &self.registry }

  /// Allocate a connection id and its outbound queue.
  ///
  /// Transports should go through [`crate::session::Session::connect`], which
  /// verifies the connection's credential first.
  pub fn open(&self) -> (ConnectionHandle, OutboundReceiver) {
    let (tx, rx) = outbound(self.outbound.capacity, self.outbound.overflow);
    (ConnectionHandle::new(ConnectionId::new(), tx), rx)
  }

  pub fn join(&self, id: &TrackingId, conn: &ConnectionHandle) -> bool {
    let added = self.registry.join(id, conn);
    tracing::debug!(tracking_id = %id, connection_id = %conn.id(), added, "join");
    added
  }

  pub fn leave(&self, id: &TrackingId, conn: ConnectionId) -> bool {
    let removed = self.registry.leave(id, conn);
    tracing::debug!(tracking_id = %id, connection_id = %conn, removed, "leave");
    removed
  }

  pub fn leave_all(&self, conn: ConnectionId) -> usize {
    let rooms = self.registry.leave_all(conn);
    tracing::debug!(connection_id = %conn, rooms, "leave all");
    rooms
  }

  /// Fan `event` out to every connection currently in its room.
  pub fn emit(&self, event: &TrackingEvent) -> EmitReport {
    let members = self.registry.members_of(&event.tracking_id);
    let mut report = EmitReport { members: members.len(), ..EmitReport::default() };
    if members.is_empty() {
      return report;
    }

    let frame: Frame = match serde_json::to_string(event) {
      Ok(json) => json.into(),
      Err(e) => {
        tracing::error!(
          tracking_id = %event.tracking_id,
          error = %e,
          "failed to serialise tracking event"
        );
        return report;
      }
    };

    for member in &members {
      match member.send(frame.clone()) {
        Push::Queued => report.queued += 1,
        Push::DroppedOldest => report.dropped_oldest += 1,
        Push::Overflowed => {
          tracing::warn!(
            tracking_id = %event.tracking_id,
            connection_id = %member.id(),
            "outbound queue overflowed, disconnecting subscriber"
          );
          report.overflowed += 1;
        }
        Push::Closed => report.closed += 1,
      }
    }

    tracing::debug!(
      tracking_id = %event.tracking_id,
      kind = event.kind(),
      subscribers = report.members,
      delivered = report.delivered(),
      "emitted tracking event"
    );
    report
  }
}
