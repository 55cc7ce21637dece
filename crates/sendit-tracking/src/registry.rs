//! Room membership: which live connections watch which shipment.
//!
//! Membership is kept in two sharded maps, room → members and connection →
//! rooms. Mutations to one room are serialised by its shard lock while
//! unrelated rooms proceed independently. A room is removed in the same step
//! that removes its last member, so empty rooms never accumulate.

use std::{
  collections::{HashMap, HashSet},
  fmt,
};

use dashmap::DashMap;
use sendit_core::TrackingId;
use serde::Serialize;
use uuid::Uuid;

use crate::queue::{Frame, OutboundSender, Push};

// ─── Connection handle ───────────────────────────────────────────────────────

/// Process-unique identifier of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
  pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for ConnectionId {
  fn default() -> Self { Self::new() }
}

impl fmt::Display for ConnectionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

/// What the registry holds for a member: its id and the producer half of its
/// outbound queue.
#[derive(Clone)]
pub struct ConnectionHandle {
  id:       ConnectionId,
  outbound: OutboundSender,
}

impl ConnectionHandle {
  pub fn new(id: ConnectionId, outbound: OutboundSender) -> Self {
    Self { id, outbound }
  }

  pub fn id(&self) -> ConnectionId { self.id }

  /// Enqueue a frame for this connection without waiting.
  pub fn send(&self, frame: Frame) -> Push { self.outbound.push(frame) }

  pub(crate) fn close(&self) { self.outbound.close() }
}

impl fmt::Debug for ConnectionHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConnectionHandle")
      .field("id", &self.id)
      .field("queued", &self.outbound.len())
      .finish()
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Diagnostic summary of one active room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
  pub tracking_id: TrackingId,
  pub subscribers: usize,
}

#[derive(Default)]
pub struct RoomRegistry {
  rooms:       DashMap<TrackingId, HashMap<ConnectionId, ConnectionHandle>>,
  memberships: DashMap<ConnectionId, HashSet<TrackingId>>,
}

impl RoomRegistry {
  pub fn new() -> Self { Self::default() }

  /// Add `conn` to the room for `id`, creating the room if needed.
  ///
  /// Idempotent. Returns `true` if the connection was not already a member.
  /// Membership does not check that the shipment exists.
  pub fn join(&self, id: &TrackingId, conn: &ConnectionHandle) -> bool {
    let added = self
      .rooms
      .entry(id.clone())
      .or_default()
      .insert(conn.id(), conn.clone())
      .is_none();
    self
      .memberships
      .entry(conn.id())
      .or_default()
      .insert(id.clone());
    added
  }

  /// Remove `conn` from the room for `id`. Returns `true` if it was a member.
  pub fn leave(&self, id: &TrackingId, conn: ConnectionId) -> bool {
    let removed = self.remove_member(id, conn);
    self.memberships.remove_if_mut(&conn, |_, rooms| {
      rooms.remove(id);
      rooms.is_empty()
    });
    removed
  }

  /// Remove `conn` from every room it belongs to. Returns the number of rooms
  /// it left.
  pub fn leave_all(&self, conn: ConnectionId) -> usize {
    let Some((_, rooms)) = self.memberships.remove(&conn) else {
      return 0;
    };
    for id in &rooms {
      self.remove_member(id, conn);
    }
    rooms.len()
  }

  fn remove_member(&self, id: &TrackingId, conn: ConnectionId) -> bool {
    let mut removed = false;
    self.rooms.remove_if_mut(id, |_, members| {
      removed = members.remove(&conn).is_some();
      members.is_empty()
    });
    removed
  }

  /// Snapshot of the room's members.
  pub fn members_of(&self, id: &TrackingId) -> Vec<ConnectionHandle> {
    self
      .rooms
      .get(id)
      .map(|members| members.values().cloned().collect())
      .unwrap_or_default()
  }

  pub fn member_ids(&self, id: &TrackingId) -> HashSet<ConnectionId> {
    self
      .rooms
      .get(id)
      .map(|members| members.keys().copied().collect())
      .unwrap_or_default()
  }

  pub fn rooms_of(&self, conn: ConnectionId) -> HashSet<TrackingId> {
    self
      .memberships
      .get(&conn)
      .map(|rooms| rooms.clone())
      .unwrap_or_default()
  }

  pub fn subscriber_count(&self, id: &TrackingId) -> usize {
    self.rooms.get(id).map_or(0, |members| members.len())
  }

  pub fn room_count(&self) -> usize { self.rooms.len() }

  /// Every non-empty room, ordered by tracking id.
  pub fn rooms(&self) -> Vec<RoomSummary> {
    let mut rooms: Vec<RoomSummary> = self
      .rooms
      .iter()
      .map(|entry| RoomSummary {
        tracking_id: entry.key().clone(),
        subscribers: entry.value().len(),
      })
      .collect();
    rooms.sort_by(|a, b| a.tracking_id.cmp(&b.tracking_id));
    rooms
  }
}
