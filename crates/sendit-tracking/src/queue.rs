//! Bounded per-connection outbound queues.
//!
//! Emitters push pre-serialised frames without ever waiting; each connection's
//! writer task drains its own queue at whatever pace its socket allows. When a
//! queue is full the configured [`OverflowPolicy`] decides whether the oldest
//! frame is evicted or the connection is cut off.

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::Deserialize;
use tokio::sync::Notify;

/// One serialised outbound message, shared by every recipient of an emit.
pub type Frame = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
  /// Evict the oldest queued frame to make room.
  #[default]
  DropOldest,
  /// Close the queue; the connection's writer sees the end of the stream.
  Disconnect,
}

/// Result of [`OutboundSender::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
  Queued,
  /// Queued after evicting the oldest frame.
  DroppedOldest,
  /// The queue was full under [`OverflowPolicy::Disconnect`] and is now
  /// closed.
  Overflowed,
  /// The queue was already closed; the frame was discarded.
  Closed,
}

struct State {
  frames:  VecDeque<Frame>,
  closed:  bool,
  dropped: u64,
}

struct Shared {
  state:    Mutex<State>,
  notify:   Notify,
  capacity: usize,
  policy:   OverflowPolicy,
}

impl Shared {
  fn lock(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Create a queue holding at most `capacity` frames (minimum 1).
pub fn outbound(
  capacity: usize,
  policy: OverflowPolicy,
) -> (OutboundSender, OutboundReceiver) {
  let capacity = capacity.max(1);
  let shared = Arc::new(Shared {
    state: Mutex::new(State {
      frames:  VecDeque::with_capacity(capacity),
      closed:  false,
      dropped: 0,
    }),
    notify: Notify::new(),
    capacity,
    policy,
  });
  (
    OutboundSender { shared: shared.clone() },
    OutboundReceiver { shared },
  )
}

// ─── Sender ──────────────────────────────────────────────────────────────────

/// Producer half. Cheap to clone; never blocks.
#[derive(Clone)]
pub struct OutboundSender {
  shared: Arc<Shared>,
}

impl OutboundSender {
  pub fn push(&self, frame: Frame) -> Push {
    let outcome = {
      let mut state = self.shared.lock();
      if state.closed {
        return Push::Closed;
      }
      if state.frames.len() < self.shared.capacity {
        state.frames.push_back(frame);
        Push::Queued
      } else {
        match self.shared.policy {
          OverflowPolicy::DropOldest => {
            state.frames.pop_front();
            state.frames.push_back(frame);
            state.dropped += 1;
            Push::DroppedOldest
          }
          OverflowPolicy::Disconnect => {
            state.closed = true;
            state.frames.clear();
            Push::Overflowed
          }
        }
      }
    };
    self.shared.notify.notify_one();
    outcome
  }

  /// Close the queue. Frames already queued are still delivered.
  pub fn close(&self) {
    self.shared.lock().closed = true;
    self.shared.notify.notify_one();
  }

  pub fn is_closed(&self) -> bool { self.shared.lock().closed }

  pub fn len(&self) -> usize { self.shared.lock().frames.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

// ─── Receiver ────────────────────────────────────────────────────────────────

/// Consumer half, owned by the connection's writer task. Dropping it closes
/// the queue.
pub struct OutboundReceiver {
  shared: Arc<Shared>,
}

impl OutboundReceiver {
  /// Wait for the next frame. Returns `None` once the queue is closed and
  /// drained.
  pub async fn recv(&mut self) -> Option<Frame> {
    loop {
      {
        let mut state = self.shared.lock();
        if let Some(frame) = state.frames.pop_front() {
          return Some(frame);
        }
        if state.closed {
          return None;
        }
      }
      self.shared.notify.notified().await;
    }
  }

  pub fn try_recv(&mut self) -> Option<Frame> {
    self.shared.lock().frames.pop_front()
  }

  /// Frames evicted under [`OverflowPolicy::DropOldest`] so far.
  pub fn dropped(&self) -> u64 { self.shared.lock().dropped }
}

impl Drop for OutboundReceiver {
  fn drop(&mut self) {
    let mut state = self.shared.lock();
    state.closed = true;
    state.frames.clear();
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  fn frame(s: &str) -> Frame { Arc::from(s) }

  #[tokio::test]
  async fn frames_arrive_in_order() {
    let (tx, mut rx) = outbound(4, OverflowPolicy::DropOldest);
    assert_eq!(tx.push(frame("a")), Push::Queued);
    assert_eq!(tx.push(frame("b")), Push::Queued);
    assert_eq!(rx.recv().await.as_deref(), Some("a"));
    assert_eq!(rx.recv().await.as_deref(), Some("b"));
  }

  #[tokio::test]
  async fn drop_oldest_keeps_newest_frames() {
    let (tx, mut rx) = outbound(2, OverflowPolicy::DropOldest);
    tx.push(frame("1"));
    tx.push(frame("2"));
    assert_eq!(tx.push(frame("3")), Push::DroppedOldest);
    assert_eq!(tx.len(), 2);
    assert_eq!(rx.dropped(), 1);
    assert_eq!(rx.recv().await.as_deref(), Some("2"));
    assert_eq!(rx.recv().await.as_deref(), Some("3"));
  }

  #[tokio::test]
  async fn disconnect_policy_closes_on_overflow() {
    let (tx, mut rx) = outbound(1, OverflowPolicy::Disconnect);
    tx.push(frame("1"));
    assert_eq!(tx.push(frame("2")), Push::Overflowed);
    assert!(tx.is_closed());
    assert_eq!(tx.push(frame("3")), Push::Closed);
    assert_eq!(rx.recv().await, None);
  }

  #[tokio::test]
  async fn close_drains_then_ends() {
    let (tx, mut rx) = outbound(4, OverflowPolicy::DropOldest);
    tx.push(frame("last"));
    tx.close();
    assert_eq!(rx.recv().await.as_deref(), Some("last"));
    assert_eq!(rx.recv().await, None);
  }

  #[tokio::test]
  async fn dropping_receiver_closes_sender() {
    let (tx, rx) = outbound(4, OverflowPolicy::DropOldest);
    drop(rx);
    assert_eq!(tx.push(frame("x")), Push::Closed);
  }

  #[tokio::test]
  async fn recv_wakes_on_push() {
    let (tx, mut rx) = outbound(4, OverflowPolicy::DropOldest);
    let reader = tokio::spawn(async move { rx.recv().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    tx.push(frame("late"));
    let got = tokio::time::timeout(Duration::from_secs(1), reader)
      .await
      .expect("reader woke")
      .unwrap();
    assert_eq!(got.as_deref(), Some("late"));
  }

  #[test]
  fn zero_capacity_is_raised_to_one() {
    let (tx, _rx) = outbound(0, OverflowPolicy::Disconnect);
    assert_eq!(tx.push(frame("a")), Push::Queued);
  }
}
