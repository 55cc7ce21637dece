//! Authenticated connection sessions.
//!
//! A [`Session`] is created only after the connection's credential has been
//! verified, so no room membership can exist for a rejected connection. The
//! session owns the connection's registry bookkeeping: dropping it (or calling
//! [`Session::close`]) leaves every room exactly once, whichever way the
//! connection ended.

use std::sync::Arc;

use sendit_core::{Error, Result, TrackingId};
use serde::{Deserialize, Serialize};

use crate::{
  broadcaster::TrackingBroadcaster,
  queue::{Frame, OutboundReceiver, Push},
  registry::{ConnectionHandle, ConnectionId},
};

// ─── Identity ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[serde(alias = "USER")]
  User,
  #[serde(alias = "DRIVER")]
  Driver,
  #[serde(alias = "ADMIN")]
  Admin,
}

/// Who a verified credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub subject: String,
  pub role:    Role,
}

/// Turns a presented access token into an [`Identity`].
///
/// Implementations return [`Error::Unauthorized`] for missing, malformed,
/// expired or otherwise invalid tokens.
pub trait CredentialVerifier: Send + Sync {
  fn verify(&self, token: &str) -> Result<Identity>;
}

// ─── Session ─────────────────────────────────────────────────────────────────

pub struct Session {
  broadcaster: Arc<TrackingBroadcaster>,
  handle:      ConnectionHandle,
  identity:    Identity,
  released:    bool,
}

impl Session {
  /// Verify `token` once and, only if it is accepted, open a connection.
  ///
  /// Returns the session and the receiving end of its outbound queue, which
  /// the transport's writer task drains.
  pub fn connect(
    broadcaster: &Arc<TrackingBroadcaster>,
    verifier: &dyn CredentialVerifier,
    token: Option<&str>,
  ) -> Result<(Self, OutboundReceiver)> {
    let token = token
      .filter(|t| !t.is_empty())
      .ok_or_else(|| Error::Unauthorized("missing access token".into()))?;
    let identity = verifier.verify(token)?;

    let (handle, outbound) = broadcaster.open();
    tracing::debug!(
      connection_id = %handle.id(),
      subject = %identity.subject,
      "connection opened"
    );

    let session = Self {
      broadcaster: broadcaster.clone(),
      handle,
      identity,
      released: false,
    };
    Ok((session, outbound))
  }

  pub fn id(&self) -> ConnectionId { self.handle.id() }

  pub fn identity(&self) -> &Identity { &self.identity }

  pub fn join(&self, id: &TrackingId) -> bool {
    self.broadcaster.join(id, &self.handle)
  }

  pub fn leave(&self, id: &TrackingId) -> bool {
    self.broadcaster.leave(id, self.handle.id())
  }

  /// Queue a frame for this connection only (acknowledgements, errors).
  pub fn send(&self, frame: Frame) -> Push { self.handle.send(frame) }

  /// Leave every room and close the outbound queue. Returns the number of
  /// rooms left.
  pub fn close(mut self) -> usize { self.release() }

  fn release(&mut self) -> usize {
    if self.released {
      return 0;
    }
    self.released = true;
    self.handle.close();
    let rooms = self.broadcaster.leave_all(self.handle.id());
    tracing::debug!(connection_id = %self.handle.id(), rooms, "connection closed");
    rooms
  }
}

impl Drop for Session {
  fn drop(&mut self) { self.release(); }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct StaticVerifier;

  impl CredentialVerifier for StaticVerifier {
    fn verify(&self, token: &str) -> Result<Identity> {
      match token {
        "good" => Ok(Identity { subject: "user-1".into(), role: Role::User }),
        _ => Err(Error::Unauthorized("bad token".into())),
      }
    }
  }

  fn broadcaster() -> Arc<TrackingBroadcaster> {
    Arc::new(TrackingBroadcaster::default())
  }

  #[test]
  fn rejected_credentials_leave_no_state() {
    let b = broadcaster();
    assert!(matches!(
      Session::connect(&b, &StaticVerifier, Some("bad")),
      Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
      Session::connect(&b, &StaticVerifier, None),
      Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
      Session::connect(&b, &StaticVerifier, Some("")),
      Err(Error::Unauthorized(_))
    ));
    assert_eq!(b.registry().room_count(), 0);
  }

  #[test]
  fn accepted_session_carries_identity() {
    let b = broadcaster();
    let (session, _rx) = Session::connect(&b, &StaticVerifier, Some("good")).unwrap();
    assert_eq!(session.identity().subject, "user-1");
  }

  #[test]
  fn dropping_a_session_leaves_all_rooms() {
    let b = broadcaster();
    let (x, y) = (TrackingId::new("X"), TrackingId::new("Y"));
    let (session, _rx) = Session::connect(&b, &StaticVerifier, Some("good")).unwrap();
    session.join(&x);
    session.join(&y);
    let id = session.id();
    assert_eq!(b.registry().rooms_of(id).len(), 2);

    drop(session);
    assert!(b.registry().rooms_of(id).is_empty());
    assert_eq!(b.registry().room_count(), 0);
  }

  #[tokio::test]
  async fn close_releases_once_and_ends_the_stream() {
    let b = broadcaster();
    let x = TrackingId::new("X");
    let (session, mut rx) = Session::connect(&b, &StaticVerifier, Some("good")).unwrap();
    session.join(&x);
    assert_eq!(session.close(), 1);
    assert_eq!(b.registry().subscriber_count(&x), 0);
    assert_eq!(rx.recv().await, None);
  }
}
