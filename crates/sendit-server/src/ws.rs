//! The realtime tracking endpoint (`GET /ws`).
//!
//! The access token (bearer header or `?token=`) is verified before the
//! upgrade; a rejected handshake gets a 401 and leaves no state behind.
//! Once upgraded, each connection runs two halves:
//!
//! - a reader loop that handles `join`/`leave` requests and answers each one
//!   with an acknowledgement frame;
//! - a writer task that drains the connection's outbound queue onto the
//!   socket, bounding every write with the configured send timeout.
//!
//! Client frames:
//!
//! ```json
//! { "action": "join",  "trackingId": "SEXP-254-1700000000000" }
//! { "action": "leave", "trackingId": "SEXP-254-1700000000000" }
//! ```

use std::time::Duration;

use axum::{
  extract::{
    Query, State,
    ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
  },
  http::HeaderMap,
  response::{IntoResponse, Response},
};
use futures::{SinkExt as _, StreamExt as _};
use sendit_core::{TrackingId, store::ShipmentStore};
use sendit_tracking::{Geocoder, Session, queue::OutboundReceiver};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::bearer_token, error::Error};

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
  pub token: Option<String>,
}

// ─── Frames ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(
  tag = "action",
  rename_all = "snake_case",
  rename_all_fields = "camelCase"
)]
enum ClientFrame {
  Join { tracking_id: TrackingId },
  Leave { tracking_id: TrackingId },
}

#[derive(Debug, Serialize)]
#[serde(
  tag = "kind",
  rename_all = "snake_case",
  rename_all_fields = "camelCase"
)]
enum ServerFrame<'a> {
  Ack {
    action:      &'a str,
    tracking_id: &'a TrackingId,
    success:     bool,
    message:     String,
  },
  Error {
    message: String,
  },
}

/// Queue `frame` for this connection only.
fn reply(session: &Session, frame: &ServerFrame<'_>) {
  match serde_json::to_string(frame) {
    Ok(json) => {
      session.send(json.into());
    }
    Err(e) => {
      tracing::error!(connection_id = %session.id(), error = %e, "reply encoding failed");
    }
  }
}

/// Handle one text frame from the client.
pub(crate) fn handle_client_frame(session: &Session, text: &str) {
  let frame = match serde_json::from_str::<ClientFrame>(text) {
    Ok(frame) => frame,
    Err(e) => {
      tracing::debug!(connection_id = %session.id(), error = %e, "malformed client frame");
      reply(session, &ServerFrame::Error {
        message: format!("malformed request: {e}"),
      });
      return;
    }
  };

  match frame {
    ClientFrame::Join { tracking_id } => {
      session.join(&tracking_id);
      reply(session, &ServerFrame::Ack {
        action:      "join",
        tracking_id: &tracking_id,
        success:     true,
        message:     format!("Joined tracking room for {tracking_id}"),
      });
    }
    ClientFrame::Leave { tracking_id } => {
      session.leave(&tracking_id);
      reply(session, &ServerFrame::Ack {
        action:      "leave",
        tracking_id: &tracking_id,
        success:     true,
        message:     format!("Left tracking room for {tracking_id}"),
      });
    }
  }
}

// ─── Handler ──────────────────────────────────────────────────────────────────

/// `GET /ws[?token=…]`
pub async fn handler<S, G>(
  State(state): State<AppState<S, G>>,
  Query(params): Query<ConnectParams>,
  headers: HeaderMap,
  ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response
where
  S: ShipmentStore + 'static,
  G: Geocoder + 'static,
{
  let token = bearer_token(&headers).map(str::to_owned).or(params.token);
  let connected = Session::connect(
    state.tracker.broadcaster(),
    state.verifier.as_ref(),
    token.as_deref(),
  );
  let (session, outbound) = match connected {
    Ok(pair) => pair,
    Err(e) => {
      tracing::debug!(error = %e, "realtime handshake refused");
      return Error::Unauthorized(e.to_string()).into_response();
    }
  };

  let ws = match ws {
    Ok(ws) => ws,
    Err(rejection) => return rejection.into_response(),
  };

  let send_timeout = state.send_timeout;
  ws.on_upgrade(move |socket| serve(socket, session, outbound, send_timeout))
}

async fn serve(
  socket: WebSocket,
  session: Session,
  mut outbound: OutboundReceiver,
  send_timeout: Duration,
) {
  let (mut sink, mut stream) = socket.split();
  let connection_id = session.id();

  let mut writer = tokio::spawn(async move {
    while let Some(frame) = outbound.recv().await {
      let send = sink.send(Message::Text(frame.as_ref().into()));
      match tokio::time::timeout(send_timeout, send).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
          tracing::debug!(%connection_id, error = %e, "socket write failed");
          break;
        }
        Err(_) => {
          tracing::warn!(%connection_id, "socket write timed out, closing");
          break;
        }
      }
    }
    let _ = sink.close().await;
  });

  let mut writer_done = false;
  loop {
    tokio::select! {
      msg = stream.next() => match msg {
        Some(Ok(Message::Text(text))) => handle_client_frame(&session, text.as_str()),
        Some(Ok(Message::Close(_))) | None => break,
        Some(Ok(_)) => {}
        Some(Err(e)) => {
          tracing::debug!(%connection_id, error = %e, "socket read failed");
          break;
        }
      },
      _ = &mut writer => {
        writer_done = true;
        break;
      }
    }
  }

  // Leaves every room and ends the writer's stream.
  session.close();
  if !writer_done {
    let _ = writer.await;
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use sendit_core::{Error as CoreError, Result};
  use sendit_tracking::{CredentialVerifier, Identity, Role, TrackingBroadcaster};

  use super::*;

  struct AnyToken;

  impl CredentialVerifier for AnyToken {
    fn verify(&self, token: &str) -> Result<Identity> {
      if token == "bad" {
        return Err(CoreError::Unauthorized("bad".into()));
      }
      Ok(Identity { subject: token.into(), role: Role::User })
    }
  }

  fn session() -> (Arc<TrackingBroadcaster>, Session, OutboundReceiver) {
    let broadcaster = Arc::new(TrackingBroadcaster::default());
    let (session, rx) =
      Session::connect(&broadcaster, &AnyToken, Some("viewer")).unwrap();
    (broadcaster, session, rx)
  }

  fn next_frame(rx: &mut OutboundReceiver) -> serde_json::Value {
    let frame = rx.try_recv().expect("a queued frame");
    serde_json::from_str(&frame).unwrap()
  }

  #[test]
  fn join_is_acknowledged_and_subscribes() {
    let (broadcaster, session, mut rx) = session();
    handle_client_frame(&session, r#"{"action":"join","trackingId":"T1"}"#);

    let ack = next_frame(&mut rx);
    assert_eq!(ack["kind"], "ack");
    assert_eq!(ack["action"], "join");
    assert_eq!(ack["trackingId"], "T1");
    assert_eq!(ack["success"], true);
    assert_eq!(ack["message"], "Joined tracking room for T1");
    assert_eq!(broadcaster.registry().subscriber_count(&"T1".into()), 1);
  }

  #[test]
  fn leave_is_acknowledged_and_unsubscribes() {
    let (broadcaster, session, mut rx) = session();
    handle_client_frame(&session, r#"{"action":"join","trackingId":"T1"}"#);
    handle_client_frame(&session, r#"{"action":"leave","trackingId":"T1"}"#);

    next_frame(&mut rx);
    let ack = next_frame(&mut rx);
    assert_eq!(ack["action"], "leave");
    assert_eq!(broadcaster.registry().room_count(), 0);
  }

  #[test]
  fn malformed_frame_gets_an_error_reply() {
    let (broadcaster, session, mut rx) = session();
    handle_client_frame(&session, r#"{"action":"subscribe"}"#);
    handle_client_frame(&session, "not json");

    assert_eq!(next_frame(&mut rx)["kind"], "error");
    assert_eq!(next_frame(&mut rx)["kind"], "error");
    assert_eq!(broadcaster.registry().room_count(), 0);
  }
}
