//! JSON REST API for SendIt tracking.
//!
//! Exposes an axum [`Router`] backed by a [`Tracker`] over any
//! [`ShipmentStore`] and [`Geocoder`]. Credential verification, TLS and
//! transport concerns are the caller's responsibility: routes that need an
//! identity read it from the request extensions (see [`caller`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", sendit_api::api_router(tracker.clone()))
//! ```

pub mod caller;
pub mod driver;
pub mod error;
pub mod track;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch},
};
use sendit_core::store::ShipmentStore;
use sendit_tracking::{Geocoder, Tracker};

pub use error::ApiError;

/// Build a fully-materialised API router for `tracker`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, G>(tracker: Arc<Tracker<S, G>>) -> Router<()>
where
  S: ShipmentStore + 'static,
  G: Geocoder + 'static,
{
  Router::new()
    // Driver reports
    .route(
      "/driver/shipments/{id}/location",
      patch(driver::location::<S, G>),
    )
    .route("/driver/shipments/{id}/status", patch(driver::status::<S, G>))
    .route("/driver/shipments/{id}/eta", patch(driver::eta::<S, G>))
    // Public lookup
    .route("/track/{id}", get(track::get_one::<S, G>))
    // Diagnostics
    .route("/rooms", get(track::rooms::<S, G>))
    .with_state(tracker)
}

#[cfg(test)]
mod tests {
  use std::{future::Future, time::Duration};

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use sendit_core::{Coordinate, NewShipment, Result};
  use sendit_store_sqlite::SqliteStore;
  use sendit_tracking::{Identity, Role, TrackingBroadcaster};
  use tower::ServiceExt as _;

  use super::*;

  struct NamedStreet;

  impl Geocoder for NamedStreet {
    fn reverse_geocode(
      &self,
      _at: Coordinate,
    ) -> impl Future<Output = Result<String>> + Send + '_ {
      async { Ok("Kenyatta Avenue".to_string()) }
    }
  }

  async fn make_tracker() -> Arc<Tracker<SqliteStore, NamedStreet>> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .create_shipment(NewShipment::with_id("T1").carrier("driver-7"))
      .await
      .unwrap();
    Arc::new(Tracker::new(
      Arc::new(store),
      Arc::new(NamedStreet),
      Arc::new(TrackingBroadcaster::default()),
      10,
      Duration::from_millis(100),
    ))
  }

  fn driver(subject: &str) -> Identity {
    Identity { subject: subject.into(), role: Role::Driver }
  }

  async fn send(
    tracker: Arc<Tracker<SqliteStore, NamedStreet>>,
    method: &str,
    uri: &str,
    identity: Option<Identity>,
    body: Option<serde_json::Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let mut req = builder
      .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
      .unwrap();
    if let Some(identity) = identity {
      req.extensions_mut().insert(identity);
    }
    api_router(tracker).oneshot(req).await.unwrap()
  }

  async fn json(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  // ── Status ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn assigned_carrier_updates_status() {
    let tracker = make_tracker().await;
    let resp = send(
      tracker,
      "PATCH",
      "/driver/shipments/T1/status",
      Some(driver("driver-7")),
      Some(serde_json::json!({ "status": "assigned" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["previous"], "pending");
    assert_eq!(body["shipment"]["status"], "assigned");
  }

  #[tokio::test]
  async fn invalid_transition_names_both_statuses() {
    let tracker = make_tracker().await;
    let resp = send(
      tracker,
      "PATCH",
      "/driver/shipments/T1/status",
      Some(driver("driver-7")),
      Some(serde_json::json!({ "status": "delivered" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json(resp).await;
    assert_eq!(body["current"], "pending");
    assert_eq!(body["requested"], "delivered");
  }

  #[tokio::test]
  async fn unknown_status_is_bad_request() {
    let tracker = make_tracker().await;
    let resp = send(
      tracker,
      "PATCH",
      "/driver/shipments/T1/status",
      Some(driver("driver-7")),
      Some(serde_json::json!({ "status": "lost_at_sea" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Authorization ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_identity_is_401() {
    let tracker = make_tracker().await;
    let resp = send(
      tracker,
      "PATCH",
      "/driver/shipments/T1/location",
      None,
      Some(serde_json::json!({ "lat": -1.28, "lng": 36.82 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn other_driver_is_403_and_nothing_changes() {
    let tracker = make_tracker().await;
    let resp = send(
      tracker.clone(),
      "PATCH",
      "/driver/shipments/T1/location",
      Some(driver("driver-9")),
      Some(serde_json::json!({ "lat": -1.28, "lng": 36.82 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let stored = tracker
      .store()
      .get_shipment(&"T1".into())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored.current, None);
  }

  #[tokio::test]
  async fn unknown_shipment_is_404() {
    let tracker = make_tracker().await;
    let resp = send(
      tracker,
      "PATCH",
      "/driver/shipments/NOPE/eta",
      Some(driver("driver-7")),
      Some(serde_json::json!({ "eta": "2030-01-01T12:00:00Z" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Location and tracking ──────────────────────────────────────────────────

  #[tokio::test]
  async fn location_report_then_public_lookup() {
    let tracker = make_tracker().await;
    let resp = send(
      tracker.clone(),
      "PATCH",
      "/driver/shipments/T1/location",
      Some(driver("driver-7")),
      Some(serde_json::json!({ "lat": -1.2864, "lng": 36.8172 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json(resp).await["address"], "Kenyatta Avenue");

    let resp = send(tracker, "GET", "/track/T1", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["trackingId"], "T1");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["currentAddress"], "Kenyatta Avenue");
    assert_eq!(body["route"].as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn out_of_range_coordinate_is_400() {
    let tracker = make_tracker().await;
    let resp = send(
      tracker,
      "PATCH",
      "/driver/shipments/T1/location",
      Some(driver("driver-7")),
      Some(serde_json::json!({ "lat": 120.0, "lng": 36.8 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn public_lookup_of_unknown_id_is_404() {
    let tracker = make_tracker().await;
    let resp = send(tracker, "GET", "/track/NOPE", None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Rooms ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn rooms_require_admin() {
    let tracker = make_tracker().await;
    let (conn, _rx) = tracker.broadcaster().open();
    tracker.broadcaster().join(&"T1".into(), &conn);

    let resp =
      send(tracker.clone(), "GET", "/rooms", Some(driver("driver-7")), None)
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let admin = Identity { subject: "ops".into(), role: Role::Admin };
    let resp = send(tracker, "GET", "/rooms", Some(admin), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
      json(resp).await,
      serde_json::json!([{ "trackingId": "T1", "subscribers": 1 }])
    );
  }
}
