//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use sendit_core::{
  Coordinate, NewShipment, ParcelStatus, RoutePoint, TrackingId, Transition,
  store::{ShipmentStore, StatusChange, StatusWrite},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn nairobi() -> Coordinate { Coordinate::new(-1.2921, 36.8219).unwrap() }

// ─── Shipments ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_shipment() {
  let s = store().await;

  let created = s
    .create_shipment(
      NewShipment {
        details: serde_json::json!({ "recipientName": "Achieng" }),
        ..NewShipment::with_id("T1")
      }
      .carrier("driver-7"),
    )
    .await
    .unwrap();
  assert_eq!(created.status, ParcelStatus::Pending);

  let fetched = s.get_shipment(&"T1".into()).await.unwrap().unwrap();
  assert_eq!(fetched.tracking_id, created.tracking_id);
  assert_eq!(fetched.carrier_id.as_deref(), Some("driver-7"));
  assert_eq!(fetched.details["recipientName"], "Achieng");
  assert!(fetched.current.is_none());
  assert!(fetched.delivered_at.is_none());
}

#[tokio::test]
async fn create_generates_tracking_id() {
  let s = store().await;
  let created = s.create_shipment(NewShipment::default()).await.unwrap();
  assert!(created.tracking_id.as_str().starts_with("SEXP-254-"));
  assert!(s.get_shipment(&created.tracking_id).await.unwrap().is_some());
}

#[tokio::test]
async fn duplicate_tracking_id_is_rejected() {
  let s = store().await;
  s.create_shipment(NewShipment::with_id("T1")).await.unwrap();
  let err = s
    .create_shipment(NewShipment::with_id("T1"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateTrackingId(id) if id.as_str() == "T1"));
}

#[tokio::test]
async fn missing_shipment_reads_as_none() {
  let s = store().await;
  let id = TrackingId::new("nope");
  assert!(s.get_shipment(&id).await.unwrap().is_none());
  assert!(s.get_shipment_status(&id).await.unwrap().is_none());
  assert!(
    s.update_shipment_location(&id, nairobi(), String::new())
      .await
      .unwrap()
      .is_none()
  );
  assert!(
    !s.append_route_point(&id, RoutePoint::new(nairobi(), Utc::now()))
      .await
      .unwrap()
  );
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn conditional_status_update_applies() {
  let s = store().await;
  let id = TrackingId::new("T1");
  s.create_shipment(NewShipment::with_id("T1")).await.unwrap();

  let t = Transition::validate(ParcelStatus::Pending, ParcelStatus::Assigned)
    .unwrap();
  let write = s
    .update_shipment_status(&id, StatusChange::from_transition(t, Utc::now()))
    .await
    .unwrap();
  let StatusWrite::Applied(shipment) = write else {
    panic!("expected applied, got {write:?}");
  };
  assert_eq!(shipment.status, ParcelStatus::Assigned);
  assert!(shipment.delivered_at.is_none());
  assert_eq!(
    s.get_shipment_status(&id).await.unwrap(),
    Some(ParcelStatus::Assigned)
  );
}

#[tokio::test]
async fn stale_expected_status_conflicts_without_writing() {
  let s = store().await;
  let id = TrackingId::new("T1");
  s.create_shipment(NewShipment::with_id("T1")).await.unwrap();

  let change = StatusChange {
    expected:     ParcelStatus::InTransit,
    status:       ParcelStatus::Delivered,
    delivered_at: Some(Utc::now()),
  };
  let write = s.update_shipment_status(&id, change).await.unwrap();
  assert!(matches!(
    write,
    StatusWrite::Conflict { actual: ParcelStatus::Pending }
  ));

  let shipment = s.get_shipment(&id).await.unwrap().unwrap();
  assert_eq!(shipment.status, ParcelStatus::Pending);
  assert!(shipment.delivered_at.is_none());
}

#[tokio::test]
async fn status_update_on_missing_shipment() {
  let s = store().await;
  let change = StatusChange {
    expected:     ParcelStatus::Pending,
    status:       ParcelStatus::Assigned,
    delivered_at: None,
  };
  let write = s
    .update_shipment_status(&"ghost".into(), change)
    .await
    .unwrap();
  assert!(matches!(write, StatusWrite::Missing));
}

#[tokio::test]
async fn delivered_at_is_written_and_never_cleared() {
  let s = store().await;
  let id = TrackingId::new("T1");
  s.create_shipment(NewShipment::with_id("T1")).await.unwrap();

  let delivered_at = Utc::now();
  let change = StatusChange {
    expected:     ParcelStatus::Pending,
    status:       ParcelStatus::Delivered,
    delivered_at: Some(delivered_at),
  };
  s.update_shipment_status(&id, change).await.unwrap();

  // A later write without a timestamp keeps the stored one.
  let change = StatusChange {
    expected:     ParcelStatus::Delivered,
    status:       ParcelStatus::Delivered,
    delivered_at: None,
  };
  s.update_shipment_status(&id, change).await.unwrap();

  let shipment = s.get_shipment(&id).await.unwrap().unwrap();
  assert_eq!(shipment.delivered_at, Some(delivered_at));
}

// ─── Location & route ────────────────────────────────────────────────────────

#[tokio::test]
async fn record_location_updates_current_and_appends() {
  let s = store().await;
  let id = TrackingId::new("T1");
  s.create_shipment(NewShipment::with_id("T1")).await.unwrap();

  let point = RoutePoint::new(nairobi(), Utc::now());
  let shipment = s
    .record_location(&id, point, "Kenyatta Avenue, Nairobi".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(shipment.current, Some(nairobi()));
  assert_eq!(
    shipment.current_address.as_deref(),
    Some("Kenyatta Avenue, Nairobi")
  );

  let route = s.route_points(&id, 10).await.unwrap();
  assert_eq!(route, vec![point]);
}

#[tokio::test]
async fn record_location_on_missing_shipment_writes_nothing() {
  let s = store().await;
  let id = TrackingId::new("ghost");
  let point = RoutePoint::new(nairobi(), Utc::now());
  assert!(
    s.record_location(&id, point, String::new())
      .await
      .unwrap()
      .is_none()
  );
  assert!(s.route_points(&id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn route_points_newest_first_and_limited() {
  let s = store().await;
  let id = TrackingId::new("T1");
  s.create_shipment(NewShipment::with_id("T1")).await.unwrap();

  let start = Utc::now();
  for i in 0..5 {
    let at = Coordinate::new(-1.0 - f64::from(i) * 0.01, 36.8).unwrap();
    let point = RoutePoint::new(at, start + Duration::seconds(i64::from(i)));
    assert!(s.append_route_point(&id, point).await.unwrap());
  }

  let route = s.route_points(&id, 3).await.unwrap();
  assert_eq!(route.len(), 3);
  assert_eq!(route[0].timestamp, start + Duration::seconds(4));
  assert_eq!(route[2].timestamp, start + Duration::seconds(2));
  assert!(route.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[tokio::test]
async fn eta_update() {
  let s = store().await;
  let id = TrackingId::new("T1");
  s.create_shipment(NewShipment::with_id("T1")).await.unwrap();

  let eta = Utc::now() + Duration::hours(3);
  let shipment = s.update_shipment_eta(&id, eta).await.unwrap().unwrap();
  assert_eq!(shipment.eta, Some(eta));
  assert!(
    s.update_shipment_eta(&"ghost".into(), eta)
      .await
      .unwrap()
      .is_none()
  );
}
