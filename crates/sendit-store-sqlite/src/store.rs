//! [`SqliteStore`] — the SQLite implementation of [`ShipmentStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use sendit_core::{
  Coordinate, NewShipment, ParcelStatus, RoutePoint, Shipment, TrackingId,
  store::{ShipmentStore, StatusChange, StatusWrite},
};

use crate::{
  Error, Result,
  encode::{
    RawRoutePoint, RawShipment, SHIPMENT_COLUMNS, decode_status, encode_dt,
    encode_status,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A shipment store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// are executed in order on the connection's worker thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Status write outcome before decoding.
enum RawStatusWrite {
  Applied(RawShipment),
  Conflict(String),
  Missing,
}

fn read_shipment(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawShipment>> {
  conn
    .query_row(
      &format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE tracking_id = ?1"),
      rusqlite::params![id],
      RawShipment::from_row,
    )
    .optional()
}

fn insert_route_point(
  conn: &rusqlite::Connection,
  id: &str,
  point: &RoutePoint,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO route_points (tracking_id, lat, lng, recorded_at)
     VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![id, point.lat, point.lng, encode_dt(point.timestamp)],
  )?;
  Ok(())
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a single-column update and return the shipment afterwards.
  async fn update_and_read(
    &self,
    id: &TrackingId,
    sql: &'static str,
    value: Option<String>,
  ) -> Result<Option<Shipment>> {
    let id_str = id.as_str().to_owned();
    let now_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed =
          conn.execute(sql, rusqlite::params![id_str, value, now_str])?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(read_shipment(conn, &id_str)?)
      })
      .await?;

    raw.map(RawShipment::into_shipment).transpose()
  }
}

// ─── ShipmentStore impl ──────────────────────────────────────────────────────

impl ShipmentStore for SqliteStore {
  type Error = Error;

  async fn create_shipment(&self, input: NewShipment) -> Result<Shipment> {
    let now = Utc::now();
    let shipment = Shipment {
      tracking_id:     input.tracking_id.unwrap_or_else(TrackingId::generate),
      status:          ParcelStatus::Pending,
      current:         None,
      current_address: None,
      carrier_id:      input.carrier_id,
      delivered_at:    None,
      eta:             None,
      details:         if input.details.is_null() {
        serde_json::json!({})
      } else {
        input.details
      },
      created_at:      now,
      updated_at:      now,
    };

    let id_str      = shipment.tracking_id.as_str().to_owned();
    let status_str  = encode_status(shipment.status);
    let carrier     = shipment.carrier_id.clone();
    let details_str = serde_json::to_string(&shipment.details)?;
    let at_str      = encode_dt(now);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken = tx
          .query_row(
            "SELECT 1 FROM shipments WHERE tracking_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO shipments (
             tracking_id, status, carrier_id, details, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, status_str, carrier, details_str, at_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateTrackingId(shipment.tracking_id));
    }
    Ok(shipment)
  }

  async fn get_shipment(&self, id: &TrackingId) -> Result<Option<Shipment>> {
    let id_str = id.as_str().to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(read_shipment(conn, &id_str)?))
      .await?;
    raw.map(RawShipment::into_shipment).transpose()
  }

  async fn get_shipment_status(
    &self,
    id: &TrackingId,
  ) -> Result<Option<ParcelStatus>> {
    let id_str = id.as_str().to_owned();
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT status FROM shipments WHERE tracking_id = ?1",
              rusqlite::params![id_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    raw.as_deref().map(decode_status).transpose()
  }

  async fn update_shipment_location(
    &self,
    id: &TrackingId,
    at: Coordinate,
    address: String,
  ) -> Result<Option<Shipment>> {
    let id_str  = id.as_str().to_owned();
    let now_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE shipments
              SET current_lat = ?2, current_lng = ?3, current_address = ?4,
                  updated_at = ?5
            WHERE tracking_id = ?1",
          rusqlite::params![id_str, at.lat, at.lng, address, now_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(read_shipment(conn, &id_str)?)
      })
      .await?;

    raw.map(RawShipment::into_shipment).transpose()
  }

  async fn append_route_point(
    &self,
    id: &TrackingId,
    point: RoutePoint,
  ) -> Result<bool> {
    let id_str = id.as_str().to_owned();
    let appended = self
      .conn
      .call(move |conn| {
        if read_shipment(conn, &id_str)?.is_none() {
          return Ok(false);
        }
        insert_route_point(conn, &id_str, &point)?;
        Ok(true)
      })
      .await?;
    Ok(appended)
  }

  async fn record_location(
    &self,
    id: &TrackingId,
    point: RoutePoint,
    address: String,
  ) -> Result<Option<Shipment>> {
    let id_str  = id.as_str().to_owned();
    let now_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE shipments
              SET current_lat = ?2, current_lng = ?3, current_address = ?4,
                  updated_at = ?5
            WHERE tracking_id = ?1",
          rusqlite::params![id_str, point.lat, point.lng, address, now_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        insert_route_point(&tx, &id_str, &point)?;
        let shipment = read_shipment(&tx, &id_str)?;
        tx.commit()?;
        Ok(shipment)
      })
      .await?;

    raw.map(RawShipment::into_shipment).transpose()
  }

  async fn update_shipment_status(
    &self,
    id: &TrackingId,
    change: StatusChange,
  ) -> Result<StatusWrite> {
    let id_str       = id.as_str().to_owned();
    let expected_str = encode_status(change.expected);
    let status_str   = encode_status(change.status);
    let delivered    = change.delivered_at.map(encode_dt);
    let now_str      = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE shipments
              SET status = ?3,
                  delivered_at = COALESCE(?4, delivered_at),
                  updated_at = ?5
            WHERE tracking_id = ?1 AND status = ?2",
          rusqlite::params![id_str, expected_str, status_str, delivered, now_str],
        )?;

        let outcome = if changed == 1 {
          match read_shipment(&tx, &id_str)? {
            Some(raw) => RawStatusWrite::Applied(raw),
            None => RawStatusWrite::Missing,
          }
        } else {
          let actual: Option<String> = tx
            .query_row(
              "SELECT status FROM shipments WHERE tracking_id = ?1",
              rusqlite::params![id_str],
              |r| r.get(0),
            )
            .optional()?;
          match actual {
            Some(actual) => RawStatusWrite::Conflict(actual),
            None => RawStatusWrite::Missing,
          }
        };

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(match raw {
      RawStatusWrite::Applied(raw) => StatusWrite::Applied(raw.into_shipment()?),
      RawStatusWrite::Conflict(actual) => StatusWrite::Conflict {
        actual: decode_status(&actual)?,
      },
      RawStatusWrite::Missing => StatusWrite::Missing,
    })
  }

  async fn update_shipment_eta(
    &self,
    id: &TrackingId,
    eta: DateTime<Utc>,
  ) -> Result<Option<Shipment>> {
    self
      .update_and_read(
        id,
        "UPDATE shipments SET eta = ?2, updated_at = ?3 WHERE tracking_id = ?1",
        Some(encode_dt(eta)),
      )
      .await
  }

  async fn route_points(
    &self,
    id: &TrackingId,
    limit: usize,
  ) -> Result<Vec<RoutePoint>> {
    let id_str    = id.as_str().to_owned();
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawRoutePoint> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT lat, lng, recorded_at
             FROM route_points
            WHERE tracking_id = ?1
            ORDER BY point_id DESC
            LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str, limit_val], |row| {
            Ok(RawRoutePoint {
              lat:         row.get(0)?,
              lng:         row.get(1)?,
              recorded_at: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRoutePoint::into_route_point).collect()
  }
}
