//! SQL schema for the SendIt SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS shipments (
    tracking_id     TEXT PRIMARY KEY,
    status          TEXT NOT NULL DEFAULT 'pending',
    current_lat     REAL,
    current_lng     REAL,
    current_address TEXT,
    carrier_id      TEXT,
    delivered_at    TEXT,            -- RFC 3339 UTC; written once
    eta             TEXT,
    details         TEXT NOT NULL DEFAULT '{}',  -- opaque JSON passthrough
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- Route points are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS route_points (
    point_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    tracking_id TEXT NOT NULL REFERENCES shipments(tracking_id),
    lat         REAL NOT NULL,
    lng         REAL NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS route_points_shipment_idx
    ON route_points(tracking_id, point_id);
CREATE INDEX IF NOT EXISTS shipments_status_idx ON shipments(status);

PRAGMA user_version = 1;
";
