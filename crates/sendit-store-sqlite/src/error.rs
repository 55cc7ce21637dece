//! Error type for `sendit-store-sqlite`.

use sendit_core::TrackingId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] sendit_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("tracking id already exists: {0}")]
  DuplicateTrackingId(TrackingId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
