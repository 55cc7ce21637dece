//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use sendit_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The route needs a verified identity and the request carried none.
  #[error("authentication required")]
  Unauthenticated,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::Unauthenticated => {
        (StatusCode::UNAUTHORIZED, json!({ "error": self.to_string() }))
      }
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, json!({ "error": m })),
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, json!({ "error": m }))
      }
      ApiError::Core(e) => core_response(e),
    };
    (status, Json(body)).into_response()
  }
}

fn core_response(e: &CoreError) -> (StatusCode, serde_json::Value) {
  let message = e.to_string();
  match e {
    CoreError::NotFound(_) => {
      (StatusCode::NOT_FOUND, json!({ "error": message }))
    }
    CoreError::InvalidTransition { from, to } => (
      StatusCode::BAD_REQUEST,
      json!({ "error": message, "current": from, "requested": to }),
    ),
    CoreError::InvalidCoordinate { .. } | CoreError::UnknownStatus(_) => {
      (StatusCode::BAD_REQUEST, json!({ "error": message }))
    }
    CoreError::Unauthorized(_) => {
      (StatusCode::FORBIDDEN, json!({ "error": message }))
    }
    CoreError::PersistenceConflict { .. } => (
      StatusCode::CONFLICT,
      json!({ "error": message, "retryable": true }),
    ),
    CoreError::UpstreamUnavailable(_) => {
      (StatusCode::BAD_GATEWAY, json!({ "error": message }))
    }
    CoreError::Store(_) => {
      tracing::error!(error = %message, "store failure");
      (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
    }
  }
}
