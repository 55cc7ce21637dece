//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A presented credential was missing, malformed, expired or forged.
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("token signing failed: {0}")]
  Signing(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized(msg) => {
        let mut res =
          (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg })))
            .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Bearer realm=\"sendit\""),
        );
        res
      }
      Error::Signing(e) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
      )
        .into_response(),
    }
  }
}
