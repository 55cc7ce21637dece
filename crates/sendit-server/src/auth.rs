//! Bearer-token verification and the identity middleware.
//!
//! Access tokens are HS256 JWTs signed with the server's `jwt_secret`. A
//! valid token on an HTTP request attaches an [`Identity`] to the request
//! extensions; `sendit-api` handlers read it from there. The realtime
//! endpoint verifies its token once, before the upgrade.

use std::sync::Arc;

use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use sendit_core::Error as CoreError;
use sendit_tracking::{CredentialVerifier, Identity, Role};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  #[serde(alias = "userId")]
  pub sub:  String,
  pub role: Role,
  /// Expiry, seconds since the Unix epoch.
  pub exp:  u64,
}

// ─── Verifier ─────────────────────────────────────────────────────────────────

pub struct JwtVerifier {
  key:        DecodingKey,
  validation: Validation,
}

impl JwtVerifier {
  pub fn new(secret: &str) -> Self {
    Self {
      key:        DecodingKey::from_secret(secret.as_bytes()),
      validation: Validation::new(Algorithm::HS256),
    }
  }
}

impl CredentialVerifier for JwtVerifier {
  fn verify(&self, token: &str) -> sendit_core::Result<Identity> {
    let data = decode::<Claims>(token, &self.key, &self.validation)
      .map_err(|e| CoreError::Unauthorized(e.to_string()))?;
    Ok(Identity { subject: data.claims.sub, role: data.claims.role })
  }
}

/// Sign a token for `subject` valid for `ttl`.
pub fn issue_token(
  secret: &str,
  subject: &str,
  role: Role,
  ttl: Duration,
) -> Result<String, Error> {
  let claims = Claims {
    sub:  subject.to_string(),
    role,
    exp:  (Utc::now() + ttl).timestamp().max(0) as u64,
  };
  let token = encode(
    &Header::new(Algorithm::HS256),
    &claims,
    &EncodingKey::from_secret(secret.as_bytes()),
  )?;
  Ok(token)
}

// ─── Extraction ───────────────────────────────────────────────────────────────

/// The token from an `Authorization: Bearer …` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

/// Attach the caller's [`Identity`] when a bearer token is present.
///
/// Requests without a token pass through untouched (public routes stay
/// public); requests with an invalid token are refused with 401.
pub async fn attach_identity(
  State(verifier): State<Arc<dyn CredentialVerifier>>,
  mut req: Request,
  next: Next,
) -> Response {
  let verified = bearer_token(req.headers()).map(|t| verifier.verify(t));
  match verified {
    None => next.run(req).await,
    Some(Ok(identity)) => {
      req.extensions_mut().insert(identity);
      next.run(req).await
    }
    Some(Err(e)) => {
      tracing::debug!(error = %e, "rejected bearer token");
      Error::Unauthorized(e.to_string()).into_response()
    }
  }
}
