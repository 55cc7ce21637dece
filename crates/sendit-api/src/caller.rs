//! Request identity extractors.
//!
//! The API does not verify credentials itself. Whatever sits in front of it
//! (see `sendit-server`'s auth middleware) inserts a verified [`Identity`]
//! into the request extensions; these extractors read it back.

use axum::{extract::FromRequestParts, http::request::Parts};
use sendit_tracking::{Identity, Role};

use crate::error::ApiError;

/// The verified identity behind a request. Rejects with 401 when absent.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl<St> FromRequestParts<St> for Caller
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &St,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Identity>()
      .cloned()
      .map(Caller)
      .ok_or(ApiError::Unauthenticated)
  }
}

/// A caller holding the `admin` role. Rejects with 403 otherwise.
#[derive(Debug, Clone)]
pub struct Admin(pub Identity);

impl<St> FromRequestParts<St> for Admin
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &St,
  ) -> Result<Self, Self::Rejection> {
    let Caller(identity) = Caller::from_request_parts(parts, state).await?;
    if identity.role != Role::Admin {
      return Err(ApiError::Forbidden("admin role required".into()));
    }
    Ok(Admin(identity))
  }
}
