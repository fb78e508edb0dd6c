//! Request extractors.
//!
//! Authentication is handled upstream; the gateway forwards the
//! authenticated user id in the `x-user-id` header and the core trusts it
//! as-is.

use super::error::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use boxoffice_core::types::UserId;
use uuid::Uuid;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized("missing x-user-id header"))?;
        let id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| AppError::unauthorized("x-user-id is not a valid id"))?;
        Ok(Self(UserId::from_uuid(id)))
    }
}
