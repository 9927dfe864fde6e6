//! Request identity.
//!
//! The identity provider's proxy authenticates the browser and forwards the
//! user id in `x-user-id`. Requests without it never reach the store.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use job_list::{JobListError, OwnerId};

use super::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct Session(pub OwnerId);

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| JobListError::Unauthorized("no active session".into()))?;
        Ok(Session(OwnerId::new(user_id)))
    }
}
