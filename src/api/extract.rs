use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header carrying the authenticated user id, set by the upstream identity
/// provider that terminates the session. This service never sees credentials.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user for a request; rejects with 401 when absent
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok())
            .map(AuthUser)
            .ok_or(AppError::Unauthenticated)
    }
}

/// Like [`AuthUser`] but for routes that also serve anonymous visitors
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<i64>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok());

        Ok(MaybeUser(user))
    }
}
