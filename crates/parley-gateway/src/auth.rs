//! Authentication extractors.
//!
//! HTTP requests carry `Authorization: Bearer <token>`. WebSocket upgrades
//! may instead pass the token as the `token` query parameter, which wins
//! when both are present.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use parley_auth::{bearer_token, JwtValidator};
use parley_core::UserId;
use parley_store::Store;

use crate::error::ApiError;
use crate::state::GatewayState;

/// An authenticated user extracted from a JWT token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The caller's user ID, from the token subject.
    pub user_id: UserId,
}

#[async_trait]
impl<S, V> FromRequestParts<Arc<GatewayState<S, V>>> for AuthUser
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState<S, V>>,
    ) -> Result<Self, Self::Rejection> {
        let token = header_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        let claims = state.jwt_validator.validate(token).await?;

        Ok(Self {
            user_id: claims.user_id,
        })
    }
}

/// The bearer token from the `Authorization` header, if any.
#[must_use]
pub fn header_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
}

/// Pick the credential for a WebSocket upgrade.
///
/// The explicit `token` query parameter takes precedence over the header.
#[must_use]
pub fn connection_token<'a>(query: Option<&'a str>, headers: &'a HeaderMap) -> Option<&'a str> {
    query
        .filter(|t| !t.is_empty())
        .or_else(|| header_token(headers))
}
