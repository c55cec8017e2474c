//! Friend and friend request endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use parley_auth::JwtValidator;
use parley_core::{RelationshipId, UserId};
use parley_realtime::{FriendRequestView, FriendView};
use parley_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response for the friend list.
#[derive(Debug, Serialize)]
pub struct ListFriendsResponse {
    /// Accepted friends with live presence.
    pub friends: Vec<FriendView>,
}

/// Response for the pending request list.
#[derive(Debug, Serialize)]
pub struct ListRequestsResponse {
    /// Pending requests addressed to the caller.
    pub requests: Vec<FriendRequestView>,
}

/// Request to befriend another user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestBody {
    /// Who to send the request to.
    pub recipient_id: UserId,
}

// =============================================================================
// Handlers
// =============================================================================

/// List the caller's accepted friends.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn list_friends<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    let friends = state.realtime.list_friends(&user.user_id)?;
    Ok(Json(ListFriendsResponse { friends }))
}

/// List pending friend requests addressed to the caller.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn list_requests<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    let requests = state.realtime.list_friend_requests(&user.user_id)?;
    Ok(Json(ListRequestsResponse { requests }))
}

/// Send a friend request.
///
/// # Errors
///
/// Returns 400 for a self-request, 404 for an unknown recipient, or 409 if
/// the pair already has a relationship.
pub async fn create_request<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    user: AuthUser,
    Json(body): Json<FriendRequestBody>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    let request = state
        .realtime
        .send_friend_request(&user.user_id, &body.recipient_id)?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Accept a friend request addressed to the caller.
///
/// # Errors
///
/// Returns 403 if the caller is not the recipient, 404 if the request
/// doesn't exist, or 409 if it was already answered.
pub async fn accept_request<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    user: AuthUser,
    Path(request_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    let request_id = parse_request_id(&request_id)?;
    let request = state
        .realtime
        .respond_to_request(&user.user_id, &request_id, true)?;
    Ok(Json(request))
}

/// Reject a friend request addressed to the caller.
///
/// # Errors
///
/// Returns 403 if the caller is not the recipient, 404 if the request
/// doesn't exist, or 409 if it was already answered.
pub async fn reject_request<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    user: AuthUser,
    Path(request_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    let request_id = parse_request_id(&request_id)?;
    let request = state
        .realtime
        .respond_to_request(&user.user_id, &request_id, false)?;
    Ok(Json(request))
}

/// Parse a friend request ID from a path segment.
fn parse_request_id(s: &str) -> Result<RelationshipId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid request ID: {s}")))
}
