//! Direct message endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use parley_auth::JwtValidator;
use parley_core::{MessageId, UserId};
use parley_realtime::SendMessagePayload;
use parley_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Query parameters for history pagination.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Page size, clamped to the configured maximum.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Only return messages older than this message.
    #[serde(default)]
    pub before: Option<String>,
}

/// Send a message to an accepted friend.
///
/// The receiver gets it live if connected, and the sender's own connection
/// gets the `message_sent` acknowledgement.
///
/// # Errors
///
/// Returns 400 for invalid content, 403 if the users are not friends.
pub async fn send_message<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    user: AuthUser,
    Json(body): Json<SendMessagePayload>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    let view = state.realtime.send_message(&user.user_id, body)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Page through the conversation with a friend, newest first.
///
/// Messages addressed to the caller on the returned page are marked read.
///
/// # Errors
///
/// Returns 400 for malformed IDs, 403 if the users are not friends, or 404
/// for an unknown cursor.
pub async fn get_history<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    user: AuthUser,
    Path(peer_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    let peer_id = parse_user_id(&peer_id)?;
    let before = query
        .before
        .as_deref()
        .map(parse_message_id)
        .transpose()?;
    let limit = state.config.page_limit(query.limit);

    let page = state
        .realtime
        .history(&user.user_id, &peer_id, before, limit)?;

    Ok(Json(page))
}

/// Parse a user ID from a path segment.
pub(crate) fn parse_user_id(s: &str) -> Result<UserId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid user ID: {s}")))
}

/// Parse a message ID from a query parameter.
fn parse_message_id(s: &str) -> Result<MessageId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid message ID: {s}")))
}
