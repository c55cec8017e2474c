//! Profile endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use parley_auth::JwtValidator;
use parley_realtime::{PresenceStatus, ProfileUpdate};
use parley_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::messages::parse_user_id;
use crate::state::GatewayState;

/// Request to change the caller's stored status.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    /// The new status.
    pub status: PresenceStatus,
}

/// Get the caller's own profile.
///
/// # Errors
///
/// Returns 404 if the caller has not created a profile yet.
pub async fn get_me<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    Ok(Json(state.realtime.get_profile(&user.user_id)?))
}

/// Create or update the caller's profile.
///
/// # Errors
///
/// Returns 400 for an invalid display name.
pub async fn update_me<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    user: AuthUser,
    Json(body): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    Ok(Json(state.realtime.update_profile(&user.user_id, body)?))
}

/// Set the caller's stored status (`online`, `away`, or `offline`).
///
/// # Errors
///
/// Returns 404 if the caller has not created a profile yet.
pub async fn set_status<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    user: AuthUser,
    Json(body): Json<StatusBody>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    Ok(Json(state.realtime.set_status(&user.user_id, body.status)?))
}

/// Get another user's profile.
///
/// # Errors
///
/// Returns 400 for a malformed ID or 404 for an unknown user.
pub async fn get_user<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    _user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(state.realtime.get_profile(&user_id)?))
}
