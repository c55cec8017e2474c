//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use parley_auth::JwtValidator;
use parley_store::Store;

use crate::handlers::{friends, health, messages, users, ws};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Live connection
/// - `GET /v1/ws` - WebSocket upgrade (`?token=` or bearer header)
///
/// ## Messages (authenticated)
/// - `POST /v1/messages` - Send a message
/// - `GET /v1/messages/:peer_id` - Conversation history
///
/// ## Friends (authenticated)
/// - `GET /v1/friends` - List friends with presence
/// - `GET /v1/friends/requests` - List pending requests
/// - `POST /v1/friends/requests` - Send a request
/// - `POST /v1/friends/requests/:request_id/accept` - Accept a request
/// - `POST /v1/friends/requests/:request_id/reject` - Reject a request
///
/// ## Profiles (authenticated)
/// - `GET /v1/me` - Own profile
/// - `PUT /v1/me` - Create or update own profile
/// - `PUT /v1/me/status` - Set own status
/// - `GET /v1/users/:user_id` - Another user's profile
pub fn create_router<S, V>(state: GatewayState<S, V>) -> Router
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    // Build the router
    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health::<S, V>))
        // Live connection
        .route("/v1/ws", get(ws::websocket_handler::<S, V>))
        // Messages
        .route("/v1/messages", post(messages::send_message::<S, V>))
        .route("/v1/messages/:peer_id", get(messages::get_history::<S, V>))
        // Friends
        .route("/v1/friends", get(friends::list_friends::<S, V>))
        .route(
            "/v1/friends/requests",
            get(friends::list_requests::<S, V>).post(friends::create_request::<S, V>),
        )
        .route(
            "/v1/friends/requests/:request_id/accept",
            post(friends::accept_request::<S, V>),
        )
        .route(
            "/v1/friends/requests/:request_id/reject",
            post(friends::reject_request::<S, V>),
        )
        // Profiles
        .route(
            "/v1/me",
            get(users::get_me::<S, V>).put(users::update_me::<S, V>),
        )
        .route("/v1/me/status", put(users::set_status::<S, V>))
        .route("/v1/users/:user_id", get(users::get_user::<S, V>))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // For specific origins, parse them
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
