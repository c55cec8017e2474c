//! HTTP and WebSocket gateway for parley.
//!
//! This crate provides the public-facing surface of the messaging backend.
//! It handles:
//!
//! - Bearer token authentication on every request and socket upgrade
//! - The `/v1/ws` live connection, bridged to the real-time core
//! - REST endpoints for messages, friends, and profiles
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Clients                              │
//! │                   (HTTP / WebSocket)                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     parley-gateway                          │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │   Auth      │ │   Router    │ │    WebSocket        │    │
//! │  │  Extractor  │ │  + Handlers │ │    Bridge           │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┴──────────────┐
//!               ▼                             ▼
//!        ┌──────────────┐              ┌──────────┐
//!        │  Realtime    │              │  Auth    │
//!        │  Service     │              │  (JWT)   │
//!        └──────────────┘              └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use parley_gateway::{GatewayConfig, GatewayState, create_router};
//! use parley_realtime::RealtimeService;
//! use parley_auth::{AuthConfig, SecretValidator};
//! use parley_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Initialize dependencies
//! let store = Arc::new(RocksStore::open("/tmp/parley")?);
//! let jwt_validator = Arc::new(SecretValidator::new(&AuthConfig {
//!     secret: "super-secret".to_string(),
//!     ..Default::default()
//! }));
//! let realtime = Arc::new(RealtimeService::with_defaults(store, jwt_validator.clone()));
//!
//! // Create gateway state
//! let config = GatewayConfig::default();
//! let state = GatewayState::new(realtime, jwt_validator, config);
//!
//! // Create router
//! let app = create_router(state);
//!
//! // Run server
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;

// Re-export key types for convenience
pub use auth::AuthUser;
