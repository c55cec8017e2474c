//! Real-time presence and message delivery for parley.
//!
//! This crate tracks which users are connected, routes live events between
//! their connections, and keeps the durable message and account records in
//! step with what was actually delivered.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Gateway (HTTP/WS)                       │
//! └─────────────────────────────────────────────────────────────┘
//!           │ frames                          │ requests
//!           ▼                                 │
//! ┌──────────────────┐                        │
//! │ Connection actor │  one task per socket   │
//! └──────────────────┘                        │
//!           │                                 ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      RealtimeService                        │
//! │  ┌─────────────┐ ┌─────────────┐ ┌──────────────────────┐   │
//! │  │ Connection  │ │   Event     │ │  Social graph and    │   │
//! │  │ lifecycle   │ │   Router    │ │  history             │   │
//! │  └─────────────┘ └─────────────┘ └──────────────────────┘   │
//! │                  ┌─────────────────┐                        │
//! │                  │PresenceRegistry │                        │
//! │                  └─────────────────┘                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┴──────────────┐
//!               ▼                             ▼
//!        ┌──────────┐                  ┌──────────┐
//!        │  Store   │                  │  Auth    │
//!        │ (RocksDB)│                  │  (JWT)   │
//!        └──────────┘                  └──────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use parley_auth::{AuthConfig, SecretValidator};
//! use parley_realtime::{actor, ConnectionCommand, RealtimeService};
//! use parley_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/parley")?);
//! let validator = Arc::new(SecretValidator::new(&AuthConfig {
//!     secret: "super-secret".to_string(),
//!     ..Default::default()
//! }));
//! let service = Arc::new(RealtimeService::with_defaults(store, validator));
//!
//! // A socket presented a token
//! let user_id = service.authenticate(Some("eyJhbGciOi...")).await?;
//!
//! let (outbox, mut events) = tokio::sync::mpsc::channel(256);
//! let connection = service.connect(user_id, outbox);
//! let (commands, _task) = actor::spawn(service.clone(), connection);
//!
//! commands
//!     .send(ConnectionCommand::from_text(r#"{"event":"typing","data":{"receiverId":"..."}}"#))
//!     .await?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.to_text()?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Delivery status
//!
//! Messages are created `sent`, become `delivered` when pushed live to the
//! receiver's connection, and `read` when the receiver marks them or pages
//! through history. Status never moves backwards.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod actor;
pub mod connection;
pub mod error;
pub mod events;
pub mod history;
pub mod presence;
pub mod router;
pub mod service;
pub mod social;
pub mod types;

#[cfg(test)]
mod test_support;

pub use actor::ConnectionCommand;
pub use connection::Connection;
pub use error::{RealtimeError, Result};
pub use events::{InboundEvent, OutboundEvent, SendMessagePayload};
pub use presence::{ConnectionHandle, PresenceRegistry};
pub use service::RealtimeService;
pub use types::{
    FriendRequestView, FriendView, HistoryPage, MessageView, Participant, ProfileUpdate,
    ProfileView, RealtimeConfig,
};

// Re-export commonly used types from dependencies for convenience
pub use parley_core::{ConnectionId, MessageId, RelationshipId, UserId};
pub use parley_store::{DeliveryStatus, MessageKind, PresenceStatus, RelationshipStatus};
