//! Core types and utilities for parley.
//!
//! This crate provides the foundational types used throughout the parley
//! messaging backend:
//!
//! - **Identifiers**: Strongly-typed IDs for users, messages, relationships,
//!   and live connections
//! - **Error types**: Common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use parley_core::{MessageId, UserId};
//!
//! // Parse a user ID from its UUID form
//! let user_id: UserId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
//!
//! // Generate a message ID
//! let message_id = MessageId::generate();
//! assert_ne!(message_id.to_string(), user_id.to_string());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;

pub use error::{CoreError, Result};
pub use ids::{ordered_pair, ConnectionId, IdError, MessageId, RelationshipId, UserId};
