//! Common error types for parley.
//!
//! This module provides shared error types that are used across multiple crates.

use crate::ids::UserId;
use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the parley system.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A user with the specified ID was not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// An invalid identifier was provided.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::ids::IdError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
