//! `RocksDB` storage layer for parley.
//!
//! This crate provides persistent storage for accounts, relationships, and
//! messages using `RocksDB` with column families for efficient indexing.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `accounts`: Account records, keyed by `user_id`
//! - `relationships`: Primary relationship records, keyed by `relationship_id`
//! - `relationship_pairs`: Uniqueness index over the unordered user pair
//! - `relationships_by_user`: Index for listing relationships by user
//! - `messages`: Primary message records, keyed by `message_id`
//! - `messages_by_conversation`: Chronological index per user pair
//!
//! # Example
//!
//! ```no_run
//! use parley_store::{RocksStore, Store};
//! use parley_core::UserId;
//!
//! let store = RocksStore::open("/tmp/parley-db").unwrap();
//!
//! // List accepted friendships for a user
//! let user_id = UserId::from_bytes([0u8; 16]);
//! let friends = store.list_accepted(&user_id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{
    Account, DeliveryStatus, Message, MessageKind, PresenceStatus, Relationship,
    RelationshipStatus,
};

use chrono::{DateTime, Utc};
use parley_core::{MessageId, RelationshipId, UserId};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, fault-injecting wrappers in tests).
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert or update an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &Account) -> Result<()>;

    /// Get an account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>>;

    /// Set an account's profile fields, creating the account if needed.
    ///
    /// Presence fields of an existing account are left as stored. A new
    /// account starts with `initial_status`. The read-modify-write is atomic
    /// with respect to presence updates.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn upsert_profile(
        &self,
        user_id: &UserId,
        display_name: &str,
        avatar: Option<String>,
        initial_status: PresenceStatus,
    ) -> Result<Account>;

    /// Update an account's presence status.
    ///
    /// `last_seen` is only written when provided.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn update_presence(
        &self,
        user_id: &UserId,
        status: PresenceStatus,
        last_seen: Option<DateTime<Utc>>,
    ) -> Result<()>;

    // =========================================================================
    // Relationship Operations
    // =========================================================================

    /// Insert a new relationship record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if any relationship already exists
    /// for the same unordered pair of users.
    fn create_relationship(&self, relationship: &Relationship) -> Result<()>;

    /// Get a relationship by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_relationship(&self, relationship_id: &RelationshipId) -> Result<Option<Relationship>>;

    /// Find the relationship between two users, in either direction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_relationship(&self, a: &UserId, b: &UserId) -> Result<Option<Relationship>>;

    /// List every relationship a user is part of, in any status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_relationships_by_user(&self, user_id: &UserId) -> Result<Vec<Relationship>>;

    /// Move a relationship from `expected` to `status`.
    ///
    /// The compare and the write happen atomically, so of two callers racing
    /// from the same status only one succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the relationship doesn't exist, or
    /// `StoreError::StatusConflict` if it is no longer in `expected`.
    fn update_relationship_status(
        &self,
        relationship_id: &RelationshipId,
        expected: RelationshipStatus,
        status: RelationshipStatus,
    ) -> Result<Relationship>;

    /// Find the relationship between two users if it is accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_accepted(&self, a: &UserId, b: &UserId) -> Result<Option<Relationship>> {
        Ok(self
            .find_relationship(a, b)?
            .filter(Relationship::is_accepted))
    }

    /// List every accepted relationship a user is part of.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_accepted(&self, user_id: &UserId) -> Result<Vec<Relationship>> {
        Ok(self
            .list_relationships_by_user(user_id)?
            .into_iter()
            .filter(Relationship::is_accepted)
            .collect())
    }

    // =========================================================================
    // Message Operations
    // =========================================================================

    /// Insert a new message record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn create_message(&self, message: &Message) -> Result<()>;

    /// Get a message by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_message(&self, message_id: &MessageId) -> Result<Option<Message>>;

    /// Move a message's delivery status forward.
    ///
    /// The read-modify-write is atomic per message. A request that would not
    /// move the status forward leaves the record untouched. Returns the
    /// message as stored after the call.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the message doesn't exist.
    fn advance_message_status(
        &self,
        message_id: &MessageId,
        status: DeliveryStatus,
    ) -> Result<Message>;

    /// List messages exchanged between two users, newest first.
    ///
    /// When `before` is given, only messages strictly older than that message
    /// are returned.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if `before` names an unknown message.
    fn list_conversation(
        &self,
        a: &UserId,
        b: &UserId,
        before: Option<&MessageId>,
        limit: usize,
    ) -> Result<Vec<Message>>;
}
