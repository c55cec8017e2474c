//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions to encode and decode keys for various indexes.
//! All keys are designed to support efficient prefix scans.

use chrono::{DateTime, Utc};
use parley_core::{ordered_pair, MessageId, RelationshipId, UserId};

/// Length of an encoded unordered user pair.
pub const PAIR_LEN: usize = 32;

/// Length of a conversation index key: `pair || timestamp || message_id`.
pub const CONVERSATION_KEY_LEN: usize = PAIR_LEN + 8 + 16;

/// Encode an account key (just the user ID bytes).
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Encode a relationship key (just the relationship ID bytes).
#[must_use]
pub fn relationship_key(relationship_id: &RelationshipId) -> Vec<u8> {
    relationship_id.as_bytes().to_vec()
}

/// Encode an unordered user pair: `low_user || high_user`.
///
/// `pair_key(a, b) == pair_key(b, a)` for all users.
#[must_use]
pub fn pair_key(a: &UserId, b: &UserId) -> Vec<u8> {
    let (low, high) = ordered_pair(*a, *b);
    let mut key = Vec::with_capacity(PAIR_LEN);
    key.extend_from_slice(low.as_bytes());
    key.extend_from_slice(high.as_bytes());
    key
}

/// Encode a user-relationship index key: `user_id || relationship_id`.
#[must_use]
pub fn user_relationship_key(user_id: &UserId, relationship_id: &RelationshipId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(relationship_id.as_bytes());
    key
}

/// Encode a user prefix for scanning all relationships of a user.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the relationship ID from a user-relationship key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_relationship_id(key: &[u8]) -> RelationshipId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    RelationshipId::from_bytes(bytes)
}

/// Decode a relationship ID stored as an index value.
#[must_use]
pub fn decode_relationship_id(value: &[u8]) -> Option<RelationshipId> {
    let bytes: [u8; 16] = value.try_into().ok()?;
    Some(RelationshipId::from_bytes(bytes))
}

/// Encode a message key (just the message ID bytes).
#[must_use]
pub fn message_key(message_id: &MessageId) -> Vec<u8> {
    message_id.as_bytes().to_vec()
}

/// Encode a timestamp so that byte order matches chronological order.
fn timestamp_bytes(at: &DateTime<Utc>) -> [u8; 8] {
    // Flipping the sign bit maps i64 order onto unsigned big-endian order.
    (at.timestamp_millis() ^ i64::MIN).to_be_bytes()
}

/// Encode a conversation index key: `pair || created_at || message_id`.
///
/// Keys within one conversation sort oldest first.
#[must_use]
pub fn conversation_message_key(
    a: &UserId,
    b: &UserId,
    created_at: &DateTime<Utc>,
    message_id: &MessageId,
) -> Vec<u8> {
    let mut key = pair_key(a, b);
    key.reserve(24);
    key.extend_from_slice(&timestamp_bytes(created_at));
    key.extend_from_slice(message_id.as_bytes());
    key
}

/// Encode the upper bound for a newest-first scan of a whole conversation.
#[must_use]
pub fn conversation_end(a: &UserId, b: &UserId) -> Vec<u8> {
    let mut key = pair_key(a, b);
    key.extend_from_slice(&[0xff; 24]);
    key
}

/// Extract the message ID from a conversation index key.
///
/// # Panics
///
/// Panics if the key is not at least `CONVERSATION_KEY_LEN` bytes.
#[must_use]
pub fn extract_message_id(key: &[u8]) -> MessageId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[PAIR_LEN + 8..CONVERSATION_KEY_LEN]);
    MessageId::from_bytes(bytes)
}
