//! Friend request operations.
//!
//! A relationship starts `pending` when requested and is answered once by
//! its recipient:
//!
//! ```text
//!   ┌─────────┐  accept   ┌──────────┐
//!   │ Pending │──────────▶│ Accepted │
//!   └────┬────┘           └──────────┘
//!        │ reject
//!        ▼
//!   ┌──────────┐
//!   │ Rejected │
//!   └──────────┘
//! ```
//!
//! At most one record exists per unordered pair, so a rejected pair cannot
//! re-request.

use parley_core::{RelationshipId, UserId};
use parley_store::{Relationship, RelationshipStatus, Store, StoreError};

use crate::error::{RealtimeError, Result};

/// Check whether a relationship may move from `from` to `to`.
#[must_use]
pub const fn is_valid_transition(from: RelationshipStatus, to: RelationshipStatus) -> bool {
    matches!(
        (from, to),
        (
            RelationshipStatus::Pending,
            RelationshipStatus::Accepted | RelationshipStatus::Rejected
        )
    )
}

/// Create a pending request from `requester` to `recipient`.
///
/// # Errors
///
/// Returns `RealtimeError::Validation` for a self-request,
/// `RealtimeError::UserNotFound` if the recipient has no account, or
/// `RealtimeError::RelationshipExists` if the pair already has a record in
/// any status or direction.
pub fn send_request<S: Store>(
    store: &S,
    requester: &UserId,
    recipient: &UserId,
) -> Result<Relationship> {
    if requester == recipient {
        return Err(RealtimeError::Validation(
            "cannot send a friend request to yourself".to_string(),
        ));
    }

    if store.get_account(recipient)?.is_none() {
        return Err(RealtimeError::UserNotFound(*recipient));
    }

    let relationship = Relationship::pending(*requester, *recipient);
    match store.create_relationship(&relationship) {
        Ok(()) => Ok(relationship),
        Err(StoreError::AlreadyExists) => Err(RealtimeError::RelationshipExists {
            user_id: *requester,
            peer_id: *recipient,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Accept or reject a request addressed to `user_id`.
///
/// # Errors
///
/// Returns `RealtimeError::RelationshipNotFound` if the record doesn't exist,
/// `RealtimeError::NotRequestRecipient` if `user_id` is not its recipient, or
/// `RealtimeError::InvalidTransition` if it was already answered.
pub fn respond<S: Store>(
    store: &S,
    user_id: &UserId,
    relationship_id: &RelationshipId,
    accept: bool,
) -> Result<Relationship> {
    let relationship = store
        .get_relationship(relationship_id)?
        .ok_or(RealtimeError::RelationshipNotFound(*relationship_id))?;

    if relationship.recipient != *user_id {
        return Err(RealtimeError::NotRequestRecipient {
            user_id: *user_id,
            relationship_id: *relationship_id,
        });
    }

    let target = if accept {
        RelationshipStatus::Accepted
    } else {
        RelationshipStatus::Rejected
    };
    if !is_valid_transition(relationship.status, target) {
        return Err(RealtimeError::InvalidTransition {
            relationship_id: *relationship_id,
            from: relationship.status,
        });
    }

    match store.update_relationship_status(relationship_id, relationship.status, target) {
        Ok(updated) => Ok(updated),
        Err(StoreError::NotFound) => Err(RealtimeError::RelationshipNotFound(*relationship_id)),
        // Another decision landed between the read and the write
        Err(StoreError::StatusConflict { current }) => Err(RealtimeError::InvalidTransition {
            relationship_id: *relationship_id,
            from: current,
        }),
        Err(e) => Err(e.into()),
    }
}

/// List pending requests addressed to `user_id`, oldest first.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn list_pending<S: Store>(store: &S, user_id: &UserId) -> Result<Vec<Relationship>> {
    let mut pending: Vec<Relationship> = store
        .list_relationships_by_user(user_id)?
        .into_iter()
        .filter(|r| r.status == RelationshipStatus::Pending && r.recipient == *user_id)
        .collect();
    pending.sort_by_key(|r| r.created_at);
    Ok(pending)
}
