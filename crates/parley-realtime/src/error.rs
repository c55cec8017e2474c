//! Error types for the real-time core.
//!
//! Every failure of a single inbound event is turned into an `error` event
//! for the calling connection; none of these errors close the connection.

use parley_core::{MessageId, RelationshipId, UserId};
use parley_store::RelationshipStatus;
use thiserror::Error;

/// A result type using `RealtimeError`.
pub type Result<T> = std::result::Result<T, RealtimeError>;

/// Errors that can occur in real-time and social-graph operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// The two users have no accepted relationship.
    #[error("user {user_id} is not friends with {peer_id}")]
    NotFriends {
        /// The user attempting the action.
        user_id: UserId,
        /// The other side of the action.
        peer_id: UserId,
    },

    /// The requested message was not found.
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),

    /// Only the receiver of a message may mark it read.
    #[error("user {user_id} is not the receiver of message {message_id}")]
    NotMessageRecipient {
        /// The user making the request.
        user_id: UserId,
        /// The message being accessed.
        message_id: MessageId,
    },

    /// The requested relationship was not found.
    #[error("relationship not found: {0}")]
    RelationshipNotFound(RelationshipId),

    /// Only the recipient of a friend request may answer it.
    #[error("user {user_id} is not the recipient of request {relationship_id}")]
    NotRequestRecipient {
        /// The user making the request.
        user_id: UserId,
        /// The relationship being answered.
        relationship_id: RelationshipId,
    },

    /// A relationship already exists for this pair of users.
    #[error("a relationship already exists between {user_id} and {peer_id}")]
    RelationshipExists {
        /// The user making the request.
        user_id: UserId,
        /// The other user.
        peer_id: UserId,
    },

    /// The relationship cannot move to the requested status.
    #[error("relationship {relationship_id} is already {from:?}")]
    InvalidTransition {
        /// The relationship being updated.
        relationship_id: RelationshipId,
        /// Its current status.
        from: RelationshipStatus,
    },

    /// The referenced account does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// An event or request was missing fields or carried invalid values.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(#[from] parley_auth::AuthError),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] parley_store::StoreError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RealtimeError {
    /// The text sent to a client in an `error` event.
    ///
    /// Storage and internal details stay in the server log.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Store(_) => "storage error".to_string(),
            Self::Internal(_) => "internal error".to_string(),
            Self::NotFriends { .. } => "you can only message accepted friends".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_for_rejections() {
        let user_id = UserId::from_bytes([1u8; 16]);
        let peer_id = UserId::from_bytes([2u8; 16]);

        assert_eq!(
            RealtimeError::NotFriends { user_id, peer_id }.client_message(),
            "you can only message accepted friends"
        );
        assert!(RealtimeError::InvalidTransition {
            relationship_id: RelationshipId::generate(),
            from: RelationshipStatus::Accepted
        }
        .client_message()
        .ends_with("is already Accepted"));

        let message_id = MessageId::generate();
        assert!(RealtimeError::MessageNotFound(message_id)
            .client_message()
            .contains(&message_id.to_string()));
    }

    #[test]
    fn client_message_hides_storage_details() {
        let err = RealtimeError::Store(parley_store::StoreError::Database(
            "disk on fire at /var/lib".into(),
        ));
        assert_eq!(err.client_message(), "storage error");

        let err = RealtimeError::Internal("lock poisoned".into());
        assert_eq!(err.client_message(), "internal error");

        let err = RealtimeError::Validation("content is empty".into());
        assert_eq!(err.client_message(), "invalid request: content is empty");
    }
}
