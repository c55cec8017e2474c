//! Domain types stored in the database.
//!
//! These types represent the persisted state of accounts, relationships, and
//! messages.

use chrono::{DateTime, Utc};
use parley_core::{MessageId, RelationshipId, UserId};
use serde::{Deserialize, Serialize};

/// An account record stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account.
    pub user_id: UserId,
    /// Human-readable display name.
    pub display_name: String,
    /// Reference to the avatar image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Last persisted presence status.
    pub status: PresenceStatus,
    /// When the user was last seen connected.
    pub last_seen: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new offline account with the given display name.
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            display_name: display_name.into(),
            avatar: None,
            status: PresenceStatus::Offline,
            last_seen: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Presence status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PresenceStatus {
    /// Connected with a live socket.
    Online = 1,
    /// No live socket.
    Offline = 2,
    /// Connected but marked away by the user.
    Away = 3,
}

/// A friendship record between two accounts.
///
/// At most one record exists per unordered pair of users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier for the relationship.
    pub relationship_id: RelationshipId,
    /// The user who sent the friend request.
    pub requester: UserId,
    /// The user who received the friend request.
    pub recipient: UserId,
    /// Current relationship status.
    pub status: RelationshipStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    /// Create a new pending relationship from `requester` to `recipient`.
    #[must_use]
    pub fn pending(requester: UserId, recipient: UserId) -> Self {
        let now = Utc::now();
        Self {
            relationship_id: RelationshipId::generate(),
            requester,
            recipient,
            status: RelationshipStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if `user_id` is either side of this relationship.
    #[must_use]
    pub fn involves(&self, user_id: &UserId) -> bool {
        self.requester == *user_id || self.recipient == *user_id
    }

    /// Returns the other side of the relationship from `user_id`'s point of view.
    #[must_use]
    pub fn counterpart(&self, user_id: &UserId) -> Option<UserId> {
        if self.requester == *user_id {
            Some(self.recipient)
        } else if self.recipient == *user_id {
            Some(self.requester)
        } else {
            None
        }
    }

    /// Returns true if the relationship authorizes message exchange.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.status == RelationshipStatus::Accepted
    }
}

/// Lifecycle states for a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RelationshipStatus {
    /// Request sent, awaiting the recipient's answer.
    Pending = 1,
    /// Both users are friends.
    Accepted = 2,
    /// The recipient declined the request.
    Rejected = 3,
}

/// A direct message between two users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for the message.
    pub message_id: MessageId,
    /// Who sent the message.
    pub sender_id: UserId,
    /// Who the message is addressed to.
    pub receiver_id: UserId,
    /// Text body, or a reference for image/file messages.
    pub content: String,
    /// What the content represents.
    pub kind: MessageKind,
    /// Delivery progress.
    pub status: DeliveryStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the message was pushed live to the receiver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    /// When the receiver read the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a new message in the `Sent` state.
    #[must_use]
    pub fn new(
        sender_id: UserId,
        receiver_id: UserId,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> Self {
        Self {
            message_id: MessageId::generate(),
            sender_id,
            receiver_id,
            content: content.into(),
            kind,
            status: DeliveryStatus::Sent,
            created_at: Utc::now(),
            delivered_at: None,
            read_at: None,
        }
    }

    /// Apply a status transition in memory.
    ///
    /// Returns `false` without touching the message when `status` would not
    /// move it forward.
    pub fn advance(&mut self, status: DeliveryStatus, at: DateTime<Utc>) -> bool {
        if !self.status.can_advance_to(status) {
            return false;
        }
        if status >= DeliveryStatus::Delivered && self.delivered_at.is_none() {
            self.delivered_at = Some(at);
        }
        if status == DeliveryStatus::Read {
            self.read_at = Some(at);
        }
        self.status = status;
        true
    }
}

/// What a message's content represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text.
    #[default]
    Text,
    /// An image reference.
    Image,
    /// A file reference.
    File,
}

/// Delivery status of a message.
///
/// Ordered so that later states compare greater; transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DeliveryStatus {
    /// Persisted, not yet pushed to the receiver.
    Sent = 1,
    /// Pushed live to the receiver's connection.
    Delivered = 2,
    /// Seen by the receiver.
    Read = 3,
}

impl DeliveryStatus {
    /// Returns true if moving from `self` to `next` is a forward transition.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        next > self
    }
}
