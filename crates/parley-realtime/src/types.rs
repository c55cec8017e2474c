//! Configuration and view types for real-time operations.
//!
//! Views are the displayable shapes pushed to connections and returned by
//! the HTTP surface. All of them serialize with camelCase field names.

use chrono::{DateTime, Utc};
use parley_core::{MessageId, RelationshipId, UserId};
use parley_store::{
    Account, DeliveryStatus, Message, MessageKind, PresenceStatus, Relationship,
};
use serde::{Deserialize, Serialize};

/// Configuration for the real-time core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Require an accepted relationship before relaying typing indicators.
    ///
    /// Off by default: typing events are relayed to any present receiver.
    #[serde(default)]
    pub typing_requires_friendship: bool,

    /// Maximum message content length in bytes.
    #[serde(default = "RealtimeConfig::default_max_content_len")]
    pub max_content_len: usize,

    /// Capacity of each connection's outbound queue.
    #[serde(default = "RealtimeConfig::default_outbox_capacity")]
    pub outbox_capacity: usize,

    /// Capacity of each connection's inbound command queue.
    #[serde(default = "RealtimeConfig::default_inbox_capacity")]
    pub inbox_capacity: usize,
}

impl RealtimeConfig {
    const fn default_max_content_len() -> usize {
        10_000
    }

    const fn default_outbox_capacity() -> usize {
        256
    }

    const fn default_inbox_capacity() -> usize {
        64
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            typing_requires_friendship: false,
            max_content_len: Self::default_max_content_len(),
            outbox_capacity: Self::default_outbox_capacity(),
            inbox_capacity: Self::default_inbox_capacity(),
        }
    }
}

/// Displayable details of one side of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// The user's ID.
    pub user_id: UserId,
    /// Display name, when the account is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar reference, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Participant {
    /// Build a participant from an optional account record.
    #[must_use]
    pub fn new(user_id: UserId, account: Option<&Account>) -> Self {
        Self {
            user_id,
            display_name: account.map(|a| a.display_name.clone()),
            avatar: account.and_then(|a| a.avatar.clone()),
        }
    }
}

/// A message record with participant details, as pushed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    /// Message ID.
    pub id: MessageId,
    /// Sender's user ID.
    pub sender_id: UserId,
    /// Receiver's user ID.
    pub receiver_id: UserId,
    /// Text body or attachment reference.
    pub content: String,
    /// Kind of content.
    pub message_type: MessageKind,
    /// Delivery status.
    pub status: DeliveryStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the message was delivered live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    /// When the message was read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    /// Sender details.
    pub sender: Participant,
    /// Receiver details.
    pub receiver: Participant,
}

impl MessageView {
    /// Combine a message with its participants.
    #[must_use]
    pub fn new(message: &Message, sender: Participant, receiver: Participant) -> Self {
        Self {
            id: message.message_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            message_type: message.kind,
            status: message.status,
            created_at: message.created_at,
            delivered_at: message.delivered_at,
            read_at: message.read_at,
            sender,
            receiver,
        }
    }
}

/// A friend with profile and live presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendView {
    /// The friend's user ID.
    pub user_id: UserId,
    /// Display name, when the account is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Effective presence status.
    pub status: PresenceStatus,
    /// When the friend was last seen connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    /// The relationship record backing the friendship.
    pub relationship_id: RelationshipId,
    /// When the friendship was accepted.
    pub since: DateTime<Utc>,
}

/// A pending friend request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestView {
    /// The relationship record ID.
    pub id: RelationshipId,
    /// Who sent the request.
    pub requester: Participant,
    /// Who received the request.
    pub recipient: UserId,
    /// Current status.
    pub status: parley_store::RelationshipStatus,
    /// When the request was sent.
    pub created_at: DateTime<Utc>,
}

impl FriendRequestView {
    /// Build a request view from a relationship and the requester's account.
    #[must_use]
    pub fn new(relationship: &Relationship, requester: Option<&Account>) -> Self {
        Self {
            id: relationship.relationship_id,
            requester: Participant::new(relationship.requester, requester),
            recipient: relationship.recipient,
            status: relationship.status,
            created_at: relationship.created_at,
        }
    }
}

/// One page of conversation history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    /// Messages on this page.
    pub messages: Vec<MessageView>,
    /// Whether older messages exist.
    pub has_more: bool,
    /// Cursor for the next (older) page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_before: Option<MessageId>,
}

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New display name.
    pub display_name: String,
    /// New avatar reference; `None` clears it.
    #[serde(default)]
    pub avatar: Option<String>,
}

/// A user's public profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    /// The user's ID.
    pub user_id: UserId,
    /// Display name.
    pub display_name: String,
    /// Avatar reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Effective presence status.
    pub status: PresenceStatus,
    /// When the user was last seen connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl ProfileView {
    /// Build a profile view with the given effective status.
    #[must_use]
    pub fn new(account: Account, status: PresenceStatus) -> Self {
        Self {
            user_id: account.user_id,
            display_name: account.display_name,
            avatar: account.avatar,
            status,
            last_seen: account.last_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RealtimeConfig::default();
        assert!(!config.typing_requires_friendship);
        assert_eq!(config.max_content_len, 10_000);
        assert_eq!(config.outbox_capacity, 256);
        assert_eq!(config.inbox_capacity, 64);
    }

    #[test]
    fn message_view_uses_camel_case() {
        let sender = UserId::generate();
        let receiver = UserId::generate();
        let message = Message::new(sender, receiver, "hi", MessageKind::Text);

        let view = MessageView::new(
            &message,
            Participant::new(sender, None),
            Participant::new(receiver, None),
        );
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["senderId"], sender.to_string());
        assert_eq!(json["receiverId"], receiver.to_string());
        assert_eq!(json["messageType"], "text");
        assert_eq!(json["status"], "sent");
        assert!(json.get("deliveredAt").is_none());
        assert!(json["sender"].get("displayName").is_none());
    }

    #[test]
    fn participant_from_account() {
        let user_id = UserId::generate();
        let mut account = Account::new(user_id, "alice");
        account.avatar = Some("avatars/alice.png".to_string());

        let participant = Participant::new(user_id, Some(&account));
        assert_eq!(participant.display_name.as_deref(), Some("alice"));
        assert_eq!(participant.avatar.as_deref(), Some("avatars/alice.png"));
    }
}
