//! Wire events exchanged over a live connection.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": {...}}`.
//!
//! # Inbound
//!
//! | Event | Data |
//! |---|---|
//! | `send_message` | `receiverId`, `content`, `messageType?` |
//! | `typing` | `receiverId` |
//! | `stop_typing` | `receiverId` |
//! | `message_read` | `messageId` |
//!
//! # Outbound
//!
//! | Event | Data |
//! |---|---|
//! | `user_online` / `user_offline` | `userId` |
//! | `receive_message` / `message_sent` | full message view |
//! | `typing` / `stop_typing` | `userId` |
//! | `message_read` | `messageId` |
//! | `error` | `message` |

use parley_core::{MessageId, UserId};
use parley_store::MessageKind;
use serde::{Deserialize, Serialize};

use crate::error::{RealtimeError, Result};
use crate::types::MessageView;

/// Data of a `send_message` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    /// Who the message is for.
    pub receiver_id: UserId,
    /// Text body or attachment reference.
    pub content: String,
    /// Kind of content, `text` when omitted.
    #[serde(default)]
    pub message_type: MessageKind,
}

/// Data of a `typing` or `stop_typing` event sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    /// Who is being typed to.
    pub receiver_id: UserId,
}

/// Data of a `message_read` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReadPayload {
    /// The message that was read.
    pub message_id: MessageId,
}

/// Data naming the user an outbound event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    /// The user the event is about.
    pub user_id: UserId,
}

/// Data of an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable reason.
    pub message: String,
}

/// An event received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Send a direct message.
    SendMessage(SendMessagePayload),
    /// The sender started typing.
    Typing(TypingPayload),
    /// The sender stopped typing.
    StopTyping(TypingPayload),
    /// The sender read a message addressed to them.
    MessageRead(MessageReadPayload),
}

impl InboundEvent {
    /// Parse a text frame.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::Validation` for unknown events, missing fields,
    /// or malformed JSON.
    pub fn from_text(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| RealtimeError::Validation(e.to_string()))
    }

    /// The event name, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SendMessage(_) => "send_message",
            Self::Typing(_) => "typing",
            Self::StopTyping(_) => "stop_typing",
            Self::MessageRead(_) => "message_read",
        }
    }
}

/// An event pushed to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// A friend connected.
    UserOnline(UserPayload),
    /// A friend disconnected.
    UserOffline(UserPayload),
    /// A message addressed to this user.
    ReceiveMessage(MessageView),
    /// Acknowledgement of a message this user sent.
    MessageSent(MessageView),
    /// Someone started typing to this user.
    Typing(UserPayload),
    /// Someone stopped typing to this user.
    StopTyping(UserPayload),
    /// A message this user sent was read.
    MessageRead(MessageReadPayload),
    /// An event from this connection was rejected.
    Error(ErrorPayload),
}

impl OutboundEvent {
    /// Build an `error` event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// Build a `user_online` event.
    #[must_use]
    pub const fn user_online(user_id: UserId) -> Self {
        Self::UserOnline(UserPayload { user_id })
    }

    /// Build a `user_offline` event.
    #[must_use]
    pub const fn user_offline(user_id: UserId) -> Self {
        Self::UserOffline(UserPayload { user_id })
    }

    /// Encode as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::Internal` if serialization fails.
    pub fn to_text(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| RealtimeError::Internal(e.to_string()))
    }

    /// The event name, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UserOnline(_) => "user_online",
            Self::UserOffline(_) => "user_offline",
            Self::ReceiveMessage(_) => "receive_message",
            Self::MessageSent(_) => "message_sent",
            Self::Typing(_) => "typing",
            Self::StopTyping(_) => "stop_typing",
            Self::MessageRead(_) => "message_read",
            Self::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECEIVER: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn parse_send_message_defaults_to_text() {
        let text = format!(
            r#"{{"event":"send_message","data":{{"receiverId":"{RECEIVER}","content":"hi"}}}}"#
        );
        let event = InboundEvent::from_text(&text).unwrap();

        let InboundEvent::SendMessage(payload) = event else {
            panic!("expected send_message, got {event:?}");
        };
        assert_eq!(payload.receiver_id.to_string(), RECEIVER);
        assert_eq!(payload.content, "hi");
        assert_eq!(payload.message_type, MessageKind::Text);
    }

    #[test]
    fn parse_send_message_with_kind() {
        let text = format!(
            r#"{{"event":"send_message","data":{{"receiverId":"{RECEIVER}","content":"files/a.png","messageType":"image"}}}}"#
        );
        let InboundEvent::SendMessage(payload) = InboundEvent::from_text(&text).unwrap() else {
            panic!("expected send_message");
        };
        assert_eq!(payload.message_type, MessageKind::Image);
    }

    #[test]
    fn parse_typing_events() {
        let typing = format!(r#"{{"event":"typing","data":{{"receiverId":"{RECEIVER}"}}}}"#);
        let stop = format!(r#"{{"event":"stop_typing","data":{{"receiverId":"{RECEIVER}"}}}}"#);

        assert!(matches!(
            InboundEvent::from_text(&typing).unwrap(),
            InboundEvent::Typing(_)
        ));
        assert_eq!(InboundEvent::from_text(&stop).unwrap().name(), "stop_typing");
    }

    #[test]
    fn missing_field_is_validation_error() {
        let text = r#"{"event":"send_message","data":{"content":"hi"}}"#;
        assert!(matches!(
            InboundEvent::from_text(text),
            Err(RealtimeError::Validation(_))
        ));
    }

    #[test]
    fn unknown_event_and_bad_json_rejected() {
        assert!(InboundEvent::from_text(r#"{"event":"join_room","data":{}}"#).is_err());
        assert!(InboundEvent::from_text("not json").is_err());
        assert!(InboundEvent::from_text(
            r#"{"event":"message_read","data":{"messageId":"nope"}}"#
        )
        .is_err());
    }

    #[test]
    fn outbound_frames() {
        let user_id: UserId = RECEIVER.parse().unwrap();

        let online = OutboundEvent::user_online(user_id).to_text().unwrap();
        assert_eq!(
            online,
            format!(r#"{{"event":"user_online","data":{{"userId":"{RECEIVER}"}}}}"#)
        );

        let error = OutboundEvent::error("nope").to_text().unwrap();
        assert_eq!(error, r#"{"event":"error","data":{"message":"nope"}}"#);

        let typing = OutboundEvent::Typing(UserPayload { user_id });
        let back: OutboundEvent = serde_json::from_str(&typing.to_text().unwrap()).unwrap();
        assert_eq!(back, typing);
    }
}
