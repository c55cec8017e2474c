//! Conversation history pagination.
//!
//! Pages run newest first. Fetching a page counts as reading it: every
//! returned message addressed to the reader is moved to `read`.

use parley_core::{MessageId, UserId};
use parley_store::{DeliveryStatus, Message, Store, StoreError};

use crate::error::{RealtimeError, Result};

/// One page of raw messages, newest first.
#[derive(Debug, Clone)]
pub struct Page {
    /// Messages on this page, with statuses as of after the read update.
    pub messages: Vec<Message>,
    /// Whether older messages exist.
    pub has_more: bool,
    /// Cursor for the next (older) page.
    pub next_before: Option<MessageId>,
}

/// Load one page of the conversation between `reader` and `peer`.
///
/// `limit` must already be clamped by the caller; zero is treated as one.
///
/// # Errors
///
/// Returns `RealtimeError::NotFriends` without an accepted relationship,
/// `RealtimeError::MessageNotFound` if `before` is not a message of this
/// conversation, or a storage error.
pub fn load_page<S: Store>(
    store: &S,
    reader: &UserId,
    peer: &UserId,
    before: Option<MessageId>,
    limit: usize,
) -> Result<Page> {
    if store.find_accepted(reader, peer)?.is_none() {
        return Err(RealtimeError::NotFriends {
            user_id: *reader,
            peer_id: *peer,
        });
    }

    let limit = limit.max(1);
    let mut messages = match store.list_conversation(reader, peer, before.as_ref(), limit + 1) {
        Ok(messages) => messages,
        Err(StoreError::NotFound) => {
            return Err(before.map_or_else(
                || RealtimeError::Internal("conversation listing failed".to_string()),
                RealtimeError::MessageNotFound,
            ))
        }
        Err(e) => return Err(e.into()),
    };

    let has_more = messages.len() > limit;
    messages.truncate(limit);

    for message in &mut messages {
        if message.receiver_id == *reader && message.status < DeliveryStatus::Read {
            *message = store.advance_message_status(&message.message_id, DeliveryStatus::Read)?;
        }
    }

    let next_before = if has_more {
        messages.last().map(|m| m.message_id)
    } else {
        None
    };

    Ok(Page {
        messages,
        has_more,
        next_before,
    })
}
