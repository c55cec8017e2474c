//! Inbound event routing.
//!
//! | Event | Precondition | Persisted | Pushed |
//! |---|---|---|---|
//! | `send_message` | accepted relationship | message (`sent`, then `delivered` if the receiver is present) | `receive_message` to receiver, `message_sent` to sender |
//! | `typing` / `stop_typing` | none, unless configured | nothing | `typing` / `stop_typing` to receiver |
//! | `message_read` | caller is the receiver | status `read` | `message_read` to sender |
//!
//! A failed event produces one `error` event for the calling connection and
//! nothing else. The connection stays open.

use parley_auth::JwtValidator;
use parley_core::{MessageId, UserId};
use parley_store::{DeliveryStatus, Message, Store, StoreError};

use crate::actor::ConnectionCommand;
use crate::connection::Connection;
use crate::error::{RealtimeError, Result};
use crate::events::{
    InboundEvent, MessageReadPayload, OutboundEvent, SendMessagePayload, TypingPayload,
    UserPayload,
};
use crate::service::RealtimeService;
use crate::types::MessageView;

impl<S: Store, V: JwtValidator> RealtimeService<S, V> {
    /// Handle one command from a connection.
    ///
    /// Errors are logged and reported to the connection as an `error` event.
    pub fn dispatch(&self, connection: &Connection, command: ConnectionCommand) {
        let result = match command {
            ConnectionCommand::Event(event) => {
                let name = event.name();
                self.handle_event(connection, event).map_err(|e| (name, e))
            }
            ConnectionCommand::Reject(reason) => {
                Err(("unparsed", RealtimeError::Validation(reason)))
            }
        };

        if let Err((event, e)) = result {
            if matches!(e, RealtimeError::Store(_) | RealtimeError::Internal(_)) {
                tracing::error!(
                    user_id = %connection.user_id(),
                    event,
                    error = %e,
                    "Event failed"
                );
            } else {
                tracing::debug!(
                    user_id = %connection.user_id(),
                    event,
                    error = %e,
                    "Event rejected"
                );
            }
            connection.send(OutboundEvent::error(e.client_message()));
        }
    }

    /// Handle one parsed event from a connection.
    ///
    /// # Errors
    ///
    /// Returns the reason the event was rejected.
    pub fn handle_event(&self, connection: &Connection, event: InboundEvent) -> Result<()> {
        let user_id = connection.user_id();
        match event {
            InboundEvent::SendMessage(payload) => {
                let view = self.deliver_message(&user_id, payload)?;
                connection.send(OutboundEvent::MessageSent(view));
                Ok(())
            }
            InboundEvent::Typing(payload) => self.relay_typing(&user_id, &payload, true),
            InboundEvent::StopTyping(payload) => self.relay_typing(&user_id, &payload, false),
            InboundEvent::MessageRead(MessageReadPayload { message_id }) => {
                self.mark_read(&user_id, &message_id)
            }
        }
    }

    /// Persist a message and push it to the receiver if present.
    ///
    /// Returns the view for the sender's acknowledgement. The caller decides
    /// where the acknowledgement goes.
    pub(crate) fn deliver_message(
        &self,
        sender: &UserId,
        payload: SendMessagePayload,
    ) -> Result<MessageView> {
        let content = payload.content.trim();
        if content.is_empty() {
            return Err(RealtimeError::Validation(
                "content must not be empty".to_string(),
            ));
        }
        if payload.content.len() > self.config.max_content_len {
            return Err(RealtimeError::Validation(format!(
                "content exceeds {} bytes",
                self.config.max_content_len
            )));
        }

        let receiver = payload.receiver_id;
        if self.store.find_accepted(sender, &receiver)?.is_none() {
            return Err(RealtimeError::NotFriends {
                user_id: *sender,
                peer_id: receiver,
            });
        }

        let mut message = Message::new(*sender, receiver, payload.content, payload.message_type);
        self.store.create_message(&message)?;

        tracing::debug!(
            message_id = %message.message_id,
            sender = %sender,
            receiver = %receiver,
            "Message created"
        );

        let sender_view = self.participant(sender);
        let receiver_view = self.participant(&receiver);

        // Persist delivery before the push so the receiver never holds a
        // status the store does not
        if let Some(handle) = self.registry.get(&receiver) {
            match self
                .store
                .advance_message_status(&message.message_id, DeliveryStatus::Delivered)
            {
                Ok(stored) => message = stored,
                Err(e) => tracing::error!(
                    message_id = %message.message_id,
                    error = %e,
                    "Failed to mark message delivered"
                ),
            }

            let view = MessageView::new(&message, sender_view.clone(), receiver_view.clone());
            handle.send(OutboundEvent::ReceiveMessage(view));
        }

        Ok(MessageView::new(&message, sender_view, receiver_view))
    }

    /// Forward a typing indicator to the receiver if present.
    fn relay_typing(&self, sender: &UserId, payload: &TypingPayload, started: bool) -> Result<()> {
        let receiver = payload.receiver_id;
        if self.config.typing_requires_friendship
            && self.store.find_accepted(sender, &receiver)?.is_none()
        {
            return Err(RealtimeError::NotFriends {
                user_id: *sender,
                peer_id: receiver,
            });
        }

        let data = UserPayload { user_id: *sender };
        let event = if started {
            OutboundEvent::Typing(data)
        } else {
            OutboundEvent::StopTyping(data)
        };
        self.registry.send_to(&receiver, event);
        Ok(())
    }

    /// Mark a message read on behalf of its receiver and tell the sender.
    fn mark_read(&self, user_id: &UserId, message_id: &MessageId) -> Result<()> {
        let message = self
            .store
            .get_message(message_id)?
            .ok_or(RealtimeError::MessageNotFound(*message_id))?;

        if message.receiver_id != *user_id {
            return Err(RealtimeError::NotMessageRecipient {
                user_id: *user_id,
                message_id: *message_id,
            });
        }

        match self
            .store
            .advance_message_status(message_id, DeliveryStatus::Read)
        {
            Ok(_) => {}
            Err(StoreError::NotFound) => return Err(RealtimeError::MessageNotFound(*message_id)),
            Err(e) => return Err(e.into()),
        }

        self.registry.send_to(
            &message.sender_id,
            OutboundEvent::MessageRead(MessageReadPayload {
                message_id: *message_id,
            }),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{drain, Fixture};
    use parley_store::MessageKind;

    fn send(to: UserId, content: &str) -> ConnectionCommand {
        ConnectionCommand::Event(InboundEvent::SendMessage(SendMessagePayload {
            receiver_id: to,
            content: content.to_string(),
            message_type: MessageKind::Text,
        }))
    }

    fn stored_messages(fixture: &Fixture, a: &UserId, b: &UserId) -> Vec<Message> {
        fixture
            .service
            .store()
            .list_conversation(a, b, None, 100)
            .unwrap()
    }

    #[test]
    fn hi_is_delivered_to_present_friend() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        fixture.befriend(&a, &b);
        let (conn_a, mut rx_a) = fixture.connect(a);
        let (_conn_b, mut rx_b) = fixture.connect(b);
        drain(&mut rx_a);

        fixture.service.dispatch(&conn_a, send(b, "hi"));

        let received = drain(&mut rx_b);
        let [OutboundEvent::ReceiveMessage(incoming)] = received.as_slice() else {
            panic!("expected one receive_message, got {received:?}");
        };
        assert_eq!(incoming.content, "hi");
        assert_eq!(incoming.status, DeliveryStatus::Delivered);
        assert_eq!(incoming.sender.display_name.as_deref(), Some("alice"));

        let acked = drain(&mut rx_a);
        let [OutboundEvent::MessageSent(ack)] = acked.as_slice() else {
            panic!("expected one message_sent, got {acked:?}");
        };
        assert_eq!(ack.id, incoming.id);
        assert_eq!(ack.status, DeliveryStatus::Delivered);

        let stored = stored_messages(&fixture, &a, &b);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, DeliveryStatus::Delivered);
        assert!(stored[0].delivered_at.is_some());
    }

    #[test]
    fn failed_delivery_update_still_sends() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        fixture.befriend(&a, &b);
        let (conn_a, mut rx_a) = fixture.connect(a);
        let (_conn_b, mut rx_b) = fixture.connect(b);
        drain(&mut rx_a);

        fixture.fail_status_updates(true);
        fixture.service.dispatch(&conn_a, send(b, "hi"));
        fixture.fail_status_updates(false);

        // Receiver and sender both see what the store holds
        let received = drain(&mut rx_b);
        let [OutboundEvent::ReceiveMessage(incoming)] = received.as_slice() else {
            panic!("expected one receive_message, got {received:?}");
        };
        assert_eq!(incoming.status, DeliveryStatus::Sent);

        let acked = drain(&mut rx_a);
        let [OutboundEvent::MessageSent(ack)] = acked.as_slice() else {
            panic!("expected one message_sent, got {acked:?}");
        };
        assert_eq!(ack.id, incoming.id);
        assert_eq!(ack.status, DeliveryStatus::Sent);

        let stored = stored_messages(&fixture, &a, &b);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, DeliveryStatus::Sent);
        assert!(stored[0].delivered_at.is_none());
    }

    #[test]
    fn absent_receiver_leaves_message_sent() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        fixture.befriend(&a, &b);
        let (conn_a, mut rx_a) = fixture.connect(a);

        fixture.service.dispatch(&conn_a, send(b, "later"));

        let acked = drain(&mut rx_a);
        let [OutboundEvent::MessageSent(ack)] = acked.as_slice() else {
            panic!("expected one message_sent, got {acked:?}");
        };
        assert_eq!(ack.status, DeliveryStatus::Sent);

        let stored = stored_messages(&fixture, &a, &b);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, DeliveryStatus::Sent);
    }

    #[test]
    fn non_friends_get_error_and_nothing_is_stored() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        let (conn_a, mut rx_a) = fixture.connect(a);
        let (_conn_b, mut rx_b) = fixture.connect(b);

        fixture.service.dispatch(&conn_a, send(b, "hi"));

        assert_eq!(
            drain(&mut rx_a),
            vec![OutboundEvent::error("you can only message accepted friends")]
        );
        assert!(drain(&mut rx_b).is_empty());
        assert!(stored_messages(&fixture, &a, &b).is_empty());
    }

    #[test]
    fn pending_request_does_not_authorize() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        fixture.service.send_friend_request(&a, &b).unwrap();
        let (conn_a, mut rx_a) = fixture.connect(a);

        fixture.service.dispatch(&conn_a, send(b, "hi"));

        assert!(matches!(
            drain(&mut rx_a).as_slice(),
            [OutboundEvent::Error(_)]
        ));
        assert!(stored_messages(&fixture, &a, &b).is_empty());
    }

    #[test]
    fn empty_or_oversized_content_rejected() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        fixture.befriend(&a, &b);
        let (conn_a, mut rx_a) = fixture.connect(a);

        fixture.service.dispatch(&conn_a, send(b, "   "));
        let oversized = "x".repeat(fixture.service.config().max_content_len + 1);
        fixture.service.dispatch(&conn_a, send(b, &oversized));

        let events = drain(&mut rx_a);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, OutboundEvent::Error(_))));
        assert!(stored_messages(&fixture, &a, &b).is_empty());
    }

    #[test]
    fn rejected_frame_reports_error() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let (conn_a, mut rx_a) = fixture.connect(a);

        fixture
            .service
            .dispatch(&conn_a, ConnectionCommand::Reject("missing field `receiverId`".into()));

        assert_eq!(
            drain(&mut rx_a),
            vec![OutboundEvent::error(
                "invalid request: missing field `receiverId`"
            )]
        );
    }

    #[test]
    fn only_latest_connection_receives() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        fixture.befriend(&a, &b);
        let (conn_a, _rx_a) = fixture.connect(a);
        let (_old_b, mut rx_old) = fixture.connect(b);
        let (_new_b, mut rx_new) = fixture.connect(b);

        fixture.service.dispatch(&conn_a, send(b, "hi"));

        assert!(drain(&mut rx_old)
            .iter()
            .all(|e| !matches!(e, OutboundEvent::ReceiveMessage(_))));
        assert!(matches!(
            drain(&mut rx_new).as_slice(),
            [OutboundEvent::ReceiveMessage(_)]
        ));
    }

    #[test]
    fn typing_relayed_only_when_present() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        let (conn_a, mut rx_a) = fixture.connect(a);

        let typing = |started: bool| {
            let payload = TypingPayload { receiver_id: b };
            ConnectionCommand::Event(if started {
                InboundEvent::Typing(payload)
            } else {
                InboundEvent::StopTyping(payload)
            })
        };

        // Absent receiver: silently dropped
        fixture.service.dispatch(&conn_a, typing(true));
        assert!(drain(&mut rx_a).is_empty());

        let (_conn_b, mut rx_b) = fixture.connect(b);
        fixture.service.dispatch(&conn_a, typing(true));
        fixture.service.dispatch(&conn_a, typing(false));

        assert_eq!(
            drain(&mut rx_b),
            vec![
                OutboundEvent::Typing(UserPayload { user_id: a }),
                OutboundEvent::StopTyping(UserPayload { user_id: a }),
            ]
        );
        assert!(drain(&mut rx_a).is_empty());
    }

    #[test]
    fn typing_friendship_check_when_configured() {
        let fixture = Fixture::with_config(crate::types::RealtimeConfig {
            typing_requires_friendship: true,
            ..Default::default()
        });
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        let (conn_a, mut rx_a) = fixture.connect(a);
        let (_conn_b, mut rx_b) = fixture.connect(b);

        fixture.service.dispatch(
            &conn_a,
            ConnectionCommand::Event(InboundEvent::Typing(TypingPayload { receiver_id: b })),
        );

        assert!(matches!(
            drain(&mut rx_a).as_slice(),
            [OutboundEvent::Error(_)]
        ));
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn mark_read_notifies_original_sender() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        fixture.befriend(&a, &b);
        let (conn_a, mut rx_a) = fixture.connect(a);
        let (conn_b, mut rx_b) = fixture.connect(b);
        drain(&mut rx_a);

        fixture.service.dispatch(&conn_a, send(b, "hi"));
        drain(&mut rx_a);
        let received = drain(&mut rx_b);
        let [OutboundEvent::ReceiveMessage(incoming)] = received.as_slice() else {
            panic!("expected receive_message");
        };
        let message_id = incoming.id;

        fixture.service.dispatch(
            &conn_b,
            ConnectionCommand::Event(InboundEvent::MessageRead(MessageReadPayload { message_id })),
        );

        assert_eq!(
            drain(&mut rx_a),
            vec![OutboundEvent::MessageRead(MessageReadPayload { message_id })]
        );
        assert!(drain(&mut rx_b).is_empty());
        let stored = fixture.service.store().get_message(&message_id).unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::Read);
    }

    #[test]
    fn mark_read_by_sender_or_unknown_rejected() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        fixture.befriend(&a, &b);
        let (conn_a, mut rx_a) = fixture.connect(a);

        fixture.service.dispatch(&conn_a, send(b, "hi"));
        let acked = drain(&mut rx_a);
        let [OutboundEvent::MessageSent(ack)] = acked.as_slice() else {
            panic!("expected message_sent");
        };
        let own = ack.id;

        for message_id in [own, MessageId::generate()] {
            fixture.service.dispatch(
                &conn_a,
                ConnectionCommand::Event(InboundEvent::MessageRead(MessageReadPayload {
                    message_id,
                })),
            );
        }

        let errors = drain(&mut rx_a);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, OutboundEvent::Error(_))));
        let stored = fixture.service.store().get_message(&own).unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::Sent);
    }

    #[test]
    fn status_never_moves_backwards() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        fixture.befriend(&a, &b);
        let (conn_a, mut rx_a) = fixture.connect(a);
        let (conn_b, mut rx_b) = fixture.connect(b);
        drain(&mut rx_a);

        fixture.service.dispatch(&conn_a, send(b, "hi"));
        let received = drain(&mut rx_b);
        let [OutboundEvent::ReceiveMessage(incoming)] = received.as_slice() else {
            panic!("expected receive_message");
        };
        let message_id = incoming.id;

        fixture.service.dispatch(
            &conn_b,
            ConnectionCommand::Event(InboundEvent::MessageRead(MessageReadPayload { message_id })),
        );

        let store = fixture.service.store();
        for status in [DeliveryStatus::Sent, DeliveryStatus::Delivered] {
            let after = store.advance_message_status(&message_id, status).unwrap();
            assert_eq!(after.status, DeliveryStatus::Read);
        }

        // A second read is harmless
        fixture.service.dispatch(
            &conn_b,
            ConnectionCommand::Event(InboundEvent::MessageRead(MessageReadPayload { message_id })),
        );
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(
            store.get_message(&message_id).unwrap().unwrap().status,
            DeliveryStatus::Read
        );
    }

    #[test]
    fn storage_failure_surfaces_as_error_event() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        fixture.befriend(&a, &b);
        let (conn_a, mut rx_a) = fixture.connect(a);

        fixture.fail_storage(true);
        fixture.service.dispatch(&conn_a, send(b, "hi"));
        fixture.fail_storage(false);

        assert_eq!(drain(&mut rx_a), vec![OutboundEvent::error("storage error")]);
        assert!(!conn_a.is_closed());
        assert!(stored_messages(&fixture, &a, &b).is_empty());

        fixture.service.dispatch(&conn_a, send(b, "again"));
        assert!(matches!(
            drain(&mut rx_a).as_slice(),
            [OutboundEvent::MessageSent(_)]
        ));
    }

    #[test]
    fn http_path_acks_registered_sender() {
        let fixture = Fixture::new();
        let a = fixture.add_user("alice");
        let b = fixture.add_user("bob");
        fixture.befriend(&a, &b);
        let (_conn_a, mut rx_a) = fixture.connect(a);
        let (_conn_b, mut rx_b) = fixture.connect(b);
        drain(&mut rx_a);

        let view = fixture
            .service
            .send_message(
                &a,
                SendMessagePayload {
                    receiver_id: b,
                    content: "from http".to_string(),
                    message_type: MessageKind::Text,
                },
            )
            .unwrap();

        assert_eq!(view.status, DeliveryStatus::Delivered);
        assert!(matches!(
            drain(&mut rx_a).as_slice(),
            [OutboundEvent::MessageSent(ack)] if ack.id == view.id
        ));
        assert!(matches!(
            drain(&mut rx_b).as_slice(),
            [OutboundEvent::ReceiveMessage(m)] if m.id == view.id
        ));
    }
}
