//! Per-connection actor.
//!
//! Each live connection gets one task that owns its [`Connection`] and
//! consumes commands from a bounded channel. Commands from one connection
//! are therefore handled strictly in arrival order, while different
//! connections run independently. When the command channel closes the actor
//! runs the disconnect bookkeeping exactly once and exits.

use std::sync::Arc;

use parley_auth::JwtValidator;
use parley_store::Store;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::connection::Connection;
use crate::events::InboundEvent;
use crate::service::RealtimeService;

/// A unit of work for a connection actor.
#[derive(Debug, Clone)]
pub enum ConnectionCommand {
    /// A parsed inbound event.
    Event(InboundEvent),
    /// A frame that could not be parsed, with the reason.
    Reject(String),
}

impl ConnectionCommand {
    /// Parse a text frame into a command.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        match InboundEvent::from_text(text) {
            Ok(event) => Self::Event(event),
            Err(e) => Self::Reject(e.to_string()),
        }
    }
}

/// Spawn the actor for an accepted connection.
///
/// Returns the sender for feeding it commands and the task handle. Dropping
/// every sender ends the connection.
pub fn spawn<S, V>(
    service: Arc<RealtimeService<S, V>>,
    connection: Connection,
) -> (mpsc::Sender<ConnectionCommand>, JoinHandle<()>)
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    let (tx, mut rx) = mpsc::channel(service.config().inbox_capacity.max(1));

    let task = tokio::spawn(async move {
        tracing::debug!(
            user_id = %connection.user_id(),
            connection_id = %connection.id(),
            "Connection actor started"
        );

        while let Some(command) = rx.recv().await {
            service.dispatch(&connection, command);
        }

        service.disconnect(&connection);
    });

    (tx, task)
}
