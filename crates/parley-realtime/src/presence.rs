//! In-memory registry of live connections.
//!
//! Maps each present user to the handle of their one live connection. A
//! user is present exactly when they have an entry here; the stored
//! presence status on the account is only a best-effort mirror of it.
//!
//! Locks are held only for the map operation itself and never across an
//! await point.

use std::collections::HashMap;

use parking_lot::RwLock;
use parley_core::{ConnectionId, UserId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::events::OutboundEvent;

/// A cheap, cloneable handle for pushing events to one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: ConnectionId,
    user_id: UserId,
    tx: mpsc::Sender<OutboundEvent>,
}

impl ConnectionHandle {
    /// Create a handle for a new connection.
    #[must_use]
    pub fn new(user_id: UserId, tx: mpsc::Sender<OutboundEvent>) -> Self {
        Self {
            connection_id: ConnectionId::generate(),
            user_id,
            tx,
        }
    }

    /// The connection this handle pushes to.
    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// The user who owns the connection.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Queue an event for the connection.
    ///
    /// Never blocks. Returns `false` if the connection has gone away or its
    /// outbound queue is full; the event is dropped in both cases.
    pub fn send(&self, event: OutboundEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    connection_id = %self.connection_id,
                    event = event.name(),
                    "Outbound queue full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                tracing::debug!(
                    user_id = %self.user_id,
                    connection_id = %self.connection_id,
                    event = event.name(),
                    "Connection closed, dropping event"
                );
                false
            }
        }
    }

    /// Returns true once the receiving side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Registry of present users and their live connection.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    connections: RwLock<HashMap<UserId, ConnectionHandle>>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, replacing any earlier one for the same user.
    ///
    /// Returns the replaced handle, if any.
    pub fn set(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        self.connections.write().insert(handle.user_id, handle)
    }

    /// Look up the live connection for a user.
    #[must_use]
    pub fn get(&self, user_id: &UserId) -> Option<ConnectionHandle> {
        self.connections.read().get(user_id).cloned()
    }

    /// Remove a user's entry if it still belongs to `connection_id`.
    ///
    /// Returns `false` when the entry is missing or already points at a newer
    /// connection, in which case the registry is left unchanged.
    pub fn remove(&self, user_id: &UserId, connection_id: ConnectionId) -> bool {
        let mut connections = self.connections.write();
        match connections.get(user_id) {
            Some(handle) if handle.connection_id == connection_id => {
                connections.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Push an event to a user if they are present.
    ///
    /// Returns `true` if the event was queued.
    pub fn send_to(&self, user_id: &UserId, event: OutboundEvent) -> bool {
        self.get(user_id).is_some_and(|handle| handle.send(event))
    }

    /// Check whether a user is present.
    #[must_use]
    pub fn contains(&self, user_id: &UserId) -> bool {
        self.connections.read().contains_key(user_id)
    }

    /// Number of present users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Check if no user is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}
