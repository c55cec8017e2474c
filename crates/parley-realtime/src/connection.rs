//! Live connection lifecycle.
//!
//! A connection is authenticated before anything touches the registry. Once
//! accepted it is registered, its account is marked online, and every
//! present friend is told. On disconnect the reverse happens, using the
//! friend set captured at connect time.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parley_auth::{AuthError, JwtValidator};
use parley_core::{ConnectionId, UserId};
use parley_store::{PresenceStatus, Store, StoreError};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::events::OutboundEvent;
use crate::presence::ConnectionHandle;
use crate::service::RealtimeService;

/// An accepted live connection.
#[derive(Debug)]
pub struct Connection {
    handle: ConnectionHandle,
    friends: Vec<UserId>,
    closed: AtomicBool,
}

impl Connection {
    /// The connection's ID.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.handle.connection_id()
    }

    /// The authenticated user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.handle.user_id()
    }

    /// Accepted friends as of connect time.
    #[must_use]
    pub fn friends(&self) -> &[UserId] {
        &self.friends
    }

    /// Push an event to this connection.
    pub fn send(&self, event: OutboundEvent) -> bool {
        self.handle.send(event)
    }

    /// Returns true once `disconnect` has run for this connection.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl<S: Store, V: JwtValidator> RealtimeService<S, V> {
    /// Verify the credential presented by a new connection.
    ///
    /// Runs before any registry mutation.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::Auth` if the token is missing or invalid.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<UserId> {
        let token = token.filter(|t| !t.is_empty()).ok_or(AuthError::MissingToken)?;
        let claims = self.validator.validate(token).await.map_err(|e| {
            tracing::debug!(error = %e, "Connection credential rejected");
            e
        })?;
        Ok(claims.user_id)
    }

    /// Register an authenticated connection.
    ///
    /// Events for the user are pushed into `outbox` from now on. Any earlier
    /// connection for the same user stops receiving events. Storage failures
    /// are reported on the new connection as `error` events; they never
    /// refuse it.
    pub fn connect(&self, user_id: UserId, outbox: mpsc::Sender<OutboundEvent>) -> Connection {
        let handle = ConnectionHandle::new(user_id, outbox);

        if let Some(previous) = self.registry.set(handle.clone()) {
            tracing::info!(
                user_id = %user_id,
                replaced = %previous.connection_id(),
                "Replacing earlier connection"
            );
        }

        tracing::info!(
            user_id = %user_id,
            connection_id = %handle.connection_id(),
            "Connection registered"
        );

        self.persist_presence(&handle, PresenceStatus::Online, None);

        let friends = match self.store.list_accepted(&user_id) {
            Ok(relationships) => relationships
                .iter()
                .filter_map(|r| r.counterpart(&user_id))
                .collect(),
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to load friends");
                handle.send(OutboundEvent::error("storage error"));
                Vec::new()
            }
        };

        let mut notified = 0usize;
        for friend in &friends {
            if self
                .registry
                .send_to(friend, OutboundEvent::user_online(user_id))
            {
                notified += 1;
            }
        }
        tracing::debug!(
            user_id = %user_id,
            friends = friends.len(),
            notified,
            "Online broadcast"
        );

        Connection {
            handle,
            friends,
            closed: AtomicBool::new(false),
        }
    }

    /// Tear down a connection.
    ///
    /// Only the first call has any effect. If a newer connection for the same
    /// user has replaced this one, the user is still present: the registry
    /// entry, stored status, and friends are all left alone.
    pub fn disconnect(&self, connection: &Connection) {
        if connection.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let user_id = connection.user_id();
        if !self.registry.remove(&user_id, connection.id()) {
            tracing::info!(
                user_id = %user_id,
                connection_id = %connection.id(),
                "Stale connection closed"
            );
            return;
        }

        tracing::info!(
            user_id = %user_id,
            connection_id = %connection.id(),
            "Connection closed"
        );

        self.mark_offline(connection);
    }

    /// Store the user offline and tell their friends, unless a newer
    /// connection registered while this one was being torn down.
    ///
    /// Every registry check follows the write it guards against, so a
    /// reconnect racing this call always ends with the user stored online and
    /// `user_online` as the last presence event each friend sees.
    fn mark_offline(&self, connection: &Connection) {
        let user_id = connection.user_id();
        self.persist_presence(
            &connection.handle,
            PresenceStatus::Offline,
            Some(Utc::now()),
        );

        if self.registry.contains(&user_id) {
            tracing::info!(user_id = %user_id, "Reconnected during close, keeping online");
            self.persist_presence(&connection.handle, PresenceStatus::Online, None);
            return;
        }

        for friend in &connection.friends {
            self.registry
                .send_to(friend, OutboundEvent::user_offline(user_id));
        }

        // The reconnect's own broadcast may have interleaved with ours
        if self.registry.contains(&user_id) {
            tracing::info!(user_id = %user_id, "Reconnected during close, repeating online");
            for friend in &connection.friends {
                self.registry
                    .send_to(friend, OutboundEvent::user_online(user_id));
            }
        }
    }

    /// Mirror presence onto the account record.
    fn persist_presence(
        &self,
        handle: &ConnectionHandle,
        status: PresenceStatus,
        last_seen: Option<chrono::DateTime<Utc>>,
    ) {
        let user_id = handle.user_id();
        match self.store.update_presence(&user_id, status, last_seen) {
            Ok(()) => {}
            Err(StoreError::NotFound) => {
                tracing::warn!(user_id = %user_id, "No account record, presence not stored");
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to store presence");
                handle.send(OutboundEvent::error("storage error"));
            }
        }
    }
}
