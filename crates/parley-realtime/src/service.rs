//! The real-time service.
//!
//! `RealtimeService` owns the presence registry and holds the store and
//! credential validator it was constructed with. Live-connection lifecycle
//! lives in [`crate::connection`], inbound event handling in
//! [`crate::router`]; this module carries the request/response operations
//! used by the HTTP surface.

use std::sync::Arc;

use parley_auth::JwtValidator;
use parley_core::{MessageId, RelationshipId, UserId};
use parley_store::{Account, PresenceStatus, Store, StoreError};

use crate::error::{RealtimeError, Result};
use crate::events::{OutboundEvent, SendMessagePayload};
use crate::history;
use crate::presence::PresenceRegistry;
use crate::social;
use crate::types::{
    FriendRequestView, FriendView, HistoryPage, MessageView, Participant, ProfileUpdate,
    ProfileView, RealtimeConfig,
};

/// Longest display name accepted on profile updates, in characters.
const MAX_DISPLAY_NAME_LEN: usize = 64;

/// The real-time messaging core.
///
/// One instance per server process. Tests build as many isolated instances
/// as they need.
pub struct RealtimeService<S: Store, V: JwtValidator> {
    pub(crate) store: Arc<S>,
    pub(crate) validator: Arc<V>,
    pub(crate) registry: PresenceRegistry,
    pub(crate) config: RealtimeConfig,
}

impl<S: Store, V: JwtValidator> RealtimeService<S, V> {
    /// Create a new service with an empty presence registry.
    #[must_use]
    pub fn new(store: Arc<S>, validator: Arc<V>, config: RealtimeConfig) -> Self {
        Self {
            store,
            validator,
            registry: PresenceRegistry::new(),
            config,
        }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults(store: Arc<S>, validator: Arc<V>) -> Self {
        Self::new(store, validator, RealtimeConfig::default())
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the presence registry.
    #[must_use]
    pub const fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Number of users with a live connection.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Displayable details for a user.
    ///
    /// A lookup failure degrades to an ID-only participant; the message it
    /// decorates has already been persisted by the time this runs.
    pub(crate) fn participant(&self, user_id: &UserId) -> Participant {
        match self.store.get_account(user_id) {
            Ok(account) => Participant::new(*user_id, account.as_ref()),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to load participant");
                Participant::new(*user_id, None)
            }
        }
    }

    /// The status other users see for an account.
    ///
    /// Present users are online unless they chose away; everyone else is
    /// offline regardless of what was last persisted.
    pub(crate) fn effective_status(&self, account: &Account) -> PresenceStatus {
        if !self.registry.contains(&account.user_id) {
            return PresenceStatus::Offline;
        }
        match account.status {
            PresenceStatus::Away => PresenceStatus::Away,
            PresenceStatus::Online | PresenceStatus::Offline => PresenceStatus::Online,
        }
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Send a message on behalf of `sender` outside of a live connection.
    ///
    /// Runs the same pipeline as the `send_message` event. The acknowledgement
    /// goes to the sender's registered connection, if any.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::Validation` for bad content,
    /// `RealtimeError::NotFriends` without an accepted relationship, or a
    /// storage error.
    pub fn send_message(&self, sender: &UserId, payload: SendMessagePayload) -> Result<MessageView> {
        let view = self.deliver_message(sender, payload)?;
        self.registry
            .send_to(sender, OutboundEvent::MessageSent(view.clone()));
        Ok(view)
    }

    /// Load one page of conversation history between `user_id` and `peer_id`.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::NotFriends` without an accepted relationship,
    /// `RealtimeError::MessageNotFound` for an unknown cursor, or a storage
    /// error.
    pub fn history(
        &self,
        user_id: &UserId,
        peer_id: &UserId,
        before: Option<MessageId>,
        limit: usize,
    ) -> Result<HistoryPage> {
        let page = history::load_page(self.store.as_ref(), user_id, peer_id, before, limit)?;

        let me = self.participant(user_id);
        let peer = self.participant(peer_id);
        let messages = page
            .messages
            .iter()
            .map(|m| {
                if m.sender_id == *user_id {
                    MessageView::new(m, me.clone(), peer.clone())
                } else {
                    MessageView::new(m, peer.clone(), me.clone())
                }
            })
            .collect();

        Ok(HistoryPage {
            messages,
            has_more: page.has_more,
            next_before: page.next_before,
        })
    }

    // =========================================================================
    // Social Graph
    // =========================================================================

    /// List accepted friends with their profile and effective presence.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_friends(&self, user_id: &UserId) -> Result<Vec<FriendView>> {
        let relationships = self.store.list_accepted(user_id)?;
        let mut friends = Vec::with_capacity(relationships.len());

        for relationship in relationships {
            let Some(friend_id) = relationship.counterpart(user_id) else {
                continue;
            };
            let account = self.store.get_account(&friend_id)?;
            let (display_name, avatar, status, last_seen) = match &account {
                Some(a) => (
                    Some(a.display_name.clone()),
                    a.avatar.clone(),
                    self.effective_status(a),
                    a.last_seen,
                ),
                None => (None, None, PresenceStatus::Offline, None),
            };

            friends.push(FriendView {
                user_id: friend_id,
                display_name,
                avatar,
                status,
                last_seen,
                relationship_id: relationship.relationship_id,
                since: relationship.updated_at,
            });
        }

        Ok(friends)
    }

    /// List pending friend requests addressed to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_friend_requests(&self, user_id: &UserId) -> Result<Vec<FriendRequestView>> {
        social::list_pending(self.store.as_ref(), user_id)?
            .iter()
            .map(|r| {
                let requester = self.store.get_account(&r.requester)?;
                Ok(FriendRequestView::new(r, requester.as_ref()))
            })
            .collect()
    }

    /// Send a friend request from `user_id` to `recipient_id`.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::Validation` for self-requests,
    /// `RealtimeError::UserNotFound` for an unknown recipient, or
    /// `RealtimeError::RelationshipExists` if the pair already has a record.
    pub fn send_friend_request(
        &self,
        user_id: &UserId,
        recipient_id: &UserId,
    ) -> Result<FriendRequestView> {
        let relationship = social::send_request(self.store.as_ref(), user_id, recipient_id)?;
        let requester = self.store.get_account(user_id)?;

        tracing::info!(
            relationship_id = %relationship.relationship_id,
            requester = %user_id,
            recipient = %recipient_id,
            "Friend request sent"
        );

        Ok(FriendRequestView::new(&relationship, requester.as_ref()))
    }

    /// Accept or reject a pending friend request addressed to `user_id`.
    ///
    /// On acceptance, if both users are present each receives a
    /// `user_online` for the other.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::RelationshipNotFound`,
    /// `RealtimeError::NotRequestRecipient`, or
    /// `RealtimeError::InvalidTransition` when the request is not pending.
    pub fn respond_to_request(
        &self,
        user_id: &UserId,
        relationship_id: &RelationshipId,
        accept: bool,
    ) -> Result<FriendRequestView> {
        let relationship = social::respond(self.store.as_ref(), user_id, relationship_id, accept)?;

        tracing::info!(
            relationship_id = %relationship_id,
            recipient = %user_id,
            status = ?relationship.status,
            "Friend request answered"
        );

        if relationship.is_accepted()
            && self.registry.contains(&relationship.requester)
            && self.registry.contains(&relationship.recipient)
        {
            self.registry.send_to(
                &relationship.requester,
                OutboundEvent::user_online(relationship.recipient),
            );
            self.registry.send_to(
                &relationship.recipient,
                OutboundEvent::user_online(relationship.requester),
            );
        }

        let requester = self.store.get_account(&relationship.requester)?;
        Ok(FriendRequestView::new(&relationship, requester.as_ref()))
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Get a user's profile with their effective presence.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::UserNotFound` if the account doesn't exist.
    pub fn get_profile(&self, user_id: &UserId) -> Result<ProfileView> {
        let account = self
            .store
            .get_account(user_id)?
            .ok_or(RealtimeError::UserNotFound(*user_id))?;
        let status = self.effective_status(&account);
        Ok(ProfileView::new(account, status))
    }

    /// Create or update the caller's profile.
    ///
    /// A new account starts offline, or online if the caller is already
    /// connected.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::Validation` for an empty or overlong display
    /// name.
    pub fn update_profile(&self, user_id: &UserId, update: ProfileUpdate) -> Result<ProfileView> {
        let display_name = update.display_name.trim();
        if display_name.is_empty() {
            return Err(RealtimeError::Validation(
                "displayName must not be empty".to_string(),
            ));
        }
        if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(RealtimeError::Validation(format!(
                "displayName must be at most {MAX_DISPLAY_NAME_LEN} characters"
            )));
        }

        let initial_status = if self.registry.contains(user_id) {
            PresenceStatus::Online
        } else {
            PresenceStatus::Offline
        };
        let account = self.store.upsert_profile(
            user_id,
            display_name,
            update.avatar,
            initial_status,
        )?;
        tracing::debug!(user_id = %user_id, "Profile updated");

        let status = self.effective_status(&account);
        Ok(ProfileView::new(account, status))
    }

    /// Set the caller's stored presence status.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::UserNotFound` if the account doesn't exist.
    pub fn set_status(&self, user_id: &UserId, status: PresenceStatus) -> Result<ProfileView> {
        match self.store.update_presence(user_id, status, None) {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(RealtimeError::UserNotFound(*user_id)),
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(user_id = %user_id, status = ?status, "Status updated");
        self.get_profile(user_id)
    }
}
