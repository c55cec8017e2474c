//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parley_auth::MockJwtValidator;
use parley_core::{MessageId, RelationshipId, UserId};
use parley_store::{
    Account, DeliveryStatus, Message, PresenceStatus, Relationship, RelationshipStatus,
    RocksStore, Store, StoreError,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

use crate::connection::Connection;
use crate::events::OutboundEvent;
use crate::service::RealtimeService;
use crate::types::RealtimeConfig;

/// A `RocksStore` that can be switched into failing every call, or only
/// message status updates.
pub struct FlakyStore {
    inner: RocksStore,
    failing: AtomicBool,
    failing_status_updates: AtomicBool,
}

impl FlakyStore {
    fn check(&self) -> parley_store::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Database("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Store for FlakyStore {
    fn put_account(&self, account: &Account) -> parley_store::Result<()> {
        self.check()?;
        self.inner.put_account(account)
    }

    fn get_account(&self, user_id: &UserId) -> parley_store::Result<Option<Account>> {
        self.check()?;
        self.inner.get_account(user_id)
    }

    fn upsert_profile(
        &self,
        user_id: &UserId,
        display_name: &str,
        avatar: Option<String>,
        initial_status: PresenceStatus,
    ) -> parley_store::Result<Account> {
        self.check()?;
        self.inner
            .upsert_profile(user_id, display_name, avatar, initial_status)
    }

    fn update_presence(
        &self,
        user_id: &UserId,
        status: PresenceStatus,
        last_seen: Option<DateTime<Utc>>,
    ) -> parley_store::Result<()> {
        self.check()?;
        self.inner.update_presence(user_id, status, last_seen)
    }

    fn create_relationship(&self, relationship: &Relationship) -> parley_store::Result<()> {
        self.check()?;
        self.inner.create_relationship(relationship)
    }

    fn get_relationship(
        &self,
        relationship_id: &RelationshipId,
    ) -> parley_store::Result<Option<Relationship>> {
        self.check()?;
        self.inner.get_relationship(relationship_id)
    }

    fn find_relationship(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> parley_store::Result<Option<Relationship>> {
        self.check()?;
        self.inner.find_relationship(a, b)
    }

    fn list_relationships_by_user(
        &self,
        user_id: &UserId,
    ) -> parley_store::Result<Vec<Relationship>> {
        self.check()?;
        self.inner.list_relationships_by_user(user_id)
    }

    fn update_relationship_status(
        &self,
        relationship_id: &RelationshipId,
        expected: RelationshipStatus,
        status: RelationshipStatus,
    ) -> parley_store::Result<Relationship> {
        self.check()?;
        self.inner
            .update_relationship_status(relationship_id, expected, status)
    }

    fn create_message(&self, message: &Message) -> parley_store::Result<()> {
        self.check()?;
        self.inner.create_message(message)
    }

    fn get_message(&self, message_id: &MessageId) -> parley_store::Result<Option<Message>> {
        self.check()?;
        self.inner.get_message(message_id)
    }

    fn advance_message_status(
        &self,
        message_id: &MessageId,
        status: DeliveryStatus,
    ) -> parley_store::Result<Message> {
        self.check()?;
        if self.failing_status_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected failure".to_string()));
        }
        self.inner.advance_message_status(message_id, status)
    }

    fn list_conversation(
        &self,
        a: &UserId,
        b: &UserId,
        before: Option<&MessageId>,
        limit: usize,
    ) -> parley_store::Result<Vec<Message>> {
        self.check()?;
        self.inner.list_conversation(a, b, before, limit)
    }
}

/// A service over a fresh temporary database.
pub struct Fixture {
    pub service: Arc<RealtimeService<FlakyStore, MockJwtValidator>>,
    store: Arc<FlakyStore>,
    _dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(RealtimeConfig::default())
    }

    pub fn with_config(config: RealtimeConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FlakyStore {
            inner: RocksStore::open(dir.path()).unwrap(),
            failing: AtomicBool::new(false),
            failing_status_updates: AtomicBool::new(false),
        });
        let service = Arc::new(RealtimeService::new(
            store.clone(),
            Arc::new(MockJwtValidator),
            config,
        ));
        Self {
            service,
            store,
            _dir: dir,
        }
    }

    /// Make every store call fail until switched back.
    pub fn fail_storage(&self, failing: bool) {
        self.store.failing.store(failing, Ordering::SeqCst);
    }

    /// Make only message status updates fail until switched back.
    pub fn fail_status_updates(&self, failing: bool) {
        self.store.failing_status_updates.store(failing, Ordering::SeqCst);
    }

    pub fn add_user(&self, name: &str) -> UserId {
        let user_id = UserId::generate();
        self.store.put_account(&Account::new(user_id, name)).unwrap();
        user_id
    }

    pub fn befriend(&self, a: &UserId, b: &UserId) {
        let relationship = Relationship::pending(*a, *b);
        self.store.create_relationship(&relationship).unwrap();
        self.store
            .update_relationship_status(
                &relationship.relationship_id,
                RelationshipStatus::Pending,
                RelationshipStatus::Accepted,
            )
            .unwrap();
    }

    pub fn connect(&self, user_id: UserId) -> (Connection, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(self.service.config().outbox_capacity);
        (self.service.connect(user_id, tx), rx)
    }
}

/// Everything queued on a connection so far.
pub fn drain(rx: &mut mpsc::Receiver<OutboundEvent>) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
