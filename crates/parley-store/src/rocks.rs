//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use parley_core::{MessageId, RelationshipId, UserId};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::{
    Account, DeliveryStatus, Message, PresenceStatus, Relationship, RelationshipStatus,
};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes read-modify-write sequences so that unique indexes and
    /// monotonic status updates hold under concurrent callers.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Read and decode a single record.
    fn get_record<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Encode and write a single record.
    fn put_record<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let value = Self::serialize(value)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn put_account(&self, account: &Account) -> Result<()> {
        self.put_record(cf::ACCOUNTS, &keys::account_key(&account.user_id), account)
    }

    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        self.get_record(cf::ACCOUNTS, &keys::account_key(user_id))
    }

    fn upsert_profile(
        &self,
        user_id: &UserId,
        display_name: &str,
        avatar: Option<String>,
        initial_status: PresenceStatus,
    ) -> Result<Account> {
        let _guard = self.write_lock.lock();

        let account = match self.get_account(user_id)? {
            Some(mut account) => {
                account.display_name = display_name.to_string();
                account.avatar = avatar;
                account.updated_at = Utc::now();
                account
            }
            None => {
                let mut account = Account::new(*user_id, display_name);
                account.avatar = avatar;
                account.status = initial_status;
                account
            }
        };

        self.put_account(&account)?;
        Ok(account)
    }

    fn update_presence(
        &self,
        user_id: &UserId,
        status: PresenceStatus,
        last_seen: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let _guard = self.write_lock.lock();

        let mut account = self.get_account(user_id)?.ok_or(StoreError::NotFound)?;
        account.status = status;
        if last_seen.is_some() {
            account.last_seen = last_seen;
        }
        account.updated_at = Utc::now();
        self.put_account(&account)
    }

    // =========================================================================
    // Relationship Operations
    // =========================================================================

    fn create_relationship(&self, relationship: &Relationship) -> Result<()> {
        let cf_relationships = self.cf(cf::RELATIONSHIPS)?;
        let cf_pairs = self.cf(cf::RELATIONSHIP_PAIRS)?;
        let cf_by_user = self.cf(cf::RELATIONSHIPS_BY_USER)?;

        let id = &relationship.relationship_id;
        let pair_key = keys::pair_key(&relationship.requester, &relationship.recipient);
        let value = Self::serialize(relationship)?;

        let _guard = self.write_lock.lock();

        // Enforce one record per unordered pair
        let existing = self
            .db
            .get_cf(&cf_pairs, &pair_key)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if existing.is_some() {
            return Err(StoreError::AlreadyExists);
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_relationships, keys::relationship_key(id), &value);
        batch.put_cf(&cf_pairs, &pair_key, id.as_bytes());
        batch.put_cf(
            &cf_by_user,
            keys::user_relationship_key(&relationship.requester, id),
            [],
        );
        batch.put_cf(
            &cf_by_user,
            keys::user_relationship_key(&relationship.recipient, id),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_relationship(&self, relationship_id: &RelationshipId) -> Result<Option<Relationship>> {
        self.get_record(cf::RELATIONSHIPS, &keys::relationship_key(relationship_id))
    }

    fn find_relationship(&self, a: &UserId, b: &UserId) -> Result<Option<Relationship>> {
        let cf_pairs = self.cf(cf::RELATIONSHIP_PAIRS)?;

        let Some(value) = self
            .db
            .get_cf(&cf_pairs, keys::pair_key(a, b))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let relationship_id = keys::decode_relationship_id(&value)
            .ok_or_else(|| StoreError::Serialization("malformed pair index entry".to_string()))?;

        self.get_relationship(&relationship_id)
    }

    fn list_relationships_by_user(&self, user_id: &UserId) -> Result<Vec<Relationship>> {
        let cf_by_user = self.cf(cf::RELATIONSHIPS_BY_USER)?;
        let prefix = keys::user_prefix(user_id);

        let mut relationships = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf_by_user, IteratorMode::From(&prefix, Direction::Forward));

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            // Stop if we're past the prefix
            if !key.starts_with(&prefix) {
                break;
            }

            let relationship_id = keys::extract_relationship_id(&key);
            if let Some(relationship) = self.get_relationship(&relationship_id)? {
                relationships.push(relationship);
            }
        }

        Ok(relationships)
    }

    fn update_relationship_status(
        &self,
        relationship_id: &RelationshipId,
        expected: RelationshipStatus,
        status: RelationshipStatus,
    ) -> Result<Relationship> {
        let _guard = self.write_lock.lock();

        let mut relationship = self
            .get_relationship(relationship_id)?
            .ok_or(StoreError::NotFound)?;
        if relationship.status != expected {
            return Err(StoreError::StatusConflict {
                current: relationship.status,
            });
        }
        relationship.status = status;
        relationship.updated_at = Utc::now();

        self.put_record(
            cf::RELATIONSHIPS,
            &keys::relationship_key(relationship_id),
            &relationship,
        )?;

        Ok(relationship)
    }

    // =========================================================================
    // Message Operations
    // =========================================================================

    fn create_message(&self, message: &Message) -> Result<()> {
        let cf_messages = self.cf(cf::MESSAGES)?;
        let cf_by_conversation = self.cf(cf::MESSAGES_BY_CONVERSATION)?;

        let message_key = keys::message_key(&message.message_id);
        let conversation_key = keys::conversation_message_key(
            &message.sender_id,
            &message.receiver_id,
            &message.created_at,
            &message.message_id,
        );
        let value = Self::serialize(message)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_messages, &message_key, &value);
        batch.put_cf(&cf_by_conversation, &conversation_key, []);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_message(&self, message_id: &MessageId) -> Result<Option<Message>> {
        self.get_record(cf::MESSAGES, &keys::message_key(message_id))
    }

    fn advance_message_status(
        &self,
        message_id: &MessageId,
        status: DeliveryStatus,
    ) -> Result<Message> {
        let _guard = self.write_lock.lock();

        let mut message = self.get_message(message_id)?.ok_or(StoreError::NotFound)?;

        if message.advance(status, Utc::now()) {
            self.put_record(cf::MESSAGES, &keys::message_key(message_id), &message)?;
        } else {
            tracing::trace!(
                message_id = %message_id,
                current = ?message.status,
                requested = ?status,
                "Ignoring non-forward status transition"
            );
        }

        Ok(message)
    }

    fn list_conversation(
        &self,
        a: &UserId,
        b: &UserId,
        before: Option<&MessageId>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let cf_by_conversation = self.cf(cf::MESSAGES_BY_CONVERSATION)?;
        let prefix = keys::pair_key(a, b);

        let start = match before {
            Some(cursor_id) => {
                let cursor = self
                    .get_message(cursor_id)?
                    .filter(|m| keys::pair_key(&m.sender_id, &m.receiver_id) == prefix)
                    .ok_or(StoreError::NotFound)?;
                keys::conversation_message_key(a, b, &cursor.created_at, cursor_id)
            }
            None => keys::conversation_end(a, b),
        };

        let mut messages = Vec::new();
        if limit == 0 {
            return Ok(messages);
        }

        let iter = self
            .db
            .iterator_cf(&cf_by_conversation, IteratorMode::From(&start, Direction::Reverse));

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            // The cursor itself is excluded
            if *key == *start {
                continue;
            }

            let message_id = keys::extract_message_id(&key);
            if let Some(message) = self.get_message(&message_id)? {
                messages.push(message);
                if messages.len() >= limit {
                    break;
                }
            }
        }

        Ok(messages)
    }
}
