//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Account records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Primary relationship records, keyed by `relationship_id`.
    pub const RELATIONSHIPS: &str = "relationships";

    /// Unique index: relationship by unordered pair, keyed by `low_user || high_user`.
    pub const RELATIONSHIP_PAIRS: &str = "relationship_pairs";

    /// Index: relationships by user, keyed by `user_id || relationship_id`.
    pub const RELATIONSHIPS_BY_USER: &str = "relationships_by_user";

    /// Primary message records, keyed by `message_id`.
    pub const MESSAGES: &str = "messages";

    /// Index: messages by conversation, keyed by `pair || created_at || message_id`.
    pub const MESSAGES_BY_CONVERSATION: &str = "messages_by_conversation";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::RELATIONSHIPS,
        cf::RELATIONSHIP_PAIRS,
        cf::RELATIONSHIPS_BY_USER,
        cf::MESSAGES,
        cf::MESSAGES_BY_CONVERSATION,
    ]
}
