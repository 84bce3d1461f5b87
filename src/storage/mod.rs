//! Storage gateway
//!
//! A single-table key-value store addressed by a partition key and a sort key.
//! Supports point reads, ordered partition queries, conditional single-item
//! writes and multi-item atomic transactions. All cross-request coordination
//! in the crate goes through these primitives.

mod condition;
mod memory;
mod postgres;
mod transaction;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use condition::{apply_updates, Condition, UpdateAction};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use transaction::{validate, CancellationReason, Mutation, TransactItem, TransactionBuilder, MAX_TRANSACTION_ITEMS};

/// Non-key attributes of an item.
pub type Attributes = serde_json::Map<String, Value>;

/// Composite primary key. Orders by partition key, then sort key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    pub pk: String,
    pub sk: String,
}

impl Key {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self { pk: pk.into(), sk: sk.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub key: Key,
    pub attrs: Attributes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortKeyCondition {
    BeginsWith(String),
    /// Inclusive on both ends.
    Between(String, String),
}

impl SortKeyCondition {
    pub fn matches(&self, sk: &str) -> bool {
        match self {
            Self::BeginsWith(prefix) => sk.starts_with(prefix.as_str()),
            Self::Between(start, end) => sk >= start.as_str() && sk <= end.as_str(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Query over one partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub partition: String,
    pub sort_key: Option<SortKeyCondition>,
    pub direction: Direction,
    pub limit: Option<usize>,
}

impl Query {
    pub fn partition(pk: impl Into<String>) -> Self {
        Self { partition: pk.into(), sort_key: None, direction: Direction::Forward, limit: None }
    }

    pub fn begins_with(mut self, prefix: impl Into<String>) -> Self {
        self.sort_key = Some(SortKeyCondition::BeginsWith(prefix.into()));
        self
    }

    pub fn between(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.sort_key = Some(SortKeyCondition::Between(start.into(), end.into()));
        self
    }

    pub fn backward(mut self) -> Self {
        self.direction = Direction::Backward;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conditional check failed")]
    ConditionFailed,

    #[error("Transaction cancelled: {0:?}")]
    TransactionCancelled(Vec<CancellationReason>),

    #[error("Transaction has no items")]
    EmptyTransaction,

    #[error("Transaction has {0} items, limit is {MAX_TRANSACTION_ITEMS}")]
    TooManyItems(usize),

    #[error("Transaction touches {0:?} more than once")]
    DuplicateKey(Key),

    #[error("Malformed item: {0}")]
    Malformed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// The storage gateway contract. Every call is an await point; dropping the
/// returned future abandons the call.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_item(&self, key: &Key) -> Result<Option<Item>, StoreError>;

    /// Items of one partition in sort-key order.
    async fn query(&self, query: Query) -> Result<Vec<Item>, StoreError>;

    async fn put_item(&self, key: Key, attrs: Attributes, condition: Option<Condition>) -> Result<(), StoreError>;

    /// Applies the actions and returns the item's attributes after the update.
    async fn update_item(
        &self,
        key: Key,
        actions: Vec<UpdateAction>,
        condition: Option<Condition>,
    ) -> Result<Attributes, StoreError>;

    /// Deleting an absent item succeeds unless a condition says otherwise.
    async fn delete_item(&self, key: Key, condition: Option<Condition>) -> Result<(), StoreError>;

    /// All items commit or none do. On failure returns
    /// [`StoreError::TransactionCancelled`] with one reason per item.
    async fn transact_write(&self, items: Vec<TransactItem>) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_condition() {
        assert!(SortKeyCondition::BeginsWith("CART#".into()).matches("CART#p1"));
        assert!(!SortKeyCondition::BeginsWith("CART#".into()).matches("ORDER#o1"));
        let range = SortKeyCondition::Between("INVLOG#2024-01".into(), "INVLOG#2024-02".into());
        assert!(range.matches("INVLOG#2024-01-15"));
        assert!(!range.matches("INVLOG#2024-03"));
    }

    #[test]
    fn test_key_ordering() {
        assert!(Key::new("A", "2") < Key::new("B", "1"));
        assert!(Key::new("A", "1") < Key::new("A", "2"));
    }
}
