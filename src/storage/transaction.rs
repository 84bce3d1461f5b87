//! Multi-item atomic write transactions.

use std::collections::HashSet;

use super::condition::{apply_updates, Condition, UpdateAction};
use super::{Attributes, Key, Store, StoreError};

/// Upper bound on the number of operations in one transaction.
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// One operation inside a transaction.
#[derive(Clone, Debug, PartialEq)]
pub enum TransactItem {
    Put { key: Key, attrs: Attributes, condition: Option<Condition> },
    Update { key: Key, actions: Vec<UpdateAction>, condition: Option<Condition> },
    Delete { key: Key, condition: Option<Condition> },
    ConditionCheck { key: Key, condition: Condition },
}

/// Effect of a single operation on the stored item.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    Write(Attributes),
    Remove,
    Keep,
}

impl TransactItem {
    pub fn key(&self) -> &Key {
        match self {
            Self::Put { key, .. }
            | Self::Update { key, .. }
            | Self::Delete { key, .. }
            | Self::ConditionCheck { key, .. } => key,
        }
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Self::Put { condition, .. } | Self::Update { condition, .. } | Self::Delete { condition, .. } => {
                condition.as_ref()
            }
            Self::ConditionCheck { condition, .. } => Some(condition),
        }
    }

    /// Computes the operation's effect given the current stored attributes.
    /// Updates against a missing item start from an empty attribute map.
    pub fn mutation(&self, current: Option<&Attributes>) -> Result<Mutation, StoreError> {
        Ok(match self {
            Self::Put { attrs, .. } => Mutation::Write(attrs.clone()),
            Self::Update { actions, .. } => {
                let base = current.cloned().unwrap_or_default();
                Mutation::Write(apply_updates(&base, actions)?)
            }
            Self::Delete { .. } => Mutation::Remove,
            Self::ConditionCheck { .. } => Mutation::Keep,
        })
    }
}

/// Per-operation outcome reported when a transaction is cancelled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancellationReason {
    /// This operation did not cause the cancellation.
    None,
    /// This operation's condition evaluated to false.
    ConditionFailed,
    /// Another in-flight transaction holds this key.
    TransactionConflict,
    Other(String),
}

/// Rejects transactions that are empty, too large, or touch a key twice.
pub fn validate(items: &[TransactItem]) -> Result<(), StoreError> {
    if items.is_empty() {
        return Err(StoreError::EmptyTransaction);
    }
    if items.len() > MAX_TRANSACTION_ITEMS {
        return Err(StoreError::TooManyItems(items.len()));
    }
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.key()) {
            return Err(StoreError::DuplicateKey(item.key().clone()));
        }
    }
    Ok(())
}

/// Accumulates typed operations and submits them as one transaction.
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    items: Vec<TransactItem>,
}

impl TransactionBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn put(mut self, key: Key, attrs: Attributes, condition: Option<Condition>) -> Self {
        self.items.push(TransactItem::Put { key, attrs, condition });
        self
    }

    pub fn update(mut self, key: Key, actions: Vec<UpdateAction>, condition: Option<Condition>) -> Self {
        self.items.push(TransactItem::Update { key, actions, condition });
        self
    }

    pub fn delete(mut self, key: Key, condition: Option<Condition>) -> Self {
        self.items.push(TransactItem::Delete { key, condition });
        self
    }

    pub fn condition_check(mut self, key: Key, condition: Condition) -> Self {
        self.items.push(TransactItem::ConditionCheck { key, condition });
        self
    }

    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn items(&self) -> &[TransactItem] { &self.items }

    pub async fn submit(self, store: &dyn Store) -> Result<(), StoreError> {
        store.transact_write(self.items).await
    }
}
