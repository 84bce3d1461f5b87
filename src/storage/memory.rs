//! In-process store backed by an ordered map, for tests and local runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::transaction::validate;
use super::{
    Attributes, CancellationReason, Condition, Direction, Item, Key, Mutation, Query, Store, StoreError, TransactItem,
    UpdateAction,
};

/// Clone-friendly via `Arc`; clones share the same data.
///
/// Every operation holds one lock for its whole duration, so transactions are
/// serialized and never report [`CancellationReason::TransactionConflict`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    items: Arc<Mutex<BTreeMap<Key, Attributes>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Number of stored items.
    pub async fn len(&self) -> usize { self.items.lock().await.len() }

    pub async fn is_empty(&self) -> bool { self.items.lock().await.is_empty() }
}

fn check(condition: Option<&Condition>, current: Option<&Attributes>) -> Result<(), StoreError> {
    match condition {
        Some(c) if !c.evaluate(current) => Err(StoreError::ConditionFailed),
        _ => Ok(()),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_item(&self, key: &Key) -> Result<Option<Item>, StoreError> {
        let items = self.items.lock().await;
        Ok(items.get(key).map(|attrs| Item { key: key.clone(), attrs: attrs.clone() }))
    }

    async fn query(&self, query: Query) -> Result<Vec<Item>, StoreError> {
        let items = self.items.lock().await;
        let start = Key::new(query.partition.clone(), "");
        let mut found: Vec<Item> = items
            .range(start..)
            .take_while(|(key, _)| key.pk == query.partition)
            .filter(|(key, _)| query.sort_key.as_ref().map_or(true, |c| c.matches(&key.sk)))
            .map(|(key, attrs)| Item { key: key.clone(), attrs: attrs.clone() })
            .collect();
        if query.direction == Direction::Backward {
            found.reverse();
        }
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn put_item(&self, key: Key, attrs: Attributes, condition: Option<Condition>) -> Result<(), StoreError> {
        let mut items = self.items.lock().await;
        check(condition.as_ref(), items.get(&key))?;
        items.insert(key, attrs);
        Ok(())
    }

    async fn update_item(
        &self,
        key: Key,
        actions: Vec<UpdateAction>,
        condition: Option<Condition>,
    ) -> Result<Attributes, StoreError> {
        let mut items = self.items.lock().await;
        let current = items.get(&key);
        check(condition.as_ref(), current)?;
        let next = super::apply_updates(&current.cloned().unwrap_or_default(), &actions)?;
        items.insert(key, next.clone());
        Ok(next)
    }

    async fn delete_item(&self, key: Key, condition: Option<Condition>) -> Result<(), StoreError> {
        let mut items = self.items.lock().await;
        check(condition.as_ref(), items.get(&key))?;
        items.remove(&key);
        Ok(())
    }

    async fn transact_write(&self, ops: Vec<TransactItem>) -> Result<(), StoreError> {
        validate(&ops)?;
        let mut items = self.items.lock().await;

        let mut reasons = Vec::with_capacity(ops.len());
        let mut cancelled = false;
        for op in &ops {
            let current = items.get(op.key());
            if op.condition().is_some_and(|c| !c.evaluate(current)) {
                reasons.push(CancellationReason::ConditionFailed);
                cancelled = true;
            } else {
                reasons.push(CancellationReason::None);
            }
        }
        if cancelled {
            return Err(StoreError::TransactionCancelled(reasons));
        }

        // Stage first so a malformed update leaves nothing half-applied.
        let mut staged = Vec::with_capacity(ops.len());
        for op in &ops {
            staged.push((op.key().clone(), op.mutation(items.get(op.key()))?));
        }
        for (key, mutation) in staged {
            match mutation {
                Mutation::Write(attrs) => {
                    items.insert(key, attrs);
                }
                Mutation::Remove => {
                    items.remove(&key);
                }
                Mutation::Keep => {}
            }
        }
        Ok(())
    }
}
