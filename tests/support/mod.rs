#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use shop_core::domain::aggregates::Product;
use shop_core::domain::value_objects::Money;
use shop_core::repository::{ProductRepository, SharedStore};
use shop_core::storage::{
    Attributes, CancellationReason, Condition, Item, Key, MemoryStore, Query, Store, StoreError, TransactItem,
    UpdateAction,
};

pub const CURRENCY: &str = "JPY";

pub async fn seed_product(store: &SharedStore, id: &str, price: i64, stock: u32) -> Product {
    let product = Product::create(id, format!("Product {id}"), Money::new(Decimal::new(price, 0), CURRENCY), stock);
    ProductRepository::new(store.clone()).put(&product).await.unwrap();
    product
}

pub async fn stock_of(store: &SharedStore, id: &str) -> u32 {
    ProductRepository::new(store.clone()).get(id).await.unwrap().stock()
}

/// Wraps a [`MemoryStore`] and injects interference.
#[derive(Default)]
pub struct SpyStore {
    pub inner: MemoryStore,
    /// Bump a cart line's version right before every versioned update,
    /// simulating a writer that always wins the race.
    pub contend_cart_updates: bool,
    /// Cancel every transaction with a conflict on its first item.
    pub conflict_transactions: bool,
    /// Quantity of a rival line written just before the next guarded cart
    /// line create, so that create loses the race.
    pub preempt_create: Mutex<Option<u32>>,
    pub cart_updates: AtomicUsize,
    pub transactions: AtomicUsize,
    pub lost_creates: AtomicUsize,
}

impl SpyStore {
    pub fn contended() -> Arc<Self> { Arc::new(Self { contend_cart_updates: true, ..Self::default() }) }

    pub fn conflicting() -> Arc<Self> { Arc::new(Self { conflict_transactions: true, ..Self::default() }) }

    pub fn preempting(quantity: u32) -> Arc<Self> {
        Arc::new(Self { preempt_create: Mutex::new(Some(quantity)), ..Self::default() })
    }

    pub fn lost_creates(&self) -> usize { self.lost_creates.load(Ordering::SeqCst) }

    pub fn cart_updates(&self) -> usize { self.cart_updates.load(Ordering::SeqCst) }

    pub fn transactions(&self) -> usize { self.transactions.load(Ordering::SeqCst) }
}

#[async_trait]
impl Store for SpyStore {
    async fn get_item(&self, key: &Key) -> Result<Option<Item>, StoreError> { self.inner.get_item(key).await }

    async fn query(&self, query: Query) -> Result<Vec<Item>, StoreError> { self.inner.query(query).await }

    async fn put_item(&self, key: Key, attrs: Attributes, condition: Option<Condition>) -> Result<(), StoreError> {
        let guarded_create = key.sk.starts_with("CART#") && condition == Some(Condition::NotExists);
        if guarded_create {
            let rival = self.preempt_create.lock().unwrap().take();
            if let Some(quantity) = rival {
                let mut rival_attrs = attrs.clone();
                rival_attrs.insert("quantity".into(), quantity.into());
                self.inner.put_item(key.clone(), rival_attrs, None).await?;
            }
        }
        let result = self.inner.put_item(key, attrs, condition).await;
        if guarded_create && matches!(result, Err(StoreError::ConditionFailed)) {
            self.lost_creates.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    async fn update_item(
        &self,
        key: Key,
        actions: Vec<UpdateAction>,
        condition: Option<Condition>,
    ) -> Result<Attributes, StoreError> {
        if key.sk.starts_with("CART#") {
            self.cart_updates.fetch_add(1, Ordering::SeqCst);
            if self.contend_cart_updates {
                let bump = vec![UpdateAction::add("version", 1)];
                match self.inner.update_item(key.clone(), bump, Some(Condition::Exists)).await {
                    Ok(_) | Err(StoreError::ConditionFailed) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        self.inner.update_item(key, actions, condition).await
    }

    async fn delete_item(&self, key: Key, condition: Option<Condition>) -> Result<(), StoreError> {
        self.inner.delete_item(key, condition).await
    }

    async fn transact_write(&self, items: Vec<TransactItem>) -> Result<(), StoreError> {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        if self.conflict_transactions {
            let mut reasons = vec![CancellationReason::None; items.len()];
            if let Some(first) = reasons.first_mut() {
                *first = CancellationReason::TransactionConflict;
            }
            return Err(StoreError::TransactionCancelled(reasons));
        }
        self.inner.transact_write(items).await
    }
}
