//! Orders and the checkout transaction.

use std::collections::BTreeMap;

use uuid::Uuid;

use super::{from_attributes, keys, timestamp_now, to_attributes, SharedStore};
use crate::domain::aggregates::{CartLine, Order, OrderLine};
use crate::storage::{
    CancellationReason, Condition, Query, StoreError, TransactionBuilder, UpdateAction, MAX_TRANSACTION_ITEMS,
};
use crate::{Result, ShopError};

/// Most cart lines one checkout transaction can consume: each line costs an
/// order-line put, a stock update and a cart delete, plus one order header.
pub const MAX_CHECKOUT_LINES: usize = (MAX_TRANSACTION_ITEMS - 1) / 3;

#[derive(Clone)]
pub struct OrderRepository {
    store: SharedStore,
}

impl OrderRepository {
    pub fn new(store: SharedStore) -> Self { Self { store } }

    /// Persists the order and consumes the cart in one atomic transaction.
    /// Either every write lands or none does.
    pub async fn create(&self, order: &Order, consumed: &[CartLine]) -> Result<()> {
        let tx = checkout_transaction(order, consumed)?;
        tx.submit(self.store.as_ref()).await.map_err(classify_checkout_failure)
    }

    /// Order headers for the user, newest first. Lines are not loaded.
    pub async fn get_by_user(&self, user_id: &str) -> Result<Vec<Order>> {
        let items = self
            .store
            .query(Query::partition(keys::user_partition(user_id)).begins_with(keys::ORDER_PREFIX).backward())
            .await?;
        items.into_iter().map(|item| from_attributes(item.attrs)).collect()
    }

    /// The order with its lines. Orders belonging to another user are
    /// reported as not found.
    pub async fn get_by_id(&self, user_id: &str, order_id: &str) -> Result<Order> {
        let order_id = Uuid::parse_str(order_id).map_err(|_| ShopError::OrderNotFound)?.to_string();
        let header = self
            .store
            .get_item(&keys::order_header(user_id, &order_id))
            .await?
            .ok_or(ShopError::OrderNotFound)?;
        let order: Order = from_attributes(header.attrs)?;
        let items = self.get_items(&order_id).await?;
        Ok(order.with_items(items))
    }

    pub async fn get_items(&self, order_id: &str) -> Result<Vec<OrderLine>> {
        let items = self
            .store
            .query(Query::partition(keys::order_partition(order_id)).begins_with(keys::ITEM_PREFIX))
            .await?;
        items.into_iter().map(|item| from_attributes(item.attrs)).collect()
    }
}

/// Builds the checkout transaction:
/// the order header, one put per order line, one guarded stock decrement per
/// distinct product, and one delete per consumed cart line.
pub fn checkout_transaction(order: &Order, consumed: &[CartLine]) -> Result<TransactionBuilder> {
    let order_id = order.id().to_string();
    let mut tx = TransactionBuilder::new().put(
        keys::order_header(order.user_id(), &order_id),
        to_attributes(&order.header())?,
        None,
    );

    let mut demand: BTreeMap<&str, i64> = BTreeMap::new();
    for line in order.items() {
        tx = tx.put(keys::order_line(&order_id, &line.product_id), to_attributes(line)?, None);
        *demand.entry(line.product_id.as_str()).or_default() += i64::from(line.quantity);
    }

    let now = timestamp_now()?;
    for (product_id, quantity) in demand {
        tx = tx.update(
            keys::product(product_id),
            vec![UpdateAction::add("stock", -quantity), UpdateAction::set("updatedAt", now.clone())],
            Some(Condition::at_least("stock", quantity)),
        );
    }

    for line in consumed {
        tx = tx.delete(keys::cart_line(&line.user_id, &line.product_id), None);
    }
    Ok(tx)
}

/// Maps a failed checkout submission onto a domain error. A failed stock
/// guard wins over a conflict when both are reported.
pub fn classify_checkout_failure(err: StoreError) -> ShopError {
    match err {
        StoreError::TransactionCancelled(reasons) => {
            if reasons.contains(&CancellationReason::ConditionFailed) {
                ShopError::InsufficientStock
            } else if reasons.contains(&CancellationReason::TransactionConflict) {
                ShopError::TransactionConflict
            } else {
                ShopError::Storage(StoreError::TransactionCancelled(reasons))
            }
        }
        other => ShopError::Storage(other),
    }
}
