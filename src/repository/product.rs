//! Product metadata and stock.

use super::{from_attributes, keys, timestamp_now, to_attributes, SharedStore};
use crate::domain::aggregates::{InventoryLog, Product};
use crate::storage::{Condition, StoreError, TransactionBuilder, UpdateAction};
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct ProductRepository {
    store: SharedStore,
}

impl ProductRepository {
    pub fn new(store: SharedStore) -> Self { Self { store } }

    pub async fn get(&self, product_id: &str) -> Result<Product> {
        let item = self.store.get_item(&keys::product(product_id)).await?.ok_or(ShopError::ProductNotFound)?;
        from_attributes(item.attrs)
    }

    /// Creates or replaces the product record.
    pub async fn put(&self, product: &Product) -> Result<()> {
        self.store.put_item(keys::product(product.id()), to_attributes(product)?, None).await?;
        Ok(())
    }

    /// Writes the log's new stock and the log record in one transaction,
    /// provided stock still equals the log's `previous_stock`. Returns `false`
    /// when another writer changed the stock first.
    pub async fn record_stock_change(&self, log: &InventoryLog) -> Result<bool> {
        let tx = TransactionBuilder::new()
            .update(
                keys::product(&log.product_id),
                vec![UpdateAction::set("stock", log.new_stock), UpdateAction::set("updatedAt", timestamp_now()?)],
                Some(Condition::equals("stock", log.previous_stock)),
            )
            .put(
                keys::inventory_log(&log.product_id, log.created_at, &log.id.to_string()),
                to_attributes(log)?,
                Some(Condition::NotExists),
            );
        match tx.submit(self.store.as_ref()).await {
            Ok(()) => Ok(true),
            Err(StoreError::TransactionCancelled(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
