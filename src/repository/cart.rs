//! Cart lines: one item per `(user, product)` under the user's partition.

use tracing::debug;

use super::{from_attributes, keys, timestamp_now, to_attributes, SharedStore};
use crate::domain::aggregates::CartLine;
use crate::storage::{Condition, Query, StoreError, UpdateAction};
use crate::Result;

#[derive(Clone)]
pub struct CartRepository {
    store: SharedStore,
}

impl CartRepository {
    pub fn new(store: SharedStore) -> Self { Self { store } }

    /// All lines of the user's cart in product-id order.
    pub async fn get_by_user(&self, user_id: &str) -> Result<Vec<CartLine>> {
        let items = self
            .store
            .query(Query::partition(keys::user_partition(user_id)).begins_with(keys::CART_PREFIX))
            .await?;
        items.into_iter().map(|item| from_attributes(item.attrs)).collect()
    }

    pub async fn get_line(&self, user_id: &str, product_id: &str) -> Result<Option<CartLine>> {
        match self.store.get_item(&keys::cart_line(user_id, product_id)).await? {
            Some(item) => Ok(Some(from_attributes(item.attrs)?)),
            None => Ok(None),
        }
    }

    /// Writes a new line. Returns `false` without writing when a line for the
    /// same product already exists.
    pub async fn create(&self, line: &CartLine) -> Result<bool> {
        let key = keys::cart_line(&line.user_id, &line.product_id);
        match self.store.put_item(key, to_attributes(line)?, Some(Condition::NotExists)).await {
            Ok(()) => Ok(true),
            Err(StoreError::ConditionFailed) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Sets the quantity if the stored version equals `expected_version`,
    /// bumping the version by one. Returns `None` when the version did not
    /// match or the line no longer exists.
    pub async fn update_quantity(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: u32,
        expected_version: u64,
    ) -> Result<Option<CartLine>> {
        let actions = vec![
            UpdateAction::set("quantity", quantity),
            UpdateAction::set("updatedAt", timestamp_now()?),
            UpdateAction::add("version", 1),
        ];
        let condition = Condition::equals("version", expected_version);
        match self.store.update_item(keys::cart_line(user_id, product_id), actions, Some(condition)).await {
            Ok(attrs) => Ok(Some(from_attributes(attrs)?)),
            Err(StoreError::ConditionFailed) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Unconditional; deleting an absent line succeeds.
    pub async fn delete(&self, user_id: &str, product_id: &str) -> Result<()> {
        self.store.delete_item(keys::cart_line(user_id, product_id), None).await?;
        Ok(())
    }

    /// Deletes the lines one by one. Not atomic: a failure part-way leaves the
    /// remaining lines in place. Returns the number of lines deleted.
    pub async fn clear(&self, user_id: &str) -> Result<usize> {
        let lines = self.get_by_user(user_id).await?;
        let mut deleted = 0;
        for line in &lines {
            self.delete(user_id, &line.product_id).await?;
            deleted += 1;
        }
        debug!(user_id, deleted, "cart cleared");
        Ok(deleted)
    }
}
