//! Stock adjustments outside checkout.

use tracing::{info, instrument, warn};

use super::MAX_ATTEMPTS;
use crate::domain::aggregates::{InventoryLog, StockChange};
use crate::repository::{ProductRepository, SharedStore};
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct InventoryService {
    products: ProductRepository,
}

impl InventoryService {
    pub fn new(store: SharedStore) -> Self { Self { products: ProductRepository::new(store) } }

    pub fn products(&self) -> &ProductRepository { &self.products }

    /// Applies a stock movement and records it in the inventory log.
    ///
    /// Every kind, `Adjust` included, is a compare-and-set on the stock value
    /// read at the start of the attempt. A lost race re-reads the product and
    /// tries again; after [`MAX_ATTEMPTS`] the call fails with `StockConflict`.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: &str,
        change_type: StockChange,
        quantity: u32,
        reason: &str,
    ) -> Result<InventoryLog> {
        if quantity == 0 && change_type != StockChange::Adjust {
            return Err(ShopError::InvalidQuantity);
        }
        for attempt in 1..=MAX_ATTEMPTS {
            let product = self.products.get(product_id).await?;
            let log = InventoryLog::record(&product, change_type, quantity, reason);
            if self.products.record_stock_change(&log).await? {
                info!(
                    product_id,
                    change_type = change_type.as_str(),
                    previous = log.previous_stock,
                    new = log.new_stock,
                    "stock adjusted"
                );
                return Ok(log);
            }
            warn!(product_id, attempt, "stock changed concurrently");
        }
        Err(ShopError::StockConflict)
    }
}
