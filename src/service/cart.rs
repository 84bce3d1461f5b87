//! Inventory-aware cart operations.
//!
//! Stock checks here are advisory: they read the product once and reserve
//! nothing. The checkout transaction is the only place stock is enforced.

use tracing::{debug, info, instrument, warn};

use super::MAX_ATTEMPTS;
use crate::domain::aggregates::{Cart, CartLine, Product};
use crate::repository::{CartRepository, ProductRepository, SharedStore, MAX_CHECKOUT_LINES};
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct CartService {
    carts: CartRepository,
    products: ProductRepository,
    currency: String,
}

impl CartService {
    /// `currency` prices the total of an empty cart.
    pub fn new(store: SharedStore, currency: impl Into<String>) -> Self {
        Self {
            carts: CartRepository::new(store.clone()),
            products: ProductRepository::new(store),
            currency: currency.into(),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: &str) -> Result<Cart> {
        let lines = self.carts.get_by_user(user_id).await?;
        Ok(Cart::from_lines(lines, &self.currency)?)
    }

    /// Adds `quantity` units, merging into an existing line for the product.
    #[instrument(skip(self))]
    pub async fn add_item(&self, user_id: &str, product_id: &str, quantity: u32) -> Result<CartLine> {
        if quantity == 0 {
            return Err(ShopError::InvalidQuantity);
        }
        let product = self.products.get(product_id).await?;

        if let Some(existing) = self.carts.get_line(user_id, product_id).await? {
            return self.merge(&product, existing, quantity).await;
        }

        if !product.has_stock_for(quantity) {
            warn!(user_id, product_id, quantity, stock = product.stock(), "insufficient stock");
            return Err(ShopError::InsufficientStock);
        }
        if self.carts.get_by_user(user_id).await?.len() >= MAX_CHECKOUT_LINES {
            warn!(user_id, product_id, "cart is full");
            return Err(ShopError::CartFull(MAX_CHECKOUT_LINES));
        }
        let line = CartLine::new(user_id, &product, quantity);
        if self.carts.create(&line).await? {
            info!(user_id, product_id, quantity, "cart line created");
            return Ok(line);
        }

        debug!(user_id, product_id, "cart line created concurrently, merging");
        let existing = self.carts.get_line(user_id, product_id).await?.ok_or(ShopError::CartItemNotFound)?;
        self.merge(&product, existing, quantity).await
    }

    /// Sets the line's quantity, starting from the version the caller last saw.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: u32,
        expected_version: u64,
    ) -> Result<CartLine> {
        if quantity == 0 {
            return Err(ShopError::InvalidQuantity);
        }
        let product = self.products.get(product_id).await?;
        if !product.has_stock_for(quantity) {
            warn!(user_id, product_id, quantity, stock = product.stock(), "insufficient stock");
            return Err(ShopError::InsufficientStock);
        }
        self.update_with_retry(user_id, product_id, quantity, expected_version).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: &str, product_id: &str) -> Result<()> {
        self.carts.delete(user_id, product_id).await?;
        info!(user_id, product_id, "cart line removed");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: &str) -> Result<()> {
        let deleted = self.carts.clear(user_id).await?;
        info!(user_id, deleted, "cart cleared");
        Ok(())
    }

    async fn merge(&self, product: &Product, existing: CartLine, quantity: u32) -> Result<CartLine> {
        let prospective = existing.quantity.checked_add(quantity).ok_or(ShopError::InvalidQuantity)?;
        if !product.has_stock_for(prospective) {
            warn!(
                user_id = %existing.user_id,
                product_id = %existing.product_id,
                prospective,
                stock = product.stock(),
                "insufficient stock"
            );
            return Err(ShopError::InsufficientStock);
        }
        self.update_with_retry(&existing.user_id, &existing.product_id, prospective, existing.version).await
    }

    /// Conditional write on `version`. On a mismatch the live version is
    /// re-read and the same target quantity is written again, up to
    /// [`MAX_ATTEMPTS`] writes in total.
    async fn update_with_retry(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: u32,
        mut version: u64,
    ) -> Result<CartLine> {
        for attempt in 1..=MAX_ATTEMPTS {
            if let Some(line) = self.carts.update_quantity(user_id, product_id, quantity, version).await? {
                debug!(user_id, product_id, version = line.version, attempt, "cart line updated");
                return Ok(line);
            }
            warn!(user_id, product_id, attempt, version, "version conflict");
            if attempt == MAX_ATTEMPTS {
                break;
            }
            version = self
                .carts
                .get_line(user_id, product_id)
                .await?
                .ok_or(ShopError::CartItemNotFound)?
                .version;
        }
        Err(ShopError::OptimisticLockExhausted)
    }
}
