//! Checkout and order history.

use tracing::{info, instrument, warn};

use crate::domain::aggregates::Order;
use crate::repository::{CartRepository, OrderRepository, SharedStore, MAX_CHECKOUT_LINES};
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct OrderService {
    carts: CartRepository,
    orders: OrderRepository,
}

impl OrderService {
    pub fn new(store: SharedStore) -> Self {
        Self { carts: CartRepository::new(store.clone()), orders: OrderRepository::new(store) }
    }

    /// Turns the user's cart into a confirmed order in a single atomic
    /// transaction. Failures are not retried here.
    #[instrument(skip(self))]
    pub async fn create_order(&self, user_id: &str) -> Result<Order> {
        let lines = self.carts.get_by_user(user_id).await?;
        if lines.is_empty() {
            return Err(ShopError::EmptyCart);
        }
        // Concurrent adds can overshoot the limit enforced by add_item.
        if lines.len() > MAX_CHECKOUT_LINES {
            return Err(ShopError::CartFull(MAX_CHECKOUT_LINES));
        }
        let order = Order::from_cart(user_id, &lines)?;

        if let Err(e) = self.orders.create(&order, &lines).await {
            warn!(user_id, order_id = %order.id(), error = %e, "checkout failed");
            return Err(e);
        }
        info!(
            user_id,
            order_id = %order.id(),
            items = order.item_count(),
            total = %order.total_amount(),
            "order created"
        );
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn get_orders(&self, user_id: &str) -> Result<Vec<Order>> {
        self.orders.get_by_user(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_order_by_id(&self, user_id: &str, order_id: &str) -> Result<Order> {
        self.orders.get_by_id(user_id, order_id).await
    }
}
