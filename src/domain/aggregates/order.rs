//! Order Aggregate
//!
//! An order is built in memory from the cart's lines, confirmed, and then
//! persisted once by the checkout transaction. It is never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::aggregates::CartLine;
use crate::domain::value_objects::{Money, MoneyError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: Uuid,
    user_id: String,
    status: OrderStatus,
    total_amount: Money,
    item_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    items: Vec<OrderLine>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Immutable snapshot of one purchased product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub order_id: Uuid,
    pub product_id: String,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub subtotal: Money,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus { #[default] Pending, Confirmed }

impl Order {
    pub fn create(user_id: impl Into<String>, currency: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), user_id: user_id.into(), status: OrderStatus::Pending,
            total_amount: Money::zero(currency), item_count: 0, items: vec![],
            created_at: now, updated_at: now,
        }
    }

    /// Builds a confirmed order holding one line per cart line.
    pub fn from_cart(user_id: &str, lines: &[CartLine]) -> Result<Self, OrderError> {
        let first = lines.first().ok_or(OrderError::NoItems)?;
        let mut order = Self::create(user_id, first.unit_price.currency());
        for line in lines {
            order.add_line(line)?;
        }
        order.confirm()?;
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> &str { &self.user_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn total_amount(&self) -> &Money { &self.total_amount }
    pub fn item_count(&self) -> usize { self.item_count }
    pub fn items(&self) -> &[OrderLine] { &self.items }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn add_line(&mut self, line: &CartLine) -> Result<(), OrderError> {
        let subtotal = line.line_total();
        self.total_amount = self.total_amount.add(&subtotal)?;
        self.items.push(OrderLine {
            order_id: self.id,
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            unit_price: line.unit_price.clone(),
            quantity: line.quantity,
            subtotal,
        });
        self.item_count = self.items.len();
        self.touch();
        Ok(())
    }

    /// Orders go straight to `Confirmed`; there is no pending stage once persisted.
    pub fn confirm(&mut self) -> Result<(), OrderError> {
        if self.items.is_empty() { return Err(OrderError::NoItems); }
        self.status = OrderStatus::Confirmed;
        self.touch();
        Ok(())
    }

    /// The header without its lines, as stored under the user's partition.
    pub fn header(&self) -> Self { Self { items: vec![], ..self.clone() } }

    pub fn with_items(mut self, items: Vec<OrderLine>) -> Self {
        self.items = items;
        self
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error(transparent)]
    Money(#[from] MoneyError),
}
