//! Product Aggregate
//!
//! The cart/order core only reads a product's name and price and mutates its
//! stock through conditional writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: String,
    name: String,
    price: Money,
    stock: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(id: impl Into<String>, name: impl Into<String>, price: Money, stock: u32) -> Self {
        let now = Utc::now();
        Self { id: id.into(), name: name.into(), price, stock, created_at: now, updated_at: now }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn price(&self) -> &Money { &self.price }
    pub fn stock(&self) -> u32 { self.stock }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn has_stock_for(&self, quantity: u32) -> bool { self.stock >= quantity }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockChange {
    /// Goods received; adds to stock.
    In,
    /// Goods removed outside checkout; subtracts, floored at zero.
    Out,
    /// Stocktake correction; `quantity` is the new absolute stock.
    Adjust,
}

impl StockChange {
    pub fn apply(self, current: u32, quantity: u32) -> u32 {
        match self {
            Self::In => current.saturating_add(quantity),
            Self::Out => current.saturating_sub(quantity),
            Self::Adjust => quantity,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self { Self::In => "IN", Self::Out => "OUT", Self::Adjust => "ADJUST" }
    }
}

impl FromStr for StockChange {
    type Err = crate::ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            "ADJUST" => Ok(Self::Adjust),
            other => Err(crate::ShopError::InvalidChangeType(other.to_string())),
        }
    }
}

/// Record of one stock movement, written alongside the stock update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLog {
    pub id: Uuid,
    pub product_id: String,
    pub change_type: StockChange,
    pub quantity: u32,
    pub previous_stock: u32,
    pub new_stock: u32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl InventoryLog {
    pub fn record(product: &Product, change_type: StockChange, quantity: u32, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            product_id: product.id.clone(),
            change_type,
            quantity,
            previous_stock: product.stock,
            new_stock: change_type.apply(product.stock, quantity),
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }
}
