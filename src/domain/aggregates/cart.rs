//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Money, MoneyError};

/// One product in a user's cart. Name and unit price are snapshots taken
/// when the line was first added and are never refreshed from the product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub user_id: String,
    pub product_id: String,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    /// Starts at 1; every successful update increments it by one.
    pub version: u64,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    pub fn new(user_id: impl Into<String>, product: &Product, quantity: u32) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            product_id: product.id().to_string(),
            product_name: product.name().to_string(),
            unit_price: product.price().clone(),
            quantity,
            version: 1,
            added_at: now,
            updated_at: now,
        }
    }

    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

/// Read model of a user's cart.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartLine>,
    total_price: Money,
    item_count: usize,
}

impl Cart {
    /// `currency` prices an empty cart; otherwise all lines must share one currency.
    pub fn from_lines(lines: Vec<CartLine>, currency: &str) -> Result<Self, MoneyError> {
        let currency = lines.first().map_or(currency, |l| l.unit_price.currency()).to_string();
        let totals: Vec<Money> = lines.iter().map(CartLine::line_total).collect();
        let total_price = Money::sum(&currency, &totals)?;
        Ok(Self { item_count: lines.len(), items: lines, total_price })
    }

    pub fn items(&self) -> &[CartLine] { &self.items }
    pub fn total_price(&self) -> &Money { &self.total_price }
    pub fn item_count(&self) -> usize { self.item_count }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn widget(price: i64) -> Product {
        Product::create("P1", "Widget", Money::new(Decimal::new(price, 0), "USD"), 10)
    }

    #[test]
    fn test_cart_line_snapshot() {
        let line = CartLine::new("U1", &widget(10), 2);
        assert_eq!(line.version, 1);
        assert_eq!(line.product_name, "Widget");
        assert_eq!(line.line_total().amount(), Decimal::new(20, 0));
    }

    #[test]
    fn test_cart_totals() {
        let mut gadget = CartLine::new("U1", &widget(5), 3);
        gadget.product_id = "P2".into();
        let cart = Cart::from_lines(vec![CartLine::new("U1", &widget(10), 2), gadget], "USD").unwrap();
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total_price().amount(), Decimal::new(35, 0));
    }

    #[test]
    fn test_empty_cart() {
        let cart = Cart::from_lines(vec![], "JPY").unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), &Money::zero("JPY"));
    }
}
