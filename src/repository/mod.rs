//! Repositories map aggregates onto the single-table key layout.
//!
//! | Entity        | Partition key         | Sort key                       |
//! |---------------|-----------------------|--------------------------------|
//! | Cart line     | `USER#<userId>`       | `CART#<productId>`             |
//! | Order header  | `USER#<userId>`       | `ORDER#<orderId>`              |
//! | Order line    | `ORDER#<orderId>`     | `ITEM#<productId>`             |
//! | Product       | `PRODUCT#<productId>` | `METADATA`                     |
//! | Inventory log | `PRODUCT#<productId>` | `INVLOG#<timestamp>#<logId>`   |

pub mod cart;
pub mod order;
pub mod product;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::storage::{Attributes, Store, StoreError};
use crate::Result;

pub use cart::CartRepository;
pub use order::{classify_checkout_failure, OrderRepository, MAX_CHECKOUT_LINES};
pub use product::ProductRepository;

/// Store handle shared by every repository.
pub type SharedStore = Arc<dyn Store>;

pub mod keys {
    use chrono::{DateTime, SecondsFormat, Utc};

    use crate::storage::Key;

    pub const CART_PREFIX: &str = "CART#";
    pub const ORDER_PREFIX: &str = "ORDER#";
    pub const ITEM_PREFIX: &str = "ITEM#";
    pub const INVLOG_PREFIX: &str = "INVLOG#";
    pub const PRODUCT_SORT_KEY: &str = "METADATA";

    pub fn user_partition(user_id: &str) -> String { format!("USER#{user_id}") }
    pub fn order_partition(order_id: &str) -> String { format!("ORDER#{order_id}") }
    pub fn product_partition(product_id: &str) -> String { format!("PRODUCT#{product_id}") }

    pub fn cart_line(user_id: &str, product_id: &str) -> Key {
        Key::new(user_partition(user_id), format!("{CART_PREFIX}{product_id}"))
    }

    pub fn order_header(user_id: &str, order_id: &str) -> Key {
        Key::new(user_partition(user_id), format!("{ORDER_PREFIX}{order_id}"))
    }

    pub fn order_line(order_id: &str, product_id: &str) -> Key {
        Key::new(order_partition(order_id), format!("{ITEM_PREFIX}{product_id}"))
    }

    pub fn product(product_id: &str) -> Key {
        Key::new(product_partition(product_id), PRODUCT_SORT_KEY)
    }

    /// The log id suffix keeps two movements in the same second apart.
    pub fn inventory_log(product_id: &str, at: DateTime<Utc>, log_id: &str) -> Key {
        Key::new(
            product_partition(product_id),
            format!("{INVLOG_PREFIX}{}#{log_id}", at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        )
    }
}

pub(crate) fn to_attributes<T: Serialize>(value: &T) -> Result<Attributes> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(format!("expected an object, got {other}")).into()),
    }
}

pub(crate) fn from_attributes<T: DeserializeOwned>(attrs: Attributes) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(attrs))?)
}

pub(crate) fn timestamp_now() -> Result<Value> {
    Ok(serde_json::to_value(chrono::Utc::now())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_key_layout() {
        let key = keys::cart_line("u1", "p1");
        assert_eq!((key.pk.as_str(), key.sk.as_str()), ("USER#u1", "CART#p1"));
        let key = keys::order_header("u1", "o1");
        assert_eq!((key.pk.as_str(), key.sk.as_str()), ("USER#u1", "ORDER#o1"));
        let key = keys::order_line("o1", "p1");
        assert_eq!((key.pk.as_str(), key.sk.as_str()), ("ORDER#o1", "ITEM#p1"));
        let key = keys::product("p1");
        assert_eq!((key.pk.as_str(), key.sk.as_str()), ("PRODUCT#p1", "METADATA"));
    }

    #[test]
    fn test_inventory_log_key_sorts_by_time() {
        let at = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let key = keys::inventory_log("p1", at, "abc");
        assert_eq!(key.sk, "INVLOG#2024-05-01T09:30:00Z#abc");
        let later = keys::inventory_log("p1", at + chrono::Duration::seconds(1), "000");
        assert!(later.sk > key.sk);
    }

    #[test]
    fn test_to_attributes_rejects_scalars() {
        assert!(to_attributes(&42).is_err());
        let attrs = to_attributes(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(attrs["a"], 1);
    }
}
