//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{InventoryLog, Product, StockChange};
pub use order::{Order, OrderError, OrderLine, OrderStatus};
pub use cart::{Cart, CartLine};
