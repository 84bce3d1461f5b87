//! Application services: the operations exposed to the HTTP layer.

pub mod cart;
pub mod inventory;
pub mod order;

pub use cart::CartService;
pub use inventory::InventoryService;
pub use order::OrderService;

/// Attempts made by a compare-and-set loop before giving up.
pub const MAX_ATTEMPTS: u32 = 3;
