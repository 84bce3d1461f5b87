//! Shop Core
//!
//! Cart and checkout backend built on a single-table key-value store.
//!
//! ## Features
//! - Inventory-aware shopping cart with optimistic concurrency
//! - Atomic checkout: order creation, stock decrement and cart cleanup in one transaction
//! - Conditional stock adjustments with an inventory log
//! - In-memory and PostgreSQL storage backends

pub mod api;
pub mod config;
pub mod domain;
pub mod repository;
pub mod service;
pub mod storage;

use thiserror::Error;

use crate::domain::aggregates::OrderError;
use crate::domain::value_objects::MoneyError;
use crate::storage::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Quantity must be greater than 0")]
    InvalidQuantity,

    #[error("Insufficient stock for the requested item")]
    InsufficientStock,

    #[error("Failed to update after max retries due to concurrent modifications")]
    OptimisticLockExhausted,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart cannot hold more than {0} different products")]
    CartFull(usize),

    #[error("Transaction conflict, please retry")]
    TransactionConflict,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Cart item not found")]
    CartItemNotFound,

    #[error("Invalid change type: {0}")]
    InvalidChangeType(String),

    #[error("Stock changed concurrently, please retry")]
    StockConflict,

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<OrderError> for ShopError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NoItems => Self::EmptyCart,
            OrderError::Money(e) => Self::Money(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
