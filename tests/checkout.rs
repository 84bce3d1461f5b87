mod support;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use shop_core::domain::aggregates::{CartLine, OrderStatus, Product, StockChange};
use shop_core::repository::{CartRepository, SharedStore, MAX_CHECKOUT_LINES};
use shop_core::service::{CartService, InventoryService, OrderService};
use shop_core::storage::MemoryStore;
use shop_core::ShopError;

use support::{seed_product, stock_of, SpyStore, CURRENCY};

fn memory() -> SharedStore { Arc::new(MemoryStore::new()) }

#[tokio::test]
async fn checkout_consumes_cart_and_decrements_stock() {
    let store = memory();
    seed_product(&store, "p1", 500, 10).await;
    seed_product(&store, "p2", 120, 4).await;
    let carts = CartService::new(store.clone(), CURRENCY);
    let orders = OrderService::new(store.clone());
    carts.add_item("u1", "p1", 3).await.unwrap();
    carts.add_item("u1", "p2", 4).await.unwrap();

    let order = orders.create_order("u1").await.unwrap();
    assert_eq!(order.status(), OrderStatus::Confirmed);
    assert_eq!(order.item_count(), 2);
    assert_eq!(order.total_amount().amount(), Decimal::new(1980, 0));

    assert!(carts.get_cart("u1").await.unwrap().is_empty());
    assert_eq!(stock_of(&store, "p1").await, 7);
    assert_eq!(stock_of(&store, "p2").await, 0);

    let loaded = orders.get_order_by_id("u1", &order.id().to_string()).await.unwrap();
    assert_eq!(loaded.items(), order.items());
    assert_eq!(loaded.total_amount(), order.total_amount());
}

#[tokio::test]
async fn empty_cart_submits_nothing() {
    let spy = Arc::new(SpyStore::default());
    let store: SharedStore = spy.clone();
    let orders = OrderService::new(store);

    assert!(matches!(orders.create_order("u1").await, Err(ShopError::EmptyCart)));
    assert_eq!(spy.transactions(), 0);
    assert!(spy.inner.is_empty().await);
}

#[tokio::test]
async fn failed_checkout_leaves_cart_and_stock_unchanged() {
    let store = memory();
    seed_product(&store, "p1", 500, 5).await;
    seed_product(&store, "p2", 500, 5).await;
    let carts = CartService::new(store.clone(), CURRENCY);
    let orders = OrderService::new(store.clone());
    let inventory = InventoryService::new(store.clone());
    carts.add_item("u1", "p1", 2).await.unwrap();
    carts.add_item("u1", "p2", 3).await.unwrap();

    // Stock drops after the advisory check.
    inventory.adjust_stock("p2", StockChange::Out, 4, "damaged").await.unwrap();
    let before = carts.get_cart("u1").await.unwrap();

    assert!(matches!(orders.create_order("u1").await, Err(ShopError::InsufficientStock)));
    assert_eq!(carts.get_cart("u1").await.unwrap(), before);
    assert_eq!(stock_of(&store, "p1").await, 5);
    assert_eq!(stock_of(&store, "p2").await, 1);
    assert!(orders.get_orders("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn conflicting_checkout_is_reported_and_not_retried() {
    let spy = SpyStore::conflicting();
    let store: SharedStore = spy.clone();
    seed_product(&store, "p1", 500, 5).await;
    let carts = CartService::new(store.clone(), CURRENCY);
    carts.add_item("u1", "p1", 1).await.unwrap();
    let before = carts.get_cart("u1").await.unwrap();

    let result = OrderService::new(store.clone()).create_order("u1").await;
    assert!(matches!(result, Err(ShopError::TransactionConflict)));
    assert_eq!(spy.transactions(), 1);
    assert_eq!(carts.get_cart("u1").await.unwrap(), before);
    assert_eq!(stock_of(&store, "p1").await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_checkouts_never_oversell() {
    let store = memory();
    seed_product(&store, "p1", 500, 5).await;
    let carts = CartService::new(store.clone(), CURRENCY);
    carts.add_item("alice", "p1", 3).await.unwrap();
    carts.add_item("bob", "p1", 3).await.unwrap();

    let orders = OrderService::new(store.clone());
    let handles: Vec<_> = ["alice", "bob"]
        .into_iter()
        .map(|user| {
            let orders = orders.clone();
            tokio::spawn(async move { orders.create_order(user).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut short = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ShopError::InsufficientStock) => short += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((succeeded, short), (1, 1));
    assert_eq!(stock_of(&store, "p1").await, 2);
}

#[tokio::test]
async fn orders_are_listed_newest_first() {
    let store = memory();
    seed_product(&store, "p1", 500, 10).await;
    let carts = CartService::new(store.clone(), CURRENCY);
    let orders = OrderService::new(store.clone());

    carts.add_item("u1", "p1", 1).await.unwrap();
    let first = orders.create_order("u1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    carts.add_item("u1", "p1", 2).await.unwrap();
    let second = orders.create_order("u1").await.unwrap();

    let listed = orders.get_orders("u1").await.unwrap();
    let ids: Vec<_> = listed.iter().map(|o| o.id()).collect();
    assert_eq!(ids, [second.id(), first.id()]);
    assert!(orders.get_orders("u2").await.unwrap().is_empty());
}

#[tokio::test]
async fn order_lookup_is_scoped_to_user() {
    let store = memory();
    seed_product(&store, "p1", 500, 10).await;
    CartService::new(store.clone(), CURRENCY).add_item("u1", "p1", 1).await.unwrap();
    let orders = OrderService::new(store);
    let order = orders.create_order("u1").await.unwrap();

    let id = order.id().to_string();
    assert!(matches!(orders.get_order_by_id("u2", &id).await, Err(ShopError::OrderNotFound)));
    assert!(matches!(
        orders.get_order_by_id("u1", &uuid::Uuid::new_v4().to_string()).await,
        Err(ShopError::OrderNotFound)
    ));
}

#[tokio::test]
async fn oversized_cart_is_rejected_before_submitting() {
    let spy = Arc::new(SpyStore::default());
    let store: SharedStore = spy.clone();
    let lines = CartRepository::new(store.clone());
    // Written directly, as racing adds could, past the add_item cap.
    for i in 0..=MAX_CHECKOUT_LINES {
        let product: Product = seed_product(&store, &format!("p{i}"), 100, 5).await;
        assert!(lines.create(&CartLine::new("u1", &product, 1)).await.unwrap());
    }

    let result = OrderService::new(store.clone()).create_order("u1").await;
    assert!(matches!(result, Err(ShopError::CartFull(n)) if n == MAX_CHECKOUT_LINES));
    assert_eq!(spy.transactions(), 0);
    assert_eq!(lines.get_by_user("u1").await.unwrap().len(), MAX_CHECKOUT_LINES + 1);
    assert_eq!(stock_of(&store, "p0").await, 5);
}
