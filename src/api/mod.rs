//! HTTP adapter over the services.

mod cart;
mod error;
mod orders;
mod products;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::repository::SharedStore;
use crate::service::{CartService, InventoryService, OrderService};
use crate::ShopError;

pub use error::{ApiError, ApiResult};

/// Header carrying the caller's identity, set by the upstream auth layer.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub carts: CartService,
    pub orders: OrderService,
    pub inventory: InventoryService,
    pub currency: String,
}

impl AppState {
    pub fn new(store: SharedStore, currency: impl Into<String>) -> Self {
        let currency = currency.into();
        Self {
            carts: CartService::new(store.clone(), currency.clone()),
            orders: OrderService::new(store.clone()),
            inventory: InventoryService::new(store),
            currency,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "shop-core"})) }))
        .route("/api/v1/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/v1/cart/items", post(cart::add_item))
        .route("/api/v1/cart/items/:product_id", put(cart::update_item).delete(cart::remove_item))
        .route("/api/v1/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/products/:id", put(products::put_product))
        .route("/api/v1/products/:id/stock", post(products::adjust_stock))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|user_id| !user_id.is_empty())
            .map(|user_id| CurrentUser(user_id.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}

/// JSON body whose parse failures are reported like every other bad request.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Request quantities arrive signed; anything outside `u32` is invalid.
fn quantity(raw: i64) -> Result<u32, ShopError> {
    u32::try_from(raw).map_err(|_| ShopError::InvalidQuantity)
}
