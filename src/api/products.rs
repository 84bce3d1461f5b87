use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use super::{quantity, ApiError, ApiJson, ApiResult, AppState};
use crate::domain::aggregates::{InventoryLog, Product, StockChange};
use crate::domain::value_objects::Money;

#[derive(Debug, Deserialize, Validate)]
pub struct PutProductRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    pub price: Decimal,
    pub stock: u32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockChangeRequest {
    pub change_type: String,
    pub quantity: i64,
    #[validate(length(max = 256))]
    #[serde(default)]
    pub reason: String,
}

/// Creates or replaces a product, priced in the shop currency.
pub async fn put_product(
    State(s): State<AppState>,
    Path(id): Path<String>,
    ApiJson(r): ApiJson<PutProductRequest>,
) -> ApiResult<Json<Product>> {
    r.validate()?;
    if r.price.is_sign_negative() {
        return Err(ApiError::BadRequest("price must not be negative".into()));
    }
    let product = Product::create(id, r.name, Money::new(r.price, &s.currency), r.stock);
    s.inventory.products().put(&product).await?;
    Ok(Json(product))
}

pub async fn adjust_stock(
    State(s): State<AppState>,
    Path(id): Path<String>,
    ApiJson(r): ApiJson<StockChangeRequest>,
) -> ApiResult<Json<InventoryLog>> {
    r.validate()?;
    let change_type: StockChange = r.change_type.parse()?;
    let log = s.inventory.adjust_stock(&id, change_type, quantity(r.quantity)?, &r.reason).await?;
    Ok(Json(log))
}
