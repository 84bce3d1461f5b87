use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use super::{quantity, ApiJson, ApiResult, AppState, CurrentUser};
use crate::domain::aggregates::{Cart, CartLine};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    #[validate(length(min = 1, max = 128))]
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
    pub version: u64,
}

pub async fn get_cart(State(s): State<AppState>, CurrentUser(user_id): CurrentUser) -> ApiResult<Json<Cart>> {
    Ok(Json(s.carts.get_cart(&user_id).await?))
}

pub async fn add_item(
    State(s): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(r): ApiJson<AddItemRequest>,
) -> ApiResult<(StatusCode, Json<CartLine>)> {
    r.validate()?;
    let line = s.carts.add_item(&user_id, &r.product_id, quantity(r.quantity)?).await?;
    Ok((StatusCode::CREATED, Json(line)))
}

pub async fn update_item(
    State(s): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<String>,
    ApiJson(r): ApiJson<UpdateItemRequest>,
) -> ApiResult<Json<CartLine>> {
    let line = s.carts.update_quantity(&user_id, &product_id, quantity(r.quantity)?, r.version).await?;
    Ok(Json(line))
}

pub async fn remove_item(
    State(s): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    s.carts.remove_item(&user_id, &product_id).await?;
    Ok(Json(serde_json::json!({"status": "removed", "productId": product_id})))
}

pub async fn clear_cart(State(s): State<AppState>, CurrentUser(user_id): CurrentUser) -> ApiResult<StatusCode> {
    s.carts.clear_cart(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
