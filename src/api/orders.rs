use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{ApiError, ApiResult, AppState, CurrentUser};
use crate::domain::aggregates::Order;

pub async fn create_order(
    State(s): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = s.orders.create_order(&user_id).await.map_err(ApiError::Checkout)?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(State(s): State<AppState>, CurrentUser(user_id): CurrentUser) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(s.orders.get_orders(&user_id).await?))
}

pub async fn get_order(
    State(s): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.orders.get_order_by_id(&user_id, &id).await?))
}
