//! Account API Handlers
//!
//! Read surface for the authenticated user's own orders and positions.

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::middleware::AuthUser;
use crate::models::{OrderResponse, PositionResponse};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersResponse {
    pub orders: Vec<OrderResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    pub positions: Vec<PositionResponse>,
    pub total: usize,
}

/// The caller's orders, newest first
/// GET /account/orders
pub async fn get_orders(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Json<OrdersResponse> {
    let mut orders = state.store.orders_for_user(auth_user.user_id);
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let orders: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    let total = orders.len();
    Json(OrdersResponse { orders, total })
}

/// The caller's positions across markets
/// GET /account/positions
pub async fn get_positions(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Json<PositionsResponse> {
    let positions: Vec<PositionResponse> = state
        .positions
        .for_user(auth_user.user_id)
        .iter()
        .map(PositionResponse::from)
        .collect();
    let total = positions.len();
    Json(PositionsResponse { positions, total })
}
