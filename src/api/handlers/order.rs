//! Order API Handlers
//!
//! Admission, cancellation and order-book views over the matching engine.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::models::{CreateOrderRequest, OrderResponse};
use crate::services::matching::BookSnapshot;
use crate::utils::response::AppError;
use crate::AppState;

/// Submit a new order
/// POST /orders
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    req.validate()
        .map_err(|e| AppError::bad_request(&e.to_string()))?;

    let order = state.engine.place_order(auth_user.user_id, &req)?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// Cancel a live order
/// POST /orders/:order_id/cancel
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .store
        .get_order(order_id)
        .filter(|o| o.user_id == auth_user.user_id)
        .ok_or_else(|| AppError::not_found("order not found"))?;

    let cancelled = state.engine.cancel_order(order.id)?;
    Ok(Json(cancelled.into()))
}

/// Get one of the caller's orders
/// GET /orders/:order_id
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .store
        .get_order(order_id)
        .filter(|o| o.user_id == auth_user.user_id)
        .ok_or_else(|| AppError::not_found("order not found"))?;
    Ok(Json(order.into()))
}

/// Snapshot of a market's resting orders
/// GET /orders/market/:market_id/book
pub async fn get_market_book(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<Uuid>,
) -> Result<Json<BookSnapshot>, AppError> {
    let snapshot = state.engine.book_snapshot(market_id)?;
    Ok(Json(snapshot))
}
