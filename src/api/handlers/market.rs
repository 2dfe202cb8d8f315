//! Market API Handlers
//!
//! Market administration: creation under an open event, lifecycle
//! transitions, the manual re-match trigger and settlement.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::models::{CreateMarketRequest, EventState, Market, SettleMarketRequest};
use crate::utils::response::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketsResponse {
    pub markets: Vec<Market>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchTriggerResponse {
    pub matches_executed: u32,
}

/// Create a market under an open event
/// POST /markets
pub async fn create_market(
    State(state): State<Arc<AppState>>,
    Extension(_auth_user): Extension<AuthUser>,
    Json(req): Json<CreateMarketRequest>,
) -> Result<(StatusCode, Json<Market>), AppError> {
    req.validate()
        .map_err(|e| AppError::bad_request(&e.to_string()))?;

    let event = state
        .store
        .get_event(req.event_id)
        .ok_or_else(|| AppError::not_found("event not found"))?;
    if event.state != EventState::Open {
        return Err(AppError::conflict("event is not open"));
    }

    let market = Market::new(event.id, req.outcome_label);
    state.store.insert_market(market.clone());
    tracing::info!(market = %market.id, event = %event.id, "market created");
    Ok((StatusCode::CREATED, Json(market)))
}

/// List all markets
/// GET /markets
pub async fn list_markets(State(state): State<Arc<AppState>>) -> Json<MarketsResponse> {
    let markets = state.store.list_markets();
    let total = markets.len();
    Json(MarketsResponse { markets, total })
}

/// Get a market
/// GET /markets/:market_id
pub async fn get_market(
    State(state): State<Arc<AppState>>,
    Path(market_id): Path<Uuid>,
) -> Result<Json<Market>, AppError> {
    let market = state
        .store
        .get_market(market_id)
        .ok_or_else(|| AppError::not_found("market not found"))?;
    Ok(Json(market))
}

/// Administrative re-match trigger
/// POST /markets/:market_id/match
pub async fn trigger_match(
    State(state): State<Arc<AppState>>,
    Extension(_auth_user): Extension<AuthUser>,
    Path(market_id): Path<Uuid>,
) -> Result<Json<MatchTriggerResponse>, AppError> {
    let matches_executed = state.engine.match_market(market_id)?;
    Ok(Json(MatchTriggerResponse { matches_executed }))
}

/// Settle a market to YES or NO
/// POST /markets/:market_id/settle
pub async fn settle_market(
    State(state): State<Arc<AppState>>,
    Extension(_auth_user): Extension<AuthUser>,
    Path(market_id): Path<Uuid>,
    Json(req): Json<SettleMarketRequest>,
) -> Result<Json<Market>, AppError> {
    let report = state.settlement.settle(market_id, req.winning_outcome)?;
    Ok(Json(report.market))
}

/// Pause trading on a market
/// POST /markets/:market_id/suspend
pub async fn suspend_market(
    State(state): State<Arc<AppState>>,
    Extension(_auth_user): Extension<AuthUser>,
    Path(market_id): Path<Uuid>,
) -> Result<Json<Market>, AppError> {
    Ok(Json(state.engine.suspend_market(market_id)?))
}

/// Resume trading on a suspended market
/// POST /markets/:market_id/resume
pub async fn resume_market(
    State(state): State<Arc<AppState>>,
    Extension(_auth_user): Extension<AuthUser>,
    Path(market_id): Path<Uuid>,
) -> Result<Json<Market>, AppError> {
    Ok(Json(state.engine.resume_market(market_id)?))
}
