//! Wallet API Handlers
//!
//! Deposits, withdrawals, balances and the per-wallet audit trail.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::models::{DepositRequest, TransactionResponse, WalletResponse, WithdrawRequest};
use crate::services::ledger::LedgerError;
use crate::utils::response::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub user_id: Uuid,
    pub transactions: Vec<TransactionResponse>,
    pub total: usize,
}

/// Fund a wallet
/// POST /wallets/deposit
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Extension(_auth_user): Extension<AuthUser>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    if !state.store.user_exists(req.user_id) {
        return Err(AppError::not_found("user not found"));
    }
    let wallet = state.ledger.deposit(req.user_id, req.amount)?;
    Ok(Json(WalletResponse::from(&wallet)))
}

/// Withdraw available funds
/// POST /wallets/withdraw
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Extension(_auth_user): Extension<AuthUser>,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    if !state.store.user_exists(req.user_id) {
        return Err(AppError::not_found("user not found"));
    }
    let wallet = state
        .ledger
        .withdraw(req.user_id, req.amount)
        .map_err(|e| match e {
            // Withdrawals report insufficiency as a plain bad request,
            // unlike order admission which answers 402.
            LedgerError::InsufficientFunds { .. } => AppError::bad_request(&e.to_string()),
            other => AppError::from(other),
        })?;
    Ok(Json(WalletResponse::from(&wallet)))
}

/// Wallet balance
/// GET /wallets/user/:user_id/balance
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<WalletResponse>, AppError> {
    if !state.store.user_exists(user_id) {
        return Err(AppError::not_found("user not found"));
    }
    let wallet = state.ledger.balance(user_id);
    Ok(Json(WalletResponse::from(&wallet)))
}

/// Wallet audit trail, oldest first
/// GET /wallets/user/:user_id/transactions
pub async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<TransactionsResponse>, AppError> {
    if !state.store.user_exists(user_id) {
        return Err(AppError::not_found("user not found"));
    }
    let transactions: Vec<TransactionResponse> = state
        .txn_log
        .for_user(user_id)
        .iter()
        .map(TransactionResponse::from)
        .collect();
    let total = transactions.len();
    Ok(Json(TransactionsResponse {
        user_id,
        transactions,
        total,
    }))
}
