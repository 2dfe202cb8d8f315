use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::ledger::LedgerError;
use crate::services::matching::MatchingError;
use crate::services::settlement::SettlementError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// Application error type
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: &str) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn internal(message: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match &err {
            LedgerError::InvalidAmount(_) => {
                Self::new(StatusCode::BAD_REQUEST, "INVALID_AMOUNT", &err.to_string())
            }
            LedgerError::InsufficientFunds { .. } => Self::new(
                StatusCode::PAYMENT_REQUIRED,
                "INSUFFICIENT_FUNDS",
                &err.to_string(),
            ),
            // Locked funds going missing is an invariant violation, never a
            // caller mistake. Log loudly, answer generically.
            LedgerError::InsufficientLocked { .. } => {
                tracing::error!("ledger invariant violation: {}", err);
                Self::internal("internal error")
            }
        }
    }
}

impl From<MatchingError> for AppError {
    fn from(err: MatchingError) -> Self {
        match &err {
            MatchingError::UserNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", &err.to_string())
            }
            MatchingError::MarketNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "MARKET_NOT_FOUND", &err.to_string())
            }
            MatchingError::OrderNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "ORDER_NOT_FOUND", &err.to_string())
            }
            MatchingError::MarketNotTradable(..) => Self::new(
                StatusCode::CONFLICT,
                "MARKET_NOT_TRADABLE",
                &err.to_string(),
            ),
            MatchingError::IllegalMarketState(..) => Self::new(
                StatusCode::CONFLICT,
                "ILLEGAL_MARKET_STATE",
                &err.to_string(),
            ),
            MatchingError::InvalidOrder(_) => {
                Self::new(StatusCode::BAD_REQUEST, "INVALID_ORDER", &err.to_string())
            }
            MatchingError::NotCancellable(..) => Self::new(
                StatusCode::CONFLICT,
                "ORDER_NOT_CANCELLABLE",
                &err.to_string(),
            ),
            MatchingError::Ledger(inner) => match inner {
                LedgerError::InsufficientFunds { .. } => Self::new(
                    StatusCode::PAYMENT_REQUIRED,
                    "INSUFFICIENT_FUNDS",
                    &err.to_string(),
                ),
                LedgerError::InvalidAmount(_) => {
                    Self::new(StatusCode::BAD_REQUEST, "INVALID_AMOUNT", &err.to_string())
                }
                LedgerError::InsufficientLocked { .. } => {
                    tracing::error!("ledger invariant violation: {}", err);
                    Self::internal("internal error")
                }
            },
            MatchingError::Internal(_) => {
                tracing::error!("matching invariant violation: {}", err);
                Self::internal("internal error")
            }
        }
    }
}

impl From<SettlementError> for AppError {
    fn from(err: SettlementError) -> Self {
        match &err {
            SettlementError::MarketNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "MARKET_NOT_FOUND", &err.to_string())
            }
            SettlementError::AlreadySettled(_) => Self::new(
                StatusCode::CONFLICT,
                "MARKET_ALREADY_SETTLED",
                &err.to_string(),
            ),
            SettlementError::Internal(_) => {
                tracing::error!("settlement invariant violation: {}", err);
                Self::internal("internal error")
            }
        }
    }
}
