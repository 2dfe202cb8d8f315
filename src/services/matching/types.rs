//! Matching engine types.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::models::{MarketState, OrderSide, OrderState};

// ============================================================================
// Price Level
// ============================================================================

/// Price level with 4 decimal precision for exact comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceLevel(i64);

impl PriceLevel {
    /// Create a PriceLevel from a Decimal price
    pub fn from_decimal(price: Decimal) -> Self {
        let scaled = (price * Decimal::from(10_000)).trunc();
        PriceLevel(scaled.to_i64().unwrap_or(0))
    }

    /// Convert back to Decimal
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 4)
    }

    /// Get raw value
    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl Ord for PriceLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for PriceLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// Book Entry
// ============================================================================

/// A live order resting in a market book.
#[derive(Debug, Clone)]
pub struct BookEntry {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub side: OrderSide,
    pub price: Decimal,
    pub remaining: i64,
    pub created_at: DateTime<Utc>,
}

impl BookEntry {
    /// Age key for maker selection: the entry with the smaller key is the
    /// older order, ties broken by the lexicographically smaller id.
    pub fn age_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.order_id)
    }
}

// ============================================================================
// Trade Event
// ============================================================================

/// One fill, broadcast to subscribers after the match commits.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEvent {
    pub market_id: Uuid,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub price: Decimal,
    pub quantity: i64,
    pub timestamp: i64,
}

// ============================================================================
// Book Snapshot
// ============================================================================

/// Aggregated book snapshot for API responses: `[price, quantity]` per
/// level, bids best-first, asks best-first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSnapshot {
    pub market_id: Uuid,
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
    pub last_price: Option<Decimal>,
    pub timestamp: i64,
}

// ============================================================================
// Error Types
// ============================================================================

/// Matching engine errors
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    #[error("market not found: {0}")]
    MarketNotFound(Uuid),

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("market {0} is not tradable (state {1})")]
    MarketNotTradable(Uuid, MarketState),

    #[error("market {0} cannot transition from {1}")]
    IllegalMarketState(Uuid, MarketState),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("order {0} is not cancellable (state {1})")]
    NotCancellable(Uuid, OrderState),

    #[error(transparent)]
    Ledger(#[from] crate::services::ledger::LedgerError),

    #[error("invariant violation: {0}")]
    Internal(String),
}
