use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::market::Outcome;

/// A user's YES/NO holdings in one market. Both sides may be held at once
/// (a hedged position). Average costs are the weighted-average entry price
/// per side and are null while the side holds no shares.
#[derive(Debug, Clone)]
pub struct Position {
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub yes_shares: i64,
    pub no_shares: i64,
    pub avg_yes_cost: Option<Decimal>,
    pub avg_no_cost: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn new(user_id: Uuid, market_id: Uuid) -> Self {
        Self {
            user_id,
            market_id,
            yes_shares: 0,
            no_shares: 0,
            avg_yes_cost: None,
            avg_no_cost: None,
            updated_at: Utc::now(),
        }
    }

    pub fn shares(&self, outcome: Outcome) -> i64 {
        match outcome {
            Outcome::Yes => self.yes_shares,
            Outcome::No => self.no_shares,
        }
    }

    pub fn net_exposure(&self) -> i64 {
        self.yes_shares - self.no_shares
    }

    pub fn is_flat(&self) -> bool {
        self.yes_shares == 0 && self.no_shares == 0
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResponse {
    pub market_id: Uuid,
    pub yes_shares: i64,
    pub no_shares: i64,
    pub avg_yes_cost: Option<Decimal>,
    pub avg_no_cost: Option<Decimal>,
    pub net_exposure: i64,
}

impl From<&Position> for PositionResponse {
    fn from(position: &Position) -> Self {
        Self {
            market_id: position.market_id,
            yes_shares: position.yes_shares,
            no_shares: position.no_shares,
            avg_yes_cost: position.avg_yes_cost,
            avg_no_cost: position.avg_no_cost,
            net_exposure: position.net_exposure(),
        }
    }
}
