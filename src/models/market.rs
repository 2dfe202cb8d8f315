use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::utils::time::datetime_ddmmyyyy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketState {
    Active,
    Suspended,
    Settled,
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketState::Active => write!(f, "ACTIVE"),
            MarketState::Suspended => write!(f, "SUSPENDED"),
            MarketState::Settled => write!(f, "SETTLED"),
        }
    }
}

/// Binary outcome of a market. A YES share pays one unit when the market
/// resolves YES; a NO share pays one unit when it resolves NO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Yes,
    No,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Yes => write!(f, "YES"),
            Outcome::No => write!(f, "NO"),
        }
    }
}

/// One independent order book under an event. `last_price` is the last
/// executed YES price, null until the first fill.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: Uuid,
    pub event_id: Uuid,
    pub outcome_label: String,
    pub state: MarketState,
    pub last_price: Option<Decimal>,
    #[serde(serialize_with = "datetime_ddmmyyyy::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "datetime_ddmmyyyy::serialize")]
    pub updated_at: DateTime<Utc>,
}

impl Market {
    pub fn new(event_id: Uuid, outcome_label: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            event_id,
            outcome_label,
            state: MarketState::Active,
            last_price: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarketRequest {
    pub event_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub outcome_label: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleMarketRequest {
    pub winning_outcome: Outcome,
}
