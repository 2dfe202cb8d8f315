//! Continuous double-auction matching for binary markets.
//!
//! # Architecture
//!
//! ```text
//! API Handler
//!   ↓
//! MatchingEngine
//!   ├→ MarketBook (per market, behind the market mutex)
//!   ├→ Ledger (fund locking / consumption / refunds)
//!   ├→ PositionStore (YES/NO share accounting)
//!   └→ TxnLog (audit records)
//! ```
//!
//! Everything that touches one market (admission, matching, cancellation,
//! settlement) runs under that market's mutex, so matches within a market
//! apply strictly in price-time order. Fills are broadcast as
//! [`TradeEvent`]s for subscribers.

mod engine;
mod orderbook;
mod types;

pub use engine::{required_funds, MatchingEngine};
pub use orderbook::MarketBook;
pub use types::*;
