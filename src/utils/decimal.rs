//! Monetary arithmetic helpers.
//!
//! All prices and amounts are fixed-decimal with scale 4; divisions round
//! HALF_UP at that scale.

use rust_decimal::{Decimal, RoundingStrategy};

pub const MONEY_SCALE: u32 = 4;

/// Round to the monetary scale, HALF_UP at midpoints.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// True when the value carries no fractional digits beyond the monetary scale.
pub fn fits_money_scale(value: Decimal) -> bool {
    value == value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero)
}
