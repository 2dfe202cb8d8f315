//! Position store.
//!
//! Per (user, market) YES/NO share counts with weighted-average entry
//! costs. The average is the only cost statistic kept; no per-lot
//! accounting. Updated exclusively by the matcher and settlement, both of
//! which run under the owning market's lock.

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Outcome, Position};
use crate::utils::decimal::round_money;

#[derive(Default)]
pub struct PositionStore {
    positions: DashMap<(Uuid, Uuid), Position>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` shares of `outcome` bought at `cost_per_share`,
    /// folding the cost into the side's weighted average (scale 4,
    /// HALF_UP on the division).
    pub fn add_shares(
        &self,
        user_id: Uuid,
        market_id: Uuid,
        outcome: Outcome,
        quantity: i64,
        cost_per_share: Decimal,
    ) {
        let mut entry = self
            .positions
            .entry((user_id, market_id))
            .or_insert_with(|| Position::new(user_id, market_id));
        let position = entry.value_mut();

        let (shares, avg_cost) = match outcome {
            Outcome::Yes => (&mut position.yes_shares, &mut position.avg_yes_cost),
            Outcome::No => (&mut position.no_shares, &mut position.avg_no_cost),
        };

        let held_cost = avg_cost.unwrap_or(Decimal::ZERO) * Decimal::from(*shares);
        let new_shares = *shares + quantity;
        let new_avg =
            (held_cost + cost_per_share * Decimal::from(quantity)) / Decimal::from(new_shares);
        *avg_cost = Some(round_money(new_avg));
        *shares = new_shares;
        position.updated_at = Utc::now();
    }

    pub fn get(&self, user_id: Uuid, market_id: Uuid) -> Option<Position> {
        self.positions.get(&(user_id, market_id)).map(|p| p.clone())
    }

    pub fn for_user(&self, user_id: Uuid) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .positions
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.clone())
            .collect();
        positions.sort_by_key(|p| p.market_id);
        positions
    }

    pub fn for_market(&self, market_id: Uuid) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .positions
            .iter()
            .filter(|p| p.market_id == market_id)
            .map(|p| p.clone())
            .collect();
        positions.sort_by_key(|p| p.user_id);
        positions
    }

    /// Zero out a position at settlement: shares cleared, costs null.
    pub fn clear(&self, user_id: Uuid, market_id: Uuid) {
        if let Some(mut position) = self.positions.get_mut(&(user_id, market_id)) {
            position.yes_shares = 0;
            position.no_shares = 0;
            position.avg_yes_cost = None;
            position.avg_no_cost = None;
            position.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_first_buy_sets_average_to_cost() {
        let store = PositionStore::new();
        let (user, market) = (Uuid::new_v4(), Uuid::new_v4());
        store.add_shares(user, market, Outcome::Yes, 100, dec!(0.60));

        let position = store.get(user, market).unwrap();
        assert_eq!(position.yes_shares, 100);
        assert_eq!(position.avg_yes_cost, Some(dec!(0.6000)));
        assert_eq!(position.no_shares, 0);
        assert_eq!(position.avg_no_cost, None);
    }

    #[test]
    fn test_weighted_average_rounds_half_up() {
        let store = PositionStore::new();
        let (user, market) = (Uuid::new_v4(), Uuid::new_v4());
        // 100 @ 0.60 + 50 @ 0.70 = 95 / 150 = 0.63333... -> 0.6333
        store.add_shares(user, market, Outcome::Yes, 100, dec!(0.60));
        store.add_shares(user, market, Outcome::Yes, 50, dec!(0.70));
        let position = store.get(user, market).unwrap();
        assert_eq!(position.yes_shares, 150);
        assert_eq!(position.avg_yes_cost, Some(dec!(0.6333)));

        // 1 @ 0.1 + 2 @ 0.2 = 0.5 / 3 = 0.16666... -> 0.1667
        store.add_shares(user, market, Outcome::No, 1, dec!(0.1));
        store.add_shares(user, market, Outcome::No, 2, dec!(0.2));
        let position = store.get(user, market).unwrap();
        assert_eq!(position.avg_no_cost, Some(dec!(0.1667)));
    }

    #[test]
    fn test_hedged_position_tracks_both_sides() {
        let store = PositionStore::new();
        let (user, market) = (Uuid::new_v4(), Uuid::new_v4());
        store.add_shares(user, market, Outcome::Yes, 80, dec!(0.55));
        store.add_shares(user, market, Outcome::No, 30, dec!(0.45));

        let position = store.get(user, market).unwrap();
        assert_eq!(position.yes_shares, 80);
        assert_eq!(position.no_shares, 30);
        assert_eq!(position.net_exposure(), 50);
    }

    #[test]
    fn test_clear_zeroes_shares_and_costs() {
        let store = PositionStore::new();
        let (user, market) = (Uuid::new_v4(), Uuid::new_v4());
        store.add_shares(user, market, Outcome::Yes, 10, dec!(0.5));
        store.clear(user, market);

        let position = store.get(user, market).unwrap();
        assert!(position.is_flat());
        assert_eq!(position.avg_yes_cost, None);
        assert_eq!(position.avg_no_cost, None);
    }
}
