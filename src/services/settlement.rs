//! Market settlement.
//!
//! Resolving a market to YES or NO is its terminal operation: live orders
//! are cancelled with their locked remainders refunded, every winning
//! share pays one unit, positions are cleared, and the market becomes
//! read-only. The whole procedure runs under the market's lock, so no
//! admission, match or cancel can interleave with it.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::models::{Market, MarketState, Order, OrderState, Outcome, TxnType};
use crate::services::ledger::Ledger;
use crate::services::matching::{required_funds, MatchingEngine};
use crate::services::positions::PositionStore;
use crate::services::txn_log::TxnLog;
use crate::store::EntityStore;

/// Settlement service errors
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("market not found: {0}")]
    MarketNotFound(Uuid),

    #[error("market already settled: {0}")]
    AlreadySettled(Uuid),

    #[error("invariant violation: {0}")]
    Internal(String),
}

/// Result of settling one market.
#[derive(Debug, Clone)]
pub struct SettlementReport {
    pub market: Market,
    pub winning_outcome: Outcome,
    pub orders_cancelled: usize,
    pub positions_paid: usize,
    pub total_payout: Decimal,
}

pub struct SettlementService {
    store: Arc<EntityStore>,
    ledger: Arc<Ledger>,
    positions: Arc<PositionStore>,
    txn_log: Arc<TxnLog>,
    engine: Arc<MatchingEngine>,
}

impl SettlementService {
    pub fn new(
        store: Arc<EntityStore>,
        ledger: Arc<Ledger>,
        positions: Arc<PositionStore>,
        txn_log: Arc<TxnLog>,
        engine: Arc<MatchingEngine>,
    ) -> Self {
        Self {
            store,
            ledger,
            positions,
            txn_log,
            engine,
        }
    }

    /// Resolve a market. The winning outcome is an explicit caller input;
    /// there is no oracle.
    pub fn settle(
        &self,
        market_id: Uuid,
        winning_outcome: Outcome,
    ) -> Result<SettlementReport, SettlementError> {
        self.store
            .get_market(market_id)
            .ok_or(SettlementError::MarketNotFound(market_id))?;

        let book = self.engine.book(market_id);
        let mut book = book.lock();

        let market = self
            .store
            .get_market(market_id)
            .ok_or(SettlementError::MarketNotFound(market_id))?;
        if market.state == MarketState::Settled {
            return Err(SettlementError::AlreadySettled(market_id));
        }

        // Cancel every live order, refunding the lock on its unfilled
        // remainder. Locked funds for this market's orders can only be
        // consumed under this market's lock, so a failed unlock means the
        // ledger invariant was already broken; abort before the market is
        // marked settled.
        let mut orders_cancelled = 0usize;
        for entry in book.live_entries() {
            let order = self.store.get_order(entry.order_id).ok_or_else(|| {
                SettlementError::Internal(format!("book entry {} has no order", entry.order_id))
            })?;
            self.cancel_for_settlement(&order)?;
            book.remove(order.id);
            orders_cancelled += 1;
        }

        // Pay one unit per winning share, then clear the position.
        let mut positions_paid = 0usize;
        let mut total_payout = Decimal::ZERO;
        for position in self.positions.for_market(market_id) {
            let payout_shares = position.shares(winning_outcome);
            if payout_shares > 0 {
                let payout = Decimal::from(payout_shares);
                self.ledger.credit(position.user_id, payout).map_err(|e| {
                    SettlementError::Internal(format!(
                        "payout to {} failed: {}",
                        position.user_id, e
                    ))
                })?;
                self.txn_log.record(
                    position.user_id,
                    TxnType::Settlement,
                    payout,
                    None,
                    Some(&format!("market settled {}", winning_outcome)),
                );
                positions_paid += 1;
                total_payout += payout;
            }
            self.positions.clear(position.user_id, market_id);
        }

        let market = self
            .store
            .update_market(market_id, |m| {
                m.state = MarketState::Settled;
                m.updated_at = Utc::now();
            })
            .ok_or_else(|| SettlementError::Internal(format!("market {} missing", market_id)))?;

        info!(
            market = %market_id,
            outcome = %winning_outcome,
            orders_cancelled,
            positions_paid,
            %total_payout,
            "market settled"
        );
        Ok(SettlementReport {
            market,
            winning_outcome,
            orders_cancelled,
            positions_paid,
            total_payout,
        })
    }

    fn cancel_for_settlement(&self, order: &Order) -> Result<(), SettlementError> {
        let refund = required_funds(order.side, order.price, order.remaining());
        if refund > Decimal::ZERO {
            self.ledger.unlock_funds(order.user_id, refund).map_err(|e| {
                SettlementError::Internal(format!(
                    "settlement refund for order {} failed: {}",
                    order.id, e
                ))
            })?;
        }
        self.txn_log.record(
            order.user_id,
            TxnType::OrderCancelled,
            refund,
            Some(order.id),
            Some("market settled"),
        );
        self.store.update_order(order.id, |o| {
            o.state = OrderState::Cancelled;
            o.updated_at = Utc::now();
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateOrderRequest, Event, OrderSide, User};
    use rust_decimal_macros::dec;

    struct Harness {
        store: Arc<EntityStore>,
        ledger: Arc<Ledger>,
        positions: Arc<PositionStore>,
        txn_log: Arc<TxnLog>,
        engine: Arc<MatchingEngine>,
        settlement: SettlementService,
    }

    fn harness() -> Harness {
        let store = Arc::new(EntityStore::new());
        let txn_log = Arc::new(TxnLog::new());
        let ledger = Arc::new(Ledger::new(txn_log.clone()));
        let positions = Arc::new(PositionStore::new());
        let engine = Arc::new(MatchingEngine::new(
            store.clone(),
            ledger.clone(),
            positions.clone(),
            txn_log.clone(),
        ));
        let settlement = SettlementService::new(
            store.clone(),
            ledger.clone(),
            positions.clone(),
            txn_log.clone(),
            engine.clone(),
        );
        Harness {
            store,
            ledger,
            positions,
            txn_log,
            engine,
            settlement,
        }
    }

    impl Harness {
        fn user(&self, username: &str, balance: Decimal) -> Uuid {
            let user = User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                password_hash: String::new(),
                password_salt: String::new(),
                created_at: Utc::now(),
            };
            let id = user.id;
            self.store.insert_user(user);
            self.ledger.deposit(id, balance).unwrap();
            id
        }

        fn market(&self) -> Uuid {
            let event = Event::new("event".into(), String::new());
            let market = Market::new(event.id, "outcome".into());
            let id = market.id;
            self.store.insert_event(event);
            self.store.insert_market(market);
            id
        }

        fn place(&self, user: Uuid, market: Uuid, side: OrderSide, price: Decimal, quantity: i64) {
            self.engine
                .place_order(
                    user,
                    &CreateOrderRequest {
                        market_id: market,
                        side,
                        price,
                        quantity,
                    },
                )
                .unwrap();
        }

        fn wallet(&self, user: Uuid) -> (Decimal, Decimal) {
            let w = self.ledger.balance(user);
            (w.available, w.locked)
        }
    }

    #[test]
    fn test_yes_settlement_pays_winners_and_clears() {
        let h = harness();
        let alice = h.user("alice", dec!(1000));
        let bob = h.user("bob", dec!(1000));
        let market = h.market();

        h.place(alice, market, OrderSide::Buy, dec!(0.60), 100);
        h.place(bob, market, OrderSide::Sell, dec!(0.60), 100);
        assert_eq!(h.wallet(alice), (dec!(940), dec!(0)));
        assert_eq!(h.wallet(bob), (dec!(960), dec!(0)));

        let report = h.settlement.settle(market, Outcome::Yes).unwrap();
        assert_eq!(report.market.state, MarketState::Settled);
        assert_eq!(report.total_payout, dec!(100));
        assert_eq!(report.positions_paid, 1);
        assert_eq!(report.orders_cancelled, 0);

        assert_eq!(h.wallet(alice), (dec!(1040), dec!(0)));
        assert_eq!(h.wallet(bob), (dec!(960), dec!(0)));
        assert!(h.positions.get(alice, market).unwrap().is_flat());
        assert!(h.positions.get(bob, market).unwrap().is_flat());

        let alice_settle: Vec<_> = h
            .txn_log
            .for_user(alice)
            .into_iter()
            .filter(|t| t.txn_type == TxnType::Settlement)
            .collect();
        assert_eq!(alice_settle.len(), 1);
        assert_eq!(alice_settle[0].amount, dec!(100));
        assert!(h
            .txn_log
            .for_user(bob)
            .iter()
            .all(|t| t.txn_type != TxnType::Settlement));
    }

    #[test]
    fn test_no_settlement_pays_the_other_side() {
        let h = harness();
        let alice = h.user("alice", dec!(1000));
        let bob = h.user("bob", dec!(1000));
        let market = h.market();

        h.place(alice, market, OrderSide::Buy, dec!(0.60), 100);
        h.place(bob, market, OrderSide::Sell, dec!(0.60), 100);

        h.settlement.settle(market, Outcome::No).unwrap();
        assert_eq!(h.wallet(alice), (dec!(940), dec!(0)));
        assert_eq!(h.wallet(bob), (dec!(1060), dec!(0)));
    }

    #[test]
    fn test_settlement_cancels_live_orders_with_refunds() {
        let h = harness();
        let alice = h.user("alice", dec!(1000));
        let bob = h.user("bob", dec!(1000));
        let market = h.market();

        // No cross: both rest in the book.
        h.place(alice, market, OrderSide::Buy, dec!(0.40), 50);
        h.place(bob, market, OrderSide::Sell, dec!(0.70), 80);
        assert_eq!(h.wallet(alice), (dec!(980), dec!(20)));
        assert_eq!(h.wallet(bob), (dec!(976), dec!(24)));

        let report = h.settlement.settle(market, Outcome::Yes).unwrap();
        assert_eq!(report.orders_cancelled, 2);
        assert_eq!(report.positions_paid, 0);

        assert_eq!(h.wallet(alice), (dec!(1000), dec!(0)));
        assert_eq!(h.wallet(bob), (dec!(1000), dec!(0)));
        for user in [alice, bob] {
            let orders = h.store.orders_for_user(user);
            assert!(orders.iter().all(|o| o.state == OrderState::Cancelled));
            assert_eq!(
                h.txn_log
                    .for_user(user)
                    .iter()
                    .filter(|t| t.txn_type == TxnType::OrderCancelled)
                    .count(),
                1
            );
        }
    }

    #[test]
    fn test_settling_twice_is_rejected() {
        let h = harness();
        let market = h.market();

        h.settlement.settle(market, Outcome::Yes).unwrap();
        assert!(matches!(
            h.settlement.settle(market, Outcome::Yes),
            Err(SettlementError::AlreadySettled(_))
        ));
        assert!(matches!(
            h.settlement.settle(Uuid::new_v4(), Outcome::No),
            Err(SettlementError::MarketNotFound(_))
        ));
    }

    #[test]
    fn test_suspended_market_can_settle() {
        let h = harness();
        let market = h.market();
        h.engine.suspend_market(market).unwrap();

        let report = h.settlement.settle(market, Outcome::No).unwrap();
        assert_eq!(report.market.state, MarketState::Settled);
    }

    #[test]
    fn test_settled_market_is_read_only() {
        let h = harness();
        let alice = h.user("alice", dec!(1000));
        let market = h.market();
        h.settlement.settle(market, Outcome::Yes).unwrap();

        let err = h
            .engine
            .place_order(
                alice,
                &CreateOrderRequest {
                    market_id: market,
                    side: OrderSide::Buy,
                    price: dec!(0.5),
                    quantity: 1,
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            crate::services::matching::MatchingError::MarketNotTradable(..)
        ));
        assert!(h.engine.match_market(market).is_err());
    }

    #[test]
    fn test_hedged_position_paid_on_winning_side_only() {
        let h = harness();
        let alice = h.user("alice", dec!(100));
        let market = h.market();

        // Self-cross: 10 YES and 10 NO at 0.60, costing 10 in total.
        h.place(alice, market, OrderSide::Buy, dec!(0.60), 10);
        h.place(alice, market, OrderSide::Sell, dec!(0.60), 10);
        assert_eq!(h.wallet(alice), (dec!(90), dec!(0)));

        h.settlement.settle(market, Outcome::Yes).unwrap();
        // Exactly the winning 10 shares pay out.
        assert_eq!(h.wallet(alice), (dec!(100), dec!(0)));
    }
}
