//! Matching engine: admission, continuous matching and cancellation.
//!
//! A BUY order at YES-price `p` locks `p * qty`; a SELL order is a purchase
//! of NO shares and locks `(1 - p) * qty`. The top bid and top ask cross
//! whenever `bid >= ask`; the execution price is the older order's price, so
//! the taker gets the price improvement. Every fill consumes each side's
//! share of locked funds and refunds the rest, which keeps the sum of
//! consumed and refunded amounts exactly equal to the locked slice.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::orderbook::MarketBook;
use super::types::{BookEntry, BookSnapshot, MatchingError, TradeEvent};
use crate::models::{
    CreateOrderRequest, Market, MarketState, Order, OrderSide, OrderState, Outcome, TxnType,
};
use crate::services::ledger::Ledger;
use crate::services::positions::PositionStore;
use crate::services::txn_log::TxnLog;
use crate::store::EntityStore;
use crate::utils::decimal::fits_money_scale;

const TRADE_CHANNEL_CAPACITY: usize = 1024;

/// Funds a resting order reserves: the worst-case cost of its unfilled
/// shares at its own limit price.
pub fn required_funds(side: OrderSide, price: Decimal, quantity: i64) -> Decimal {
    let qty = Decimal::from(quantity);
    match side {
        OrderSide::Buy => price * qty,
        OrderSide::Sell => (Decimal::ONE - price) * qty,
    }
}

pub struct MatchingEngine {
    store: Arc<EntityStore>,
    ledger: Arc<Ledger>,
    positions: Arc<PositionStore>,
    txn_log: Arc<TxnLog>,

    /// One book per market. The mutex is the serialization unit for every
    /// engine operation touching that market.
    books: DashMap<Uuid, Arc<Mutex<MarketBook>>>,

    trade_tx: broadcast::Sender<TradeEvent>,
}

impl MatchingEngine {
    pub fn new(
        store: Arc<EntityStore>,
        ledger: Arc<Ledger>,
        positions: Arc<PositionStore>,
        txn_log: Arc<TxnLog>,
    ) -> Self {
        let (trade_tx, _) = broadcast::channel(TRADE_CHANNEL_CAPACITY);
        Self {
            store,
            ledger,
            positions,
            txn_log,
            books: DashMap::new(),
            trade_tx,
        }
    }

    /// Get trade event receiver
    pub fn subscribe_trades(&self) -> broadcast::Receiver<TradeEvent> {
        self.trade_tx.subscribe()
    }

    pub(crate) fn book(&self, market_id: Uuid) -> Arc<Mutex<MarketBook>> {
        self.books
            .entry(market_id)
            .or_insert_with(|| Arc::new(Mutex::new(MarketBook::new(market_id))))
            .clone()
    }

    /// Admit a new order: validate, lock the required funds, persist it as
    /// PENDING and hand the market to the matcher. A matching failure
    /// after admission never rolls the placement back.
    pub fn place_order(
        &self,
        user_id: Uuid,
        req: &CreateOrderRequest,
    ) -> Result<Order, MatchingError> {
        if !self.store.user_exists(user_id) {
            return Err(MatchingError::UserNotFound(user_id));
        }
        self.store
            .get_market(req.market_id)
            .ok_or(MatchingError::MarketNotFound(req.market_id))?;

        let book = self.book(req.market_id);
        let mut book = book.lock();

        // Re-read under the market lock: a concurrent settlement or
        // suspension must win against this admission.
        let market = self
            .store
            .get_market(req.market_id)
            .ok_or(MatchingError::MarketNotFound(req.market_id))?;
        if market.state != MarketState::Active {
            return Err(MatchingError::MarketNotTradable(market.id, market.state));
        }

        if req.price <= Decimal::ZERO || req.price > Decimal::ONE {
            return Err(MatchingError::InvalidOrder(format!(
                "price {} outside (0, 1]",
                req.price
            )));
        }
        if !fits_money_scale(req.price) {
            return Err(MatchingError::InvalidOrder(format!(
                "price {} exceeds 4 decimal places",
                req.price
            )));
        }
        if req.quantity < 1 {
            return Err(MatchingError::InvalidOrder(format!(
                "quantity {} below 1",
                req.quantity
            )));
        }

        let required = required_funds(req.side, req.price, req.quantity);
        // A SELL at price 1.0000 reserves nothing; skip the zero lock.
        if required > Decimal::ZERO {
            self.ledger.lock_funds(user_id, required)?;
        }

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            market_id: req.market_id,
            side: req.side,
            price: req.price,
            quantity: req.quantity,
            filled_quantity: 0,
            state: OrderState::Pending,
            execution_price: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_order(order.clone());
        book.insert(BookEntry {
            order_id: order.id,
            user_id,
            side: order.side,
            price: order.price,
            remaining: order.quantity,
            created_at: order.created_at,
        });
        self.txn_log.record(
            user_id,
            TxnType::OrderPlaced,
            required,
            Some(order.id),
            Some("order placed"),
        );
        tracing::info!(
            order = %order.id,
            market = %order.market_id,
            user = %user_id,
            side = %order.side,
            price = %order.price,
            quantity = order.quantity,
            "order admitted"
        );

        self.run_matching_locked(&mut book, req.market_id);

        self.store
            .get_order(order.id)
            .ok_or_else(|| MatchingError::Internal(format!("admitted order {} missing", order.id)))
    }

    /// Administrative re-match trigger. Returns the number of matches
    /// executed.
    pub fn match_market(&self, market_id: Uuid) -> Result<u32, MatchingError> {
        self.store
            .get_market(market_id)
            .ok_or(MatchingError::MarketNotFound(market_id))?;

        let book = self.book(market_id);
        let mut book = book.lock();
        let market = self
            .store
            .get_market(market_id)
            .ok_or(MatchingError::MarketNotFound(market_id))?;
        if market.state != MarketState::Active {
            return Err(MatchingError::MarketNotTradable(market.id, market.state));
        }
        Ok(self.run_matching_locked(&mut book, market_id))
    }

    /// Cancel a live order, refunding the lock held for its unfilled
    /// remainder.
    pub fn cancel_order(&self, order_id: Uuid) -> Result<Order, MatchingError> {
        let order = self
            .store
            .get_order(order_id)
            .ok_or(MatchingError::OrderNotFound(order_id))?;

        let book = self.book(order.market_id);
        let mut book = book.lock();

        // Re-read under the market lock; a concurrent match may have
        // filled it meanwhile.
        let order = self
            .store
            .get_order(order_id)
            .ok_or(MatchingError::OrderNotFound(order_id))?;
        if !order.is_live() {
            return Err(MatchingError::NotCancellable(order_id, order.state));
        }

        let refund = required_funds(order.side, order.price, order.remaining());
        if refund > Decimal::ZERO {
            self.ledger.unlock_funds(order.user_id, refund).map_err(|e| {
                MatchingError::Internal(format!("cancel refund for {} failed: {}", order_id, e))
            })?;
        }
        self.txn_log.record(
            order.user_id,
            TxnType::OrderCancelled,
            refund,
            Some(order_id),
            Some("order cancelled"),
        );
        book.remove(order_id);
        let cancelled = self
            .store
            .update_order(order_id, |o| {
                o.state = OrderState::Cancelled;
                o.updated_at = Utc::now();
            })
            .ok_or_else(|| MatchingError::Internal(format!("order {} missing", order_id)))?;

        tracing::info!(order = %order_id, user = %order.user_id, %refund, "order cancelled");
        Ok(cancelled)
    }

    /// Aggregated view of a market's resting orders.
    pub fn book_snapshot(&self, market_id: Uuid) -> Result<BookSnapshot, MatchingError> {
        let market = self
            .store
            .get_market(market_id)
            .ok_or(MatchingError::MarketNotFound(market_id))?;
        let book = self.book(market_id);
        let book = book.lock();
        let (bids, asks) = book.snapshot_levels();
        Ok(BookSnapshot {
            market_id,
            bids,
            asks,
            last_price: market.last_price,
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    pub fn suspend_market(&self, market_id: Uuid) -> Result<Market, MatchingError> {
        self.transition_market(market_id, MarketState::Active, MarketState::Suspended)
    }

    pub fn resume_market(&self, market_id: Uuid) -> Result<Market, MatchingError> {
        self.transition_market(market_id, MarketState::Suspended, MarketState::Active)
    }

    fn transition_market(
        &self,
        market_id: Uuid,
        from: MarketState,
        to: MarketState,
    ) -> Result<Market, MatchingError> {
        self.store
            .get_market(market_id)
            .ok_or(MatchingError::MarketNotFound(market_id))?;
        let book = self.book(market_id);
        let _book = book.lock();
        let market = self
            .store
            .get_market(market_id)
            .ok_or(MatchingError::MarketNotFound(market_id))?;
        if market.state != from {
            return Err(MatchingError::IllegalMarketState(market_id, market.state));
        }
        let updated = self
            .store
            .update_market(market_id, |m| {
                m.state = to;
                m.updated_at = Utc::now();
            })
            .ok_or_else(|| MatchingError::Internal(format!("market {} missing", market_id)))?;
        tracing::info!(market = %market_id, state = %to, "market transitioned");
        Ok(updated)
    }

    /// Run the match loop while the top of book crosses. A failed match
    /// aborts the loop but keeps every previously applied match.
    fn run_matching_locked(&self, book: &mut MarketBook, market_id: Uuid) -> u32 {
        let mut executed = 0u32;
        loop {
            let (bid, ask) = match (book.best_bid(), book.best_ask()) {
                (Some(bid), Some(ask)) if bid.price >= ask.price => (bid.clone(), ask.clone()),
                _ => break,
            };
            match self.apply_match(book, market_id, &bid, &ask) {
                Ok(()) => executed += 1,
                Err(e) => {
                    tracing::error!(
                        market = %market_id,
                        buy = %bid.order_id,
                        sell = %ask.order_id,
                        error = %e,
                        "match aborted; prior matches kept"
                    );
                    break;
                }
            }
        }
        executed
    }

    /// Apply one match between the current top bid and top ask. The ledger
    /// commit validates both wallets before mutating anything, so an error
    /// here leaves every store untouched.
    fn apply_match(
        &self,
        book: &mut MarketBook,
        market_id: Uuid,
        bid: &BookEntry,
        ask: &BookEntry,
    ) -> Result<(), MatchingError> {
        let quantity = bid.remaining.min(ask.remaining);
        if quantity < 1 {
            return Err(MatchingError::Internal(format!(
                "zero-quantity match between {} and {}",
                bid.order_id, ask.order_id
            )));
        }
        // Maker-price rule: the older order sets the execution price.
        let exec_price = if bid.age_key() <= ask.age_key() {
            bid.price
        } else {
            ask.price
        };

        let qty = Decimal::from(quantity);
        let pay_buy = exec_price * qty;
        let pay_sell = (Decimal::ONE - exec_price) * qty;
        let refund_buy = (bid.price - exec_price) * qty;
        let refund_sell = (exec_price - ask.price) * qty;

        // Every locked unit of the filled slice is either consumed or
        // refunded; anything else means value was created or destroyed.
        let locked_slice = bid.price * qty + (Decimal::ONE - ask.price) * qty;
        if pay_buy + pay_sell + refund_buy + refund_sell != locked_slice {
            return Err(MatchingError::Internal(format!(
                "conservation violated: fill {} x {} between {} and {}",
                exec_price, quantity, bid.order_id, ask.order_id
            )));
        }

        self.ledger.commit_match(
            bid.user_id,
            pay_buy,
            refund_buy,
            ask.user_id,
            pay_sell,
            refund_sell,
        )?;

        // Ledger committed; the in-memory updates below cannot fail.
        book.reduce_top(OrderSide::Buy, quantity);
        book.reduce_top(OrderSide::Sell, quantity);

        let now = Utc::now();
        for order_id in [bid.order_id, ask.order_id] {
            self.store.update_order(order_id, |o| {
                o.filled_quantity += quantity;
                o.execution_price = Some(exec_price);
                o.state = if o.filled_quantity >= o.quantity {
                    OrderState::Filled
                } else {
                    OrderState::PartiallyFilled
                };
                o.updated_at = now;
            });
        }
        self.store.update_market(market_id, |m| {
            m.last_price = Some(exec_price);
            m.updated_at = now;
        });

        self.positions
            .add_shares(bid.user_id, market_id, Outcome::Yes, quantity, exec_price);
        self.positions.add_shares(
            ask.user_id,
            market_id,
            Outcome::No,
            quantity,
            Decimal::ONE - exec_price,
        );

        let notional = pay_buy;
        self.txn_log.record(
            bid.user_id,
            TxnType::OrderExecuted,
            notional,
            Some(bid.order_id),
            Some("order executed"),
        );
        self.txn_log.record(
            ask.user_id,
            TxnType::OrderExecuted,
            notional,
            Some(ask.order_id),
            Some("order executed"),
        );

        let _ = self.trade_tx.send(TradeEvent {
            market_id,
            buy_order_id: bid.order_id,
            sell_order_id: ask.order_id,
            buyer_id: bid.user_id,
            seller_id: ask.user_id,
            price: exec_price,
            quantity,
            timestamp: now.timestamp_millis(),
        });
        tracing::debug!(
            market = %market_id,
            price = %exec_price,
            quantity,
            buy = %bid.order_id,
            sell = %ask.order_id,
            "match executed"
        );
        Ok(())
    }
}
