//! Market book.
//!
//! Two price-ordered sides over the live orders of one market: bids are
//! consumed highest-price-first, asks lowest-price-first, FIFO within a
//! level. The book is owned by the market's mutex in the engine, so it
//! needs no interior locking; every committed state change is reflected
//! here before the next matching attempt runs.

use std::collections::{BTreeMap, HashMap, VecDeque};

use uuid::Uuid;

use super::types::{BookEntry, PriceLevel};
use crate::models::OrderSide;

pub struct MarketBook {
    market_id: Uuid,

    /// Bids keyed by price level; best bid is the highest key.
    bids: BTreeMap<PriceLevel, VecDeque<BookEntry>>,

    /// Asks keyed by price level; best ask is the lowest key.
    asks: BTreeMap<PriceLevel, VecDeque<BookEntry>>,

    /// Order id to (side, price level) for O(1) removal.
    order_index: HashMap<Uuid, (OrderSide, PriceLevel)>,
}

impl MarketBook {
    pub fn new(market_id: Uuid) -> Self {
        Self {
            market_id,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_index: HashMap::new(),
        }
    }

    pub fn market_id(&self) -> Uuid {
        self.market_id
    }

    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    fn side_mut(&mut self, side: OrderSide) -> &mut BTreeMap<PriceLevel, VecDeque<BookEntry>> {
        match side {
            OrderSide::Buy => &mut self.bids,
            OrderSide::Sell => &mut self.asks,
        }
    }

    /// Add a live order to its side. Orders arrive in creation order, so
    /// pushing to the back keeps FIFO time priority within a level.
    pub fn insert(&mut self, entry: BookEntry) {
        let level = PriceLevel::from_decimal(entry.price);
        let side = entry.side;
        let order_id = entry.order_id;

        self.side_mut(side)
            .entry(level)
            .or_insert_with(VecDeque::new)
            .push_back(entry);
        self.order_index.insert(order_id, (side, level));
    }

    /// Remove an order by id, returning its entry if it was resting.
    pub fn remove(&mut self, order_id: Uuid) -> Option<BookEntry> {
        let (side, level) = self.order_index.remove(&order_id)?;
        let book_side = self.side_mut(side);
        let queue = book_side.get_mut(&level)?;
        let pos = queue.iter().position(|e| e.order_id == order_id)?;
        let entry = queue.remove(pos);
        if queue.is_empty() {
            book_side.remove(&level);
        }
        entry
    }

    /// Best (highest-priced, oldest) bid.
    pub fn best_bid(&self) -> Option<&BookEntry> {
        self.bids.iter().next_back().and_then(|(_, q)| q.front())
    }

    /// Best (lowest-priced, oldest) ask.
    pub fn best_ask(&self) -> Option<&BookEntry> {
        self.asks.iter().next().and_then(|(_, q)| q.front())
    }

    /// Reduce the top entry of a side by a fill quantity, dropping the
    /// entry (and empty level) once fully consumed.
    pub fn reduce_top(&mut self, side: OrderSide, quantity: i64) {
        let book_side = match side {
            OrderSide::Buy => &mut self.bids,
            OrderSide::Sell => &mut self.asks,
        };
        let top = match side {
            OrderSide::Buy => book_side.iter_mut().next_back(),
            OrderSide::Sell => book_side.iter_mut().next(),
        };
        let (level, queue) = match top {
            Some(top) => top,
            None => return,
        };
        let entry = match queue.front_mut() {
            Some(entry) => entry,
            None => return,
        };
        entry.remaining -= quantity;
        if entry.remaining > 0 {
            return;
        }
        let done_id = entry.order_id;
        queue.pop_front();
        let level = *level;
        if queue.is_empty() {
            book_side.remove(&level);
        }
        self.order_index.remove(&done_id);
    }

    pub fn contains(&self, order_id: &Uuid) -> bool {
        self.order_index.contains_key(order_id)
    }

    /// All resting entries, used by the settlement cancel sweep.
    pub fn live_entries(&self) -> Vec<BookEntry> {
        self.bids
            .values()
            .chain(self.asks.values())
            .flat_map(|q| q.iter().cloned())
            .collect()
    }

    /// Aggregate quantity per level: bids best-first, asks best-first.
    pub fn snapshot_levels(&self) -> (Vec<[String; 2]>, Vec<[String; 2]>) {
        let bids = self
            .bids
            .iter()
            .rev()
            .map(|(level, orders)| {
                let total: i64 = orders.iter().map(|e| e.remaining).sum();
                [level.to_decimal().to_string(), total.to_string()]
            })
            .collect();
        let asks = self
            .asks
            .iter()
            .map(|(level, orders)| {
                let total: i64 = orders.iter().map(|e| e.remaining).sum();
                [level.to_decimal().to_string(), total.to_string()]
            })
            .collect();
        (bids, asks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn entry(price: Decimal, remaining: i64, side: OrderSide) -> BookEntry {
        BookEntry {
            order_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            side,
            price,
            remaining,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_remove() {
        let mut book = MarketBook::new(Uuid::new_v4());
        let bid = entry(dec!(0.60), 100, OrderSide::Buy);
        let bid_id = bid.order_id;

        book.insert(bid);
        assert_eq!(book.order_count(), 1);
        assert!(book.contains(&bid_id));

        let removed = book.remove(bid_id);
        assert!(removed.is_some());
        assert_eq!(book.order_count(), 0);
        assert!(book.best_bid().is_none());
    }

    #[test]
    fn test_best_bid_and_ask() {
        let mut book = MarketBook::new(Uuid::new_v4());
        book.insert(entry(dec!(0.58), 10, OrderSide::Buy));
        book.insert(entry(dec!(0.61), 10, OrderSide::Buy));
        book.insert(entry(dec!(0.65), 10, OrderSide::Sell));
        book.insert(entry(dec!(0.63), 10, OrderSide::Sell));

        assert_eq!(book.best_bid().unwrap().price, dec!(0.61));
        assert_eq!(book.best_ask().unwrap().price, dec!(0.63));
    }

    #[test]
    fn test_fifo_within_price_level() {
        let mut book = MarketBook::new(Uuid::new_v4());
        let first = entry(dec!(0.50), 5, OrderSide::Buy);
        let second = entry(dec!(0.50), 7, OrderSide::Buy);
        let first_id = first.order_id;
        book.insert(first);
        book.insert(second);

        assert_eq!(book.best_bid().unwrap().order_id, first_id);
        book.reduce_top(OrderSide::Buy, 5);
        assert!(!book.contains(&first_id));
        assert_eq!(book.best_bid().unwrap().remaining, 7);
    }

    #[test]
    fn test_reduce_top_partial() {
        let mut book = MarketBook::new(Uuid::new_v4());
        book.insert(entry(dec!(0.40), 100, OrderSide::Sell));
        book.reduce_top(OrderSide::Sell, 30);

        let top = book.best_ask().unwrap();
        assert_eq!(top.remaining, 70);
        assert_eq!(book.order_count(), 1);
    }

    #[test]
    fn test_snapshot_aggregates_levels() {
        let mut book = MarketBook::new(Uuid::new_v4());
        book.insert(entry(dec!(0.60), 10, OrderSide::Buy));
        book.insert(entry(dec!(0.60), 20, OrderSide::Buy));
        book.insert(entry(dec!(0.55), 5, OrderSide::Buy));
        book.insert(entry(dec!(0.70), 15, OrderSide::Sell));

        let (bids, asks) = book.snapshot_levels();
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0], ["0.6000".to_string(), "30".to_string()]);
        assert_eq!(bids[1], ["0.5500".to_string(), "5".to_string()]);
        assert_eq!(asks, vec![["0.7000".to_string(), "15".to_string()]]);
    }
}
