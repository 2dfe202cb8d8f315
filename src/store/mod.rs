//! In-memory entity store.
//!
//! Authoritative state for users, events, markets and orders, keyed by id
//! in concurrent maps. Mutations of a single entity are atomic; anything
//! that must be serialized against matching goes through the per-market
//! lock owned by the matching engine, not through this store.

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{Event, Market, Order, User};

#[derive(Default)]
pub struct EntityStore {
    users: DashMap<Uuid, User>,
    usernames: DashMap<String, Uuid>,
    events: DashMap<Uuid, Event>,
    markets: DashMap<Uuid, Market>,
    orders: DashMap<Uuid, Order>,
    orders_by_user: DashMap<Uuid, Vec<Uuid>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user; returns false when the username is already taken.
    pub fn insert_user(&self, user: User) -> bool {
        match self.usernames.entry(user.username.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user);
                true
            }
        }
    }

    pub fn user_exists(&self, user_id: Uuid) -> bool {
        self.users.contains_key(&user_id)
    }

    pub fn get_user(&self, user_id: Uuid) -> Option<User> {
        self.users.get(&user_id).map(|u| u.clone())
    }

    pub fn find_user_by_username(&self, username: &str) -> Option<User> {
        let id = *self.usernames.get(username)?;
        self.get_user(id)
    }

    pub fn insert_event(&self, event: Event) {
        self.events.insert(event.id, event);
    }

    pub fn get_event(&self, event_id: Uuid) -> Option<Event> {
        self.events.get(&event_id).map(|e| e.clone())
    }

    pub fn list_events(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.events.iter().map(|e| e.clone()).collect();
        events.sort_by_key(|e| e.created_at);
        events
    }

    pub fn insert_market(&self, market: Market) {
        self.markets.insert(market.id, market);
    }

    pub fn get_market(&self, market_id: Uuid) -> Option<Market> {
        self.markets.get(&market_id).map(|m| m.clone())
    }

    pub fn list_markets(&self) -> Vec<Market> {
        let mut markets: Vec<Market> = self.markets.iter().map(|m| m.clone()).collect();
        markets.sort_by_key(|m| m.created_at);
        markets
    }

    /// Apply a mutation to a market; returns the updated market, or None
    /// when it does not exist.
    pub fn update_market<F>(&self, market_id: Uuid, mutate: F) -> Option<Market>
    where
        F: FnOnce(&mut Market),
    {
        let mut market = self.markets.get_mut(&market_id)?;
        mutate(market.value_mut());
        Some(market.clone())
    }

    pub fn insert_order(&self, order: Order) {
        self.orders_by_user
            .entry(order.user_id)
            .or_default()
            .push(order.id);
        self.orders.insert(order.id, order);
    }

    pub fn get_order(&self, order_id: Uuid) -> Option<Order> {
        self.orders.get(&order_id).map(|o| o.clone())
    }

    /// Apply a mutation to an order; returns the updated order, or None
    /// when it does not exist.
    pub fn update_order<F>(&self, order_id: Uuid, mutate: F) -> Option<Order>
    where
        F: FnOnce(&mut Order),
    {
        let mut order = self.orders.get_mut(&order_id)?;
        mutate(order.value_mut());
        Some(order.clone())
    }

    pub fn orders_for_user(&self, user_id: Uuid) -> Vec<Order> {
        let ids = match self.orders_by_user.get(&user_id) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };
        ids.iter().filter_map(|id| self.get_order(*id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_user(username: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: String::new(),
            password_salt: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_username_uniqueness() {
        let store = EntityStore::new();
        assert!(store.insert_user(test_user("alice")));
        assert!(!store.insert_user(test_user("alice")));
        assert!(store.insert_user(test_user("bob")));
        assert!(store.find_user_by_username("alice").is_some());
    }

    #[test]
    fn test_market_update() {
        let store = EntityStore::new();
        let event = Event::new("event".into(), String::new());
        let market = Market::new(event.id, "outcome".into());
        let market_id = market.id;
        store.insert_event(event);
        store.insert_market(market);

        let updated = store
            .update_market(market_id, |m| {
                m.state = crate::models::MarketState::Suspended;
            })
            .unwrap();
        assert_eq!(updated.state, crate::models::MarketState::Suspended);
        assert!(store.update_market(Uuid::new_v4(), |_| {}).is_none());
    }
}
