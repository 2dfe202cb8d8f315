//! Append-only transaction log.
//!
//! Every monetary event produces exactly one record per affected wallet.
//! Records are never updated or deleted; `seq` is allocated from a global
//! counter inside the causal operation, so a single wallet's records read
//! back in causal order.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Transaction, TxnType};

#[derive(Default)]
pub struct TxnLog {
    entries: DashMap<Uuid, Vec<Transaction>>,
    seq: AtomicU64,
}

impl TxnLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        user_id: Uuid,
        txn_type: TxnType,
        amount: Decimal,
        order_id: Option<Uuid>,
        description: Option<&str>,
    ) -> Transaction {
        let txn = Transaction {
            id: Uuid::new_v4(),
            user_id,
            txn_type,
            amount,
            order_id,
            description: description.map(|d| d.to_string()),
            seq: self.seq.fetch_add(1, Ordering::SeqCst),
            created_at: Utc::now(),
        };
        self.entries.entry(user_id).or_default().push(txn.clone());
        txn
    }

    /// All records for one wallet, oldest first.
    pub fn for_user(&self, user_id: Uuid) -> Vec<Transaction> {
        let mut txns = self
            .entries
            .get(&user_id)
            .map(|e| e.clone())
            .unwrap_or_default();
        txns.sort_by_key(|t| t.seq);
        txns
    }

    pub fn total_recorded(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }
}
