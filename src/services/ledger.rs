//! Wallet ledger.
//!
//! Holds every user's available/locked balances and applies all monetary
//! mutations. Each wallet sits behind its own mutex; a single-wallet
//! operation locks exactly one wallet. The two-wallet commit used by the
//! matcher acquires both mutexes in ascending user-id order so concurrent
//! matches can never deadlock, validates every debit against the guards,
//! and only then mutates.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{TxnType, Wallet};
use crate::services::txn_log::TxnLog;
use crate::utils::decimal::fits_money_scale;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("insufficient locked funds: required {required}, locked {locked}")]
    InsufficientLocked { required: Decimal, locked: Decimal },
}

pub struct Ledger {
    wallets: DashMap<Uuid, Arc<Mutex<Wallet>>>,
    txn_log: Arc<TxnLog>,
}

impl Ledger {
    pub fn new(txn_log: Arc<TxnLog>) -> Self {
        Self {
            wallets: DashMap::new(),
            txn_log,
        }
    }

    /// Wallets are created lazily on first reference, with zero balances.
    fn wallet(&self, user_id: Uuid) -> Arc<Mutex<Wallet>> {
        self.wallets
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(Wallet::new(user_id))))
            .clone()
    }

    pub fn balance(&self, user_id: Uuid) -> Wallet {
        self.wallet(user_id).lock().clone()
    }

    fn check_amount(amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO || !fits_money_scale(amount) {
            return Err(LedgerError::InvalidAmount(amount));
        }
        Ok(())
    }

    pub fn deposit(&self, user_id: Uuid, amount: Decimal) -> Result<Wallet, LedgerError> {
        Self::check_amount(amount)?;
        let wallet = self.wallet(user_id);
        let snapshot = {
            let mut w = wallet.lock();
            w.available += amount;
            w.updated_at = Utc::now();
            w.clone()
        };
        self.txn_log
            .record(user_id, TxnType::Deposit, amount, None, None);
        tracing::info!(user = %user_id, %amount, "deposit");
        Ok(snapshot)
    }

    pub fn withdraw(&self, user_id: Uuid, amount: Decimal) -> Result<Wallet, LedgerError> {
        Self::check_amount(amount)?;
        let wallet = self.wallet(user_id);
        let snapshot = {
            let mut w = wallet.lock();
            if w.available < amount {
                return Err(LedgerError::InsufficientFunds {
                    required: amount,
                    available: w.available,
                });
            }
            w.available -= amount;
            w.updated_at = Utc::now();
            w.clone()
        };
        self.txn_log
            .record(user_id, TxnType::Withdrawal, amount, None, None);
        tracing::info!(user = %user_id, %amount, "withdrawal");
        Ok(snapshot)
    }

    /// Reserve available funds against an open order. No audit record; the
    /// caller emits ORDER_PLACED for the whole placement.
    pub fn lock_funds(&self, user_id: Uuid, amount: Decimal) -> Result<(), LedgerError> {
        Self::check_amount(amount)?;
        let wallet = self.wallet(user_id);
        let mut w = wallet.lock();
        if w.available < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: w.available,
            });
        }
        w.available -= amount;
        w.locked += amount;
        w.updated_at = Utc::now();
        Ok(())
    }

    /// Release reserved funds back to available. No audit record; the
    /// caller emits ORDER_CANCELLED when appropriate.
    pub fn unlock_funds(&self, user_id: Uuid, amount: Decimal) -> Result<(), LedgerError> {
        Self::check_amount(amount)?;
        let wallet = self.wallet(user_id);
        let mut w = wallet.lock();
        if w.locked < amount {
            return Err(LedgerError::InsufficientLocked {
                required: amount,
                locked: w.locked,
            });
        }
        w.locked -= amount;
        w.available += amount;
        w.updated_at = Utc::now();
        Ok(())
    }

    /// Spend reserved funds; they leave the wallet entirely. The caller
    /// emits ORDER_EXECUTED.
    pub fn consume_locked(&self, user_id: Uuid, amount: Decimal) -> Result<(), LedgerError> {
        Self::check_amount(amount)?;
        let wallet = self.wallet(user_id);
        let mut w = wallet.lock();
        if w.locked < amount {
            return Err(LedgerError::InsufficientLocked {
                required: amount,
                locked: w.locked,
            });
        }
        w.locked -= amount;
        w.updated_at = Utc::now();
        Ok(())
    }

    /// Pay out directly to available funds. The caller emits SETTLEMENT.
    pub fn credit(&self, user_id: Uuid, amount: Decimal) -> Result<Wallet, LedgerError> {
        Self::check_amount(amount)?;
        let wallet = self.wallet(user_id);
        let mut w = wallet.lock();
        w.available += amount;
        w.updated_at = Utc::now();
        Ok(w.clone())
    }

    /// Apply one match to both wallets as a unit: each side's consumed
    /// payment plus price-improvement refund is debited from locked funds,
    /// with the refund returned to available. Nothing is mutated unless
    /// both sides can cover their slice, so a failed match leaves the
    /// ledger untouched.
    pub fn commit_match(
        &self,
        buyer_id: Uuid,
        pay_buy: Decimal,
        refund_buy: Decimal,
        seller_id: Uuid,
        pay_sell: Decimal,
        refund_sell: Decimal,
    ) -> Result<(), LedgerError> {
        for amount in [pay_buy, refund_buy, pay_sell, refund_sell] {
            if amount < Decimal::ZERO || !fits_money_scale(amount) {
                return Err(LedgerError::InvalidAmount(amount));
            }
        }

        let now = Utc::now();

        // Self-cross: one wallet carries both legs.
        if buyer_id == seller_id {
            let wallet = self.wallet(buyer_id);
            let mut w = wallet.lock();
            let needed = pay_buy + refund_buy + pay_sell + refund_sell;
            if w.locked < needed {
                return Err(LedgerError::InsufficientLocked {
                    required: needed,
                    locked: w.locked,
                });
            }
            w.locked -= needed;
            w.available += refund_buy + refund_sell;
            w.updated_at = now;
            return Ok(());
        }

        let (first_id, second_id) = if buyer_id < seller_id {
            (buyer_id, seller_id)
        } else {
            (seller_id, buyer_id)
        };
        let first = self.wallet(first_id);
        let second = self.wallet(second_id);
        let mut first_guard = first.lock();
        let mut second_guard = second.lock();
        let (buy, sell) = if first_id == buyer_id {
            (&mut *first_guard, &mut *second_guard)
        } else {
            (&mut *second_guard, &mut *first_guard)
        };

        let buy_needed = pay_buy + refund_buy;
        let sell_needed = pay_sell + refund_sell;
        if buy.locked < buy_needed {
            return Err(LedgerError::InsufficientLocked {
                required: buy_needed,
                locked: buy.locked,
            });
        }
        if sell.locked < sell_needed {
            return Err(LedgerError::InsufficientLocked {
                required: sell_needed,
                locked: sell.locked,
            });
        }

        buy.locked -= buy_needed;
        buy.available += refund_buy;
        buy.updated_at = now;
        sell.locked -= sell_needed;
        sell.available += refund_sell;
        sell.updated_at = now;
        Ok(())
    }
}
