use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exactly one wallet per user, created lazily on first reference.
/// `available` funds can be withdrawn or locked against new orders;
/// `locked` funds are reserved for open orders until consumed or released.
#[derive(Debug, Clone)]
pub struct Wallet {
    pub user_id: Uuid,
    pub available: Decimal,
    pub locked: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            available: Decimal::ZERO,
            locked: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total(&self) -> Decimal {
        self.available + self.locked
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub user_id: Uuid,
    pub available: Decimal,
    pub locked: Decimal,
    pub total: Decimal,
}

impl From<&Wallet> for WalletResponse {
    fn from(wallet: &Wallet) -> Self {
        Self {
            user_id: wallet.user_id,
            available: wallet.available,
            locked: wallet.locked,
            total: wallet.total(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub user_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub user_id: Uuid,
    pub amount: Decimal,
}
