use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::utils::time::datetime_ddmmyyyy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxnType {
    Deposit,
    Withdrawal,
    OrderPlaced,
    OrderExecuted,
    OrderCancelled,
    Settlement,
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxnType::Deposit => write!(f, "DEPOSIT"),
            TxnType::Withdrawal => write!(f, "WITHDRAWAL"),
            TxnType::OrderPlaced => write!(f, "ORDER_PLACED"),
            TxnType::OrderExecuted => write!(f, "ORDER_EXECUTED"),
            TxnType::OrderCancelled => write!(f, "ORDER_CANCELLED"),
            TxnType::Settlement => write!(f, "SETTLEMENT"),
        }
    }
}

/// One audit record of a monetary event. Records are append-only; `seq` is
/// a process-wide sequence consistent with the causal order of the
/// operations that produced them.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub txn_type: TxnType,
    pub amount: Decimal,
    pub order_id: Option<Uuid>,
    pub description: Option<String>,
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub txn_type: TxnType,
    pub amount: Decimal,
    pub order_id: Option<Uuid>,
    pub description: Option<String>,
    #[serde(serialize_with = "datetime_ddmmyyyy::serialize")]
    pub created_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionResponse {
    fn from(txn: &Transaction) -> Self {
        Self {
            id: txn.id,
            txn_type: txn.txn_type,
            amount: txn.amount,
            order_id: txn.order_id,
            description: txn.description.clone(),
            created_at: txn.created_at,
        }
    }
}
