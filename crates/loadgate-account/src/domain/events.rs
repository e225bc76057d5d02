//! Persisted account event payloads.
//!
//! Field names at the store boundary are pinned to the upper-camel casing
//! of the historical event format; changing them would orphan any
//! persisted stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loadgate_core::transaction::Transaction;

/// Aggregated transaction volume for one bucket (a civil day or an ISO
/// week).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TxnRecord {
    /// Number of accepted transactions in the bucket.
    #[serde(rename = "NumTxns")]
    pub num_txns: u32,
    /// Signed sum of accepted load amounts in the bucket.
    #[serde(rename = "TotalAmount")]
    pub total_amount: f64,
}

impl TxnRecord {
    /// Returns this record with one more transaction of `amount` applied.
    #[must_use]
    pub fn with_txn(self, amount: f64) -> Self {
        Self {
            num_txns: self.num_txns + 1,
            total_amount: self.total_amount + amount,
        }
    }
}

/// Snapshot of an account after one accepted transaction.
///
/// Payload of `AccountDeposited` and `AccountWithdrawn` events; replaying
/// these snapshots in order reconstructs the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    /// The accepted transaction's id.
    #[serde(rename = "TxnID")]
    pub txn_id: String,
    /// The customer the account belongs to.
    #[serde(rename = "CustID")]
    pub cust_id: String,
    /// The accepted transaction's instant.
    #[serde(rename = "TxnTime")]
    pub txn_time: DateTime<Utc>,
    /// Daily bucket including this transaction.
    #[serde(rename = "DailyTxn")]
    pub daily_txn: TxnRecord,
    /// Weekly bucket including this transaction.
    #[serde(rename = "WeeklyTxn")]
    pub weekly_txn: TxnRecord,
    /// Account balance after this transaction.
    #[serde(rename = "TotalAmount")]
    pub total_amount: f64,
}

/// Why a transaction was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCause {
    /// The transaction id was seen before on this account.
    DuplicateTxn,
    /// A daily count or amount limit was breached.
    DailyLimitsExceeded,
    /// A weekly count or amount limit was breached.
    WeeklyLimitsExceeded,
    /// The transaction would take the balance below zero.
    InsufficientFunds,
}

/// Payload of `DuplicateTxn` and `AccountLimitExceeded` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxnFailure {
    /// The rejected transaction.
    #[serde(rename = "Txn")]
    pub txn: Transaction,
    /// Human-readable rejection reason.
    #[serde(rename = "Error")]
    pub error: String,
    /// Machine-readable rejection cause.
    #[serde(rename = "FailureCause")]
    pub failure_cause: FailureCause,
}
