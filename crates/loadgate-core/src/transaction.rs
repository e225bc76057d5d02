//! The account transaction value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single validated account transaction.
///
/// `load_amount` carries the direction in its sign: negative amounts are
/// withdrawals, everything else is a deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier from the originating request.
    pub id: String,
    /// Customer the transaction belongs to.
    pub customer_id: String,
    /// Signed amount being loaded onto the account.
    pub load_amount: f64,
    /// Instant the transaction was requested for.
    pub time: DateTime<Utc>,
}
