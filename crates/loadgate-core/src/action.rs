//! Command and event action tags.
//!
//! Actions identify message topics on the bus. The string form of each
//! variant is the canonical tag used for topic routing and logging.

use serde::{Deserialize, Serialize};

/// Action tag carried by every [`Command`](crate::command::Command).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmdAction {
    /// Validate a raw load request and create a transaction.
    CreateTxn,
    /// Run a created transaction through the account state machine.
    ProcessTxn,
    /// Assemble the final report.
    CreateReport,
    /// Write serialized report data to the output sink.
    WriteData,
}

impl CmdAction {
    /// Returns the canonical string tag used as the bus topic.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateTxn => "CreateTxn",
            Self::ProcessTxn => "ProcessTxn",
            Self::CreateReport => "CreateReport",
            Self::WriteData => "WriteData",
        }
    }
}

impl std::fmt::Display for CmdAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action tag carried by every [`Event`](crate::event::Event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventAction {
    /// A raw request line was read from the input source.
    TxnRead,
    /// A load request passed validation and became a transaction.
    TxnCreated,
    /// A load request failed validation.
    TxnCreateFailed,
    /// A transaction was accepted as a deposit.
    AccountDeposited,
    /// A transaction was accepted as a withdrawal.
    AccountWithdrawn,
    /// A transaction breached a daily or weekly limit.
    AccountLimitExceeded,
    /// A transaction id was seen before on the account.
    DuplicateTxn,
    /// The report was flushed to the output sink.
    DataWritten,
}

impl EventAction {
    /// Returns the canonical string tag used as the bus topic.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TxnRead => "TxnRead",
            Self::TxnCreated => "TxnCreated",
            Self::TxnCreateFailed => "TxnCreateFailed",
            Self::AccountDeposited => "AccountDeposited",
            Self::AccountWithdrawn => "AccountWithdrawn",
            Self::AccountLimitExceeded => "AccountLimitExceeded",
            Self::DuplicateTxn => "DuplicateTxn",
            Self::DataWritten => "DataWritten",
        }
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
