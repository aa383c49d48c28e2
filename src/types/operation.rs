//! Operation-log types for the Rust Streaming Engine
//!
//! The engine is driven by an operation log: each record names an operation,
//! the instant it happens at, the calling account, and the operation's
//! arguments. Every record carries an explicit time so the engine never reads
//! a wall clock; status and amounts are pure functions of the supplied
//! instant.

use crate::types::stream::{AccountId, AssetId, Segment, StreamId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Operations accepted by the streaming engine pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Credit the ledger balance of an account (seeding; not an engine
    /// operation)
    Fund,

    /// Create a stream from the calling account to a recipient
    Create,

    /// Pay out part of a stream's withdrawable balance
    Withdraw,

    /// Pay out the entire withdrawable balance
    WithdrawMax,

    /// Cancel a stream and refund the unstreamed remainder to the sender
    Cancel,

    /// Irrevocably make a stream non-cancelable
    Renounce,

    /// Destroy the claim of a depleted stream
    Burn,
}

/// A single parsed operation-log record
///
/// Fields other than `op`, `time`, and `account` are optional because each
/// operation uses a different subset; the conversion layer validates that the
/// required fields for the given operation are present.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRecord {
    /// The operation to perform
    pub op: OperationType,

    /// The instant at which the operation happens
    pub time: Timestamp,

    /// Target stream (absent for fund and create)
    pub stream: Option<StreamId>,

    /// The calling account (funder for fund, sender for create)
    pub account: AccountId,

    /// Counterparty: the recipient for create, the destination for
    /// withdraw/withdraw_max
    pub to: Option<AccountId>,

    /// Asset (fund and create only)
    pub asset: Option<AssetId>,

    /// Amount (fund, create, withdraw)
    pub amount: Option<Decimal>,

    /// Stream start time (create only)
    pub start_time: Option<Timestamp>,

    /// Whether the stream is cancelable (create only)
    pub cancelable: Option<bool>,

    /// Resolved unlock schedule (create only)
    pub segments: Option<Vec<Segment>>,
}
