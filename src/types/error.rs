//! Error types for the Rust Streaming Engine
//!
//! This module defines all error types that can occur while operating on
//! streams. Errors are designed to be descriptive and user-friendly for CLI
//! output.
//!
//! # Error Categories
//!
//! - **Validation Errors**: malformed schedules, zero amounts, null accounts,
//!   mismatched batch lengths; rejected before any state changes.
//! - **Authorization Errors**: the caller lacks the required relationship to
//!   the stream; rejected before any state changes.
//! - **State Errors**: the operation is illegal for the stream's current
//!   status; the error carries the status that blocked it.
//! - **Bound/Overflow Errors**: schedule arithmetic that would exceed the
//!   numeric range or the configured segment-count bound.
//! - **Collaborator Failures**: a ledger transfer failed; the whole operation
//!   is aborted and accounting is left unchanged.
//! - **File I/O and CSV Errors**: surfaced by the operation-log pipeline.

use crate::types::stream::{AccountId, StreamId, StreamStatus, Timestamp};
use rust_decimal::Decimal;
use thiserror::Error;

/// Transfer failure reported by a ledger implementation
///
/// Ledger failures propagate as the whole engine operation failing; nothing
/// is retried internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// The source account does not hold enough of the asset
    #[error("Insufficient balance for account {account}: asset {asset}, held {held}, requested {requested}")]
    InsufficientBalance {
        /// Account being debited
        account: AccountId,
        /// Asset being moved
        asset: String,
        /// Balance actually held
        held: Decimal,
        /// Amount requested
        requested: Decimal,
    },

    /// Balance arithmetic would overflow
    #[error("Balance overflow for account {account}: asset {asset}")]
    BalanceOverflow {
        /// Account being credited
        account: AccountId,
        /// Asset being moved
        asset: String,
    },
}

/// Main error type for the streaming engine
///
/// This enum represents all possible errors that can occur while creating or
/// operating on streams. Each variant includes relevant context to help
/// diagnose and resolve the issue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    /// File not found at the specified path
    ///
    /// This is a fatal error that prevents processing from starting.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// This is a recoverable error - the malformed record is skipped and
    /// processing continues with the next record.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// No stream exists with the given id
    #[error("Stream {id} not found")]
    StreamNotFound {
        /// The unknown stream id
        id: StreamId,
    },

    /// The deposit amount resolved to zero
    #[error("Deposit amount must be greater than zero")]
    DepositAmountZero,

    /// A required account was the null account
    #[error("The {role} account must not be the null account")]
    NullAccount {
        /// Which account was null (e.g. "recipient", "withdrawal destination")
        role: String,
    },

    /// The schedule has no segments
    #[error("Segment list is empty")]
    SegmentCountZero,

    /// The schedule has more segments than the evaluation loop bound allows
    #[error("Too many segments: {count} exceeds the maximum of {max}")]
    SegmentCountTooHigh {
        /// Number of segments supplied
        count: usize,
        /// Configured maximum
        max: usize,
    },

    /// Segment milestones are not strictly increasing
    ///
    /// When a zero-length duration causes the collision, both reported
    /// milestones are equal.
    #[error("Segment {index} milestone {current} is not strictly after the previous milestone {previous}")]
    SegmentMilestonesNotOrdered {
        /// Index of the offending segment
        index: usize,
        /// Milestone of the preceding segment
        previous: Timestamp,
        /// Milestone of the offending segment
        current: Timestamp,
    },

    /// The start time does not precede the first segment milestone
    #[error("Start time {start_time} must be strictly before the first segment milestone {first_milestone}")]
    StartTimeNotBeforeFirstMilestone {
        /// The stream's start time
        start_time: Timestamp,
        /// The first segment's milestone
        first_milestone: Timestamp,
    },

    /// A segment exponent exceeds the configured maximum
    #[error("Segment {index} exponent {exponent} exceeds the maximum of {max}")]
    SegmentExponentTooHigh {
        /// Index of the offending segment
        index: usize,
        /// The supplied exponent
        exponent: Decimal,
        /// Configured maximum
        max: Decimal,
    },

    /// A segment exponent is negative
    #[error("Segment {index} exponent {exponent} is negative")]
    SegmentExponentNegative {
        /// Index of the offending segment
        index: usize,
        /// The supplied exponent
        exponent: Decimal,
    },

    /// A segment amount is negative
    #[error("Segment {index} amount {amount} is negative")]
    SegmentAmountNegative {
        /// Index of the offending segment
        index: usize,
        /// The supplied amount
        amount: Decimal,
    },

    /// Accumulating segment durations overflowed the timestamp range
    #[error("Milestone calculation overflowed at segment {index}")]
    MilestoneOverflow {
        /// Index of the segment whose milestone could not be computed
        index: usize,
    },

    /// Summing the segment amounts overflowed
    #[error("Segment amounts sum overflowed")]
    SegmentAmountsSumOverflow,

    /// The segment amounts do not sum to the net deposit
    #[error("Segment amounts sum {actual} does not equal the net deposit {expected}")]
    SegmentAmountsSumMismatch {
        /// The net deposit (total minus fees)
        expected: Decimal,
        /// The actual segment sum
        actual: Decimal,
    },

    /// A fee fraction is outside the accepted range
    #[error("Fee rate {rate} is outside the accepted range [0, {max}]")]
    FeeRateOutOfRange {
        /// The offending rate
        rate: Decimal,
        /// Maximum accepted fraction
        max: Decimal,
    },

    /// The stream is in a terminal, no-longer-cancelable status
    #[error("Stream {id} is cold ({status}); no cancellation or renouncement is possible")]
    StreamCold {
        /// The stream id
        id: StreamId,
        /// The terminal status that blocked the operation
        status: StreamStatus,
    },

    /// Withdrawal attempted before the stream started
    #[error("Stream {id} is pending; nothing can be withdrawn yet")]
    StreamPending {
        /// The stream id
        id: StreamId,
    },

    /// Operation attempted on a fully paid-out stream
    #[error("Stream {id} is depleted")]
    StreamDepleted {
        /// The stream id
        id: StreamId,
    },

    /// Cancel attempted on a non-cancelable stream
    #[error("Stream {id} is not cancelable")]
    StreamNotCancelable {
        /// The stream id
        id: StreamId,
    },

    /// Renounce attempted on an already non-cancelable stream
    #[error("Stream {id} is already non-cancelable")]
    StreamAlreadyNonCancelable {
        /// The stream id
        id: StreamId,
    },

    /// Burn attempted on a stream that is not depleted
    #[error("Stream {id} is not depleted ({status}); its claim cannot be burned")]
    StreamNotDepleted {
        /// The stream id
        id: StreamId,
        /// The stream's actual status
        status: StreamStatus,
    },

    /// The caller lacks the required relationship to the stream
    #[error("Account {caller} is not authorized to perform {operation} on stream {id}")]
    Unauthorized {
        /// The calling account
        caller: AccountId,
        /// The stream id
        id: StreamId,
        /// The attempted operation
        operation: String,
    },

    /// A sender-initiated withdrawal targeted an account other than the
    /// recipient
    #[error("Sender withdrawal on stream {id} must pay the recipient {recipient}, not account {to}")]
    WithdrawalDestinationNotRecipient {
        /// The stream id
        id: StreamId,
        /// The attempted destination
        to: AccountId,
        /// The current claim owner
        recipient: AccountId,
    },

    /// Withdrawal of a zero amount
    #[error("Cannot withdraw a zero amount from stream {id}")]
    WithdrawAmountZero {
        /// The stream id
        id: StreamId,
    },

    /// Withdrawal amount exceeds what the schedule has made available
    #[error("Overdraw on stream {id}: requested {requested}, withdrawable {withdrawable}")]
    Overdraw {
        /// The stream id
        id: StreamId,
        /// Amount requested
        requested: Decimal,
        /// Amount currently withdrawable
        withdrawable: Decimal,
    },

    /// Batch id and amount arrays differ in length
    #[error("Batch length mismatch: {ids} stream ids but {amounts} amounts")]
    BatchLengthMismatch {
        /// Number of stream ids supplied
        ids: usize,
        /// Number of amounts supplied
        amounts: usize,
    },

    /// Amount arithmetic overflowed
    #[error("Arithmetic overflow in {operation} for stream {id}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// The stream id
        id: StreamId,
    },

    /// A ledger transfer failed; the operation was aborted with accounting
    /// unchanged
    #[error("Transfer failed: {0}")]
    Transfer(#[from] LedgerError),

    /// The registry rejected a claim operation
    #[error("Claim registry error for stream {id}: {message}")]
    Registry {
        /// The stream id
        id: StreamId,
        /// Description of the registry failure
        message: String,
    },
}

// Conversion from io::Error to StreamError
impl From<std::io::Error> for StreamError {
    fn from(error: std::io::Error) -> Self {
        StreamError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to StreamError
impl From<csv::Error> for StreamError {
    fn from(error: csv::Error) -> Self {
        // Extract line number if available
        let line = error.position().map(|pos| pos.line());

        StreamError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl StreamError {
    /// Create a StreamNotFound error
    pub fn stream_not_found(id: StreamId) -> Self {
        StreamError::StreamNotFound { id }
    }

    /// Create a NullAccount error
    pub fn null_account(role: &str) -> Self {
        StreamError::NullAccount {
            role: role.to_string(),
        }
    }

    /// Create a StreamCold error
    pub fn stream_cold(id: StreamId, status: StreamStatus) -> Self {
        StreamError::StreamCold { id, status }
    }

    /// Create an Unauthorized error
    pub fn unauthorized(caller: AccountId, id: StreamId, operation: &str) -> Self {
        StreamError::Unauthorized {
            caller,
            id,
            operation: operation.to_string(),
        }
    }

    /// Create an Overdraw error
    pub fn overdraw(id: StreamId, requested: Decimal, withdrawable: Decimal) -> Self {
        StreamError::Overdraw {
            id,
            requested,
            withdrawable,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, id: StreamId) -> Self {
        StreamError::ArithmeticOverflow {
            operation: operation.to_string(),
            id,
        }
    }

    /// Create a Registry error
    pub fn registry(id: StreamId, message: &str) -> Self {
        StreamError::Registry {
            id,
            message: message.to_string(),
        }
    }
}
