//! Rust Streaming Engine Library
//! # Overview
//!
//! This library implements programmable token-streaming ("vesting")
//! accounts: a payer deposits an asset amount that unlocks to a recipient
//! continuously or in curved steps over time, with optional cancellation,
//! multi-party withdrawal authorization, and protocol fee accrual. An
//! operation-log CSV pipeline drives the engine with a sync and an async
//! strategy.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Stream, Segment, OperationRecord, etc.)
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::curve`] - Dynamic schedule validation and evaluation
//!   - [`core::status`] - Derived lifecycle status and operation gates
//!   - [`core::accounting`] - Withdrawable / refundable amount math
//!   - [`core::engine`] - Stream orchestration (create, withdraw, cancel,
//!     renounce, burn)
//!   - [`core::fees`] - Protocol fee accrual
//! - [`io`] - Operation-log parsing and stream-state output
//! - [`strategy`] - Sync and async processing pipelines
//!
//! # Stream Lifecycle
//!
//! A stream's status is always derived, never stored:
//!
//! - **Pending**: before the start time; nothing unlocked
//! - **Streaming**: unlocking along the segment curve
//! - **Settled**: the schedule ran out; the whole deposit is unlockable
//! - **Canceled**: terminal; the unlocked amount is frozen at cancellation
//! - **Depleted**: everything ever withdrawable has been withdrawn
//!
//! # Collaborators
//!
//! Value transfer, claim ownership, and fee rates live behind the
//! [`core::traits::Ledger`], [`core::traits::ClaimRegistry`], and
//! [`core::traits::FeeOracle`] traits; thread-safe in-memory
//! implementations back both engines.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use crate::core::{InMemoryLedger, InMemoryLockupEngine, InMemoryRegistry, LockupEngine};
pub use crate::io::write_streams_csv;
pub use crate::types::{
    AccountId, CreateParams, OperationRecord, OperationType, Segment, Stream, StreamError,
    StreamId, StreamStatus,
};
