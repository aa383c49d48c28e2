//! Core data types for the Rust Streaming Engine
//!
//! This module contains all the fundamental types used throughout the system:
//!
//! - `stream` - The Stream entity, segments, amounts, and derived status
//! - `operation` - Operation-log records that drive the engine
//! - `event` - Structured events emitted by mutating operations
//! - `error` - All error types

pub mod error;
pub mod event;
pub mod operation;
pub mod stream;

pub use error::{LedgerError, StreamError};
pub use event::StreamEvent;
pub use operation::{OperationRecord, OperationType};
pub use stream::{
    AccountId, Amounts, AssetId, Broker, CreateParams, Segment, SegmentDuration, Stream, StreamId,
    StreamStatus, Timestamp, NULL_ACCOUNT,
};
