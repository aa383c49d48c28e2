//! Concurrent implementations of the core components
//!
//! This module provides the thread-safe counterparts of the single-writer
//! engine, built for the batched asynchronous processing strategy:
//!
//! - **AsyncStreamStore**: stream records behind `DashMap`, one entry lock
//!   per stream
//! - **AsyncLockupEngine**: the orchestrator, cloneable across tasks
//! - **BatchProcessor**: stream-partitioned batch application
//!
//! # Concurrency Contract
//!
//! Every mutation of a single stream runs under that stream's entry lock
//! with the checks, the accounting effect, and the ledger interaction inside
//! the lock, so per-stream serializability matches the single-writer engine.
//! Cross-stream operations run in parallel. The all-or-nothing batch
//! operations stay on the single-writer engine, where their dry-run view
//! cannot race.

pub mod batch_processor;
pub mod engine;
pub mod stream_store;

pub use batch_processor::{BatchProcessor, OperationOutcome};
pub use engine::{AsyncLockupEngine, InMemoryAsyncLockupEngine};
pub use stream_store::AsyncStreamStore;
