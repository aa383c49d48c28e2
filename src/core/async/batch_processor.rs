//! Batch processing with stream-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which applies a batch of
//! operation-log records against the concurrent engine. Funding and creation
//! records are applied first, sequentially and in log order (creations assign
//! sequential ids, so their relative order is part of the contract). The
//! remaining records are partitioned by stream id and processed concurrently,
//! one tokio task per stream, preserving per-stream order.

use std::collections::HashMap;
use std::sync::Arc;

use super::InMemoryAsyncLockupEngine;
use crate::types::{OperationRecord, OperationType, StreamError, StreamId};

/// Result of processing a single operation record
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    /// The record that was processed
    pub record: OperationRecord,

    /// The result of processing (success or error)
    pub result: Result<(), StreamError>,
}

/// Batch processor with stream-based partitioning
#[derive(Clone)]
pub struct BatchProcessor {
    engine: Arc<InMemoryAsyncLockupEngine>,
}

impl BatchProcessor {
    /// Create a processor around a shared engine.
    pub fn new(engine: Arc<InMemoryAsyncLockupEngine>) -> Self {
        Self { engine }
    }

    /// Split a batch into ordered admin records (fund/create) and per-stream
    /// groups of the rest
    ///
    /// # Guarantees
    ///
    /// - every record lands in exactly one place;
    /// - admin records keep their relative log order;
    /// - records for one stream keep their relative log order.
    pub fn partition_by_stream(
        &self,
        batch: Vec<OperationRecord>,
    ) -> (Vec<OperationRecord>, HashMap<StreamId, Vec<OperationRecord>>) {
        let mut admin = Vec::new();
        let mut stream_batches: HashMap<StreamId, Vec<OperationRecord>> = HashMap::new();

        for record in batch {
            match (record.op, record.stream) {
                (OperationType::Fund | OperationType::Create, _) | (_, None) => {
                    admin.push(record);
                }
                (_, Some(id)) => {
                    stream_batches.entry(id).or_default().push(record);
                }
            }
        }

        (admin, stream_batches)
    }

    /// Process one stream's records sequentially, capturing each outcome
    ///
    /// Errors are captured per record and do not stop the remaining records
    /// of the stream.
    pub async fn process_stream_operations(
        &self,
        records: Vec<OperationRecord>,
    ) -> Vec<OperationOutcome> {
        let mut outcomes = Vec::with_capacity(records.len());

        for record in records {
            let result = self.engine.process_operation(record.clone());
            outcomes.push(OperationOutcome { record, result });
        }

        outcomes
    }

    /// Process a batch: admin records in order, then streams in parallel
    ///
    /// Records for different streams are processed concurrently; records for
    /// the same stream sequentially in log order. All records are processed
    /// even when some fail; outcomes across streams may be reordered.
    pub async fn process_batch(&self, batch: Vec<OperationRecord>) -> Vec<OperationOutcome> {
        let (admin, stream_batches) = self.partition_by_stream(batch);

        // Phase one: funding and creations, in log order.
        let mut outcomes = self.process_stream_operations(admin).await;

        // Phase two: one task per stream.
        let mut tasks = Vec::new();
        for (_stream_id, records) in stream_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_stream_operations(records).await
            }));
        }

        for task in tasks {
            match task.await {
                Ok(stream_outcomes) => outcomes.extend(stream_outcomes),
                Err(e) => {
                    eprintln!("Task panicked: {:?}", e);
                }
            }
        }

        outcomes
    }
}
