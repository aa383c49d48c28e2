//! Asynchronous batch processing strategy
//!
//! Multi-threaded pipeline around the concurrent engine:
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batched CSV reading)
//!     ├── BatchProcessor (stream partitioning + tasks)
//!     └── InMemoryAsyncLockupEngine (thread-safe state)
//! ```
//!
//! Batches are processed sequentially so per-stream ordering holds across
//! the whole file; within a batch, funding and creations run first in log
//! order (creations assign sequential ids) and the remaining operations run
//! in parallel, partitioned by stream id.

use crate::core::r#async::{BatchProcessor, InMemoryAsyncLockupEngine};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::{stream_state_row, write_streams_csv, StreamStateRow};
use crate::strategy::ProcessingStrategy;
use crate::types::{Timestamp, NULL_ACCOUNT};
use rust_decimal::Decimal;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing
///
/// Controls how operations are batched and the number of worker threads for
/// parallel processing within each batch.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of operations per batch
    pub batch_size: usize,
    /// Maximum number of worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults, with a warning on stderr.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            eprintln!(
                "Warning: Invalid batch_size ({}), using default ({})",
                batch_size, default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            eprintln!(
                "Warning: Invalid max_concurrent_batches ({}), using default ({})",
                max_concurrent_batches, default.max_concurrent_batches
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
///
/// Operations are read in batches and processed batch-by-batch; within each
/// batch, operations for different streams run in parallel while per-stream
/// order is preserved.
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    fee_rate: Decimal,
}

impl AsyncProcessingStrategy {
    /// Strategy with the given batch configuration and flat protocol fee.
    pub fn new(config: BatchConfig, fee_rate: Decimal) -> Self {
        Self { config, fee_rate }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        // Multi-threaded runtime with the configured number of workers.
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let engine = Arc::new(InMemoryAsyncLockupEngine::in_memory(self.fee_rate));
            let processor = BatchProcessor::new(Arc::clone(&engine));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // Wrap the tokio file in a compatibility layer for csv-async.
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            // Stream states are reported at the latest instant the log
            // mentions.
            let mut last_time: Timestamp = 0;

            // Batches run sequentially so per-stream ordering holds across
            // the entire file.
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                last_time = batch
                    .iter()
                    .map(|record| record.time)
                    .fold(last_time, Timestamp::max);

                let outcomes = processor.process_batch(batch).await;
                for outcome in outcomes {
                    if let Err(e) = outcome.result {
                        eprintln!("Operation processing error: {}", e);
                    }
                }
            }

            let rows: Vec<StreamStateRow> = engine
                .all_streams()
                .iter()
                .map(|stream| {
                    let recipient = engine.get_recipient(stream.id).unwrap_or(NULL_ACCOUNT);
                    stream_state_row(stream, recipient, last_time)
                })
                .collect();

            write_streams_csv(&rows, output)?;

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_async_strategy_full_stream_lifecycle() {
        let csv_content = "op,time,stream,account,to,asset,amount,start,cancelable,segments\n\
                           fund,0,,10,,USDC,2000,,,\n\
                           create,0,,10,20,USDC,1000,0,true,1000:1:100\n\
                           withdraw,50,1,20,20,,500,,,\n";
        let file = create_temp_csv(csv_content);

        let strategy = AsyncProcessingStrategy::new(BatchConfig::default(), Decimal::ZERO);
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("1,10,20,USDC,1000.0000,500.0000,0.0000,streaming"));
    }

    #[test]
    fn test_async_strategy_multiple_streams() {
        let csv_content = "op,time,stream,account,to,asset,amount,start,cancelable,segments\n\
                           fund,0,,10,,USDC,5000,,,\n\
                           create,0,,10,20,USDC,1000,0,true,1000:1:100\n\
                           create,0,,10,30,USDC,2000,0,true,2000:1:100\n\
                           withdraw,50,1,20,20,,500,,,\n\
                           withdraw,50,2,30,30,,1000,,,\n";
        let file = create_temp_csv(csv_content);

        let strategy = AsyncProcessingStrategy::new(BatchConfig::default(), Decimal::ZERO);
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("1,10,20,USDC,1000.0000,500.0000,0.0000,streaming"));
        assert!(text.contains("2,10,30,USDC,2000.0000,1000.0000,0.0000,streaming"));
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default(), Decimal::ZERO);
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert!(result.is_err());
    }

    #[test]
    fn test_async_strategy_small_batches_preserve_ordering() {
        // batch_size 1 forces every record into its own batch; sequential
        // batch processing must still apply them in log order.
        let csv_content = "op,time,stream,account,to,asset,amount,start,cancelable,segments\n\
                           fund,0,,10,,USDC,2000,,,\n\
                           create,0,,10,20,USDC,1000,0,true,1000:1:100\n\
                           withdraw,30,1,20,20,,100,,,\n\
                           withdraw,50,1,20,20,,400,,,\n";
        let file = create_temp_csv(csv_content);

        let strategy = AsyncProcessingStrategy::new(BatchConfig::new(1, 2), Decimal::ZERO);
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("1,10,20,USDC,1000.0000,500.0000,0.0000,streaming"));
    }

    #[rstest]
    #[case::zero_batch_size(0, 4, 1000, 4)]
    #[case::zero_workers(500, 0, 500, num_cpus::get())]
    fn test_batch_config_zero_values_fall_back(
        #[case] batch_size: usize,
        #[case] workers: usize,
        #[case] expected_batch: usize,
        #[case] expected_workers: usize,
    ) {
        let config = BatchConfig::new(batch_size, workers);
        assert_eq!(config.batch_size, expected_batch);
        assert_eq!(config.max_concurrent_batches, expected_workers);
    }
}
