//! Processing strategy module for operation-log processing
//!
//! This module defines the Strategy pattern for complete processing
//! pipelines, encompassing CSV parsing, engine processing, and stream-state
//! output. This allows different processing implementations (synchronous,
//! asynchronous batch) to be selected at runtime.

use crate::cli::StrategyType;
use rust_decimal::Decimal;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete operation-log pipelines
///
/// Each strategy reads operation records from a CSV file, applies them
/// through an engine, and writes the final stream states to output.
pub trait ProcessingStrategy: Send + Sync {
    /// Process operations from the input file and write stream states to
    /// output
    ///
    /// Stream states are reported at the latest operation time seen in the
    /// log; status is a pure function of that instant.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if all processing completed (possibly with recoverable,
    ///   logged errors)
    /// * `Err(String)` if a fatal error occurred (file not found, I/O error)
    ///
    /// Individual operation failures are logged to stderr and do not abort
    /// the pipeline.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create
/// * `fee_rate` - Protocol fee fraction applied by the flat fee oracle
/// * `config` - Optional configuration for async batch processing (ignored
///   for sync)
///
/// # Returns
///
/// A boxed trait object implementing the ProcessingStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    fee_rate: Decimal,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(fee_rate)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, fee_rate))
        }
    }
}
