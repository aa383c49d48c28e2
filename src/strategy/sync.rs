//! Synchronous processing strategy
//!
//! Single-threaded pipeline around the single-writer engine: stream the
//! operation log through `SyncReader`, apply each record in log order, then
//! emit the final stream states.
//!
//! # Memory Efficiency
//!
//! Operation records are processed one at a time; memory usage is
//! O(streams), not O(operations).

use crate::core::InMemoryLockupEngine;
use crate::io::csv_format::{stream_state_row, write_streams_csv, StreamStateRow};
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use crate::types::{Timestamp, NULL_ACCOUNT};
use rust_decimal::Decimal;
use std::io::Write;
use std::path::Path;

/// Synchronous processing strategy
///
/// Applies the whole log in order against a single-writer engine. This is
/// the strictly serializable reference pipeline; the async strategy must
/// produce the same final states for logs whose operations succeed.
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy {
    fee_rate: Decimal,
}

impl SyncProcessingStrategy {
    /// Strategy with the given flat protocol fee.
    pub fn new(fee_rate: Decimal) -> Self {
        Self { fee_rate }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let mut engine = InMemoryLockupEngine::in_memory(self.fee_rate);
        let reader = SyncReader::new(input_path)?;

        // Stream states are reported at the latest instant the log mentions.
        let mut last_time: Timestamp = 0;

        for result in reader {
            match result {
                Ok(record) => {
                    last_time = last_time.max(record.time);
                    if let Err(e) = engine.process_operation(record) {
                        eprintln!("Operation processing error: {}", e);
                    }
                }
                Err(e) => {
                    eprintln!("CSV parsing error: {}", e);
                }
            }
        }

        let rows: Vec<StreamStateRow> = engine
            .all_streams()
            .iter()
            .map(|stream| {
                // A burned claim leaves no owner; report the null account.
                let recipient = engine.get_recipient(stream.id).unwrap_or(NULL_ACCOUNT);
                stream_state_row(stream, recipient, last_time)
            })
            .collect();

        write_streams_csv(&rows, output)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn test_sync_strategy_full_stream_lifecycle() {
        let csv_content = "op,time,stream,account,to,asset,amount,start,cancelable,segments\n\
                           fund,0,,10,,USDC,2000,,,\n\
                           create,0,,10,20,USDC,1000,0,true,1000:1:100\n\
                           withdraw,50,1,20,20,,500,,,\n";
        let file = create_temp_csv(csv_content);

        let strategy = SyncProcessingStrategy::new(Decimal::ZERO);
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "stream,sender,recipient,asset,deposited,withdrawn,refunded,status"
        );
        assert_eq!(lines[1], "1,10,20,USDC,1000.0000,500.0000,0.0000,streaming");
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let strategy = SyncProcessingStrategy::new(Decimal::ZERO);
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_strategy_continues_after_failed_operation() {
        // The second withdraw overdraws and is rejected; the log continues.
        let csv_content = "op,time,stream,account,to,asset,amount,start,cancelable,segments\n\
                           fund,0,,10,,USDC,2000,,,\n\
                           create,0,,10,20,USDC,1000,0,true,1000:1:100\n\
                           withdraw,50,1,20,20,,600,,,\n\
                           withdraw,50,1,20,20,,100,,,\n";
        let file = create_temp_csv(csv_content);

        let strategy = SyncProcessingStrategy::new(Decimal::ZERO);
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        // 600 exceeds the 500 withdrawable at t=50, so only the 100 landed.
        assert!(text.contains("1,10,20,USDC,1000.0000,100.0000,0.0000,streaming"));
    }

    #[test]
    fn test_sync_strategy_applies_protocol_fee() {
        // 1% fee: a 1000 total leaves a 990 deposit.
        let csv_content = "op,time,stream,account,to,asset,amount,start,cancelable,segments\n\
                           fund,0,,10,,USDC,2000,,,\n\
                           create,0,,10,20,USDC,1000,0,true,990:1:100\n";
        let file = create_temp_csv(csv_content);

        let strategy = SyncProcessingStrategy::new(Decimal::new(1, 2));
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("1,10,20,USDC,990.0000,0.0000,0.0000,streaming"));
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
