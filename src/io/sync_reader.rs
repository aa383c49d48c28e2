//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over operation records from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record parsing errors are yielded as Err variants in the
//!   iterator
//!
//! # Memory Efficiency
//!
//! The reader maintains streaming behavior: records are read one at a time
//! and the file is never loaded into memory as a whole.

use crate::io::csv_format::{convert_operation_record, CsvRecord};
use crate::types::OperationRecord;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader
///
/// Provides an iterator interface over operation records.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader is configured to trim whitespace, allow flexible field
    /// counts (most operations leave fields empty), and buffer reads.
    ///
    /// # Errors
    ///
    /// Returns `Err(String)` if the file could not be opened.
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<OperationRecord, String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.line_num += 1;
        // The deserialize iterator resumes at the reader's current position.
        let mut records = self.reader.deserialize::<CsvRecord>();
        match records.next() {
            None => None,
            Some(Ok(csv_record)) => Some(
                convert_operation_record(csv_record)
                    .map_err(|e| format!("Line {}: {}", self.line_num + 1, e)),
            ),
            Some(Err(e)) => Some(Err(format!("CSV parse error: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperationType;
    use rust_decimal::Decimal;
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
    fn test_reads_operations_in_order() {
        let csv_content = "op,time,stream,account,to,asset,amount,start,cancelable,segments\n\
                           fund,0,,10,,USDC,2000,,,\n\
                           create,0,,10,20,USDC,1000,0,true,1000:1:100\n\
                           withdraw,50,1,20,20,,500,,,\n";
        let file = create_temp_csv(csv_content);

        let reader = SyncReader::new(file.path()).unwrap();
        let records: Vec<OperationRecord> = reader.filter_map(Result::ok).collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].op, OperationType::Fund);
        assert_eq!(records[1].op, OperationType::Create);
        assert_eq!(records[1].segments.as_ref().unwrap().len(), 1);
        assert_eq!(records[2].op, OperationType::Withdraw);
        assert_eq!(records[2].amount, Some(Decimal::new(500, 0)));
        assert_eq!(records[2].time, 50);
    }

    #[test]
    fn test_missing_file_fails() {
        let result = SyncReader::new(Path::new("nonexistent.csv"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_malformed_record_yields_error_and_continues() {
        let csv_content = "op,time,stream,account,to,asset,amount,start,cancelable,segments\n\
                           fund,0,,10,,USDC,not-a-number,,,\n\
                           fund,0,,10,,USDC,500,,,\n";
        let file = create_temp_csv(csv_content);

        let reader = SyncReader::new(file.path()).unwrap();
        let results: Vec<Result<OperationRecord, String>> = reader.collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        let csv_content = "op,time,stream,account,to,asset,amount,start,cancelable,segments\n";
        let file = create_temp_csv(csv_content);

        let reader = SyncReader::new(file.path()).unwrap();
        assert_eq!(reader.count(), 0);
    }
}
