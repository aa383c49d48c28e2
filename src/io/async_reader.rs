//! Asynchronous CSV reader with batch interface
//!
//! Provides batched reading of operation records from an async byte stream,
//! built on csv-async. Invalid records are logged to stderr and skipped so a
//! malformed row never stalls the pipeline.

use crate::io::csv_format::{convert_operation_record, CsvRecord};
use crate::types::OperationRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV reader
///
/// Provides batch reading interface over operation records.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader.
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read a batch of operation records
    ///
    /// Reads up to `batch_size` records, converting them to
    /// OperationRecords. Invalid records are logged to stderr and skipped.
    /// Returns an empty vector at end of file.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<OperationRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_operation_record(csv_record) {
                    Ok(operation_record) => batch.push(operation_record),
                    Err(e) => eprintln!("Record conversion error: {}", e),
                },
                Some(Err(e)) => eprintln!("CSV parse error: {}", e),
                None => break,
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperationType;
    use futures::io::Cursor;

    #[tokio::test]
    async fn test_read_batch_respects_size() {
        let csv_content = "op,time,stream,account,to,asset,amount,start,cancelable,segments\n\
                           fund,0,,10,,USDC,2000,,,\n\
                           create,0,,10,20,USDC,1000,0,true,1000:1:100\n\
                           withdraw,50,1,20,20,,500,,,\n";
        let reader = Cursor::new(csv_content.as_bytes());
        let mut async_reader = AsyncReader::new(reader);

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].op, OperationType::Fund);
        assert_eq!(batch[1].op, OperationType::Create);

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].op, OperationType::Withdraw);

        let batch = async_reader.read_batch(2).await;
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_read_batch_skips_invalid_records() {
        let csv_content = "op,time,stream,account,to,asset,amount,start,cancelable,segments\n\
                           teleport,0,,10,,USDC,2000,,,\n\
                           fund,0,,10,,USDC,2000,,,\n";
        let reader = Cursor::new(csv_content.as_bytes());
        let mut async_reader = AsyncReader::new(reader);

        let batch = async_reader.read_batch(10).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].op, OperationType::Fund);
    }

    #[tokio::test]
    async fn test_read_batch_empty_csv() {
        let csv_content = "op,time,stream,account,to,asset,amount,start,cancelable,segments\n";
        let reader = Cursor::new(csv_content.as_bytes());
        let mut async_reader = AsyncReader::new(reader);

        let batch = async_reader.read_batch(10).await;
        assert!(batch.is_empty());
    }
}
