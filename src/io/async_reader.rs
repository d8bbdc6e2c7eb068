//! Asynchronous CSV reader with batch interface
//!
//! Reads replay records in batches for the async strategy.
//!
//! # Architecture
//!
//! ```text
//! tokio::fs::File → compat → AsyncReader → Vec<ReplayRecord> batches
//!                                 ↓
//!                          csv_format module
//!                   (CsvCommandRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvCommandRecord};
use crate::types::ReplayRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous command-log reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` records
    ///
    /// Rows that fail to parse or convert are logged and skipped. An empty
    /// vector means end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<ReplayRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvCommandRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_csv_record(csv_record) {
                    Ok(record) => batch.push(record),
                    Err(e) => warn!(error = %e, "Skipping command-log row"),
                },
                Some(Err(e)) => warn!(error = %e, "CSV parse error"),
                None => break,
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProcessId, TransferCommand};
    use futures::io::Cursor;

    #[tokio::test]
    async fn test_async_reader_reads_in_batches() {
        let csv_content =
            "process,command,detail\ntp-1,initiate,\ntp-2,initiate,\ntp-1,request,\n";
        let mut reader = AsyncReader::new(Cursor::new(csv_content.as_bytes()));

        let batch = reader.read_batch(2).await;
        assert_eq!(
            batch,
            vec![
                ReplayRecord::Initiate(ProcessId::new("tp-1")),
                ReplayRecord::Initiate(ProcessId::new("tp-2")),
            ]
        );

        let batch = reader.read_batch(2).await;
        assert_eq!(
            batch,
            vec![ReplayRecord::Command(TransferCommand::request("tp-1"))]
        );

        assert!(reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut reader = AsyncReader::new(Cursor::new("process,command,detail\n".as_bytes()));
        assert!(reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_rows() {
        let csv_content = "process,command,detail\ntp-1,launch,\n,start,\ntp-1,FAIL,disk full\n";
        let mut reader = AsyncReader::new(Cursor::new(csv_content.as_bytes()));

        let batch = reader.read_batch(10).await;

        assert_eq!(
            batch,
            vec![ReplayRecord::Command(TransferCommand::fail("tp-1", "disk full"))]
        );
    }
}
