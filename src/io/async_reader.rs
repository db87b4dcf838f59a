//! Asynchronous request reader with batch interface
//!
//! Reads loan requests from a CSV stream in batches for the async apply
//! strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV stream → AsyncRequestReader → Batches of LoanRequests
//!                     ↓
//!              csv_format module
//!              (CsvRequest, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRequest};
use crate::types::LoanRequest;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV request reader
pub struct AsyncRequestReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncRequestReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
        }
    }

    /// Read up to `batch_size` requests
    ///
    /// Rows that cannot be parsed are logged with their file line and
    /// skipped, the same rows the sync reader reports as errors.
    ///
    /// # Returns
    ///
    /// The converted requests; empty once the stream is exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<LoanRequest> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRequest>();

        while batch.len() < batch_size {
            let Some(row) = records.next().await else {
                break;
            };
            self.line_num += 1;

            match row {
                Ok(record) => match convert_csv_record(record) {
                    Ok(request) => batch.push(request),
                    Err(e) => tracing::warn!(line = self.line_num, "Skipping request: {}", e),
                },
                Err(e) => tracing::warn!(line = self.line_num, "CSV parse error: {}", e),
            }
        }

        batch
    }
}
