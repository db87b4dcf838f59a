//! Asynchronous batch apply strategy
//!
//! This module provides an asynchronous, multi-threaded implementation of the
//! ApplyStrategy trait. Requests are read in batches and each batch is
//! partitioned by member for parallel processing.
//!
//! # Architecture
//!
//! ```text
//! AsyncApplyStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncRequestReader (batch CSV reading)
//!     ├── LoanBatchProcessor (member partitioning + tokio tasks)
//!     └── AsyncCirculationEngine (thread-safe circulation)
//!         └── AsyncCatalog (atomic copy checkout)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after another
//! - Within a batch each member's requests keep their file order
//! - A return of a loan opened earlier in the same batch waits until every
//!   request before it has been applied
//! - Requests of different members run concurrently, so two members racing
//!   for the last copy of a book may be served in either order, and their new
//!   transactions are numbered in completion order

use crate::core::{AsyncCirculationEngine, LoanBatchProcessor, LoanPolicy};
use crate::io::async_reader::AsyncRequestReader;
use crate::io::csv_format::write_outcomes_csv;
use crate::strategy::ApplyStrategy;
use crate::types::{CirculationError, Snapshot};
use chrono::{DateTime, Utc};
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Configuration for batch processing
///
/// Controls how requests are batched and the number of worker threads
/// for parallel processing within each batch.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Number of requests per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
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
    /// Zero values fall back to the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                batch_size,
                default = default.batch_size,
                "Invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "Invalid max_concurrent_batches, using default"
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

/// Asynchronous batch apply strategy
#[derive(Debug, Clone)]
pub struct AsyncApplyStrategy {
    config: BatchConfig,
}

impl AsyncApplyStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ApplyStrategy for AsyncApplyStrategy {
    /// Apply the request file batch by batch
    ///
    /// 1. Builds an `AsyncCirculationEngine` from the snapshot
    /// 2. Creates a tokio multi-threaded runtime
    /// 3. Reads requests in batches with `AsyncRequestReader`
    /// 4. Processes each batch to completion before reading the next
    /// 5. Writes the outcome report and returns the final snapshot
    fn apply(
        &self,
        snapshot: Snapshot,
        input_path: &Path,
        now: DateTime<Utc>,
        policy: &LoanPolicy,
        output: &mut dyn Write,
    ) -> Result<Snapshot, CirculationError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| CirculationError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let engine = AsyncCirculationEngine::from_snapshot(snapshot, policy.clone())?;
        let processor = LoanBatchProcessor::new(engine.clone(), now);

        let outcomes = runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| match e.kind() {
                    ErrorKind::NotFound => CirculationError::FileNotFound {
                        path: input_path.display().to_string(),
                    },
                    _ => CirculationError::IoError {
                        message: format!("Failed to open file '{}': {}", input_path.display(), e),
                    },
                })?;

            // Wrap tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncRequestReader::new(compat_file);

            let mut outcomes = Vec::new();
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                let offset = outcomes.len();
                for mut outcome in processor.process_batch(batch).await {
                    if let Err(e) = &outcome.result {
                        tracing::warn!("Request refused: {}", e);
                    }
                    outcome.index += offset;
                    outcomes.push(outcome);
                }
            }

            Ok::<_, CirculationError>(outcomes)
        })?;

        write_outcomes_csv(&outcomes, output)?;
        Ok(engine.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::demo::demo_snapshot;
    use crate::strategy::SyncApplyStrategy;
    use chrono::TimeZone;
    use rstest::rstest;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 20, 10, 0, 0).unwrap()
    }

    #[rstest]
    #[case::zero_batch(0, 4, BatchConfig { batch_size: 1000, max_concurrent_batches: 4 })]
    #[case::custom(50, 2, BatchConfig { batch_size: 50, max_concurrent_batches: 2 })]
    fn test_batch_config_new(
        #[case] batch_size: usize,
        #[case] max_concurrent: usize,
        #[case] expected: BatchConfig,
    ) {
        assert_eq!(BatchConfig::new(batch_size, max_concurrent), expected);
    }

    #[test]
    fn test_batch_config_zero_workers_uses_cpu_count() {
        assert_eq!(BatchConfig::new(10, 0).max_concurrent_batches, num_cpus::get());
    }

    #[test]
    fn test_keeps_member_order_across_batches() {
        // John (member 1) holds two loans; with a limit of 3 only one more
        // borrow fits until he returns something
        let file = create_temp_csv(
            "type,book,member,transaction,at\n\
             borrow,4,1,,\n\
             borrow,1,1,,\n\
             return,,,1,\n\
             borrow,1,1,,\n",
        );
        let policy = LoanPolicy::new(14, 3, rust_decimal::Decimal::new(50, 2));

        let mut output = Vec::new();
        let strategy = AsyncApplyStrategy::new(BatchConfig::new(2, 2));
        let snapshot = strategy
            .apply(demo_snapshot(now()), file.path(), now(), &policy, &mut output)
            .unwrap();

        let report = String::from_utf8(output).unwrap();
        let lines: Vec<_> = report.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("1,borrow,5,OK,"));
        assert!(lines[2].starts_with("2,borrow,,BORROW_LIMIT_EXCEEDED,"));
        assert!(lines[3].starts_with("3,return,1,OK,"));
        assert!(lines[4].starts_with("4,borrow,6,OK,"));

        assert_eq!(snapshot.transactions.len(), 6);
        assert_eq!(snapshot.book(1).unwrap().available_copies, 4);
        assert_eq!(snapshot.book(4).unwrap().available_copies, 1);
    }

    #[test]
    fn test_matches_sync_strategy_with_single_request_batches() {
        let file = create_temp_csv(
            "type,book,member,transaction,at\n\
             return,,,2,\n\
             borrow,4,1,,\n\
             borrow,1,3,,\n\
             borrow,2,2,,\n\
             return,,,3,2024-11-21T08:00:00Z\n",
        );

        let mut sync_output = Vec::new();
        let sync_snapshot = SyncApplyStrategy
            .apply(
                demo_snapshot(now()),
                file.path(),
                now(),
                &LoanPolicy::default(),
                &mut sync_output,
            )
            .unwrap();

        // One request per batch keeps transaction ids in file order
        let mut async_output = Vec::new();
        let async_snapshot = AsyncApplyStrategy::new(BatchConfig::new(1, 2))
            .apply(
                demo_snapshot(now()),
                file.path(),
                now(),
                &LoanPolicy::default(),
                &mut async_output,
            )
            .unwrap();

        assert_eq!(
            String::from_utf8(async_output).unwrap(),
            String::from_utf8(sync_output).unwrap()
        );
        assert_eq!(async_snapshot.books, sync_snapshot.books);
        assert_eq!(async_snapshot.transactions.len(), sync_snapshot.transactions.len());
    }

    #[test]
    fn test_missing_file() {
        let strategy = AsyncApplyStrategy::new(BatchConfig::default());
        let mut output = Vec::new();

        let result = strategy.apply(
            Snapshot::default(),
            Path::new("nonexistent-requests.csv"),
            now(),
            &LoanPolicy::default(),
            &mut output,
        );
        assert!(matches!(result, Err(CirculationError::FileNotFound { .. })));
    }
}
