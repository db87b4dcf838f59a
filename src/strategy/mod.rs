//! Apply strategy module for loan request files
//!
//! This module defines the Strategy pattern for replaying a CSV file of loan
//! requests against a snapshot, from reading the file through evaluating each
//! request to writing a per-request outcome report. Different implementations
//! (synchronous, asynchronous batch) can be selected at runtime.

use crate::cli::StrategyType;
use crate::core::LoanPolicy;
use crate::types::{CirculationError, Snapshot};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncApplyStrategy, BatchConfig};
pub use sync::SyncApplyStrategy;

/// Apply strategy trait for loan request files
pub trait ApplyStrategy: Send + Sync {
    /// Apply every request in `input_path` to `snapshot`
    ///
    /// Requests without their own `at` column are applied at `now`. One
    /// outcome row per applied request is written to `output`.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - State the requests are applied to
    /// * `input_path` - CSV file of `type,book,member,transaction,at` rows
    /// * `now` - Time for requests that carry none
    /// * `policy` - Loan policy used by the evaluator
    /// * `output` - Writer for the outcome report
    ///
    /// # Returns
    ///
    /// The snapshot after every accepted request has been committed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The request file cannot be opened
    /// - The snapshot is inconsistent (duplicate ids, invalid copy counts)
    /// - The report cannot be written
    ///
    /// Malformed rows and refused requests are not errors: malformed rows are
    /// logged and skipped, refusals are reported in the output.
    fn apply(
        &self,
        snapshot: Snapshot,
        input_path: &Path,
        now: DateTime<Utc>,
        policy: &LoanPolicy,
        output: &mut dyn Write,
    ) -> Result<Snapshot, CirculationError>;
}

/// Create an apply strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of strategy to create (Sync or Async)
/// * `config` - Optional configuration for async batch processing (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ApplyStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncApplyStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncApplyStrategy::new(config))
        }
    }
}
