//! Synchronous apply strategy
//!
//! Streams requests through `RequestReader` and applies them one at a time to
//! a `CirculationEngine`. Memory use is bounded by the snapshot, not by the
//! length of the request file.

use crate::core::{CirculationEngine, LoanPolicy, RequestOutcome};
use crate::io::csv_format::write_outcomes_csv;
use crate::io::sync_reader::RequestReader;
use crate::strategy::ApplyStrategy;
use crate::types::{CirculationError, Snapshot};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::Path;

/// Synchronous apply strategy
///
/// ```no_run
/// use library_circulation::core::LoanPolicy;
/// use library_circulation::strategy::{ApplyStrategy, SyncApplyStrategy};
/// use library_circulation::types::Snapshot;
/// use std::path::Path;
///
/// let mut output = std::io::stdout();
/// let snapshot = SyncApplyStrategy
///     .apply(
///         Snapshot::default(),
///         Path::new("requests.csv"),
///         chrono::Utc::now(),
///         &LoanPolicy::default(),
///         &mut output,
///     )
///     .expect("Applying requests failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncApplyStrategy;

impl ApplyStrategy for SyncApplyStrategy {
    fn apply(
        &self,
        snapshot: Snapshot,
        input_path: &Path,
        now: DateTime<Utc>,
        policy: &LoanPolicy,
        output: &mut dyn Write,
    ) -> Result<Snapshot, CirculationError> {
        let mut engine = CirculationEngine::from_snapshot(snapshot, policy.clone())?;
        let reader = RequestReader::new(input_path)?;

        let mut outcomes = Vec::new();
        for result in reader {
            match result {
                Ok(request) => {
                    let result = engine.apply(&request, now);
                    if let Err(e) = &result {
                        tracing::warn!("Request refused: {}", e);
                    }
                    outcomes.push(RequestOutcome {
                        index: outcomes.len(),
                        request,
                        result,
                    });
                }
                Err(e) => tracing::warn!("Skipping request: {}", e),
            }
        }

        write_outcomes_csv(&outcomes, output)?;
        Ok(engine.into_snapshot())
    }
}
