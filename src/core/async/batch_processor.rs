//! Batch processing with member-based partitioning
//!
//! This module provides the `LoanBatchProcessor`, which applies a batch of
//! loan requests concurrently while keeping each member's requests in order.
//!
//! # Design
//!
//! Requests are partitioned by the member they act for. A borrow names its
//! member directly; a return is attributed to the member of the transaction
//! it closes. Each partition runs sequentially on its own tokio task, and
//! partitions run in parallel.
//!
//! A return whose transaction is not known yet (typically a loan opened
//! earlier in the same batch) ends the current segment: the requests queued
//! so far are applied first, then the return is attributed again. Every
//! member's requests therefore run strictly in batch order.
//!
//! # Architecture
//!
//! ```text
//! LoanBatchProcessor
//!     ├── AsyncCirculationEngine  (shared, cheaply cloned)
//!     └── now                     (time for requests without their own)
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use super::AsyncCirculationEngine;
use crate::core::engine::LoanReceipt;
use crate::types::{CirculationError, LoanRequest, MemberId};

/// Result of applying a single request
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    /// Position of the request within its batch
    pub index: usize,

    /// The request that was applied
    pub request: LoanRequest,

    /// The receipt, or the reason the request was refused
    pub result: Result<LoanReceipt, CirculationError>,
}

type Partition = Vec<(usize, LoanRequest)>;

/// Batch processor with member-based partitioning
#[derive(Debug, Clone)]
pub struct LoanBatchProcessor {
    engine: AsyncCirculationEngine,
    now: DateTime<Utc>,
}

impl LoanBatchProcessor {
    /// Create a processor applying requests at `now` unless they carry a time
    pub fn new(engine: AsyncCirculationEngine, now: DateTime<Utc>) -> Self {
        Self { engine, now }
    }

    /// Partition a segment of requests by member
    ///
    /// # Returns
    ///
    /// A map from member to that member's requests in batch order, plus the
    /// returns that could not be attributed to a member.
    ///
    /// # Guarantees
    ///
    /// - Each request appears exactly once across the output
    /// - Each partition keeps the original relative order
    pub fn partition_by_member(
        &self,
        requests: Partition,
    ) -> (HashMap<MemberId, Partition>, Partition) {
        let mut partitions: HashMap<MemberId, Partition> = HashMap::new();
        let mut unresolved = Vec::new();

        for (index, request) in requests {
            match self.engine.member_of(&request) {
                Some(member) => partitions.entry(member).or_default().push((index, request)),
                None => unresolved.push((index, request)),
            }
        }

        (partitions, unresolved)
    }

    /// Apply one member's requests sequentially, in order
    ///
    /// A refused request does not stop the ones after it.
    pub async fn process_member_requests(&self, requests: Partition) -> Vec<RequestOutcome> {
        requests
            .into_iter()
            .map(|(index, request)| {
                let result = self.engine.apply(&request, self.now);
                RequestOutcome {
                    index,
                    request,
                    result,
                }
            })
            .collect()
    }

    /// Run every member partition on its own task and wait for all of them
    async fn process_partitions(&self, partitions: HashMap<MemberId, Partition>) -> Vec<RequestOutcome> {
        let tasks = partitions.into_values().map(|requests| {
            let processor = self.clone();
            tokio::spawn(async move { processor.process_member_requests(requests).await })
        });

        let mut outcomes = Vec::new();
        for joined in join_all(tasks).await {
            match joined {
                Ok(member_outcomes) => outcomes.extend(member_outcomes),
                Err(e) => tracing::error!("Loan request task failed: {}", e),
            }
        }
        outcomes
    }

    /// Apply a batch of requests
    ///
    /// 1. Queue requests by member until a return cannot be attributed
    /// 2. Apply the queued segment, one tokio task per member
    /// 3. Attribute the return again now that the segment has run; a return
    ///    of a transaction that still does not exist is refused on the spot
    /// 4. Repeat until the batch is exhausted
    ///
    /// # Returns
    ///
    /// One outcome per request that ran, in batch order. A request whose task
    /// panicked is logged and missing from the result.
    pub async fn process_batch(&self, batch: Vec<LoanRequest>) -> Vec<RequestOutcome> {
        let mut outcomes = Vec::with_capacity(batch.len());
        let mut segment: Partition = Vec::new();

        for (index, request) in batch.into_iter().enumerate() {
            if self.engine.member_of(&request).is_none() && !segment.is_empty() {
                let (partitions, unresolved) = self.partition_by_member(std::mem::take(&mut segment));
                outcomes.extend(self.process_partitions(partitions).await);
                outcomes.extend(self.process_member_requests(unresolved).await);
            }

            if self.engine.member_of(&request).is_some() {
                segment.push((index, request));
            } else {
                outcomes.extend(self.process_member_requests(vec![(index, request)]).await);
            }
        }

        let (partitions, unresolved) = self.partition_by_member(segment);
        outcomes.extend(self.process_partitions(partitions).await);
        outcomes.extend(self.process_member_requests(unresolved).await);

        outcomes.sort_by_key(|outcome| outcome.index);
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::policy::LoanPolicy;
    use crate::io::demo::demo_snapshot;
    use crate::types::{EntityKind, LoanAction, LoanStatus};
    use rust_decimal::Decimal;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 20, 10, 0, 0).unwrap()
    }

    fn processor() -> LoanBatchProcessor {
        let engine =
            AsyncCirculationEngine::from_snapshot(demo_snapshot(now()), LoanPolicy::default())
                .unwrap();
        LoanBatchProcessor::new(engine, now())
    }

    fn borrow(book: u64, member: u64) -> LoanRequest {
        LoanRequest {
            action: LoanAction::Borrow { book, member },
            at: None,
        }
    }

    fn give_back(transaction: u64) -> LoanRequest {
        LoanRequest {
            action: LoanAction::Return { transaction },
            at: None,
        }
    }

    #[test]
    fn test_partition_by_member() {
        let processor = processor();
        let segment = vec![borrow(1, 1), borrow(4, 2), give_back(3), give_back(2), give_back(42)]
            .into_iter()
            .enumerate()
            .collect();

        let (partitions, unresolved) = processor.partition_by_member(segment);

        assert_eq!(partitions.len(), 2);
        let john: Vec<_> = partitions[&1].iter().map(|(index, _)| *index).collect();
        assert_eq!(john, vec![0, 2]);
        let jane: Vec<_> = partitions[&2].iter().map(|(index, _)| *index).collect();
        assert_eq!(jane, vec![1, 3]);
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].0, 4);
    }

    #[tokio::test]
    async fn test_process_batch_empty() {
        assert!(processor().process_batch(vec![]).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_process_batch_keeps_batch_order() {
        let processor = processor();
        let batch = vec![borrow(4, 1), borrow(4, 2), give_back(1), borrow(4, 3)];

        let outcomes = processor.process_batch(batch).await;

        let indices: Vec<_> = outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_ok());
        assert_eq!(
            outcomes[2].result.as_ref().unwrap().transaction.status,
            LoanStatus::Returned
        );
        assert!(matches!(
            outcomes[3].result,
            Err(CirculationError::MemberNotEligible { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_errors_do_not_stop_member_partition() {
        let processor = processor();
        // 1984 has no copy on the shelf, so the first request fails
        let batch = vec![borrow(3, 2), borrow(1, 2)];

        let outcomes = processor.process_batch(batch).await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].result, Err(CirculationError::book_unavailable(3)));
        assert!(outcomes[1].result.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_return_of_loan_opened_in_same_batch() {
        let processor = processor();
        let batch = vec![borrow(4, 1), give_back(5)];

        let outcomes = processor.process_batch(batch).await;

        assert!(outcomes[0].result.is_ok());
        assert_eq!(
            outcomes[1].result.as_ref().unwrap().transaction.id,
            5
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_member_requests_after_same_batch_return_run_in_order() {
        let engine = AsyncCirculationEngine::from_snapshot(
            demo_snapshot(now()),
            LoanPolicy::new(14, 3, Decimal::ZERO),
        )
        .unwrap();
        let processor = LoanBatchProcessor::new(engine, now());
        // John already holds two loans, so only one more fits under the limit
        let batch = vec![borrow(4, 1), give_back(5), borrow(2, 1), give_back(42)];

        let outcomes = processor.process_batch(batch).await;

        let indices: Vec<_> = outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(outcomes[0].result.as_ref().unwrap().transaction.id, 5);
        assert_eq!(
            outcomes[1].result.as_ref().unwrap().transaction.status,
            LoanStatus::Returned
        );
        assert_eq!(outcomes[2].result.as_ref().unwrap().transaction.id, 6);
        assert_eq!(
            outcomes[3].result,
            Err(CirculationError::not_found(EntityKind::Transaction, 42))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_many_members_race_for_few_copies() {
        let mut snapshot = demo_snapshot(now());
        for id in 10..40 {
            let mut member = snapshot.members[0].clone();
            member.id = id;
            member.email = format!("member{}@example.org", id);
            snapshot.members.push(member);
        }
        let engine = AsyncCirculationEngine::from_snapshot(snapshot, LoanPolicy::default()).unwrap();
        let processor = LoanBatchProcessor::new(engine.clone(), now());

        // 30 members want A Brief History of Time, which has two copies
        let batch = (10..40).map(|member| borrow(4, member)).collect();
        let outcomes = processor.process_batch(batch).await;

        let lent = outcomes.iter().filter(|o| o.result.is_ok()).count();
        assert_eq!(lent, 2);
        assert_eq!(engine.snapshot().book(4).unwrap().available_copies, 0);
    }
}
