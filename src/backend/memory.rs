//! In-process backend
//!
//! Holds a `CirculationEngine` for the lifetime of the process. Used for the
//! offline demo, where changes are intentionally not written anywhere.

use super::Backend;
use crate::core::{CirculationEngine, LoanPolicy, LoanReceipt};
use crate::types::{
    Book, BookDraft, BookId, CirculationError, Member, MemberDraft, MemberId, Snapshot,
    TransactionId,
};
use chrono::{DateTime, NaiveDate, Utc};

/// Backend whose state lives only in memory
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    engine: CirculationEngine,
}

impl MemoryBackend {
    /// # Errors
    ///
    /// Returns a `ValidationError` if the snapshot is inconsistent.
    pub fn new(snapshot: Snapshot, policy: LoanPolicy) -> Result<Self, CirculationError> {
        Ok(Self {
            engine: CirculationEngine::from_snapshot(snapshot, policy)?,
        })
    }
}

impl Backend for MemoryBackend {
    fn policy(&self) -> &LoanPolicy {
        self.engine.policy()
    }

    fn snapshot(&self) -> Result<Snapshot, CirculationError> {
        Ok(self.engine.snapshot())
    }

    fn stores_snapshots(&self) -> bool {
        true
    }

    fn store(&mut self, snapshot: Snapshot) -> Result<(), CirculationError> {
        self.engine = CirculationEngine::from_snapshot(snapshot, self.engine.policy().clone())?;
        Ok(())
    }

    fn health(&self) -> bool {
        true
    }

    fn engine(&self) -> Result<CirculationEngine, CirculationError> {
        Ok(self.engine.clone())
    }

    fn borrow(
        &mut self,
        book: BookId,
        member: MemberId,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        self.engine.borrow(book, member, now)
    }

    fn return_loan(
        &mut self,
        transaction: TransactionId,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        self.engine.return_loan(transaction, now)
    }

    fn add_book(&mut self, draft: BookDraft) -> Result<Book, CirculationError> {
        self.engine.add_book(draft)
    }

    fn update_book(&mut self, id: BookId, draft: BookDraft) -> Result<Book, CirculationError> {
        self.engine.update_book(id, draft)
    }

    fn remove_book(&mut self, id: BookId) -> Result<(), CirculationError> {
        self.engine.remove_book(id).map(|_| ())
    }

    fn add_member(&mut self, draft: MemberDraft, today: NaiveDate) -> Result<Member, CirculationError> {
        self.engine.add_member(draft, today)
    }

    fn update_member(
        &mut self,
        id: MemberId,
        draft: MemberDraft,
        today: NaiveDate,
    ) -> Result<Member, CirculationError> {
        self.engine.update_member(id, draft, today)
    }

    fn remove_member(&mut self, id: MemberId) -> Result<(), CirculationError> {
        self.engine.remove_member(id).map(|_| ())
    }
}
