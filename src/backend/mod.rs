//! Storage backends for the circulation desk
//!
//! A backend owns the library's state between CLI invocations. Every backend
//! answers queries and performs mutations through the same trait, so the
//! command layer never knows where the data lives.
//!
//! - `file` - JSON snapshot file, evaluated in process
//! - `remote` - REST backend, validated client-side before each mutation
//! - `memory` - In-process snapshot that is discarded on exit (offline demo)

use crate::core::{CirculationEngine, DashboardStats, LoanPolicy, LoanReceipt, Notice, OverdueEntry};
use crate::types::{
    Book, BookDraft, BookId, BorrowingTransaction, CirculationError, Member, MemberDraft, MemberId,
    Snapshot, TransactionId,
};
use chrono::{DateTime, NaiveDate, Utc};

pub mod file;
pub mod memory;
pub mod remote;

pub use file::SnapshotBackend;
pub use memory::MemoryBackend;
pub use remote::RemoteBackend;

/// Source and sink of the library's state
///
/// Queries have default implementations that evaluate a freshly read
/// snapshot; backends with cheaper ways to answer them override them.
pub trait Backend: Send {
    /// Loan policy used when evaluating requests
    fn policy(&self) -> &LoanPolicy;

    /// Read the complete current state
    fn snapshot(&self) -> Result<Snapshot, CirculationError>;

    /// Whether `store` is supported
    fn stores_snapshots(&self) -> bool {
        false
    }

    /// Replace the complete state
    ///
    /// Only backends that own their state support this.
    fn store(&mut self, snapshot: Snapshot) -> Result<(), CirculationError> {
        let _ = snapshot;
        Err(CirculationError::validation(
            "this backend does not support replacing its state",
        ))
    }

    /// Whether the backend can currently serve requests
    fn health(&self) -> bool;

    fn borrow(
        &mut self,
        book: BookId,
        member: MemberId,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError>;

    fn return_loan(
        &mut self,
        transaction: TransactionId,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError>;

    fn add_book(&mut self, draft: BookDraft) -> Result<Book, CirculationError>;

    fn update_book(&mut self, id: BookId, draft: BookDraft) -> Result<Book, CirculationError>;

    fn remove_book(&mut self, id: BookId) -> Result<(), CirculationError>;

    fn add_member(&mut self, draft: MemberDraft, today: NaiveDate) -> Result<Member, CirculationError>;

    fn update_member(
        &mut self,
        id: MemberId,
        draft: MemberDraft,
        today: NaiveDate,
    ) -> Result<Member, CirculationError>;

    fn remove_member(&mut self, id: MemberId) -> Result<(), CirculationError>;

    /// Engine over the current snapshot, for evaluating queries
    fn engine(&self) -> Result<CirculationEngine, CirculationError> {
        CirculationEngine::from_snapshot(self.snapshot()?, self.policy().clone())
    }

    fn books(&self) -> Result<Vec<Book>, CirculationError> {
        Ok(self.snapshot()?.books)
    }

    fn book(&self, id: BookId) -> Result<Book, CirculationError> {
        self.engine()?.book(id).cloned()
    }

    fn search_books(&self, keyword: &str) -> Result<Vec<Book>, CirculationError> {
        Ok(self.engine()?.search_books(keyword).into_iter().cloned().collect())
    }

    fn available_books(&self) -> Result<Vec<Book>, CirculationError> {
        Ok(self.engine()?.available_books().into_iter().cloned().collect())
    }

    fn members(&self) -> Result<Vec<Member>, CirculationError> {
        Ok(self.snapshot()?.members)
    }

    fn member(&self, id: MemberId) -> Result<Member, CirculationError> {
        self.engine()?.member(id).cloned()
    }

    fn search_members(&self, name: &str) -> Result<Vec<Member>, CirculationError> {
        Ok(self.engine()?.search_members(name).into_iter().cloned().collect())
    }

    fn active_members(&self) -> Result<Vec<Member>, CirculationError> {
        Ok(self.engine()?.active_members().into_iter().cloned().collect())
    }

    fn transactions(&self) -> Result<Vec<BorrowingTransaction>, CirculationError> {
        Ok(self.snapshot()?.transactions)
    }

    fn member_loans(&self, member: MemberId) -> Result<Vec<BorrowingTransaction>, CirculationError> {
        Ok(self
            .engine()?
            .member_loans(member)?
            .into_iter()
            .cloned()
            .collect())
    }

    fn overdue(&self, now: DateTime<Utc>) -> Result<Vec<OverdueEntry>, CirculationError> {
        Ok(self.engine()?.overdue(now))
    }

    fn overdue_notices(&self, now: DateTime<Utc>) -> Result<Vec<Notice>, CirculationError> {
        Ok(self.engine()?.overdue_notices(now))
    }

    fn stats(&self, now: DateTime<Utc>) -> Result<DashboardStats, CirculationError> {
        Ok(self.engine()?.stats(now))
    }
}
