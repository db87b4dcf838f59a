//! Circulation orchestration for concurrent processing
//!
//! This module provides the `AsyncCirculationEngine`, which runs borrows and
//! returns from many tasks at once against shared, lock-sharded state.
//!
//! # Architecture
//!
//! ```text
//! AsyncCirculationEngine
//!     ├── Arc<AsyncCatalog>                 (copy counts, atomic decrement)
//!     ├── DashMap<MemberId, Member>         (read-only during processing)
//!     ├── DashMap<MemberId, u32>            (open loans per member)
//!     ├── DashMap<TransactionId, BorrowingTransaction>
//!     └── AtomicU64                         (next transaction id)
//! ```
//!
//! # Locking
//!
//! A borrow holds the member's open-loan entry while it checks the limit and
//! takes a copy, so one member's concurrent borrows cannot exceed the limit.
//! A return holds the transaction's entry while it closes the loan and puts
//! the copy back, so a loan is returned at most once. Neither path takes the
//! locks in the opposite order of the other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::AsyncCatalog;
use crate::core::engine::LoanReceipt;
use crate::core::lifecycle;
use crate::core::notice::Notice;
use crate::core::policy::LoanPolicy;
use crate::types::{
    BookId, BorrowingTransaction, CirculationError, EntityKind, LoanAction, LoanRequest,
    LoanStatus, Member, MemberId, Snapshot, TransactionId,
};

/// Circulation engine safe to share across tasks
///
/// Cloning is cheap: clones share the same state.
#[derive(Debug, Clone)]
pub struct AsyncCirculationEngine {
    catalog: Arc<AsyncCatalog>,
    members: Arc<DashMap<MemberId, Member>>,
    open_loans: Arc<DashMap<MemberId, u32>>,
    transactions: Arc<DashMap<TransactionId, BorrowingTransaction>>,
    next_id: Arc<AtomicU64>,
    policy: LoanPolicy,
}

impl AsyncCirculationEngine {
    /// Create an engine over the contents of `snapshot`
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the snapshot contains duplicate
    /// identifiers or books with inconsistent copy counts.
    pub fn from_snapshot(snapshot: Snapshot, policy: LoanPolicy) -> Result<Self, CirculationError> {
        let catalog = AsyncCatalog::from_books(snapshot.books)?;

        let members = DashMap::new();
        for member in snapshot.members {
            let id = member.id;
            if members.insert(id, member).is_some() {
                return Err(CirculationError::validation(format!(
                    "duplicate member id {}",
                    id
                )));
            }
        }

        let open_loans: DashMap<MemberId, u32> = DashMap::new();
        let transactions = DashMap::new();
        let mut last_id = 0;
        for tx in snapshot.transactions {
            let id = tx.id;
            last_id = last_id.max(id);
            if tx.is_open() {
                *open_loans.entry(tx.member_id).or_insert(0) += 1;
            }
            if transactions.insert(id, tx).is_some() {
                return Err(CirculationError::validation(format!(
                    "duplicate transaction id {}",
                    id
                )));
            }
        }

        Ok(Self {
            catalog: Arc::new(catalog),
            members: Arc::new(members),
            open_loans: Arc::new(open_loans),
            transactions: Arc::new(transactions),
            next_id: Arc::new(AtomicU64::new(last_id + 1)),
            policy,
        })
    }

    /// Lend a copy of `book` to `member` at `now`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown book or member, otherwise
    /// `MemberNotEligible`, `BorrowLimitExceeded` or `BookUnavailable`.
    /// Nothing changes on error.
    pub fn borrow(
        &self,
        book: BookId,
        member: MemberId,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        self.catalog.get(book)?;
        let member = self
            .members
            .get(&member)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CirculationError::not_found(EntityKind::Member, member))?;
        lifecycle::ensure_eligible(&member)?;
        let due_date = lifecycle::due_date(now, &self.policy)?;

        let book = {
            let mut open = self.open_loans.entry(member.id).or_insert(0);
            lifecycle::ensure_within_limit(member.id, *open, &self.policy)?;
            let book = self.catalog.checkout_copy(book)?;
            *open += 1;
            book
        };

        let transaction = BorrowingTransaction {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            book_id: book.id,
            member_id: member.id,
            borrow_date: now,
            due_date,
            return_date: None,
            status: LoanStatus::Borrowed,
        };
        self.transactions.insert(transaction.id, transaction.clone());

        let notice = Notice::borrow_confirmation(&transaction, &book);
        tracing::debug!(transaction = transaction.id, "{}", notice.message);
        Ok(LoanReceipt {
            transaction,
            book,
            notice,
        })
    }

    /// Take back the copy lent by `transaction` at `now`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown transaction or book,
    /// `AlreadyReturned` for a closed loan, or a `ValidationError` if the
    /// copy cannot go back on the shelf.
    pub fn return_loan(
        &self,
        transaction: TransactionId,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        let (closed, book) = {
            let mut entry = self
                .transactions
                .get_mut(&transaction)
                .ok_or_else(|| CirculationError::not_found(EntityKind::Transaction, transaction))?;
            let closed = lifecycle::close_transaction(entry.value(), now)?;
            let book = self.catalog.checkin_copy(closed.book_id)?;
            *entry.value_mut() = closed.clone();
            (closed, book)
        };

        if let Some(mut open) = self.open_loans.get_mut(&closed.member_id) {
            *open = open.saturating_sub(1);
        }

        let notice = Notice::return_confirmation(&closed, &book);
        tracing::debug!(transaction = closed.id, "{}", notice.message);
        Ok(LoanReceipt {
            transaction: closed,
            book,
            notice,
        })
    }

    /// Apply one loan request, using its own time if it carries one
    pub fn apply(
        &self,
        request: &LoanRequest,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        let at = request.effective_at(now);
        match request.action {
            LoanAction::Borrow { book, member } => self.borrow(book, member, at),
            LoanAction::Return { transaction } => self.return_loan(transaction, at),
        }
    }

    /// Member a request is processed on behalf of
    ///
    /// Returns resolve through their transaction. `None` for a return of an
    /// unknown transaction.
    pub fn member_of(&self, request: &LoanRequest) -> Option<MemberId> {
        match request.action {
            LoanAction::Borrow { member, .. } => Some(member),
            LoanAction::Return { transaction } => self
                .transactions
                .get(&transaction)
                .map(|entry| entry.value().member_id),
        }
    }

    /// Copy the current state out as a snapshot, ordered by identifier
    pub fn snapshot(&self) -> Snapshot {
        let mut members: Vec<Member> = self
            .members
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        members.sort_by_key(|member| member.id);

        let mut transactions: Vec<BorrowingTransaction> = self
            .transactions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        transactions.sort_by_key(|tx| tx.id);

        Snapshot {
            books: self.catalog.books(),
            members,
            transactions,
        }
    }
}
