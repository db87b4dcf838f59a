//! Circulation engine
//!
//! This module provides the CirculationEngine that runs circulation desk
//! operations against one snapshot by coordinating the Catalog, the
//! MemberRegistry and the TransactionLedger.
//!
//! The engine enforces business rules such as:
//! - Entity lookups before evaluation (unknown ids yield `NotFound`)
//! - Borrow and return decisions through the lifecycle evaluator
//! - Committing the evaluator's results to every store, or to none
//! - Refusing to remove books or members that still have open loans

use super::catalog::Catalog;
use super::ledger::TransactionLedger;
use super::lifecycle::{self, accrued_fine, days_overdue};
use super::notice::{self, Notice};
use super::policy::LoanPolicy;
use super::registry::MemberRegistry;
use super::search::search;
use super::stats::DashboardStats;
use crate::types::{
    Book, BookDraft, BookId, BorrowingTransaction, CirculationError, LoanAction, LoanRequest,
    Member, MemberDraft, MemberId, Snapshot, TransactionId,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Result of a successful borrow or return
#[derive(Debug, Clone, PartialEq)]
pub struct LoanReceipt {
    /// The transaction as stored after the operation
    pub transaction: BorrowingTransaction,

    /// The book as stored after the operation
    pub book: Book,

    /// Confirmation addressed to the member
    pub notice: Notice,
}

/// One line of the overdue report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverdueEntry {
    pub transaction: TransactionId,
    pub book: BookId,
    pub title: String,
    pub member: MemberId,
    pub member_name: String,
    #[serde(with = "crate::types::timestamp")]
    pub due_date: DateTime<Utc>,
    pub days_overdue: u64,
    pub fine: Decimal,
}

/// Single-threaded circulation engine
///
/// Owns the catalog, member registry and ledger built from a snapshot. Every
/// mutating operation either commits fully or leaves the engine untouched.
#[derive(Debug, Clone, Default)]
pub struct CirculationEngine {
    catalog: Catalog,
    registry: MemberRegistry,
    ledger: TransactionLedger,
    policy: LoanPolicy,
}

impl CirculationEngine {
    /// Create an engine with no books, members or loans
    pub fn new(policy: LoanPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Create an engine over the contents of `snapshot`
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the snapshot contains duplicate
    /// identifiers or books with inconsistent copy counts.
    pub fn from_snapshot(snapshot: Snapshot, policy: LoanPolicy) -> Result<Self, CirculationError> {
        let mut catalog = Catalog::from_books(snapshot.books)?;
        let mut registry = MemberRegistry::from_members(snapshot.members)?;
        let ledger = TransactionLedger::from_transactions(snapshot.transactions)?;

        // Removed books and members stay referenced by the history
        for tx in ledger.as_slice() {
            catalog.reserve_through(tx.book_id);
            registry.reserve_through(tx.member_id);
        }

        Ok(Self {
            catalog,
            registry,
            ledger,
            policy,
        })
    }

    /// Copy the engine's current state out as a snapshot
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            books: self.catalog.list().into_iter().cloned().collect(),
            members: self.registry.list().into_iter().cloned().collect(),
            transactions: self.ledger.as_slice().to_vec(),
        }
    }

    /// Consume the engine, returning its state as a snapshot
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            books: self.catalog.into_books(),
            members: self.registry.into_members(),
            transactions: self.ledger.into_transactions(),
        }
    }

    pub fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    /// Lend a copy of `book` to `member` at `now`
    ///
    /// # Arguments
    ///
    /// * `book` - Identifier of the book to lend
    /// * `member` - Identifier of the borrowing member
    /// * `now` - Time of the borrow
    ///
    /// # Returns
    ///
    /// * `Ok(LoanReceipt)` with the new transaction, the updated book and a
    ///   borrow confirmation
    /// * `Err(CirculationError)` if the borrow is refused
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown book or member, otherwise whatever
    /// the evaluator refuses with (`MemberNotEligible`,
    /// `BorrowLimitExceeded`, `BookUnavailable`).
    pub fn borrow(
        &mut self,
        book: BookId,
        member: MemberId,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        let book = self.catalog.get(book)?;
        let member = self.registry.get(member)?;

        let outcome = lifecycle::attempt_borrow(
            self.ledger.next_id(),
            book,
            member,
            self.ledger.as_slice(),
            now,
            &self.policy,
        )?;

        self.catalog.replace(outcome.book.clone())?;
        self.ledger.record(outcome.transaction.clone())?;

        let notice = Notice::borrow_confirmation(&outcome.transaction, &outcome.book);
        tracing::info!(member = notice.member_id, "{}", notice.message);
        Ok(LoanReceipt {
            transaction: outcome.transaction,
            book: outcome.book,
            notice,
        })
    }

    /// Take back the copy lent by `transaction` at `now`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown transaction or a transaction whose
    /// book is gone, `AlreadyReturned` for a closed loan, or a
    /// `ValidationError` if the return cannot be applied.
    pub fn return_loan(
        &mut self,
        transaction: TransactionId,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        let transaction = self.ledger.get(transaction)?;
        let book = self.catalog.get(transaction.book_id)?;

        let outcome = lifecycle::attempt_return(transaction, book, now)?;

        self.catalog.replace(outcome.book.clone())?;
        self.ledger.replace(outcome.transaction.clone())?;

        let notice = Notice::return_confirmation(&outcome.transaction, &outcome.book);
        tracing::info!(member = notice.member_id, "{}", notice.message);
        Ok(LoanReceipt {
            transaction: outcome.transaction,
            book: outcome.book,
            notice,
        })
    }

    /// Apply one loan request, using its own time if it carries one
    pub fn apply(
        &mut self,
        request: &LoanRequest,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        let at = request.effective_at(now);
        match request.action {
            LoanAction::Borrow { book, member } => self.borrow(book, member, at),
            LoanAction::Return { transaction } => self.return_loan(transaction, at),
        }
    }

    pub fn book(&self, id: BookId) -> Result<&Book, CirculationError> {
        self.catalog.get(id)
    }

    pub fn books(&self) -> Vec<&Book> {
        self.catalog.list()
    }

    pub fn available_books(&self) -> Vec<&Book> {
        self.catalog.available()
    }

    /// Books whose title, author or genre contains `query`
    pub fn search_books(&self, query: &str) -> Vec<&Book> {
        search(self.catalog.list(), query)
    }

    /// Add a book to the catalog
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the draft is invalid.
    pub fn add_book(&mut self, draft: BookDraft) -> Result<Book, CirculationError> {
        self.catalog.insert(draft).cloned()
    }

    /// Replace a book's details, keeping its copies on loan
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown book or a `ValidationError` if the
    /// new total is below the copies on loan.
    pub fn update_book(&mut self, id: BookId, draft: BookDraft) -> Result<Book, CirculationError> {
        self.catalog.update(id, draft).cloned()
    }

    /// Remove a book with no copies on loan
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown book or a `ValidationError` if an
    /// open loan still references it.
    pub fn remove_book(&mut self, id: BookId) -> Result<Book, CirculationError> {
        self.catalog.get(id)?;
        if self.ledger.has_open_loan_for_book(id) {
            return Err(CirculationError::validation(format!(
                "book {} still has copies on loan",
                id
            )));
        }
        self.catalog.remove(id)
    }

    pub fn member(&self, id: MemberId) -> Result<&Member, CirculationError> {
        self.registry.get(id)
    }

    pub fn members(&self) -> Vec<&Member> {
        self.registry.list()
    }

    pub fn active_members(&self) -> Vec<&Member> {
        self.registry.active()
    }

    /// Members whose name or email contains `query`
    pub fn search_members(&self, query: &str) -> Vec<&Member> {
        search(self.registry.list(), query)
    }

    /// Register a member, dating the registration `today` unless the draft
    /// says otherwise
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the draft is invalid or the email is
    /// taken.
    pub fn add_member(
        &mut self,
        draft: MemberDraft,
        today: NaiveDate,
    ) -> Result<Member, CirculationError> {
        self.registry.insert(draft, today).cloned()
    }

    /// Replace a member's details
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown member or a `ValidationError` if the
    /// draft is invalid.
    pub fn update_member(
        &mut self,
        id: MemberId,
        draft: MemberDraft,
        today: NaiveDate,
    ) -> Result<Member, CirculationError> {
        self.registry.update(id, draft, today).cloned()
    }

    /// Remove a member holding no open loans
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown member or a `ValidationError` if the
    /// member still has books out.
    pub fn remove_member(&mut self, id: MemberId) -> Result<Member, CirculationError> {
        self.registry.get(id)?;
        if self.ledger.has_open_loan_for_member(id) {
            return Err(CirculationError::validation(format!(
                "member {} still has books on loan",
                id
            )));
        }
        self.registry.remove(id)
    }

    pub fn transaction(&self, id: TransactionId) -> Result<&BorrowingTransaction, CirculationError> {
        self.ledger.get(id)
    }

    pub fn transactions(&self) -> &[BorrowingTransaction] {
        self.ledger.as_slice()
    }

    /// Every loan of `member`, returned ones included
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown member.
    pub fn member_loans(&self, member: MemberId) -> Result<Vec<&BorrowingTransaction>, CirculationError> {
        self.registry.get(member)?;
        Ok(self.ledger.for_member(member))
    }

    /// Overdue loans at `now` with their lateness and accrued fine
    ///
    /// Loans whose book or member has disappeared are still reported, with
    /// an empty title or name.
    pub fn overdue(&self, now: DateTime<Utc>) -> Vec<OverdueEntry> {
        lifecycle::overdue(self.ledger.as_slice(), now)
            .into_iter()
            .map(|tx| OverdueEntry {
                transaction: tx.id,
                book: tx.book_id,
                title: self
                    .catalog
                    .get(tx.book_id)
                    .map(|b| b.title.clone())
                    .unwrap_or_default(),
                member: tx.member_id,
                member_name: self
                    .registry
                    .get(tx.member_id)
                    .map(|m| m.name.clone())
                    .unwrap_or_default(),
                due_date: tx.due_date,
                days_overdue: days_overdue(tx, now),
                fine: accrued_fine(tx, now, &self.policy),
            })
            .collect()
    }

    /// Overdue notices for every late loan at `now`
    pub fn overdue_notices(&self, now: DateTime<Utc>) -> Vec<Notice> {
        notice::overdue_notices(&self.snapshot(), now)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> DashboardStats {
        DashboardStats::compute(&self.snapshot(), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::demo::demo_snapshot;
    use crate::types::{EntityKind, LoanStatus, MembershipStatus};
    use chrono::{TimeDelta, TimeZone};
    use rstest::{fixture, rstest};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 20, 10, 0, 0).unwrap()
    }

    #[fixture]
    fn engine() -> CirculationEngine {
        CirculationEngine::from_snapshot(demo_snapshot(now()), LoanPolicy::default()).unwrap()
    }

    #[rstest]
    fn test_borrow_commits_book_and_transaction(mut engine: CirculationEngine) {
        let receipt = engine.borrow(4, 1, now()).unwrap();

        assert_eq!(receipt.transaction.id, 5);
        assert_eq!(receipt.transaction.due_date, now() + TimeDelta::days(14));
        assert_eq!(receipt.book.available_copies, 1);
        assert_eq!(engine.book(4).unwrap().available_copies, 1);
        assert_eq!(engine.transaction(5).unwrap(), &receipt.transaction);
        assert!(receipt.notice.message.contains("A Brief History of Time"));
    }

    #[rstest]
    fn test_borrow_unknown_ids(mut engine: CirculationEngine) {
        assert_eq!(
            engine.borrow(99, 1, now()).unwrap_err(),
            CirculationError::not_found(EntityKind::Book, 99)
        );
        assert_eq!(
            engine.borrow(1, 99, now()).unwrap_err(),
            CirculationError::not_found(EntityKind::Member, 99)
        );
    }

    #[rstest]
    fn test_refused_borrow_changes_nothing(mut engine: CirculationEngine) {
        let before = engine.snapshot();

        assert_eq!(
            engine.borrow(3, 2, now()).unwrap_err(),
            CirculationError::book_unavailable(3)
        );
        assert_eq!(
            engine.borrow(1, 3, now()).unwrap_err(),
            CirculationError::member_not_eligible(3, MembershipStatus::Suspended)
        );
        assert_eq!(engine.snapshot(), before);
    }

    #[rstest]
    fn test_limit_applies_per_member() {
        let policy = LoanPolicy::new(14, 2, Decimal::ZERO);
        let mut engine = CirculationEngine::from_snapshot(demo_snapshot(now()), policy).unwrap();

        // John already holds two loans
        assert_eq!(
            engine.borrow(4, 1, now()).unwrap_err(),
            CirculationError::borrow_limit_exceeded(1, 2, 2)
        );
        // Jane holds one
        assert!(engine.borrow(4, 2, now()).is_ok());
    }

    #[rstest]
    fn test_return_restores_copy_once(mut engine: CirculationEngine) {
        let later = now() + TimeDelta::hours(2);
        let receipt = engine.return_loan(1, later).unwrap();

        assert_eq!(receipt.transaction.status, LoanStatus::Returned);
        assert_eq!(receipt.transaction.return_date, Some(later));
        assert_eq!(engine.book(1).unwrap().available_copies, 5);
        assert!(receipt.notice.message.ends_with("Thank you!"));

        assert_eq!(
            engine.return_loan(1, later).unwrap_err(),
            CirculationError::already_returned(1)
        );
        assert_eq!(engine.book(1).unwrap().available_copies, 5);
    }

    #[test]
    fn test_stored_overdue_status_is_returnable() {
        let mut snapshot = demo_snapshot(now());
        snapshot.transactions[1].status = LoanStatus::Overdue;
        let mut engine = CirculationEngine::from_snapshot(snapshot, LoanPolicy::default()).unwrap();

        assert_eq!(engine.overdue(now()).len(), 1);

        let receipt = engine.return_loan(2, now()).unwrap();
        assert_eq!(receipt.transaction.status, LoanStatus::Returned);
        assert_eq!(engine.book(2).unwrap().available_copies, 3);
        assert!(engine.overdue(now()).is_empty());
    }

    #[rstest]
    fn test_apply_uses_request_time(mut engine: CirculationEngine) {
        let at = now() - TimeDelta::days(3);
        let request = LoanRequest {
            action: LoanAction::Borrow { book: 4, member: 2 },
            at: Some(at),
        };
        let receipt = engine.apply(&request, now()).unwrap();
        assert_eq!(receipt.transaction.borrow_date, at);
    }

    #[rstest]
    fn test_overdue_report(engine: CirculationEngine) {
        let report = engine.overdue(now());
        assert_eq!(report.len(), 1);

        let entry = &report[0];
        assert_eq!(entry.transaction, 2);
        assert_eq!(entry.title, "To Kill a Mockingbird");
        assert_eq!(entry.member_name, "Jane Smith");
        assert_eq!(entry.days_overdue, 6);
        assert_eq!(entry.fine, Decimal::new(300, 2));
        assert_eq!(engine.overdue_notices(now()).len(), 1);
    }

    #[rstest]
    fn test_remove_with_open_loans_is_refused(mut engine: CirculationEngine) {
        assert!(matches!(
            engine.remove_book(1),
            Err(CirculationError::ValidationError { .. })
        ));
        assert!(matches!(
            engine.remove_member(2),
            Err(CirculationError::ValidationError { .. })
        ));

        assert_eq!(engine.remove_member(3).unwrap().name, "Bob Johnson");
        assert_eq!(engine.remove_book(4).unwrap().id, 4);
        assert_eq!(engine.books().len(), 3);
    }

    #[rstest]
    fn test_removed_ids_are_not_reassigned(mut engine: CirculationEngine) {
        let draft = || BookDraft {
            title: "Other".to_string(),
            author: "Someone Else".to_string(),
            available_copies: 1,
            ..BookDraft::default()
        };

        // Book 4 is only referenced by the returned transaction 4
        engine.remove_book(4).unwrap();
        assert_eq!(engine.add_book(draft()).unwrap().id, 5);

        engine.remove_book(5).unwrap();
        let mut reloaded =
            CirculationEngine::from_snapshot(engine.snapshot(), LoanPolicy::default()).unwrap();
        let after_reload = reloaded.add_book(draft()).unwrap();
        assert_eq!(after_reload.id, 5);
        assert_eq!(reloaded.transaction(4).unwrap().book_id, 4);
        assert!(reloaded.book(4).is_err());

        engine.remove_member(3).unwrap();
        let member = engine
            .add_member(
                MemberDraft {
                    name: "Ada Lovelace".to_string(),
                    email: "ada@example.org".to_string(),
                    ..MemberDraft::default()
                },
                now().date_naive(),
            )
            .unwrap();
        assert_eq!(member.id, 4);
    }

    #[test]
    fn test_history_references_reserve_ids() {
        let mut snapshot = demo_snapshot(now());
        // Drop the returned book and its borrower's registration from the collections
        snapshot.books.retain(|book| book.id != 4);
        snapshot.members.retain(|member| member.id != 3);
        snapshot.transactions[3].member_id = 7;

        let mut engine = CirculationEngine::from_snapshot(snapshot, LoanPolicy::default()).unwrap();

        let book = engine
            .add_book(BookDraft {
                title: "Other".to_string(),
                author: "Someone Else".to_string(),
                available_copies: 1,
                ..BookDraft::default()
            })
            .unwrap();
        assert_eq!(book.id, 5);

        let member = engine
            .add_member(
                MemberDraft {
                    name: "Ada Lovelace".to_string(),
                    email: "ada@example.org".to_string(),
                    ..MemberDraft::default()
                },
                now().date_naive(),
            )
            .unwrap();
        assert_eq!(member.id, 8);
    }

    #[rstest]
    fn test_add_update_and_search(mut engine: CirculationEngine) {
        let added = engine
            .add_book(BookDraft {
                title: "Brave New World".to_string(),
                author: "Aldous Huxley".to_string(),
                genre: Some("Dystopian Fiction".to_string()),
                available_copies: 2,
                ..BookDraft::default()
            })
            .unwrap();
        assert_eq!(added.id, 5);
        assert_eq!(added.total_copies, 2);

        let ids: Vec<_> = engine.search_books("DYSTOPIAN").iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![3, 5]);

        let today = now().date_naive();
        let member = engine
            .add_member(
                MemberDraft {
                    name: "Grace Hopper".to_string(),
                    email: "grace@example.org".to_string(),
                    ..MemberDraft::default()
                },
                today,
            )
            .unwrap();
        assert_eq!(member.registration_date, Some(today));
        assert_eq!(engine.search_members("hopper").len(), 1);
        assert_eq!(engine.active_members().len(), 3);
    }

    #[rstest]
    fn test_member_loans_and_stats(engine: CirculationEngine) {
        let loans: Vec<_> = engine.member_loans(2).unwrap().iter().map(|tx| tx.id).collect();
        assert_eq!(loans, vec![2, 4]);
        assert!(engine.member_loans(42).is_err());

        let stats = engine.stats(now());
        assert_eq!(stats.active_transactions, 3);
        assert_eq!(stats.overdue_books, 1);
    }

    #[rstest]
    fn test_snapshot_round_trips_through_engine(engine: CirculationEngine) {
        let snapshot = engine.snapshot();
        let rebuilt = CirculationEngine::from_snapshot(snapshot.clone(), LoanPolicy::default()).unwrap();
        assert_eq!(rebuilt.into_snapshot(), snapshot);
    }
}
