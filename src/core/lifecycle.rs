//! Borrowing lifecycle evaluator
//!
//! Pure functions that decide whether a borrow or return is allowed, compute
//! its effects, and classify loans against an explicit `now`. Nothing here
//! performs I/O or keeps state: callers pass in snapshots of the books,
//! members and transactions involved, and persist the values that come back.
//!
//! # Borrowing
//!
//! A borrow succeeds when, checked in this order:
//! 1. the member is `Active` (else `MemberNotEligible`)
//! 2. the member's open loans are below the policy limit (else
//!    `BorrowLimitExceeded`)
//! 3. the book has a copy on the shelf (else `BookUnavailable`)
//!
//! The result is a new `Borrowed` transaction due `loan_period_days` after
//! `now`, together with the book holding one copy fewer. On failure nothing
//! is produced, so there is nothing to roll back.
//!
//! # Overdue classification
//!
//! `Overdue` is never stored. An open loan is overdue whenever `now` is past
//! its due date, and it is late by the number of started days since then.

use super::policy::LoanPolicy;
use crate::types::{
    Book, BorrowingTransaction, CirculationError, LoanStatus, Member, MemberId, TransactionId,
};
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

/// Result of a successful borrow
#[derive(Debug, Clone, PartialEq)]
pub struct BorrowOutcome {
    /// The newly opened loan
    pub transaction: BorrowingTransaction,

    /// The book with one copy fewer on the shelf
    pub book: Book,
}

/// Result of a successful return
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnOutcome {
    /// The loan, now closed
    pub transaction: BorrowingTransaction,

    /// The book with its copy back on the shelf
    pub book: Book,
}

/// Check that the member may borrow at all
///
/// # Errors
///
/// Returns `MemberNotEligible` unless the member is `Active`.
pub fn ensure_eligible(member: &Member) -> Result<(), CirculationError> {
    if member.membership_status.can_borrow() {
        Ok(())
    } else {
        Err(CirculationError::member_not_eligible(
            member.id,
            member.membership_status,
        ))
    }
}

/// Check the member's open-loan count against the policy ceiling
///
/// # Errors
///
/// Returns `BorrowLimitExceeded` when `open_loans` has reached the limit.
pub fn ensure_within_limit(
    member: MemberId,
    open_loans: u32,
    policy: &LoanPolicy,
) -> Result<(), CirculationError> {
    match policy.max_open_loans {
        Some(limit) if open_loans >= limit => Err(CirculationError::borrow_limit_exceeded(
            member, open_loans, limit,
        )),
        _ => Ok(()),
    }
}

/// Count the loans `member` currently holds
pub fn open_loan_count(member: MemberId, transactions: &[BorrowingTransaction]) -> u32 {
    let count = transactions
        .iter()
        .filter(|tx| tx.member_id == member && tx.is_open())
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Take one copy off the shelf
///
/// # Errors
///
/// Returns `BookUnavailable` if no copy is available.
pub fn checkout_copy(book: &Book) -> Result<Book, CirculationError> {
    let available_copies = book
        .available_copies
        .checked_sub(1)
        .ok_or_else(|| CirculationError::book_unavailable(book.id))?;

    Ok(Book {
        available_copies,
        ..book.clone()
    })
}

/// Put one copy back on the shelf
///
/// # Errors
///
/// Returns a `ValidationError` if every copy is already on the shelf, which
/// would break `available_copies <= total_copies`.
pub fn checkin_copy(book: &Book) -> Result<Book, CirculationError> {
    if book.available_copies >= book.total_copies {
        return Err(CirculationError::validation(format!(
            "book {} already has all {} copies on the shelf",
            book.id, book.total_copies
        )));
    }

    Ok(Book {
        available_copies: book.available_copies + 1,
        ..book.clone()
    })
}

/// Due date of a loan made at `borrowed`
///
/// # Errors
///
/// Returns a `ValidationError` if the date falls outside the representable
/// range.
pub fn due_date(
    borrowed: DateTime<Utc>,
    policy: &LoanPolicy,
) -> Result<DateTime<Utc>, CirculationError> {
    borrowed
        .checked_add_signed(policy.loan_period())
        .ok_or_else(|| CirculationError::validation("due date is out of range"))
}

/// Attempt to lend `book` to `member` at `now`
///
/// `transactions` must contain at least every loan of `member`; loans of
/// other members are ignored. `id` becomes the new transaction's identifier.
///
/// # Errors
///
/// Returns `MemberNotEligible`, `BorrowLimitExceeded` or `BookUnavailable`
/// as described in the module documentation.
pub fn attempt_borrow(
    id: TransactionId,
    book: &Book,
    member: &Member,
    transactions: &[BorrowingTransaction],
    now: DateTime<Utc>,
    policy: &LoanPolicy,
) -> Result<BorrowOutcome, CirculationError> {
    ensure_eligible(member)?;
    ensure_within_limit(member.id, open_loan_count(member.id, transactions), policy)?;
    let book = checkout_copy(book)?;

    let transaction = BorrowingTransaction {
        id,
        book_id: book.id,
        member_id: member.id,
        borrow_date: now,
        due_date: due_date(now, policy)?,
        return_date: None,
        status: LoanStatus::Borrowed,
    };

    Ok(BorrowOutcome { transaction, book })
}

/// Close an open loan at `now`
///
/// # Errors
///
/// Returns `AlreadyReturned` if the loan is closed, or a `ValidationError` if
/// `now` precedes the borrow date.
pub fn close_transaction(
    transaction: &BorrowingTransaction,
    now: DateTime<Utc>,
) -> Result<BorrowingTransaction, CirculationError> {
    if !transaction.is_open() {
        return Err(CirculationError::already_returned(transaction.id));
    }
    if now < transaction.borrow_date {
        return Err(CirculationError::validation(format!(
            "transaction {} cannot be returned before it was borrowed",
            transaction.id
        )));
    }

    Ok(BorrowingTransaction {
        return_date: Some(now),
        status: LoanStatus::Returned,
        ..transaction.clone()
    })
}

/// Attempt to take back the copy lent by `transaction` at `now`
///
/// `book` must be the book the transaction references.
///
/// # Errors
///
/// Returns `AlreadyReturned` if the loan is closed, or a `ValidationError` if
/// `book` is not the borrowed book or its copy counts cannot take the copy
/// back.
pub fn attempt_return(
    transaction: &BorrowingTransaction,
    book: &Book,
    now: DateTime<Utc>,
) -> Result<ReturnOutcome, CirculationError> {
    let transaction = close_transaction(transaction, now)?;
    if book.id != transaction.book_id {
        return Err(CirculationError::validation(format!(
            "transaction {} is for book {}, not book {}",
            transaction.id, transaction.book_id, book.id
        )));
    }
    let book = checkin_copy(book)?;

    Ok(ReturnOutcome { transaction, book })
}

/// Classify a loan at `now`
pub fn classify(transaction: &BorrowingTransaction, now: DateTime<Utc>) -> LoanStatus {
    if !transaction.is_open() {
        LoanStatus::Returned
    } else if now > transaction.due_date {
        LoanStatus::Overdue
    } else {
        LoanStatus::Borrowed
    }
}

/// Number of started days a loan is past due at `now`
///
/// Zero unless the loan classifies as `Overdue`.
pub fn days_overdue(transaction: &BorrowingTransaction, now: DateTime<Utc>) -> u64 {
    if classify(transaction, now) != LoanStatus::Overdue {
        return 0;
    }

    let late = now - transaction.due_date;
    let whole_days = late.num_days();
    let started_days = if late > TimeDelta::days(whole_days) {
        whole_days + 1
    } else {
        whole_days
    };
    u64::try_from(started_days).unwrap_or(0)
}

/// Fine accrued by a loan at `now`, rounded to cents
pub fn accrued_fine(
    transaction: &BorrowingTransaction,
    now: DateTime<Utc>,
    policy: &LoanPolicy,
) -> Decimal {
    let days = Decimal::from(days_overdue(transaction, now));
    policy
        .daily_fine
        .checked_mul(days)
        .unwrap_or(Decimal::MAX)
        .round_dp(2)
}

/// Loans that classify as `Overdue` at `now`, in input order
pub fn overdue(
    transactions: &[BorrowingTransaction],
    now: DateTime<Utc>,
) -> Vec<&BorrowingTransaction> {
    transactions
        .iter()
        .filter(|tx| classify(tx, now) == LoanStatus::Overdue)
        .collect()
}

/// Open loans held by `member`, in input order
pub fn open_loans(
    member: MemberId,
    transactions: &[BorrowingTransaction],
) -> Vec<&BorrowingTransaction> {
    transactions
        .iter()
        .filter(|tx| tx.member_id == member && tx.is_open())
        .collect()
}
