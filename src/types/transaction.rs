//! Borrowing transaction types
//!
//! This module defines the stored borrowing transaction, its status, and the
//! loan requests that drive borrow and return operations.

use super::book::BookId;
use super::member::MemberId;
use super::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Borrowing transaction identifier
pub type TransactionId = u64;

/// Status of a borrowing transaction
///
/// Only `Borrowed` and `Returned` are ever stored by this crate. `Overdue` is
/// derived from the due date at read time, but is accepted on input because
/// the backend may report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// The book is out with the member
    Borrowed,

    /// The book came back
    Returned,

    /// The book is out and past its due date
    Overdue,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanStatus::Borrowed => write!(f, "BORROWED"),
            LoanStatus::Returned => write!(f, "RETURNED"),
            LoanStatus::Overdue => write!(f, "OVERDUE"),
        }
    }
}

/// A loan of one copy of a book to one member
///
/// Transactions reference books and members by identifier only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowingTransaction {
    /// Unique transaction identifier
    #[serde(rename = "transactionId", alias = "id")]
    pub id: TransactionId,

    /// The borrowed book
    pub book_id: BookId,

    /// The borrowing member
    pub member_id: MemberId,

    #[serde(with = "timestamp")]
    pub borrow_date: DateTime<Utc>,

    /// `borrow_date` plus the loan period in force when the loan was made
    #[serde(with = "timestamp")]
    pub due_date: DateTime<Utc>,

    /// Set when the book comes back
    #[serde(default, with = "timestamp::option")]
    pub return_date: Option<DateTime<Utc>>,

    pub status: LoanStatus,
}

impl BorrowingTransaction {
    /// Whether the loan is still outstanding
    ///
    /// A loan is open until a return date is recorded or its stored status is
    /// `Returned`. A stored `Overdue` status still counts as open: overdue is
    /// derived from the due date, so such a loan can be returned normally.
    pub fn is_open(&self) -> bool {
        self.return_date.is_none() && self.status != LoanStatus::Returned
    }
}

/// Operation requested at the circulation desk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanAction {
    /// Lend a copy of `book` to `member`
    Borrow { book: BookId, member: MemberId },

    /// Take back the copy lent by `transaction`
    Return { transaction: TransactionId },
}

/// A loan request, as read from a request file
///
/// `at` is the time the request was made; requests without one are applied
/// at the caller's `now`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRequest {
    pub action: LoanAction,
    pub at: Option<DateTime<Utc>>,
}

impl LoanRequest {
    /// Time the request takes effect, falling back to `now`
    pub fn effective_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.at.unwrap_or(now)
    }
}
