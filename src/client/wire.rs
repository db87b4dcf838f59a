//! JSON shapes the REST backend uses for borrowing transactions
//!
//! The backend embeds the full book and member in every transaction. Only
//! their identifiers are kept.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::types::{
    timestamp, BookId, BorrowingTransaction, LoanStatus, MemberId, TransactionId,
};

#[derive(Debug, Clone, Deserialize)]
pub struct BookRef {
    #[serde(rename = "bookId", alias = "id")]
    pub id: BookId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberRef {
    #[serde(rename = "memberId", alias = "id")]
    pub id: MemberId,
}

/// A borrowing transaction as the backend sends it
///
/// References may come embedded (`book`, `member`) or flat (`bookId`,
/// `memberId`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTransaction {
    #[serde(rename = "transactionId", alias = "id")]
    pub id: TransactionId,

    #[serde(default)]
    pub book: Option<BookRef>,

    #[serde(default)]
    pub book_id: Option<BookId>,

    #[serde(default)]
    pub member: Option<MemberRef>,

    #[serde(default)]
    pub member_id: Option<MemberId>,

    #[serde(with = "timestamp")]
    pub borrow_date: DateTime<Utc>,

    #[serde(default, with = "timestamp::option")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp::option")]
    pub return_date: Option<DateTime<Utc>>,

    pub status: LoanStatus,
}

impl WireTransaction {
    /// Reduce to a domain transaction
    ///
    /// A missing due date is computed from the borrow date and
    /// `loan_period`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the missing reference if the transaction
    /// carries no book or no member.
    pub fn into_transaction(self, loan_period: TimeDelta) -> Result<BorrowingTransaction, String> {
        let book_id = self
            .book
            .map(|book| book.id)
            .or(self.book_id)
            .ok_or_else(|| format!("transaction {} has no book", self.id))?;
        let member_id = self
            .member
            .map(|member| member.id)
            .or(self.member_id)
            .ok_or_else(|| format!("transaction {} has no member", self.id))?;

        Ok(BorrowingTransaction {
            id: self.id,
            book_id,
            member_id,
            borrow_date: self.borrow_date,
            due_date: self.due_date.unwrap_or(self.borrow_date + loan_period),
            return_date: self.return_date,
            status: self.status,
        })
    }
}
