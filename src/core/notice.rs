//! Member notices produced by circulation events
//!
//! Borrowing and returning a book each produce a confirmation for the member,
//! and every overdue loan can produce an overdue notice. Notices are plain
//! values; delivering them is up to the caller.

use super::lifecycle::days_overdue;
use crate::types::{Book, BorrowingTransaction, MemberId, Snapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a notice is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeKind {
    BorrowConfirmation,
    ReturnConfirmation,
    OverdueNotice,
}

/// A message addressed to a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub member_id: MemberId,
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn borrow_confirmation(transaction: &BorrowingTransaction, book: &Book) -> Self {
        Self {
            member_id: transaction.member_id,
            kind: NoticeKind::BorrowConfirmation,
            message: format!(
                "You have successfully borrowed '{}'. Due date: {}",
                book.title,
                transaction.due_date.date_naive()
            ),
        }
    }

    pub fn return_confirmation(transaction: &BorrowingTransaction, book: &Book) -> Self {
        Self {
            member_id: transaction.member_id,
            kind: NoticeKind::ReturnConfirmation,
            message: format!("You have successfully returned '{}'. Thank you!", book.title),
        }
    }

    pub fn overdue_notice(transaction: &BorrowingTransaction, book: &Book, days: u64) -> Self {
        Self {
            member_id: transaction.member_id,
            kind: NoticeKind::OverdueNotice,
            message: format!(
                "Your book '{}' is {} {} overdue. Please return it immediately to avoid additional fines.",
                book.title,
                days,
                if days == 1 { "day" } else { "days" }
            ),
        }
    }
}

/// Overdue notices for every loan of `snapshot` that is late at `now`
///
/// Loans whose book is missing from the snapshot are skipped with a warning.
pub fn overdue_notices(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<Notice> {
    snapshot
        .transactions
        .iter()
        .filter_map(|tx| {
            let days = days_overdue(tx, now);
            if days == 0 {
                return None;
            }
            match snapshot.book(tx.book_id) {
                Some(book) => Some(Notice::overdue_notice(tx, book, days)),
                None => {
                    tracing::warn!(transaction = tx.id, book = tx.book_id, "Overdue loan references unknown book");
                    None
                }
            }
        })
        .collect()
}
