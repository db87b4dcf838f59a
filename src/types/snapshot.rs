//! Point-in-time view of the library's collections

use super::book::{Book, BookId};
use super::member::{Member, MemberId};
use super::transaction::{BorrowingTransaction, TransactionId};
use serde::{Deserialize, Serialize};

/// Books, members and borrowing transactions read at one instant
///
/// Snapshots are plain values: nothing in them is shared or live. Callers
/// fetch one, hand it to the evaluator, and persist whatever comes back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub books: Vec<Book>,

    #[serde(default)]
    pub members: Vec<Member>,

    #[serde(default)]
    pub transactions: Vec<BorrowingTransaction>,
}

impl Snapshot {
    pub fn book(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    pub fn transaction(&self, id: TransactionId) -> Option<&BorrowingTransaction> {
        self.transactions.iter().find(|tx| tx.id == id)
    }
}
