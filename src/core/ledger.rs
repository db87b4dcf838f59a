//! Transaction ledger
//!
//! This module provides the TransactionLedger component that keeps the full
//! borrowing history of a snapshot. Loans are never deleted: a return closes
//! a transaction in place, so the ledger doubles as the circulation history.
//!
//! # Ordering
//!
//! Transactions are kept in identifier order. Identifiers are assigned by
//! the ledger and only ever grow.

use crate::types::{
    BookId, BorrowingTransaction, CirculationError, EntityKind, MemberId, TransactionId,
};

/// Borrowing history, ordered by transaction identifier
#[derive(Debug, Clone, Default)]
pub struct TransactionLedger {
    transactions: Vec<BorrowingTransaction>,
}

impl TransactionLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from recorded transactions
    ///
    /// The transactions are sorted by identifier.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if an identifier appears twice.
    pub fn from_transactions(
        mut transactions: Vec<BorrowingTransaction>,
    ) -> Result<Self, CirculationError> {
        transactions.sort_by_key(|tx| tx.id);
        if let Some(pair) = transactions.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(CirculationError::validation(format!(
                "duplicate transaction id {}",
                pair[0].id
            )));
        }
        Ok(Self { transactions })
    }

    /// Identifier the next recorded transaction should carry
    pub fn next_id(&self) -> TransactionId {
        self.transactions.last().map_or(1, |tx| tx.id + 1)
    }

    /// Append a newly opened transaction
    ///
    /// # Arguments
    ///
    /// * `transaction` - The transaction to record; its id must be `next_id()`
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the identifier is out of sequence.
    pub fn record(&mut self, transaction: BorrowingTransaction) -> Result<(), CirculationError> {
        let expected = self.next_id();
        if transaction.id != expected {
            return Err(CirculationError::validation(format!(
                "transaction id {} is out of sequence, expected {}",
                transaction.id, expected
            )));
        }
        self.transactions.push(transaction);
        Ok(())
    }

    /// Look a transaction up by identifier
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such transaction exists.
    pub fn get(&self, id: TransactionId) -> Result<&BorrowingTransaction, CirculationError> {
        self.position(id).map(|index| &self.transactions[index])
    }

    /// Overwrite a recorded transaction, typically after a return
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the transaction was never recorded.
    pub fn replace(&mut self, transaction: BorrowingTransaction) -> Result<(), CirculationError> {
        let index = self.position(transaction.id)?;
        self.transactions[index] = transaction;
        Ok(())
    }

    /// All transactions, oldest first
    pub fn as_slice(&self) -> &[BorrowingTransaction] {
        &self.transactions
    }

    /// Every transaction of `member`, open or closed
    pub fn for_member(&self, member: MemberId) -> Vec<&BorrowingTransaction> {
        self.transactions
            .iter()
            .filter(|tx| tx.member_id == member)
            .collect()
    }

    /// Whether any open loan references `book`
    pub fn has_open_loan_for_book(&self, book: BookId) -> bool {
        self.transactions
            .iter()
            .any(|tx| tx.book_id == book && tx.is_open())
    }

    /// Whether `member` holds any open loan
    pub fn has_open_loan_for_member(&self, member: MemberId) -> bool {
        self.transactions
            .iter()
            .any(|tx| tx.member_id == member && tx.is_open())
    }

    pub fn into_transactions(self) -> Vec<BorrowingTransaction> {
        self.transactions
    }

    fn position(&self, id: TransactionId) -> Result<usize, CirculationError> {
        self.transactions
            .binary_search_by_key(&id, |tx| tx.id)
            .map_err(|_| CirculationError::not_found(EntityKind::Transaction, id))
    }
}
