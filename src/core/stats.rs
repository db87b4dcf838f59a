//! Dashboard statistics over a snapshot

use super::lifecycle::{classify, overdue};
use crate::types::{LoanStatus, Snapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Headline numbers for the circulation dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_books: usize,
    /// Titles with at least one copy on the shelf
    pub available_books: usize,
    pub total_members: usize,
    pub active_members: usize,
    /// Open loans, overdue ones included
    pub active_transactions: usize,
    pub overdue_books: usize,
}

impl DashboardStats {
    /// Compute the statistics of `snapshot` at `now`
    pub fn compute(snapshot: &Snapshot, now: DateTime<Utc>) -> Self {
        Self {
            total_books: snapshot.books.len(),
            available_books: snapshot.books.iter().filter(|b| b.is_borrowable()).count(),
            total_members: snapshot.members.len(),
            active_members: snapshot.members.iter().filter(|m| m.is_active()).count(),
            active_transactions: snapshot
                .transactions
                .iter()
                .filter(|tx| classify(tx, now) != LoanStatus::Returned)
                .count(),
            overdue_books: overdue(&snapshot.transactions, now).len(),
        }
    }
}
