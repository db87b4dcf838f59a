//! Snapshot-file backend
//!
//! Each operation reads the JSON snapshot, evaluates it with a
//! `CirculationEngine` and, for mutations, writes the result back. Queries
//! require the file to exist; the first mutation creates it.

use super::Backend;
use crate::core::{CirculationEngine, LoanPolicy, LoanReceipt};
use crate::io::snapshot_file;
use crate::types::{
    Book, BookDraft, BookId, CirculationError, Member, MemberDraft, MemberId, Snapshot,
    TransactionId,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Path, PathBuf};

/// Backend stored in a local snapshot file
#[derive(Debug, Clone)]
pub struct SnapshotBackend {
    path: PathBuf,
    policy: LoanPolicy,
}

impl SnapshotBackend {
    pub fn new(path: impl Into<PathBuf>, policy: LoanPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `operation` on the stored state and save it if it succeeds
    ///
    /// A failed operation leaves the file untouched.
    fn mutate<T, F>(&self, operation: F) -> Result<T, CirculationError>
    where
        F: FnOnce(&mut CirculationEngine) -> Result<T, CirculationError>,
    {
        let snapshot = snapshot_file::load_or_default(&self.path)?;
        let mut engine = CirculationEngine::from_snapshot(snapshot, self.policy.clone())?;
        let result = operation(&mut engine)?;
        snapshot_file::save(&self.path, &engine.into_snapshot())?;
        Ok(result)
    }
}

impl Backend for SnapshotBackend {
    fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    fn snapshot(&self) -> Result<Snapshot, CirculationError> {
        snapshot_file::load(&self.path)
    }

    fn stores_snapshots(&self) -> bool {
        true
    }

    fn store(&mut self, snapshot: Snapshot) -> Result<(), CirculationError> {
        // Refuse to persist a snapshot the engine would not load back
        let engine = CirculationEngine::from_snapshot(snapshot, self.policy.clone())?;
        snapshot_file::save(&self.path, &engine.into_snapshot())
    }

    fn health(&self) -> bool {
        match snapshot_file::load(&self.path) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), "Snapshot unavailable: {}", e);
                false
            }
        }
    }

    fn borrow(
        &mut self,
        book: BookId,
        member: MemberId,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        self.mutate(|engine| engine.borrow(book, member, now))
    }

    fn return_loan(
        &mut self,
        transaction: TransactionId,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        self.mutate(|engine| engine.return_loan(transaction, now))
    }

    fn add_book(&mut self, draft: BookDraft) -> Result<Book, CirculationError> {
        self.mutate(|engine| engine.add_book(draft))
    }

    fn update_book(&mut self, id: BookId, draft: BookDraft) -> Result<Book, CirculationError> {
        self.mutate(|engine| engine.update_book(id, draft))
    }

    fn remove_book(&mut self, id: BookId) -> Result<(), CirculationError> {
        self.mutate(|engine| engine.remove_book(id).map(|_| ()))
    }

    fn add_member(&mut self, draft: MemberDraft, today: NaiveDate) -> Result<Member, CirculationError> {
        self.mutate(|engine| engine.add_member(draft, today))
    }

    fn update_member(
        &mut self,
        id: MemberId,
        draft: MemberDraft,
        today: NaiveDate,
    ) -> Result<Member, CirculationError> {
        self.mutate(|engine| engine.update_member(id, draft, today))
    }

    fn remove_member(&mut self, id: MemberId) -> Result<(), CirculationError> {
        self.mutate(|engine| engine.remove_member(id).map(|_| ()))
    }
}
