//! REST backend
//!
//! Wraps an [`ApiClient`] and a private tokio runtime so the synchronous
//! command layer can drive it. Borrows and returns are checked against the
//! lifecycle rules on freshly fetched data before the server is asked to
//! perform them; the server stays responsible for the atomic copy update.

use super::Backend;
use crate::client::ApiClient;
use crate::client::ClientConfig;
use crate::core::lifecycle;
use crate::core::{LoanPolicy, LoanReceipt, Notice};
use crate::types::{
    Book, BookDraft, BookId, BorrowingTransaction, CirculationError, EntityKind, Member,
    MemberDraft, MemberId, Snapshot, TransactionId,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::future::Future;
use tokio::runtime::Runtime;

// Placeholder id for client-side validation; the server assigns the real one
const UNASSIGNED_ID: u64 = 0;

/// Backend reached over HTTP
#[derive(Debug)]
pub struct RemoteBackend {
    client: ApiClient,
    runtime: Runtime,
    policy: LoanPolicy,
}

impl RemoteBackend {
    /// Create a backend for the server described by `config`
    ///
    /// # Errors
    ///
    /// Returns an `IoError` if the runtime cannot be started or a network
    /// error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, policy: LoanPolicy) -> Result<Self, CirculationError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| CirculationError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;
        let client = ApiClient::new(config)?;

        Ok(Self {
            client,
            runtime,
            policy,
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Run `future` to completion on the backend's runtime
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl Backend for RemoteBackend {
    fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    fn snapshot(&self) -> Result<Snapshot, CirculationError> {
        self.block_on(self.client.fetch_snapshot())
    }

    fn health(&self) -> bool {
        self.block_on(self.client.health())
    }

    fn borrow(
        &mut self,
        book: BookId,
        member: MemberId,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        let client = &self.client;
        let policy = &self.policy;

        let (transaction, book) = self.runtime.block_on(async {
            let (current, borrower, loans) = tokio::try_join!(
                client.get_book(book),
                client.get_member(member),
                client.member_transactions(member)
            )?;
            lifecycle::attempt_borrow(UNASSIGNED_ID, &current, &borrower, &loans, now, policy)?;

            let transaction = client.borrow(book, member).await?;
            let book = client.get_book(book).await?;
            Ok::<_, CirculationError>((transaction, book))
        })?;

        let notice = Notice::borrow_confirmation(&transaction, &book);
        tracing::info!(member = notice.member_id, "{}", notice.message);
        Ok(LoanReceipt {
            transaction,
            book,
            notice,
        })
    }

    fn return_loan(
        &mut self,
        transaction: TransactionId,
        now: DateTime<Utc>,
    ) -> Result<LoanReceipt, CirculationError> {
        let client = &self.client;

        let (transaction, book) = self.runtime.block_on(async {
            let current = client
                .list_transactions()
                .await?
                .into_iter()
                .find(|tx| tx.id == transaction)
                .ok_or_else(|| CirculationError::not_found(EntityKind::Transaction, transaction))?;
            let book = client.get_book(current.book_id).await?;
            lifecycle::attempt_return(&current, &book, now)?;

            let closed = client.return_book(transaction).await?;
            let book = client.get_book(closed.book_id).await?;
            Ok::<_, CirculationError>((closed, book))
        })?;

        let notice = Notice::return_confirmation(&transaction, &book);
        tracing::info!(member = notice.member_id, "{}", notice.message);
        Ok(LoanReceipt {
            transaction,
            book,
            notice,
        })
    }

    fn add_book(&mut self, draft: BookDraft) -> Result<Book, CirculationError> {
        draft.clone().into_book(UNASSIGNED_ID)?;
        self.block_on(self.client.create_book(&draft))
    }

    fn update_book(&mut self, id: BookId, draft: BookDraft) -> Result<Book, CirculationError> {
        draft.clone().into_book(id)?;
        self.block_on(self.client.update_book(id, &draft))
    }

    fn remove_book(&mut self, id: BookId) -> Result<(), CirculationError> {
        self.block_on(self.client.delete_book(id))
    }

    fn add_member(&mut self, draft: MemberDraft, today: NaiveDate) -> Result<Member, CirculationError> {
        draft.clone().into_member(UNASSIGNED_ID, today)?;
        self.block_on(self.client.create_member(&draft))
    }

    fn update_member(
        &mut self,
        id: MemberId,
        draft: MemberDraft,
        today: NaiveDate,
    ) -> Result<Member, CirculationError> {
        draft.clone().into_member(id, today)?;
        self.block_on(self.client.update_member(id, &draft))
    }

    fn remove_member(&mut self, id: MemberId) -> Result<(), CirculationError> {
        self.block_on(self.client.delete_member(id))
    }

    fn books(&self) -> Result<Vec<Book>, CirculationError> {
        self.block_on(self.client.list_books())
    }

    fn book(&self, id: BookId) -> Result<Book, CirculationError> {
        self.block_on(self.client.get_book(id))
    }

    fn search_books(&self, keyword: &str) -> Result<Vec<Book>, CirculationError> {
        self.block_on(self.client.search_books(keyword))
    }

    fn available_books(&self) -> Result<Vec<Book>, CirculationError> {
        self.block_on(self.client.available_books())
    }

    fn members(&self) -> Result<Vec<Member>, CirculationError> {
        self.block_on(self.client.list_members())
    }

    fn member(&self, id: MemberId) -> Result<Member, CirculationError> {
        self.block_on(self.client.get_member(id))
    }

    fn search_members(&self, name: &str) -> Result<Vec<Member>, CirculationError> {
        self.block_on(self.client.search_members(name))
    }

    fn active_members(&self) -> Result<Vec<Member>, CirculationError> {
        self.block_on(self.client.active_members())
    }

    fn transactions(&self) -> Result<Vec<BorrowingTransaction>, CirculationError> {
        self.block_on(self.client.list_transactions())
    }

    fn member_loans(&self, member: MemberId) -> Result<Vec<BorrowingTransaction>, CirculationError> {
        self.block_on(async {
            self.client.get_member(member).await?;
            self.client.member_transactions(member).await
        })
    }
}
