//! Typed client for the circulation REST backend
//!
//! Every request carries the configured timeout. A response with HTTP 500 is
//! retried exactly once after `retry_delay`; any other failure is returned
//! immediately. Transport failures map onto [`NetworkError`] so callers can
//! tell an unreachable backend from one that refused the request.
//!
//! # Endpoints
//!
//! ```text
//! /books       list, get, create, update, delete, search?keyword=, available
//! /members     list, get, create, update, delete, search?name=, active
//! /borrowing   list, borrow?bookId=&memberId=, return/{id}, overdue, member/{id}
//! /health      liveness probe
//! ```

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::config::ClientConfig;
use super::wire::WireTransaction;
use crate::types::{
    Book, BookDraft, BookId, BorrowingTransaction, CirculationError, EntityKind, Member,
    MemberDraft, MemberId, NetworkError, Snapshot, TransactionId,
};

/// REST client for one backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
}

/// Map a transport error onto the network taxonomy
fn transport_error(url: &str, error: reqwest::Error) -> NetworkError {
    if error.is_timeout() {
        NetworkError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        NetworkError::Unreachable {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        NetworkError::Request {
            message: error.to_string(),
        }
    }
}

impl ApiClient {
    /// Create a client for the backend described by `config`
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::Request` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, NetworkError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NetworkError::Request {
                message: e.to_string(),
            })?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a request, retrying once if the backend answers HTTP 500
    ///
    /// `build` is called once per attempt because a request builder cannot
    /// be reused after sending.
    async fn execute<F>(&self, url: &str, build: F) -> Result<Response, NetworkError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut retried = false;
        loop {
            tracing::debug!(url, "Sending request");
            let response = build(&self.http)
                .send()
                .await
                .map_err(|e| transport_error(url, e))?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let error = NetworkError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                message: response.text().await.unwrap_or_default().trim().to_string(),
            };

            if error.is_transient() && !retried {
                retried = true;
                tracing::warn!(
                    url,
                    "Backend returned HTTP 500, retrying in {:?}",
                    self.config.retry_delay
                );
                tokio::time::sleep(self.config.retry_delay).await;
                continue;
            }

            return Err(error);
        }
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, NetworkError> {
        let body = response.bytes().await.map_err(|e| transport_error(url, e))?;
        serde_json::from_slice(&body).map_err(|e| NetworkError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, NetworkError> {
        let url = self.config.url(path);
        let response = self
            .execute(&url, |http| http.get(&url).query(query))
            .await?;
        Self::decode(&url, response).await
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, NetworkError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = self.config.url(path);
        let response = self
            .execute(&url, |http| {
                let request = http.request(method.clone(), &url).query(query);
                match body {
                    Some(body) => request.json(body),
                    None => request,
                }
            })
            .await?;
        Self::decode(&url, response).await
    }

    async fn delete(&self, path: &str) -> Result<(), NetworkError> {
        let url = self.config.url(path);
        self.execute(&url, |http| http.delete(&url)).await?;
        Ok(())
    }

    fn transactions(
        &self,
        wire: Vec<WireTransaction>,
        url: &str,
    ) -> Result<Vec<BorrowingTransaction>, NetworkError> {
        wire.into_iter()
            .map(|tx| self.transaction(tx, url))
            .collect()
    }

    fn transaction(
        &self,
        wire: WireTransaction,
        url: &str,
    ) -> Result<BorrowingTransaction, NetworkError> {
        wire.into_transaction(self.config.loan_period)
            .map_err(|message| NetworkError::Decode {
                url: url.to_string(),
                message,
            })
    }

    /// Probe `GET /health`
    ///
    /// Uses the shorter health timeout and never retries. Any failure counts
    /// as "not alive".
    pub async fn health(&self) -> bool {
        let url = self.config.url("/health");
        match self
            .http
            .get(&url)
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(url, "Health probe failed: {}", e);
                false
            }
        }
    }

    // Books

    pub async fn list_books(&self) -> Result<Vec<Book>, CirculationError> {
        Ok(self.get_json("/books", &[]).await?)
    }

    pub async fn get_book(&self, id: BookId) -> Result<Book, CirculationError> {
        self.get_json(&format!("/books/{}", id), &[])
            .await
            .map_err(|e| not_found_as(e, EntityKind::Book, id))
    }

    pub async fn search_books(&self, keyword: &str) -> Result<Vec<Book>, CirculationError> {
        Ok(self
            .get_json("/books/search", &[("keyword", keyword.to_string())])
            .await?)
    }

    pub async fn available_books(&self) -> Result<Vec<Book>, CirculationError> {
        Ok(self.get_json("/books/available", &[]).await?)
    }

    pub async fn create_book(&self, draft: &BookDraft) -> Result<Book, CirculationError> {
        Ok(self
            .send_json(Method::POST, "/books", &[], Some(draft))
            .await?)
    }

    pub async fn update_book(&self, id: BookId, draft: &BookDraft) -> Result<Book, CirculationError> {
        self.send_json(Method::PUT, &format!("/books/{}", id), &[], Some(draft))
            .await
            .map_err(|e| not_found_as(e, EntityKind::Book, id))
    }

    pub async fn delete_book(&self, id: BookId) -> Result<(), CirculationError> {
        self.delete(&format!("/books/{}", id))
            .await
            .map_err(|e| not_found_as(e, EntityKind::Book, id))
    }

    // Members

    pub async fn list_members(&self) -> Result<Vec<Member>, CirculationError> {
        Ok(self.get_json("/members", &[]).await?)
    }

    pub async fn get_member(&self, id: MemberId) -> Result<Member, CirculationError> {
        self.get_json(&format!("/members/{}", id), &[])
            .await
            .map_err(|e| not_found_as(e, EntityKind::Member, id))
    }

    pub async fn search_members(&self, name: &str) -> Result<Vec<Member>, CirculationError> {
        Ok(self
            .get_json("/members/search", &[("name", name.to_string())])
            .await?)
    }

    pub async fn active_members(&self) -> Result<Vec<Member>, CirculationError> {
        Ok(self.get_json("/members/active", &[]).await?)
    }

    pub async fn create_member(&self, draft: &MemberDraft) -> Result<Member, CirculationError> {
        Ok(self
            .send_json(Method::POST, "/members", &[], Some(draft))
            .await?)
    }

    pub async fn update_member(
        &self,
        id: MemberId,
        draft: &MemberDraft,
    ) -> Result<Member, CirculationError> {
        self.send_json(Method::PUT, &format!("/members/{}", id), &[], Some(draft))
            .await
            .map_err(|e| not_found_as(e, EntityKind::Member, id))
    }

    pub async fn delete_member(&self, id: MemberId) -> Result<(), CirculationError> {
        self.delete(&format!("/members/{}", id))
            .await
            .map_err(|e| not_found_as(e, EntityKind::Member, id))
    }

    // Borrowing

    pub async fn list_transactions(&self) -> Result<Vec<BorrowingTransaction>, CirculationError> {
        let url = self.config.url("/borrowing");
        let wire: Vec<WireTransaction> = self.get_json("/borrowing", &[]).await?;
        Ok(self.transactions(wire, &url)?)
    }

    pub async fn overdue_transactions(
        &self,
    ) -> Result<Vec<BorrowingTransaction>, CirculationError> {
        let url = self.config.url("/borrowing/overdue");
        let wire: Vec<WireTransaction> = self.get_json("/borrowing/overdue", &[]).await?;
        Ok(self.transactions(wire, &url)?)
    }

    pub async fn member_transactions(
        &self,
        member: MemberId,
    ) -> Result<Vec<BorrowingTransaction>, CirculationError> {
        let path = format!("/borrowing/member/{}", member);
        let url = self.config.url(&path);
        let wire: Vec<WireTransaction> = self.get_json(&path, &[]).await?;
        Ok(self.transactions(wire, &url)?)
    }

    /// Ask the backend to lend `book` to `member`
    pub async fn borrow(
        &self,
        book: BookId,
        member: MemberId,
    ) -> Result<BorrowingTransaction, CirculationError> {
        let url = self.config.url("/borrowing/borrow");
        let query = [("bookId", book.to_string()), ("memberId", member.to_string())];
        let wire = self
            .send_json::<(), WireTransaction>(Method::POST, "/borrowing/borrow", &query, None)
            .await?;
        Ok(self.transaction(wire, &url)?)
    }

    /// Ask the backend to close `transaction`
    pub async fn return_book(
        &self,
        transaction: TransactionId,
    ) -> Result<BorrowingTransaction, CirculationError> {
        let path = format!("/borrowing/return/{}", transaction);
        let url = self.config.url(&path);
        let wire = self
            .send_json::<(), WireTransaction>(Method::POST, &path, &[], None)
            .await
            .map_err(|e| not_found_as(e, EntityKind::Transaction, transaction))?;
        Ok(self.transaction(wire, &url)?)
    }

    /// Fetch books, members and transactions concurrently
    ///
    /// # Errors
    ///
    /// Fails if any of the three requests fails.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, CirculationError> {
        let (books, members, transactions) = tokio::try_join!(
            self.list_books(),
            self.list_members(),
            self.list_transactions()
        )?;

        Ok(Snapshot {
            books,
            members,
            transactions,
        })
    }
}

/// Turn a 404 for a single entity into `NotFound`
fn not_found_as(error: NetworkError, entity: EntityKind, id: u64) -> CirculationError {
    if error.status() == Some(StatusCode::NOT_FOUND.as_u16()) {
        CirculationError::not_found(entity, id)
    } else {
        error.into()
    }
}
