//! Library Circulation
//! # Overview
//!
//! This library administers a library catalog, its members and the borrowing
//! transactions between them, against either a local JSON snapshot or a REST
//! backend.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Book, Member, BorrowingTransaction, errors)
//! - [`core`] - Circulation logic:
//!   - [`core::lifecycle`] - Pure borrow/return evaluation, overdue days, fines
//!   - [`core::engine`] - Single-threaded circulation desk over a snapshot
//!   - [`core::r#async`] - Thread-safe engine and member-partitioned batches
//! - [`backend`] - Snapshot-file, REST and in-memory backends behind one trait
//! - [`client`] - HTTP client for the REST backend and its health monitor
//! - [`io`] - Snapshot files, CSV request files and CSV reports
//! - [`strategy`] - Sync and async strategies for applying request files
//! - [`cli`] - Argument parsing and command dispatch
//!
//! # Loan Lifecycle
//!
//! - **Borrow**: an active member below the open-loan limit takes one of the
//!   book's available copies; the loan is due after the loan period
//! - **Return**: closing an open loan puts the copy back on the shelf
//! - **Overdue**: an open loan past its due date, counted in started days and
//!   fined per day
//!
//! Every evaluation takes the current time as an argument, so results are
//! reproducible for any `now`.

// Module declarations
pub mod backend;
pub mod cli;
pub mod client;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use backend::Backend;
pub use core::{CirculationEngine, LoanPolicy, LoanReceipt};
pub use types::{
    Book, BookId, BorrowingTransaction, CirculationError, LoanStatus, Member, MemberId,
    MembershipStatus, NetworkError, Snapshot, TransactionId,
};
