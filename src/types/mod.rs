//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `book`: Catalog entries and book drafts
//! - `member`: Members, drafts and membership status
//! - `transaction`: Borrowing transactions and loan requests
//! - `snapshot`: Point-in-time collections handed to the evaluator
//! - `error`: Error types for circulation and networking
//! - `timestamp`: Serde helpers for the accepted date formats

pub mod book;
pub mod error;
pub mod member;
pub mod snapshot;
pub mod timestamp;
pub mod transaction;

pub use book::{Book, BookDraft, BookId};
pub use error::{CirculationError, EntityKind, NetworkError};
pub use member::{Member, MemberDraft, MemberId, MembershipStatus};
pub use snapshot::Snapshot;
pub use transaction::{
    BorrowingTransaction, LoanAction, LoanRequest, LoanStatus, TransactionId,
};
