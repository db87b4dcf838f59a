//! Error types for library circulation
//!
//! This module defines every error the circulation library reports to its
//! callers. Errors are designed to be descriptive and user-friendly for CLI
//! output, and are `Clone + PartialEq` so tests can match on them directly.
//!
//! # Error Categories
//!
//! - **Circulation Errors**: member not eligible, no copies left, loan limit
//!   reached, loan already returned
//! - **Lookup and Validation Errors**: unknown identifiers, malformed input
//! - **Local I/O Errors**: snapshot or request files missing or malformed
//! - **Network Errors**: the REST backend is unreachable, slow, or rejected the
//!   request (see [`NetworkError`])

use super::book::BookId;
use super::member::{MemberId, MembershipStatus};
use super::transaction::TransactionId;
use std::fmt;
use thiserror::Error;

/// Kind of entity an identifier refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Book,
    Member,
    Transaction,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Book => write!(f, "Book"),
            EntityKind::Member => write!(f, "Member"),
            EntityKind::Transaction => write!(f, "Transaction"),
        }
    }
}

/// Main error type for library circulation
///
/// Every failure path returns one of these variants to the caller; none of
/// them is fatal to the process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CirculationError {
    /// The member's status does not allow borrowing
    ///
    /// Only `Active` members may borrow. The book is left untouched.
    #[error("Member {member} is not eligible to borrow (membership {status})")]
    MemberNotEligible {
        /// Member that attempted to borrow
        member: MemberId,
        /// The member's current status
        status: MembershipStatus,
    },

    /// No copies of the book are on the shelf
    #[error("Book {book} has no available copies")]
    BookUnavailable {
        /// Book that was requested
        book: BookId,
    },

    /// The member already holds as many open loans as the policy allows
    #[error("Member {member} has {open_loans} open loans (limit {limit})")]
    BorrowLimitExceeded {
        /// Member that attempted to borrow
        member: MemberId,
        /// Number of loans the member currently holds
        open_loans: u32,
        /// Configured ceiling
        limit: u32,
    },

    /// The transaction was already returned
    #[error("Transaction {transaction} has already been returned")]
    AlreadyReturned {
        /// Transaction that was returned twice
        transaction: TransactionId,
    },

    /// No entity with the given identifier exists
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity that was looked up
        entity: EntityKind,
        /// The unknown identifier
        id: u64,
    },

    /// Malformed input, e.g. a non-positive copy count
    #[error("Validation error: {message}")]
    ValidationError {
        /// Description of what is wrong
        message: String,
    },

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// A snapshot or request file could not be parsed
    #[error("Parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// The REST backend could not serve the request
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Network-layer failures talking to the REST backend
///
/// Kept apart from [`CirculationError`]'s domain variants so the front-end
/// can switch to offline mode on [`NetworkError::is_offline`] failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// Connection refused or host unreachable
    #[error("Backend unreachable at {url}: {message}")]
    Unreachable {
        /// URL that was requested
        url: String,
        /// Underlying transport error
        message: String,
    },

    /// The request did not complete in time
    #[error("Request to {url} timed out")]
    Timeout {
        /// URL that was requested
        url: String,
    },

    /// The backend answered with a non-success status
    #[error("Backend returned HTTP {status} for {url}{}", if message.is_empty() { String::new() } else { format!(": {}", message) })]
    Status {
        /// HTTP status code
        status: u16,
        /// URL that was requested
        url: String,
        /// Response body, if any
        message: String,
    },

    /// The response body did not match the expected JSON shape
    #[error("Unexpected response from {url}: {message}")]
    Decode {
        /// URL that was requested
        url: String,
        /// Decoder error
        message: String,
    },

    /// The request could not be built or sent
    #[error("Request error: {message}")]
    Request {
        /// Description of the failure
        message: String,
    },
}

impl NetworkError {
    /// Whether the failure means the backend is not reachable at all
    pub fn is_offline(&self) -> bool {
        matches!(
            self,
            NetworkError::Unreachable { .. } | NetworkError::Timeout { .. }
        )
    }

    /// Whether the failure is a transient server error worth one retry
    pub fn is_transient(&self) -> bool {
        matches!(self, NetworkError::Status { status: 500, .. })
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// Conversion from io::Error to CirculationError
impl From<std::io::Error> for CirculationError {
    fn from(error: std::io::Error) -> Self {
        CirculationError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to CirculationError
impl From<csv::Error> for CirculationError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        CirculationError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Conversion from serde_json::Error to CirculationError
impl From<serde_json::Error> for CirculationError {
    fn from(error: serde_json::Error) -> Self {
        let line = match error.line() {
            0 => None,
            line => Some(line as u64),
        };

        CirculationError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl CirculationError {
    /// Create a MemberNotEligible error
    pub fn member_not_eligible(member: MemberId, status: MembershipStatus) -> Self {
        CirculationError::MemberNotEligible { member, status }
    }

    /// Create a BookUnavailable error
    pub fn book_unavailable(book: BookId) -> Self {
        CirculationError::BookUnavailable { book }
    }

    /// Create a BorrowLimitExceeded error
    pub fn borrow_limit_exceeded(member: MemberId, open_loans: u32, limit: u32) -> Self {
        CirculationError::BorrowLimitExceeded {
            member,
            open_loans,
            limit,
        }
    }

    /// Create an AlreadyReturned error
    pub fn already_returned(transaction: TransactionId) -> Self {
        CirculationError::AlreadyReturned { transaction }
    }

    /// Create a NotFound error
    pub fn not_found(entity: EntityKind, id: u64) -> Self {
        CirculationError::NotFound { entity, id }
    }

    /// Create a ValidationError
    pub fn validation(message: impl Into<String>) -> Self {
        CirculationError::ValidationError {
            message: message.into(),
        }
    }

    /// Whether the error means the backend could not be reached
    pub fn is_offline(&self) -> bool {
        matches!(self, CirculationError::Network(e) if e.is_offline())
    }

    /// Stable machine-readable name of the variant, used in reports
    pub fn code(&self) -> &'static str {
        match self {
            CirculationError::MemberNotEligible { .. } => "MEMBER_NOT_ELIGIBLE",
            CirculationError::BookUnavailable { .. } => "BOOK_UNAVAILABLE",
            CirculationError::BorrowLimitExceeded { .. } => "BORROW_LIMIT_EXCEEDED",
            CirculationError::AlreadyReturned { .. } => "ALREADY_RETURNED",
            CirculationError::NotFound { .. } => "NOT_FOUND",
            CirculationError::ValidationError { .. } => "VALIDATION_ERROR",
            CirculationError::FileNotFound { .. } => "FILE_NOT_FOUND",
            CirculationError::IoError { .. } => "IO_ERROR",
            CirculationError::ParseError { .. } => "PARSE_ERROR",
            CirculationError::Network(_) => "NETWORK_ERROR",
        }
    }
}
