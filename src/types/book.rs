//! Book-related types
//!
//! This module defines the catalog entry for a book and the draft record used
//! to create or update one.

use super::error::CirculationError;
use serde::{Deserialize, Serialize};

/// Book identifier
pub type BookId = u64;

/// A catalog entry with its copy counts
///
/// Invariant: `1 <= total_copies` and `available_copies <= total_copies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique book identifier
    #[serde(rename = "bookId", alias = "id")]
    pub id: BookId,

    pub title: String,

    pub author: String,

    #[serde(default)]
    pub genre: Option<String>,

    #[serde(default)]
    pub isbn: Option<String>,

    #[serde(default)]
    pub year_published: Option<i32>,

    /// Number of copies owned by the library
    pub total_copies: u32,

    /// Number of copies currently on the shelf
    ///
    /// Decremented by one on every borrow and incremented on every return.
    pub available_copies: u32,
}

impl Book {
    /// Whether at least one copy can be lent out
    pub fn is_borrowable(&self) -> bool {
        self.available_copies > 0
    }

    /// Number of copies currently out on loan
    pub fn copies_on_loan(&self) -> u32 {
        self.total_copies.saturating_sub(self.available_copies)
    }

    /// Check the copy-count invariant
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the book owns no copies or reports more
    /// copies on the shelf than it owns.
    pub fn validate(&self) -> Result<(), CirculationError> {
        if self.total_copies == 0 {
            return Err(CirculationError::validation(format!(
                "book {} must own at least one copy",
                self.id
            )));
        }
        if self.available_copies > self.total_copies {
            return Err(CirculationError::validation(format!(
                "book {} has {} available copies but only {} in total",
                self.id, self.available_copies, self.total_copies
            )));
        }
        Ok(())
    }
}

/// Input record for creating or updating a book
///
/// When `total_copies` is omitted, the available count is taken as the total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub year_published: Option<i32>,
    #[serde(default)]
    pub total_copies: Option<u32>,
    pub available_copies: u32,
}

impl BookDraft {
    /// Total number of copies the draft describes
    pub fn effective_total(&self) -> u32 {
        self.total_copies.unwrap_or(self.available_copies)
    }

    /// Build a book with the given identifier, validating the draft
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if title or author is blank, or if the
    /// copy counts break the book invariant.
    pub fn into_book(self, id: BookId) -> Result<Book, CirculationError> {
        if self.title.trim().is_empty() {
            return Err(CirculationError::validation("book title must not be empty"));
        }
        if self.author.trim().is_empty() {
            return Err(CirculationError::validation("book author must not be empty"));
        }

        let total_copies = self.effective_total();
        let book = Book {
            id,
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            genre: self.genre,
            isbn: self.isbn,
            year_published: self.year_published,
            total_copies,
            available_copies: self.available_copies,
        };
        book.validate()?;
        Ok(book)
    }
}
