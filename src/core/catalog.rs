//! Book catalog module
//!
//! This module provides the `Catalog` struct which holds the books of a
//! snapshot and the operations that change them.
//!
//! The Catalog is responsible for:
//! - Assigning identifiers to new books, never reusing one that a book or a
//!   transaction has carried
//! - Keeping copy counts consistent when a book is edited
//! - Taking copies off the shelf and putting them back, one at a time
//! - Providing id-ordered listings for output

use super::lifecycle;
use crate::types::{Book, BookDraft, BookId, CirculationError, EntityKind};
use std::collections::BTreeMap;

/// Books of one snapshot, keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Map of book IDs to books
    books: BTreeMap<BookId, Book>,

    /// Lowest identifier that has never been used
    next_id: BookId,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from existing books
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if a book breaks the copy-count invariant
    /// or an identifier appears twice.
    pub fn from_books(books: Vec<Book>) -> Result<Self, CirculationError> {
        let mut catalog = Self::new();
        for book in books {
            book.validate()?;
            if catalog.books.contains_key(&book.id) {
                return Err(CirculationError::validation(format!(
                    "duplicate book id {}",
                    book.id
                )));
            }
            catalog.reserve_through(book.id);
            catalog.books.insert(book.id, book);
        }
        Ok(catalog)
    }

    /// Keep `id` and every identifier below it from being assigned again
    ///
    /// Used for books that are gone from the catalog but still referenced by
    /// the transaction history.
    pub fn reserve_through(&mut self, id: BookId) {
        self.next_id = self.next_id.max(id.saturating_add(1));
    }

    /// Look a book up by identifier
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such book exists.
    pub fn get(&self, id: BookId) -> Result<&Book, CirculationError> {
        self.books
            .get(&id)
            .ok_or_else(|| CirculationError::not_found(EntityKind::Book, id))
    }

    /// All books ordered by identifier
    pub fn list(&self) -> Vec<&Book> {
        self.books.values().collect()
    }

    /// Books with at least one copy on the shelf
    pub fn available(&self) -> Vec<&Book> {
        self.books.values().filter(|b| b.is_borrowable()).collect()
    }

    /// Add a new book, assigning the next free identifier
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the draft is invalid.
    pub fn insert(&mut self, draft: BookDraft) -> Result<&Book, CirculationError> {
        let id = self.next_id.max(1);
        let book = draft.into_book(id)?;
        self.reserve_through(id);
        Ok(self.books.entry(id).or_insert(book))
    }

    /// Replace a book's details
    ///
    /// The number of copies on loan is carried over: the new available count
    /// is the new total minus the copies currently lent out, whatever the
    /// draft says about availability.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown book, or a `ValidationError` if the
    /// draft is invalid or its total is below the copies on loan.
    pub fn update(&mut self, id: BookId, draft: BookDraft) -> Result<&Book, CirculationError> {
        let on_loan = self.get(id)?.copies_on_loan();
        let total = draft.effective_total();

        let available_copies = total.checked_sub(on_loan).ok_or_else(|| {
            CirculationError::validation(format!(
                "book {} has {} copies on loan, total cannot drop to {}",
                id, on_loan, total
            ))
        })?;

        let book = BookDraft {
            total_copies: Some(total),
            available_copies,
            ..draft
        }
        .into_book(id)?;

        self.books.insert(id, book);
        self.get(id)
    }

    /// Remove a book
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such book exists.
    pub fn remove(&mut self, id: BookId) -> Result<Book, CirculationError> {
        self.books
            .remove(&id)
            .ok_or_else(|| CirculationError::not_found(EntityKind::Book, id))
    }

    /// Store a book produced by the evaluator
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the book is not part of the catalog.
    pub fn replace(&mut self, book: Book) -> Result<(), CirculationError> {
        let slot = self
            .books
            .get_mut(&book.id)
            .ok_or_else(|| CirculationError::not_found(EntityKind::Book, book.id))?;
        *slot = book;
        Ok(())
    }

    /// Take one copy off the shelf if one is available
    ///
    /// Decrements `available_copies` only when it is positive, so the count
    /// can never go negative.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown book or `BookUnavailable` if no copy
    /// is on the shelf. The catalog is unchanged on error.
    pub fn checkout_copy(&mut self, id: BookId) -> Result<&Book, CirculationError> {
        let slot = self
            .books
            .get_mut(&id)
            .ok_or_else(|| CirculationError::not_found(EntityKind::Book, id))?;
        *slot = lifecycle::checkout_copy(slot)?;
        Ok(slot)
    }

    /// Put one copy back on the shelf
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown book or a `ValidationError` if every
    /// copy is already on the shelf.
    pub fn checkin_copy(&mut self, id: BookId) -> Result<&Book, CirculationError> {
        let slot = self
            .books
            .get_mut(&id)
            .ok_or_else(|| CirculationError::not_found(EntityKind::Book, id))?;
        *slot = lifecycle::checkin_copy(slot)?;
        Ok(slot)
    }

    /// Consume the catalog, returning its books in identifier order
    pub fn into_books(self) -> Vec<Book> {
        self.books.into_values().collect()
    }
}
