//! Thread-safe book catalog for concurrent circulation
//!
//! The `AsyncCatalog` uses `DashMap` to hold books behind per-entry locks.
//! Taking a copy off the shelf is a conditional decrement performed while the
//! book's entry is locked, so two borrowers racing for the last copy can
//! never both get it.
//!
//! # Thread Safety
//!
//! Operations on different books proceed in parallel. Operations on the same
//! book are serialized by the entry lock and never observe a half-updated
//! copy count.

use crate::core::lifecycle;
use crate::types::{Book, BookId, CirculationError, EntityKind};
use dashmap::DashMap;

/// Thread-safe catalog keyed by book identifier
#[derive(Debug, Default)]
pub struct AsyncCatalog {
    /// Map of book IDs to books
    ///
    /// DashMap shards the map internally, so only books in the same shard
    /// contend for a lock.
    books: DashMap<BookId, Book>,
}

impl AsyncCatalog {
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
        }
    }

    /// Build a catalog from existing books
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for an inconsistent book or a duplicate
    /// identifier.
    pub fn from_books(books: Vec<Book>) -> Result<Self, CirculationError> {
        let catalog = Self::new();
        for book in books {
            book.validate()?;
            let id = book.id;
            if catalog.books.insert(id, book).is_some() {
                return Err(CirculationError::validation(format!(
                    "duplicate book id {}",
                    id
                )));
            }
        }
        Ok(catalog)
    }

    /// Copy of the book as currently stored
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such book exists.
    pub fn get(&self, id: BookId) -> Result<Book, CirculationError> {
        self.books
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CirculationError::not_found(EntityKind::Book, id))
    }

    /// Atomically take one copy off the shelf
    ///
    /// The availability check and the decrement happen under the book's
    /// entry lock.
    ///
    /// # Returns
    ///
    /// The book after the decrement
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown book or `BookUnavailable` when no
    /// copy is left. The stored book is unchanged on error.
    pub fn checkout_copy(&self, id: BookId) -> Result<Book, CirculationError> {
        let mut entry = self
            .books
            .get_mut(&id)
            .ok_or_else(|| CirculationError::not_found(EntityKind::Book, id))?;
        let updated = lifecycle::checkout_copy(entry.value())?;
        *entry.value_mut() = updated.clone();
        Ok(updated)
    }

    /// Atomically put one copy back on the shelf
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown book or a `ValidationError` if
    /// every copy is already on the shelf.
    pub fn checkin_copy(&self, id: BookId) -> Result<Book, CirculationError> {
        let mut entry = self
            .books
            .get_mut(&id)
            .ok_or_else(|| CirculationError::not_found(EntityKind::Book, id))?;
        let updated = lifecycle::checkin_copy(entry.value())?;
        *entry.value_mut() = updated.clone();
        Ok(updated)
    }

    /// All books, ordered by identifier
    ///
    /// The result is a copy taken book by book; concurrent borrows may change
    /// the catalog while it is being collected.
    pub fn books(&self) -> Vec<Book> {
        let mut books: Vec<Book> = self
            .books
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        books.sort_by_key(|book| book.id);
        books
    }
}
