//! Concurrent implementations of the circulation components
//!
//! This module provides thread-safe versions of the catalog and engine
//! using DashMap for fine-grained locking, plus a batch processor that
//! applies loan requests from many members in parallel.
//!
//! # Thread Safety
//!
//! - Requests touching different books and members proceed in parallel
//! - Taking a copy is an atomic conditional decrement on the book's entry
//! - A member's open-loan count is checked and raised under one entry lock
//! - No global locks

pub mod batch_processor;
pub mod catalog;
pub mod engine;

pub use batch_processor::{LoanBatchProcessor, RequestOutcome};
pub use catalog::AsyncCatalog;
pub use engine::AsyncCirculationEngine;
