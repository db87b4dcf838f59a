//! Core circulation logic
//!
//! This module contains the circulation components:
//! - `lifecycle` - Pure borrow/return evaluation and overdue classification
//! - `policy` - Loan period, open-loan limit and fine rate
//! - `search` - Case-insensitive text search
//! - `catalog`, `registry`, `ledger` - In-memory stores for one snapshot
//! - `engine` - Single-threaded circulation desk over those stores
//! - `notice` - Member notices for borrows, returns and overdue loans
//! - `stats` - Dashboard statistics
//! - `async` - Thread-safe engine and batch processor

pub mod r#async;
pub mod catalog;
pub mod engine;
pub mod ledger;
pub mod lifecycle;
pub mod notice;
pub mod policy;
pub mod registry;
pub mod search;
pub mod stats;

pub use catalog::Catalog;
pub use engine::{CirculationEngine, LoanReceipt, OverdueEntry};
pub use ledger::TransactionLedger;
pub use notice::{Notice, NoticeKind};
pub use policy::LoanPolicy;
pub use r#async::{AsyncCatalog, AsyncCirculationEngine, LoanBatchProcessor, RequestOutcome};
pub use registry::MemberRegistry;
pub use stats::DashboardStats;
