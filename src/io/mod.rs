//! I/O module
//!
//! Handles the files the CLI reads and writes.
//!
//! # Components
//!
//! - `csv_format` - Request rows and report writers
//! - `sync_reader` - Synchronous request reader with iterator interface
//! - `async_reader` - Asynchronous request reader with batch reading interface
//! - `snapshot_file` - JSON snapshot files
//! - `demo` - Built-in sample library for offline mode

pub mod async_reader;
pub mod csv_format;
pub mod demo;
pub mod snapshot_file;
pub mod sync_reader;

pub use async_reader::AsyncRequestReader;
pub use csv_format::{convert_csv_record, CsvRequest};
pub use demo::demo_snapshot;
pub use sync_reader::RequestReader;
