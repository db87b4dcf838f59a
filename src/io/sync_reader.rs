//! Synchronous request reader with iterator interface
//!
//! Streams loan requests from a CSV request file one row at a time. Parsing
//! and conversion are delegated to the csv_format module.
//!
//! ```no_run
//! use library_circulation::io::sync_reader::RequestReader;
//! use std::path::Path;
//!
//! let reader = RequestReader::new(Path::new("requests.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(request) => println!("Applying {:?}", request.action),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - A missing file is reported from `new()` as `FileNotFound`
//! - Malformed rows are yielded as `ParseError` carrying the file line, and
//!   iteration continues with the next row

use crate::io::csv_format::{convert_csv_record, CsvRequest};
use crate::types::{CirculationError, LoanRequest};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

/// Synchronous CSV request reader
#[derive(Debug)]
pub struct RequestReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl RequestReader {
    /// Open a request file for streaming iteration
    ///
    /// The CSV reader trims whitespace, tolerates missing trailing columns and
    /// uses an 8KB buffer.
    ///
    /// # Errors
    ///
    /// * `FileNotFound` if the file does not exist
    /// * `IoError` if it cannot be opened for another reason
    pub fn new(path: &Path) -> Result<Self, CirculationError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CirculationError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => CirculationError::IoError {
                message: format!("Failed to open file '{}': {}", path.display(), e),
            },
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for RequestReader {
    type Item = Result<LoanRequest, CirculationError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRequest>();
        let row = deserializer.next()?;
        self.line_num += 1;

        // Line numbers count the header as line 1
        let line = Some(self.line_num);
        Some(match row {
            Ok(record) => convert_csv_record(record)
                .map_err(|message| CirculationError::ParseError { line, message }),
            Err(e) => Err(CirculationError::ParseError {
                line,
                message: format!("CSV parse error: {}", e),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LoanAction;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_missing_file_is_file_not_found() {
        let result = RequestReader::new(Path::new("nonexistent-requests.csv"));
        assert!(matches!(result, Err(CirculationError::FileNotFound { .. })));
    }

    #[test]
    fn test_reads_borrow_and_return() {
        let file = create_temp_csv(
            "type,book,member,transaction,at\n\
             borrow,1,2,,\n\
             return,,,7,2024-11-02T09:00:00Z\n",
        );

        let requests: Vec<_> = RequestReader::new(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].action, LoanAction::Borrow { book: 1, member: 2 });
        assert_eq!(requests[0].at, None);
        assert_eq!(requests[1].action, LoanAction::Return { transaction: 7 });
        assert!(requests[1].at.is_some());
    }

    #[test]
    fn test_short_rows_and_whitespace() {
        let file = create_temp_csv("type,book,member,transaction,at\n  return , , , 3\n");

        let requests: Vec<_> = RequestReader::new(file.path()).unwrap().collect();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].as_ref().unwrap().action,
            LoanAction::Return { transaction: 3 }
        );
    }

    #[test]
    fn test_errors_carry_file_line_and_iteration_continues() {
        let file = create_temp_csv(
            "type,book,member,transaction,at\n\
             borrow,1,1,,\n\
             borrow,x,1,,\n\
             renew,1,1,,\n\
             return,,,1,\n",
        );

        let results: Vec<_> = RequestReader::new(file.path()).unwrap().collect();

        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(CirculationError::ParseError { line: Some(3), .. })
        ));
        assert!(matches!(
            results[2],
            Err(CirculationError::ParseError { line: Some(4), .. })
        ));
        assert!(results[3].is_ok());
    }

    #[test]
    fn test_header_only() {
        let file = create_temp_csv("type,book,member,transaction,at\n");
        assert_eq!(RequestReader::new(file.path()).unwrap().count(), 0);
    }
}
