//! CSV format handling for loan requests and reports
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRequest structure for deserializing request files
//! - Conversion from CSV records to loan requests
//! - Report writers for books, members, loans, overdue loans, notices and
//!   request outcomes
//!
//! Request files have the columns `type,book,member,transaction,at`:
//!
//! ```text
//! type,book,member,transaction,at
//! borrow,1,2,,2024-11-01T10:00:00Z
//! return,,,7,
//! ```

use crate::core::lifecycle::{classify, days_overdue};
use crate::core::{Notice, OverdueEntry, RequestOutcome};
use crate::types::{
    timestamp, Book, BookId, BorrowingTransaction, CirculationError, LoanAction, LoanRequest,
    LoanStatus, Member, MemberId, TransactionId,
};
use chrono::{DateTime, Utc};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One row of a request file
///
/// Columns not relevant to the request type are left empty.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub book: Option<BookId>,
    pub member: Option<MemberId>,
    pub transaction: Option<TransactionId>,
    pub at: Option<String>,
}

/// Convert a CsvRequest to a LoanRequest
///
/// - `borrow` rows need `book` and `member`
/// - `return` rows need `transaction`
/// - `at`, when present, must be a timestamp in one of the accepted forms
///
/// # Returns
///
/// * `Ok(LoanRequest)` - Successfully converted record
/// * `Err(String)` - Description of what is missing or malformed
pub fn convert_csv_record(record: CsvRequest) -> Result<LoanRequest, String> {
    let action = match record.kind.trim().to_lowercase().as_str() {
        "borrow" => match (record.book, record.member) {
            (Some(book), Some(member)) => LoanAction::Borrow { book, member },
            _ => return Err("borrow request needs a book and a member".to_string()),
        },
        "return" => match record.transaction {
            Some(transaction) => LoanAction::Return { transaction },
            None => return Err("return request needs a transaction".to_string()),
        },
        other => return Err(format!("Invalid request type: '{}'", other)),
    };

    let at = match record.at {
        Some(raw) if !raw.trim().is_empty() => Some(timestamp::parse(&raw)?),
        _ => None,
    };

    Ok(LoanRequest { action, at })
}

fn write_error(error: csv::Error) -> CirculationError {
    CirculationError::IoError {
        message: format!("Failed to write CSV: {}", error),
    }
}

fn write_rows<T: Serialize>(
    rows: impl IntoIterator<Item = T>,
    output: &mut dyn Write,
) -> Result<(), CirculationError> {
    let mut writer = Writer::from_writer(output);
    for row in rows {
        writer.serialize(row).map_err(write_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write books with columns `bookId,title,author,genre,isbn,yearPublished,totalCopies,availableCopies`
pub fn write_books_csv(books: &[Book], output: &mut dyn Write) -> Result<(), CirculationError> {
    if books.is_empty() {
        return write_header(
            &[
                "bookId",
                "title",
                "author",
                "genre",
                "isbn",
                "yearPublished",
                "totalCopies",
                "availableCopies",
            ],
            output,
        );
    }
    write_rows(books, output)
}

/// Write members with columns `memberId,name,email,phone,address,membershipStatus,registrationDate`
pub fn write_members_csv(members: &[Member], output: &mut dyn Write) -> Result<(), CirculationError> {
    if members.is_empty() {
        return write_header(
            &[
                "memberId",
                "name",
                "email",
                "phone",
                "address",
                "membershipStatus",
                "registrationDate",
            ],
            output,
        );
    }
    write_rows(members, output)
}

// serde only emits a header together with the first row
fn write_header(columns: &[&str], output: &mut dyn Write) -> Result<(), CirculationError> {
    let mut writer = Writer::from_writer(output);
    writer.write_record(columns).map_err(write_error)?;
    writer.flush()?;
    Ok(())
}

/// Transactions as listed to the user, with status classified at `now`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRow {
    transaction_id: TransactionId,
    book_id: BookId,
    member_id: MemberId,
    borrow_date: String,
    due_date: String,
    return_date: String,
    status: LoanStatus,
    days_overdue: u64,
}

/// Write transactions with their status and lateness at `now`
pub fn write_transactions_csv(
    transactions: &[BorrowingTransaction],
    now: DateTime<Utc>,
    output: &mut dyn Write,
) -> Result<(), CirculationError> {
    if transactions.is_empty() {
        return write_header(
            &[
                "transactionId",
                "bookId",
                "memberId",
                "borrowDate",
                "dueDate",
                "returnDate",
                "status",
                "daysOverdue",
            ],
            output,
        );
    }

    write_rows(
        transactions.iter().map(|tx| TransactionRow {
            transaction_id: tx.id,
            book_id: tx.book_id,
            member_id: tx.member_id,
            borrow_date: timestamp::format(&tx.borrow_date),
            due_date: timestamp::format(&tx.due_date),
            return_date: tx
                .return_date
                .as_ref()
                .map(timestamp::format)
                .unwrap_or_default(),
            status: classify(tx, now),
            days_overdue: days_overdue(tx, now),
        }),
        output,
    )
}

/// Write the overdue report with columns
/// `transaction,book,title,member,memberName,dueDate,daysOverdue,fine`
///
/// Fines are written with two decimal places.
pub fn write_overdue_csv(
    entries: &[OverdueEntry],
    output: &mut dyn Write,
) -> Result<(), CirculationError> {
    let mut writer = Writer::from_writer(output);
    writer
        .write_record([
            "transaction",
            "book",
            "title",
            "member",
            "memberName",
            "dueDate",
            "daysOverdue",
            "fine",
        ])
        .map_err(write_error)?;

    for entry in entries {
        writer
            .write_record(&[
                entry.transaction.to_string(),
                entry.book.to_string(),
                entry.title.clone(),
                entry.member.to_string(),
                entry.member_name.clone(),
                timestamp::format(&entry.due_date),
                entry.days_overdue.to_string(),
                format!("{:.2}", entry.fine),
            ])
            .map_err(write_error)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write notices with columns `memberId,kind,message`
pub fn write_notices_csv(notices: &[Notice], output: &mut dyn Write) -> Result<(), CirculationError> {
    if notices.is_empty() {
        return write_header(&["memberId", "kind", "message"], output);
    }
    write_rows(notices, output)
}

/// Write one line per applied request with columns
/// `line,action,transaction,outcome,message`
///
/// `line` counts the applied requests from 1; rows rejected while reading the
/// request file are not counted. `outcome` is `OK` or the error code of the
/// refusal.
pub fn write_outcomes_csv(
    outcomes: &[RequestOutcome],
    output: &mut dyn Write,
) -> Result<(), CirculationError> {
    let mut writer = Writer::from_writer(output);
    writer
        .write_record(["line", "action", "transaction", "outcome", "message"])
        .map_err(write_error)?;

    for outcome in outcomes {
        let action = match outcome.request.action {
            LoanAction::Borrow { .. } => "borrow",
            LoanAction::Return { .. } => "return",
        };
        let (transaction, code, message) = match &outcome.result {
            Ok(receipt) => (
                receipt.transaction.id.to_string(),
                "OK",
                receipt.notice.message.clone(),
            ),
            Err(e) => {
                let transaction = match outcome.request.action {
                    LoanAction::Return { transaction } => transaction.to_string(),
                    LoanAction::Borrow { .. } => String::new(),
                };
                (transaction, e.code(), e.to_string())
            }
        };

        writer
            .write_record(&[
                (outcome.index + 1).to_string(),
                action.to_string(),
                transaction,
                code.to_string(),
                message,
            ])
            .map_err(write_error)?;
    }

    writer.flush()?;
    Ok(())
}
