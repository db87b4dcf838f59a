//! Built-in demo data for offline mode
//!
//! When the backend cannot be reached the CLI can fall back to this sample
//! library. Loan dates are laid out relative to `now` so the sample always
//! shows one loan of each kind: on time, overdue, just borrowed, returned.

use crate::types::{
    Book, BorrowingTransaction, LoanStatus, Member, MembershipStatus, Snapshot,
};
use chrono::{DateTime, TimeDelta, Utc};

fn book(
    id: u64,
    title: &str,
    author: &str,
    genre: &str,
    isbn: &str,
    year: i32,
    total: u32,
    available: u32,
) -> Book {
    Book {
        id,
        title: title.to_string(),
        author: author.to_string(),
        genre: Some(genre.to_string()),
        isbn: Some(isbn.to_string()),
        year_published: Some(year),
        total_copies: total,
        available_copies: available,
    }
}

fn member(id: u64, name: &str, email: &str, status: MembershipStatus, now: DateTime<Utc>) -> Member {
    Member {
        id,
        name: name.to_string(),
        email: email.to_string(),
        phone: Some(format!("555-010{}", id)),
        address: None,
        membership_status: status,
        registration_date: Some((now - TimeDelta::days(365)).date_naive()),
    }
}

fn loan(id: u64, book_id: u64, member_id: u64, borrowed: DateTime<Utc>) -> BorrowingTransaction {
    BorrowingTransaction {
        id,
        book_id,
        member_id,
        borrow_date: borrowed,
        due_date: borrowed + TimeDelta::days(14),
        return_date: None,
        status: LoanStatus::Borrowed,
    }
}

/// Sample library as seen at `now`
pub fn demo_snapshot(now: DateTime<Utc>) -> Snapshot {
    let books = vec![
        book(1, "The Great Gatsby", "F. Scott Fitzgerald", "Fiction", "978-0-7432-7356-5", 1925, 5, 4),
        book(2, "To Kill a Mockingbird", "Harper Lee", "Fiction", "978-0-06-112008-4", 1960, 3, 2),
        book(3, "1984", "George Orwell", "Dystopian Fiction", "978-0-452-28423-4", 1949, 1, 0),
        book(4, "A Brief History of Time", "Stephen Hawking", "Science", "978-0-553-38016-3", 1988, 2, 2),
    ];

    let members = vec![
        member(1, "John Doe", "john.doe@email.com", MembershipStatus::Active, now),
        member(2, "Jane Smith", "jane.smith@email.com", MembershipStatus::Active, now),
        member(3, "Bob Johnson", "bob.johnson@email.com", MembershipStatus::Suspended, now),
    ];

    let mut returned = loan(4, 4, 2, now - TimeDelta::days(30));
    returned.return_date = Some(now - TimeDelta::days(18));
    returned.status = LoanStatus::Returned;

    let transactions = vec![
        loan(1, 1, 1, now - TimeDelta::days(5)),
        loan(2, 2, 2, now - TimeDelta::days(20)),
        loan(3, 3, 1, now - TimeDelta::days(1)),
        returned,
    ];

    Snapshot {
        books,
        members,
        transactions,
    }
}
