use crate::core::policy::{DEFAULT_LOAN_PERIOD_DAYS, DEFAULT_MAX_OPEN_LOANS};
use crate::core::LoanPolicy;
use crate::strategy::BatchConfig;
use crate::types::{timestamp, BookDraft, BookId, MemberDraft, MemberId, MembershipStatus, TransactionId};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Library circulation desk
///
/// Works against a local JSON snapshot (`--snapshot`) or the REST backend
/// (`--api-url`, default http://localhost:8080/api).
#[derive(Parser, Debug)]
#[command(name = "circulation", version)]
pub struct CliArgs {
    /// Use a local snapshot file instead of the REST backend
    #[arg(long, global = true, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Base URL of the REST backend
    #[arg(long = "api-url", global = true, env = "LIBRARY_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// Evaluate at this time instead of the current time
    #[arg(long, global = true, value_name = "TIMESTAMP", value_parser = timestamp::parse)]
    pub now: Option<DateTime<Utc>>,

    /// Fall back to the built-in demo library when the backend is offline
    #[arg(long = "offline-demo", global = true)]
    pub offline_demo: bool,

    /// Days between borrowing and the due date
    #[arg(
        long = "loan-days",
        global = true,
        env = "CIRCULATION_LOAN_DAYS",
        value_name = "DAYS",
        default_value_t = DEFAULT_LOAN_PERIOD_DAYS
    )]
    pub loan_days: u32,

    /// Maximum open loans per member (0 for unlimited)
    #[arg(
        long = "max-loans",
        global = true,
        env = "CIRCULATION_MAX_LOANS",
        value_name = "COUNT",
        default_value_t = DEFAULT_MAX_OPEN_LOANS
    )]
    pub max_loans: u32,

    /// Fine per started day past the due date
    #[arg(
        long = "daily-fine",
        global = true,
        env = "CIRCULATION_DAILY_FINE",
        value_name = "AMOUNT",
        default_value = "0.50"
    )]
    pub daily_fine: Decimal,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the catalog
    #[command(subcommand)]
    Books(BookCommand),

    /// Manage members
    #[command(subcommand)]
    Members(MemberCommand),

    /// Borrow, return and report on loans
    #[command(subcommand)]
    Loans(LoanCommand),

    /// Print dashboard statistics as JSON
    Stats,

    /// Check whether the backend is reachable
    Health {
        /// Keep probing and print every change until interrupted
        #[arg(long)]
        watch: bool,

        /// Seconds between probes when watching
        #[arg(long, value_name = "SECONDS", default_value_t = 30)]
        interval: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum BookCommand {
    /// List every book as CSV
    List,
    /// Show one book as JSON
    Get { id: BookId },
    /// Add a book
    Add(BookFields),
    /// Replace a book's details
    Update {
        id: BookId,
        #[command(flatten)]
        fields: BookFields,
    },
    /// Remove a book with no copies on loan
    Remove { id: BookId },
    /// Books whose title, author or genre contains KEYWORD
    Search { keyword: String },
    /// Books with at least one copy on the shelf
    Available,
}

#[derive(Args, Debug, Clone)]
pub struct BookFields {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub author: String,
    #[arg(long)]
    pub genre: Option<String>,
    #[arg(long)]
    pub isbn: Option<String>,
    #[arg(long = "year", value_name = "YEAR")]
    pub year_published: Option<i32>,
    /// Copies on the shelf
    #[arg(long = "copies", value_name = "COUNT")]
    pub available_copies: u32,
    /// Copies owned, when some are on loan (defaults to --copies)
    #[arg(long = "total", value_name = "COUNT")]
    pub total_copies: Option<u32>,
}

impl From<BookFields> for BookDraft {
    fn from(fields: BookFields) -> Self {
        BookDraft {
            title: fields.title,
            author: fields.author,
            genre: fields.genre,
            isbn: fields.isbn,
            year_published: fields.year_published,
            total_copies: fields.total_copies,
            available_copies: fields.available_copies,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    /// List every member as CSV
    List,
    /// Show one member as JSON
    Get { id: MemberId },
    /// Register a member
    Add(MemberFields),
    /// Replace a member's details
    Update {
        id: MemberId,
        #[command(flatten)]
        fields: MemberFields,
    },
    /// Remove a member holding no open loans
    Remove { id: MemberId },
    /// Members whose name or email contains NAME
    Search { name: String },
    /// Members allowed to borrow
    Active,
}

#[derive(Args, Debug, Clone)]
pub struct MemberFields {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    /// ACTIVE, SUSPENDED or EXPIRED (defaults to ACTIVE)
    #[arg(long = "status", value_name = "STATUS")]
    pub membership_status: Option<MembershipStatus>,
    /// Registration date as YYYY-MM-DD (defaults to today)
    #[arg(long = "registered", value_name = "DATE")]
    pub registration_date: Option<NaiveDate>,
}

impl From<MemberFields> for MemberDraft {
    fn from(fields: MemberFields) -> Self {
        MemberDraft {
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            address: fields.address,
            membership_status: fields.membership_status,
            registration_date: fields.registration_date,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum LoanCommand {
    /// List every transaction as CSV with its status at --now
    List,
    /// Lend a book to a member
    Borrow {
        #[arg(long)]
        book: BookId,
        #[arg(long)]
        member: MemberId,
    },
    /// Take back the copy lent by a transaction
    Return { transaction: TransactionId },
    /// Overdue loans with days late and accrued fines
    Overdue,
    /// Every loan of one member
    Member { member: MemberId },
    /// Overdue notices for every late loan
    Notify,
    /// Replay a CSV file of loan requests against the snapshot
    Apply(ApplyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    /// CSV file with columns type,book,member,transaction,at
    #[arg(value_name = "INPUT")]
    pub input_file: PathBuf,

    /// Processing strategy to use for the request file
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Processing strategy: 'sync' for in-order or 'async' for member-parallel batches"
    )]
    pub strategy: StrategyType,

    /// Number of requests per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of requests per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,
}

/// Available strategies for applying request files
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl ApplyArgs {
    /// Create a BatchConfig from the arguments, defaulting what is missing
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}

impl CliArgs {
    /// Loan policy from the policy flags
    pub fn policy(&self) -> LoanPolicy {
        LoanPolicy::new(self.loan_days, self.max_loans, self.daily_fine)
    }
}
