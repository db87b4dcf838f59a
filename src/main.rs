//! Library circulation CLI
//!
//! # Usage
//!
//! ```bash
//! circulation books list > books.csv
//! circulation --snapshot library.json loans borrow --book 4 --member 1
//! circulation --snapshot library.json --now 2024-11-20 loans overdue
//! circulation --snapshot library.json loans apply requests.csv --strategy async
//! circulation --api-url http://localhost:8080/api --offline-demo stats
//! circulation health --watch --interval 10
//! ```
//!
//! Reports go to stdout, logs to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (refused request, unknown id, unreachable backend, bad file, etc.)

use library_circulation::cli;
use std::process;

fn main() {
    let args = cli::parse_args();
    cli::init_tracing(args.verbose);

    let mut output = std::io::stdout();
    if let Err(e) = cli::run(&args, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
