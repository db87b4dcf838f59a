// CLI module
// Command-line interface, argument parsing and command dispatch

mod args;
mod commands;

pub use args::{
    ApplyArgs, BookCommand, BookFields, CliArgs, Command, LoanCommand, MemberCommand,
    MemberFields, StrategyType,
};
pub use commands::{execute, run};

use clap::Parser;

/// Parse command-line arguments using clap
///
/// On invalid arguments or `--help`, clap prints the message and exits the
/// process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Install the global tracing subscriber
///
/// Events go to stderr so reports on stdout stay machine-readable. The level
/// follows the `-v` count and can be refined through `RUST_LOG`.
pub fn init_tracing(verbosity: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
