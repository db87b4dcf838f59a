//! Command dispatch
//!
//! `run` picks the backend from the global flags and hands the parsed
//! command to `execute`, which renders results on `output`: lists as CSV,
//! single records and statistics as JSON, confirmations as text.

use super::args::{BookCommand, CliArgs, Command, LoanCommand, MemberCommand};
use crate::backend::{Backend, MemoryBackend, RemoteBackend, SnapshotBackend};
use crate::client::{ClientConfig, HealthMonitor, HealthStatus, DEFAULT_BASE_URL};
use crate::core::LoanReceipt;
use crate::io::csv_format::{
    write_books_csv, write_members_csv, write_notices_csv, write_overdue_csv,
    write_transactions_csv,
};
use crate::io::demo::demo_snapshot;
use crate::strategy::create_strategy;
use crate::types::{timestamp, CirculationError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

/// Run the command described by `args`
///
/// With `--offline-demo`, a command that fails because the REST backend is
/// unreachable is run again against the built-in demo library.
///
/// # Errors
///
/// Returns whatever the command failed with.
pub fn run(args: &CliArgs, output: &mut dyn Write) -> Result<(), CirculationError> {
    let now = args.now.unwrap_or_else(Utc::now);

    if let Command::Health {
        watch: true,
        interval,
    } = args.command
    {
        return watch_health(args, Duration::from_secs(interval.max(1)), output);
    }

    let mut backend = open_backend(args)?;
    match execute(&args.command, backend.as_mut(), now, output) {
        Err(e) if e.is_offline() && args.offline_demo => {
            tracing::warn!("{}; using the built-in demo library, changes will not be saved", e);
            let mut demo = MemoryBackend::new(demo_snapshot(now), args.policy())?;
            execute(&args.command, &mut demo, now, output)
        }
        other => other,
    }
}

/// `--snapshot` selects the file backend; otherwise the REST backend is used
fn open_backend(args: &CliArgs) -> Result<Box<dyn Backend>, CirculationError> {
    match &args.snapshot {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Using snapshot file");
            Ok(Box::new(SnapshotBackend::new(path, args.policy())))
        }
        None => {
            let config = client_config(args);
            tracing::debug!(url = %config.base_url, "Using REST backend");
            Ok(Box::new(RemoteBackend::new(config, args.policy())?))
        }
    }
}

fn client_config(args: &CliArgs) -> ClientConfig {
    ClientConfig {
        loan_period: args.policy().loan_period(),
        ..ClientConfig::new(args.api_url.as_deref().unwrap_or(DEFAULT_BASE_URL))
    }
}

/// Execute one command against `backend`
pub fn execute(
    command: &Command,
    backend: &mut dyn Backend,
    now: DateTime<Utc>,
    output: &mut dyn Write,
) -> Result<(), CirculationError> {
    match command {
        Command::Books(command) => execute_book(command, backend, output),
        Command::Members(command) => execute_member(command, backend, now, output),
        Command::Loans(command) => execute_loan(command, backend, now, output),
        Command::Stats => write_json(&backend.stats(now)?, output),
        Command::Health { .. } => {
            let status = if backend.health() {
                HealthStatus::Online
            } else {
                HealthStatus::Offline
            };
            writeln!(output, "{}", status)?;
            Ok(())
        }
    }
}

fn execute_book(
    command: &BookCommand,
    backend: &mut dyn Backend,
    output: &mut dyn Write,
) -> Result<(), CirculationError> {
    match command {
        BookCommand::List => write_books_csv(&backend.books()?, output),
        BookCommand::Get { id } => write_json(&backend.book(*id)?, output),
        BookCommand::Add(fields) => write_json(&backend.add_book(fields.clone().into())?, output),
        BookCommand::Update { id, fields } => {
            write_json(&backend.update_book(*id, fields.clone().into())?, output)
        }
        BookCommand::Remove { id } => {
            backend.remove_book(*id)?;
            writeln!(output, "Removed book {}", id)?;
            Ok(())
        }
        BookCommand::Search { keyword } => write_books_csv(&backend.search_books(keyword)?, output),
        BookCommand::Available => write_books_csv(&backend.available_books()?, output),
    }
}

fn execute_member(
    command: &MemberCommand,
    backend: &mut dyn Backend,
    now: DateTime<Utc>,
    output: &mut dyn Write,
) -> Result<(), CirculationError> {
    let today = now.date_naive();
    match command {
        MemberCommand::List => write_members_csv(&backend.members()?, output),
        MemberCommand::Get { id } => write_json(&backend.member(*id)?, output),
        MemberCommand::Add(fields) => {
            write_json(&backend.add_member(fields.clone().into(), today)?, output)
        }
        MemberCommand::Update { id, fields } => write_json(
            &backend.update_member(*id, fields.clone().into(), today)?,
            output,
        ),
        MemberCommand::Remove { id } => {
            backend.remove_member(*id)?;
            writeln!(output, "Removed member {}", id)?;
            Ok(())
        }
        MemberCommand::Search { name } => write_members_csv(&backend.search_members(name)?, output),
        MemberCommand::Active => write_members_csv(&backend.active_members()?, output),
    }
}

fn execute_loan(
    command: &LoanCommand,
    backend: &mut dyn Backend,
    now: DateTime<Utc>,
    output: &mut dyn Write,
) -> Result<(), CirculationError> {
    match command {
        LoanCommand::List => write_transactions_csv(&backend.transactions()?, now, output),
        LoanCommand::Borrow { book, member } => {
            write_receipt(&backend.borrow(*book, *member, now)?, output)
        }
        LoanCommand::Return { transaction } => {
            write_receipt(&backend.return_loan(*transaction, now)?, output)
        }
        LoanCommand::Overdue => write_overdue_csv(&backend.overdue(now)?, output),
        LoanCommand::Member { member } => {
            write_transactions_csv(&backend.member_loans(*member)?, now, output)
        }
        LoanCommand::Notify => write_notices_csv(&backend.overdue_notices(now)?, output),
        LoanCommand::Apply(apply) => {
            if !backend.stores_snapshots() {
                return Err(CirculationError::validation(
                    "loans apply needs a snapshot file (--snapshot)",
                ));
            }
            let config = apply.to_batch_config();
            tracing::info!(
                strategy = ?apply.strategy,
                batch_size = config.batch_size,
                "Applying {}",
                apply.input_file.display()
            );

            let strategy = create_strategy(apply.strategy, Some(config));
            let snapshot = strategy.apply(
                backend.snapshot()?,
                &apply.input_file,
                now,
                backend.policy(),
                output,
            )?;
            backend.store(snapshot)
        }
    }
}

fn write_receipt(receipt: &LoanReceipt, output: &mut dyn Write) -> Result<(), CirculationError> {
    writeln!(
        output,
        "Transaction {}: {}",
        receipt.transaction.id, receipt.notice.message
    )?;
    Ok(())
}

fn write_json<T: Serialize>(value: &T, output: &mut dyn Write) -> Result<(), CirculationError> {
    serde_json::to_writer_pretty(&mut *output, value).map_err(|e| CirculationError::IoError {
        message: e.to_string(),
    })?;
    writeln!(output)?;
    Ok(())
}

/// Print every change of the backend's health until Ctrl+C or SIGTERM
fn watch_health(
    args: &CliArgs,
    interval: Duration,
    output: &mut dyn Write,
) -> Result<(), CirculationError> {
    if args.snapshot.is_some() {
        return Err(CirculationError::validation(
            "health --watch needs the REST backend",
        ));
    }

    let backend = RemoteBackend::new(client_config(args), args.policy())?;
    backend.block_on(async {
        let monitor = HealthMonitor::spawn(backend.client().clone(), interval);
        let mut updates = monitor.subscribe();
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => break Ok(()),
                changed = updates.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                    let status = *updates.borrow_and_update();
                    if let Err(e) = writeln!(output, "{} {}", timestamp::format(&Utc::now()), status)
                        .and_then(|_| output.flush())
                    {
                        break Err(CirculationError::from(e));
                    }
                }
            }
        };

        monitor.shutdown().await;
        result
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LoanPolicy;
    use crate::io::snapshot_file;
    use clap::Parser;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 20, 10, 0, 0).unwrap()
    }

    fn demo() -> MemoryBackend {
        MemoryBackend::new(demo_snapshot(now()), LoanPolicy::default()).unwrap()
    }

    fn run_command(argv: &[&str], backend: &mut dyn Backend) -> Result<String, CirculationError> {
        let args = CliArgs::try_parse_from(std::iter::once("circulation").chain(argv.iter().copied()))
            .unwrap();
        let mut output = Vec::new();
        execute(&args.command, backend, now(), &mut output)?;
        Ok(String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_borrow_prints_confirmation() {
        let mut backend = demo();
        let text = run_command(&["loans", "borrow", "--book", "4", "--member", "1"], &mut backend)
            .unwrap();
        assert_eq!(
            text,
            "Transaction 5: You have successfully borrowed 'A Brief History of Time'. Due date: 2024-12-04\n"
        );
    }

    #[test]
    fn test_refused_borrow_is_error() {
        let mut backend = demo();
        let result = run_command(&["loans", "borrow", "--book", "1", "--member", "3"], &mut backend);
        assert!(matches!(
            result,
            Err(CirculationError::MemberNotEligible { member: 3, .. })
        ));
    }

    #[test]
    fn test_stats_json() {
        let mut backend = demo();
        let text = run_command(&["stats"], &mut backend).unwrap();
        let stats: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(stats["totalBooks"], 4);
        assert_eq!(stats["activeMembers"], 2);
        assert_eq!(stats["activeTransactions"], 3);
        assert_eq!(stats["overdueBooks"], 1);
    }

    #[test]
    fn test_overdue_report() {
        let mut backend = demo();
        let text = run_command(&["loans", "overdue"], &mut backend).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("2,2,To Kill a Mockingbird,2,Jane Smith,"));
        assert!(lines[1].ends_with(",6,3.00"));
    }

    #[test]
    fn test_member_get_unknown() {
        let mut backend = demo();
        assert!(matches!(
            run_command(&["members", "get", "42"], &mut backend),
            Err(CirculationError::NotFound { id: 42, .. })
        ));
    }

    #[test]
    fn test_apply_requires_storable_backend() {
        let config = ClientConfig::new("http://127.0.0.1:9/api");
        let mut backend = RemoteBackend::new(config, LoanPolicy::default()).unwrap();
        let result = run_command(&["loans", "apply", "requests.csv"], &mut backend);
        assert!(matches!(result, Err(CirculationError::ValidationError { .. })));
    }

    #[test]
    fn test_run_against_snapshot_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("library.json");
        snapshot_file::save(&path, &demo_snapshot(now())).unwrap();
        let path_arg = path.display().to_string();

        let args = CliArgs::try_parse_from([
            "circulation",
            "--snapshot",
            path_arg.as_str(),
            "--now",
            "2024-11-20T10:00:00Z",
            "loans",
            "return",
            "2",
        ])
        .unwrap();
        let mut output = Vec::new();
        run(&args, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Transaction 2: You have successfully returned 'To Kill a Mockingbird'. Thank you!\n"
        );
        assert!(!snapshot_file::load(&path).unwrap().transactions[1].is_open());
    }

    #[test]
    fn test_offline_demo_fallback() {
        let args = CliArgs::try_parse_from([
            "circulation",
            "--api-url",
            "http://127.0.0.1:9/api",
            "--offline-demo",
            "--now",
            "2024-11-20T10:00:00Z",
            "books",
            "available",
        ])
        .unwrap();
        let mut output = Vec::new();
        run(&args, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("A Brief History of Time"));
    }

    #[test]
    fn test_offline_without_demo_fails() {
        let args = CliArgs::try_parse_from([
            "circulation",
            "--api-url",
            "http://127.0.0.1:9/api",
            "stats",
        ])
        .unwrap();
        let mut output = Vec::new();
        let error = run(&args, &mut output).unwrap_err();
        assert!(error.is_offline());
    }
}
