// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Driver for the ledger and channel demonstrations.
//
// Usage:
//   bank-ipc [all]
//   bank-ipc ledger [--workers N] [--rounds N] [--initial N] [--unguarded]
//   bank-ipc stress [--workers N]
//   bank-ipc pipe [--bulk-size BYTES] [--chunk BYTES] [--timeout-ms MS]
//
// Exits non-zero if a channel cannot be created or any scenario fails.

use std::process::ExitCode;
use std::time::Duration;

use bankipc::scenario::{self, BrokenMode, BULK_PAYLOAD_LEN, TRANSACTION_LOG};
use bankipc::{
    run_workload, Account, ChannelError, ChannelOptions, Ledger, Payload, UnguardedLedger,
    WorkloadConfig,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Multi-threaded ledger and pipe handoff demonstrations
#[derive(Parser, Debug)]
#[command(name = "bank-ipc")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Concurrent customers against one ledger
    Ledger(LedgerArgs),
    /// Many concurrent customers, timed
    Stress {
        /// Number of customer threads
        #[arg(long, default_value_t = WorkloadConfig::stress().workers)]
        workers: usize,
    },
    /// Integrity, broken-channel and bulk-transfer handoffs
    Pipe(PipeArgs),
    /// Everything, in order (default)
    All,
}

#[derive(Args, Debug)]
struct LedgerArgs {
    /// Number of customer threads
    #[arg(long, default_value_t = WorkloadConfig::concurrency().workers)]
    workers: usize,

    /// Deposit/withdraw pairs per customer
    #[arg(long, default_value_t = WorkloadConfig::concurrency().rounds)]
    rounds: usize,

    /// Opening balance
    #[arg(long, default_value_t = 100)]
    initial: i64,

    /// Run without the mutex to show lost updates
    #[arg(long)]
    unguarded: bool,
}

#[derive(Args, Debug)]
struct PipeArgs {
    /// Bulk payload size in bytes
    #[arg(long, default_value_t = BULK_PAYLOAD_LEN)]
    bulk_size: usize,

    /// Receive chunk size in bytes
    #[arg(long, default_value_t = bankipc::pipe::DEFAULT_READ_CHUNK)]
    chunk: usize,

    /// Per-operation timeout in milliseconds (blocks indefinitely if unset)
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl Default for PipeArgs {
    fn default() -> Self {
        Self {
            bulk_size: BULK_PAYLOAD_LEN,
            chunk: bankipc::pipe::DEFAULT_READ_CHUNK,
            timeout_ms: None,
        }
    }
}

impl PipeArgs {
    fn options(&self) -> ChannelOptions {
        self.timeout_ms
            .map(|ms| ChannelOptions::with_timeout(Duration::from_millis(ms)))
            .unwrap_or_default()
    }
}

/// Why a demonstration did not succeed.
#[derive(Debug)]
enum Failure {
    Channel(ChannelError),
    Check(&'static str),
}

impl From<ChannelError> for Failure {
    fn from(err: ChannelError) -> Self {
        Self::Channel(err)
    }
}

fn run_ledger<A: Account>(label: &str, account: &A, initial: i64, config: &WorkloadConfig) {
    let report = run_workload(account, config);
    let expected = report.expected_balance(initial);
    tracing::info!(
        "{label}: final balance {} (expected {expected}), {} deposits, {} withdrawals, {} rejected, {} ms",
        report.final_balance,
        report.deposits,
        report.withdrawals_completed,
        report.withdrawals_rejected,
        report.elapsed.as_millis()
    );
    match report.lost_amount(initial) {
        0 => tracing::info!("{label}: no lost updates"),
        lost => tracing::warn!("{label}: {lost} lost to unsynchronised updates"),
    }
}

fn ledger(args: &LedgerArgs) {
    let config = WorkloadConfig {
        workers: args.workers,
        rounds: args.rounds,
        ..WorkloadConfig::concurrency()
    };
    if args.unguarded {
        run_ledger("unguarded", &UnguardedLedger::new(args.initial), args.initial, &config);
    } else {
        run_ledger("guarded", &Ledger::new(args.initial), args.initial, &config);
    }
}

fn stress(workers: usize) {
    let config = WorkloadConfig {
        workers,
        ..WorkloadConfig::stress()
    };
    run_ledger("stress", &Ledger::new(100), 100, &config);
}

fn pipes(args: &PipeArgs) -> Result<(), Failure> {
    let options = args.options();

    tracing::info!("running data integrity handoff");
    let report = scenario::integrity_transfer(&Payload::terminated(TRANSACTION_LOG), options)?;
    tracing::info!("log process received: {}", display_text(&report.received));
    if !report.intact() {
        return Err(Failure::Check("received bytes differ from sent bytes"));
    }

    for mode in [BrokenMode::WriterClosed, BrokenMode::ReaderGone] {
        tracing::info!(?mode, "running broken channel handoff");
        let report = scenario::broken_channel(mode, options)?;
        match &report.detected {
            Some(err) => tracing::info!(
                "detected in {:?}: {err} (writer {:?})",
                report.detection_time,
                report.writer_state
            ),
            None => return Err(Failure::Check("write on broken channel went undetected")),
        }
    }

    tracing::info!(bytes = args.bulk_size, "running bulk transfer");
    let report = scenario::bulk_transfer(args.bulk_size, args.chunk, options)?;
    tracing::info!(
        "received {} bytes in {} ms ({:.1} MiB/s); writer done after {} ms",
        report.bytes_received,
        report.elapsed.as_millis(),
        report.throughput_mib_s(),
        report.write_elapsed.as_millis()
    );
    if !report.intact {
        return Err(Failure::Check("bulk payload arrived incomplete or altered"));
    }
    Ok(())
}

fn display_text(bytes: &[u8]) -> String {
    Payload::from_slice(bytes)
        .text()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("<{} non-text bytes>", bytes.len()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let result = match cli.command.unwrap_or(Command::All) {
        Command::Ledger(args) => {
            ledger(&args);
            Ok(())
        }
        Command::Stress { workers } => {
            stress(workers);
            Ok(())
        }
        Command::Pipe(args) => pipes(&args),
        Command::All => {
            tracing::info!("==== concurrency test ====");
            run_ledger("guarded", &Ledger::new(100), 100, &WorkloadConfig::concurrency());
            tracing::info!("==== synchronisation validation (no mutex) ====");
            run_ledger(
                "unguarded",
                &UnguardedLedger::new(100),
                100,
                &WorkloadConfig::concurrency(),
            );
            tracing::info!("==== stress test ====");
            stress(WorkloadConfig::stress().workers);
            tracing::info!("==== IPC transaction logging ====");
            pipes(&PipeArgs::default())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Channel(err)) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
        Err(Failure::Check(what)) => {
            tracing::error!("{what}");
            ExitCode::FAILURE
        }
    }
}
