// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Concurrent customer workload over any `Account`.
// Each worker performs `rounds` × (deposit, withdraw) and keeps its own
// tally; tallies are merged after every worker has joined.

use std::thread;
use std::time::{Duration, Instant};

use crate::ledger::Account;

/// Shape of a concurrent workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadConfig {
    /// Number of concurrent worker threads.
    pub workers: usize,
    /// Deposit/withdraw pairs per worker.
    pub rounds: usize,
    /// Amount of each deposit.
    pub deposit: i64,
    /// Amount of each withdrawal.
    pub withdraw: i64,
}

impl WorkloadConfig {
    /// Five customers, three rounds of +50 / −30 each.
    pub const fn concurrency() -> Self {
        Self {
            workers: 5,
            rounds: 3,
            deposit: 50,
            withdraw: 30,
        }
    }

    /// Same per-customer pattern with fifty customers.
    pub const fn stress() -> Self {
        Self {
            workers: 50,
            ..Self::concurrency()
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self::concurrency()
    }
}

/// What a workload run did and how long it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadReport {
    pub final_balance: i64,
    pub deposits: usize,
    pub withdrawals_completed: usize,
    pub withdrawals_rejected: usize,
    /// Sum of all deposited amounts.
    pub deposited: i64,
    /// Sum of all successfully withdrawn amounts.
    pub withdrawn: i64,
    /// Smallest balance any operation reported back to its caller.
    pub min_observed_balance: i64,
    pub elapsed: Duration,
}

impl WorkloadReport {
    /// The balance a race-free account must end with.
    pub fn expected_balance(&self, initial: i64) -> i64 {
        initial + self.deposited - self.withdrawn
    }

    /// How far the final balance drifted from the race-free expectation.
    /// Zero for a correctly guarded account.
    pub fn lost_amount(&self, initial: i64) -> i64 {
        self.expected_balance(initial) - self.final_balance
    }
}

#[derive(Debug, Default)]
struct Tally {
    deposits: usize,
    completed: usize,
    rejected: usize,
    deposited: i64,
    withdrawn: i64,
    min_balance: Option<i64>,
}

impl Tally {
    fn observe(&mut self, balance: i64) {
        self.min_balance = Some(self.min_balance.map_or(balance, |m| m.min(balance)));
    }
}

fn customer<A: Account + ?Sized>(account: &A, config: &WorkloadConfig) -> Tally {
    let mut tally = Tally::default();
    for _ in 0..config.rounds {
        let balance = account.deposit(config.deposit);
        tally.deposits += 1;
        tally.deposited += config.deposit;
        tally.observe(balance);

        let outcome = account.withdraw(config.withdraw);
        if outcome.is_completed() {
            tally.completed += 1;
            tally.withdrawn += config.withdraw;
        } else {
            tally.rejected += 1;
        }
        tally.observe(outcome.balance());
    }
    tally
}

/// Run `config.workers` concurrent customers against `account` and wait for
/// all of them.
pub fn run_workload<A: Account + ?Sized>(account: &A, config: &WorkloadConfig) -> WorkloadReport {
    tracing::debug!(
        workers = config.workers,
        rounds = config.rounds,
        "starting workload"
    );
    let start = Instant::now();

    let tallies: Vec<Tally> = thread::scope(|s| {
        let handles: Vec<_> = (0..config.workers)
            .map(|_| s.spawn(move || customer(account, config)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    let elapsed = start.elapsed();
    let final_balance = account.balance();

    let mut report = WorkloadReport {
        final_balance,
        deposits: 0,
        withdrawals_completed: 0,
        withdrawals_rejected: 0,
        deposited: 0,
        withdrawn: 0,
        min_observed_balance: final_balance,
        elapsed,
    };
    for t in tallies {
        report.deposits += t.deposits;
        report.withdrawals_completed += t.completed;
        report.withdrawals_rejected += t.rejected;
        report.deposited += t.deposited;
        report.withdrawn += t.withdrawn;
        if let Some(m) = t.min_balance {
            report.min_observed_balance = report.min_observed_balance.min(m);
        }
    }

    tracing::debug!(
        final_balance = report.final_balance,
        elapsed_ms = elapsed.as_millis() as u64,
        "workload finished"
    );
    report
}
