// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Tests for the guarded ledger, its unguarded twin, and the concurrent
// customer workload.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use bankipc::{run_workload, Account, Ledger, UnguardedLedger, Withdrawal, WorkloadConfig};
use proptest::prelude::*;

#[test]
fn deposit_returns_new_balance() {
    let acct = Ledger::new(100);
    assert_eq!(acct.deposit(50), 150);
    assert_eq!(acct.deposit(1), 151);
    assert_eq!(acct.balance(), 151);
}

#[test]
fn withdraw_within_balance() {
    let acct = Ledger::new(100);
    assert_eq!(acct.withdraw(30), Withdrawal::Completed { balance: 70 });
    assert_eq!(acct.balance(), 70);
}

#[test]
fn withdraw_exact_balance() {
    let acct = Ledger::new(30);
    assert_eq!(acct.withdraw(30), Withdrawal::Completed { balance: 0 });
}

#[test]
fn insufficient_funds_leaves_balance() {
    let acct = Ledger::new(20);
    let outcome = acct.withdraw(30);
    assert_eq!(
        outcome,
        Withdrawal::InsufficientFunds {
            balance: 20,
            requested: 30
        }
    );
    assert!(!outcome.is_completed());
    assert_eq!(acct.balance(), 20);
}

#[test]
fn negative_opening_balance_rejects_withdrawals() {
    let acct = Ledger::new(-5);
    assert!(!acct.withdraw(1).is_completed());
    assert_eq!(acct.deposit(10), 5);
    assert!(acct.withdraw(5).is_completed());
}

// 100 initial, 5 customers × 3 × (+50, −30) → 400
#[test]
fn concurrency_scenario_ends_at_400() {
    let acct = Ledger::new(100);
    let config = WorkloadConfig::concurrency();
    let report = run_workload(&acct, &config);

    assert_eq!(report.final_balance, 400);
    assert_eq!(acct.balance(), 400);
    assert_eq!(report.deposits, 15);
    assert_eq!(report.withdrawals_completed, 15);
    assert_eq!(report.withdrawals_rejected, 0);
    assert_eq!(report.lost_amount(100), 0);
    assert!(report.min_observed_balance >= 0);
}

#[test]
fn stress_has_no_lost_updates() {
    let acct = Ledger::new(100);
    let config = WorkloadConfig::stress();
    let report = run_workload(&acct, &config);

    assert_eq!(report.deposits, 150);
    assert_eq!(report.final_balance, 100 + 150 * 20);
    assert_eq!(report.expected_balance(100), report.final_balance);
}

#[test]
fn many_threads_many_rounds() {
    let acct = Ledger::new(0);
    let config = WorkloadConfig {
        workers: 16,
        rounds: 500,
        deposit: 7,
        withdraw: 3,
    };
    let report = run_workload(&acct, &config);
    assert_eq!(report.final_balance, 16 * 500 * 4);
    assert_eq!(report.lost_amount(0), 0);
}

// Withdrawals that race for a limited balance: exactly balance/amount win.
#[test]
fn sufficiency_check_under_contention() {
    let acct = Ledger::new(100);
    let wins = AtomicUsize::new(0);
    let losses = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..20 {
            s.spawn(|| match acct.withdraw(10) {
                Withdrawal::Completed { balance } => {
                    assert!(balance >= 0);
                    wins.fetch_add(1, Ordering::Relaxed);
                }
                Withdrawal::InsufficientFunds { balance, .. } => {
                    assert!(balance < 10);
                    losses.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });

    assert_eq!(wins.load(Ordering::Relaxed), 10);
    assert_eq!(losses.load(Ordering::Relaxed), 10);
    assert_eq!(acct.balance(), 0);
}

#[test]
fn rejected_withdrawals_are_counted() {
    // Every customer withdraws more than it deposits; most attempts fail.
    let acct = Ledger::new(0);
    let config = WorkloadConfig {
        workers: 4,
        rounds: 10,
        deposit: 10,
        withdraw: 25,
    };
    let report = run_workload(&acct, &config);
    assert_eq!(report.withdrawals_completed + report.withdrawals_rejected, 40);
    assert!(report.withdrawals_rejected > 0);
    assert_eq!(report.final_balance, report.expected_balance(0));
    assert!(report.final_balance >= 0);
}

#[test]
fn ledger_usable_through_trait_object() {
    let accounts: Vec<Box<dyn Account>> =
        vec![Box::new(Ledger::new(10)), Box::new(UnguardedLedger::new(10))];
    for acct in &accounts {
        let report = run_workload(acct.as_ref(), &WorkloadConfig {
            workers: 1,
            rounds: 2,
            deposit: 5,
            withdraw: 5,
        });
        assert_eq!(report.final_balance, 10);
    }
}

// The unguarded ledger is exact without contention; under contention it
// still completes and accounts for every attempt, even if updates are lost.
#[test]
fn unguarded_completes_under_contention() {
    let acct = UnguardedLedger::new(100);
    let config = WorkloadConfig::stress();
    let report = run_workload(&acct, &config);

    assert_eq!(report.deposits, 150);
    assert_eq!(report.withdrawals_completed + report.withdrawals_rejected, 150);
    assert!(report.final_balance >= 0);
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Deposit(i64),
    Withdraw(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..1_000).prop_map(Op::Deposit),
        (1i64..1_000).prop_map(Op::Withdraw),
    ]
}

proptest! {
    // Sequential operations agree with a plain integer model, and every
    // withdrawal result matches the balance change.
    #[test]
    fn matches_sequential_model(initial in 0i64..1_000, ops in prop::collection::vec(op(), 0..64)) {
        let acct = Ledger::new(initial);
        let mut model = initial;
        for op in ops {
            match op {
                Op::Deposit(d) => {
                    model += d;
                    prop_assert_eq!(acct.deposit(d), model);
                }
                Op::Withdraw(w) => {
                    let before = acct.balance();
                    let outcome = acct.withdraw(w);
                    if w <= model {
                        model -= w;
                        prop_assert_eq!(outcome, Withdrawal::Completed { balance: model });
                    } else {
                        prop_assert_eq!(outcome, Withdrawal::InsufficientFunds { balance: model, requested: w });
                        prop_assert_eq!(acct.balance(), before);
                    }
                }
            }
        }
        prop_assert_eq!(acct.balance(), model);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Each worker withdraws no more than it just deposited, so every
    // withdrawal is covered and the final balance is fully determined.
    #[test]
    fn concurrent_covered_withdrawals_never_lose_updates(
        initial in 0i64..500,
        pairs in prop::collection::vec((1i64..100, 0i64..100), 1..12),
    ) {
        let acct = Ledger::new(initial);
        thread::scope(|s| {
            for &(d, w) in &pairs {
                let acct = &acct;
                s.spawn(move || {
                    acct.deposit(d);
                    let w = w.min(d);
                    if w > 0 {
                        assert!(acct.withdraw(w).is_completed());
                    }
                });
            }
        });
        let expected = initial + pairs.iter().map(|&(d, w)| d - w.min(d)).sum::<i64>();
        prop_assert_eq!(acct.balance(), expected);
    }
}
