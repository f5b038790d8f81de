// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Shared account balance mutated by concurrent workers.
//
// `Ledger` serialises every read-modify-write behind one mutex.
// `UnguardedLedger` performs the same operations with no lock at all and is
// kept as a separate type so the two can never be confused; it exists to
// show lost updates under contention.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outcome of a withdrawal attempt.
///
/// Insufficient funds is an ordinary business result, not an error: the
/// balance is left untouched and the caller decides what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Withdrawal {
    /// The amount was subtracted; `balance` is the new balance.
    Completed { balance: i64 },
    /// `requested` exceeded `balance`; nothing changed.
    InsufficientFunds { balance: i64, requested: i64 },
}

impl Withdrawal {
    /// Whether the withdrawal went through.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Balance observed at the end of the operation.
    pub fn balance(&self) -> i64 {
        match *self {
            Self::Completed { balance } | Self::InsufficientFunds { balance, .. } => balance,
        }
    }
}

/// Operations shared by the guarded and unguarded ledgers.
pub trait Account: Sync {
    /// Add `amount` (positive) and return the resulting balance.
    fn deposit(&self, amount: i64) -> i64;

    /// Subtract `amount` (positive) if the balance covers it.
    fn withdraw(&self, amount: i64) -> Withdrawal;

    /// Current balance.
    fn balance(&self) -> i64;
}

// ---------------------------------------------------------------------------
// Ledger: mutex-guarded
// ---------------------------------------------------------------------------

/// A balance guarded by a single mutex.
///
/// Every operation holds the lock across the whole read-modify-write, so no
/// caller can observe a partially applied deposit or withdrawal and no
/// update is lost regardless of how many threads contend.
#[derive(Debug)]
pub struct Ledger {
    balance: Mutex<i64>,
}

impl Ledger {
    /// Create a ledger holding `initial`.
    pub fn new(initial: i64) -> Self {
        Self {
            balance: Mutex::new(initial),
        }
    }

    // The guarded value is a single integer updated in one assignment, so a
    // panic in another holder cannot leave it half-written.
    fn lock(&self) -> MutexGuard<'_, i64> {
        self.balance.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Account for Ledger {
    fn deposit(&self, amount: i64) -> i64 {
        debug_assert!(amount > 0, "deposit amount must be positive");
        let mut balance = self.lock();
        *balance += amount;
        tracing::trace!(amount, balance = *balance, "deposited");
        *balance
    }

    fn withdraw(&self, amount: i64) -> Withdrawal {
        debug_assert!(amount > 0, "withdraw amount must be positive");
        let mut balance = self.lock();
        if *balance >= amount {
            *balance -= amount;
            tracing::trace!(amount, balance = *balance, "withdrawn");
            Withdrawal::Completed { balance: *balance }
        } else {
            tracing::debug!(amount, balance = *balance, "insufficient funds");
            Withdrawal::InsufficientFunds {
                balance: *balance,
                requested: amount,
            }
        }
    }

    fn balance(&self) -> i64 {
        *self.lock()
    }
}

// ---------------------------------------------------------------------------
// UnguardedLedger: no lock, races on purpose
// ---------------------------------------------------------------------------

/// The same account with no mutual exclusion.
///
/// Each operation reads the balance, yields to the scheduler, then writes
/// back a value computed from the stale read. Loads and stores are atomic,
/// so there is no undefined behaviour, but concurrent callers overwrite each
/// other's results and the final balance is generally wrong.
#[derive(Debug)]
pub struct UnguardedLedger {
    balance: AtomicI64,
}

impl UnguardedLedger {
    /// Create an unguarded ledger holding `initial`.
    pub fn new(initial: i64) -> Self {
        Self {
            balance: AtomicI64::new(initial),
        }
    }
}

impl Account for UnguardedLedger {
    fn deposit(&self, amount: i64) -> i64 {
        let current = self.balance.load(Ordering::Relaxed);
        std::thread::yield_now();
        let next = current + amount;
        self.balance.store(next, Ordering::Relaxed);
        tracing::trace!(amount, balance = next, "deposited (unguarded)");
        next
    }

    fn withdraw(&self, amount: i64) -> Withdrawal {
        let current = self.balance.load(Ordering::Relaxed);
        if current < amount {
            tracing::debug!(amount, balance = current, "insufficient funds (unguarded)");
            return Withdrawal::InsufficientFunds {
                balance: current,
                requested: amount,
            };
        }
        std::thread::yield_now();
        let next = current - amount;
        self.balance.store(next, Ordering::Relaxed);
        tracing::trace!(amount, balance = next, "withdrawn (unguarded)");
        Withdrawal::Completed { balance: next }
    }

    fn balance(&self) -> i64 {
        self.balance.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn withdrawal_accessors() {
        let ok = Withdrawal::Completed { balance: 70 };
        assert!(ok.is_completed());
        assert_eq!(ok.balance(), 70);

        let short = Withdrawal::InsufficientFunds { balance: 10, requested: 30 };
        assert!(!short.is_completed());
        assert_eq!(short.balance(), 10);
    }

    #[test]
    fn unguarded_single_thread_is_exact() {
        // Without contention the unguarded path computes the same result.
        let acct = UnguardedLedger::new(100);
        assert_eq!(acct.deposit(50), 150);
        assert_eq!(acct.withdraw(30), Withdrawal::Completed { balance: 120 });
        assert_eq!(
            acct.withdraw(500),
            Withdrawal::InsufficientFunds { balance: 120, requested: 500 }
        );
        assert_eq!(acct.balance(), 120);
    }
}
