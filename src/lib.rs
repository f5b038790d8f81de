// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Two independent primitives:
// - a mutex-guarded shared ledger (plus an unguarded twin that loses updates)
// - a one-shot byte handoff over an anonymous kernel pipe between two
//   execution contexts, with broken-channel detection and bulk transfer.

mod platform;

pub mod error;
pub use error::{ChannelError, Endpoint, Result};

pub mod ledger;
pub use ledger::{Account, Ledger, UnguardedLedger, Withdrawal};

pub mod workload;
pub use workload::{run_workload, WorkloadConfig, WorkloadReport};

mod payload;
pub use payload::Payload;

pub mod pipe;
pub use pipe::{
    pipe, pipe_with, spawn_peer, ChannelOptions, EndpointState, Peer, PipeReader, PipeWriter,
    ReadOutcome,
};

pub mod scenario;
