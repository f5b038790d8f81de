// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The three channel handoffs: integrity, broken channel, bulk transfer.
// Each creates a fresh channel, hands the write end to a peer context and
// keeps the read end, then reports what happened.

use std::time::{Duration, Instant};

use crate::error::{ChannelError, Result};
use crate::payload::Payload;
use crate::pipe::{
    pipe_with, spawn_peer, ChannelOptions, EndpointState, Peer, PipeReader, PipeWriter,
};

/// The log line handed from the bank process to the logger.
pub const TRANSACTION_LOG: &str = "Transaction Log: Deposit 50, Withdraw 30";

/// Bulk-transfer size in bytes.
pub const BULK_PAYLOAD_LEN: usize = 1_000_000;

/// Filler byte for bulk payloads.
pub const BULK_FILL: u8 = b'X';

/// Wind down a handoff whose read side failed with `err`.
///
/// Dropping the read end unblocks a peer stuck on a full pipe, then the peer
/// is joined so its own outcome is logged rather than left on a detached
/// thread. Returns `err`.
fn abort_handoff<T>(
    reader: PipeReader,
    peer: Peer<Result<T>>,
    err: ChannelError,
) -> ChannelError {
    drop(reader);
    let name = peer.name().to_string();
    tracing::debug!(
        peer = %name,
        finished = peer.is_finished(),
        error = %err,
        "read side failed"
    );
    match peer.join() {
        Ok(Ok(_)) => tracing::debug!(peer = %name, "peer completed"),
        Ok(Err(peer_err)) | Err(peer_err) => {
            tracing::warn!(peer = %name, error = %peer_err, "peer failed")
        }
    }
    err
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

/// What the reader got for a single written payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub sent: Payload,
    pub received: Vec<u8>,
}

impl IntegrityReport {
    /// Byte-for-byte equality, terminator included.
    pub fn intact(&self) -> bool {
        self.sent.as_bytes() == self.received.as_slice()
    }
}

/// Write `payload` once from a peer and read it back to end-of-stream.
pub fn integrity_transfer(payload: &Payload, options: ChannelOptions) -> Result<IntegrityReport> {
    let (writer, mut reader) = pipe_with(options)?;

    let message = payload.clone();
    let peer = spawn_peer("log-writer", writer, move |mut w: PipeWriter| -> Result<()> {
        w.write_all(message.as_bytes())?;
        w.close()
    })?;

    let received = match reader.read_to_end() {
        Ok(received) => received,
        Err(e) => return Err(abort_handoff(reader, peer, e)),
    };
    reader.close()?;
    peer.join()??;

    let report = IntegrityReport {
        sent: payload.clone(),
        received,
    };
    tracing::info!(
        sent = report.sent.len(),
        received = report.received.len(),
        intact = report.intact(),
        "integrity transfer"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Broken channel
// ---------------------------------------------------------------------------

/// How the channel is broken before the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokenMode {
    /// The writer closes its own end and then tries to write through it.
    WriterClosed,
    /// The reader closes its end before the writer writes.
    ReaderGone,
}

/// Outcome of a write attempted on a broken channel.
#[derive(Debug)]
pub struct BrokenReport {
    pub mode: BrokenMode,
    /// The error the write returned; `None` means the failure went unnoticed.
    pub detected: Option<ChannelError>,
    /// Writer state after the attempt.
    pub writer_state: EndpointState,
    /// Bytes the reader received (always empty when detection works).
    pub received: Vec<u8>,
    /// Time from the write attempt to its return.
    pub detection_time: Duration,
}

impl BrokenReport {
    pub fn is_detected(&self) -> bool {
        self.detected.is_some()
    }
}

struct BrokenWrite {
    detected: Option<ChannelError>,
    state: EndpointState,
    detection_time: Duration,
}

fn attempt_write(w: &mut PipeWriter, payload: &[u8]) -> BrokenWrite {
    let start = Instant::now();
    let detected = match w.write(payload) {
        Ok(n) => {
            tracing::error!(written = n, "write on broken channel reported success");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "pipe error detected");
            Some(e)
        }
    };
    BrokenWrite {
        detected,
        state: w.state(),
        detection_time: start.elapsed(),
    }
}

/// Attempt a write on a channel broken as described by `mode`.
///
/// Never hangs: a closed write end fails with `ClosedHandle`, a closed read
/// end with `BrokenChannel`.
pub fn broken_channel(mode: BrokenMode, options: ChannelOptions) -> Result<BrokenReport> {
    let (writer, mut reader) = pipe_with(options)?;
    let payload = Payload::from_slice(TRANSACTION_LOG.as_bytes());

    let (outcome, received) = match mode {
        BrokenMode::WriterClosed => {
            let peer = spawn_peer("log-writer", writer, move |mut w: PipeWriter| -> Result<BrokenWrite> {
                w.close()?;
                Ok(attempt_write(&mut w, payload.as_bytes()))
            })?;
            // The only write end is gone, so the reader sees end-of-stream.
            let received = match reader.read_to_end() {
                Ok(received) => received,
                Err(e) => return Err(abort_handoff(reader, peer, e)),
            };
            reader.close()?;
            (peer.join()??, received)
        }
        BrokenMode::ReaderGone => {
            reader.close()?;
            let peer = spawn_peer("log-writer", writer, move |mut w: PipeWriter| {
                attempt_write(&mut w, payload.as_bytes())
            })?;
            (peer.join()?, Vec::new())
        }
    };

    Ok(BrokenReport {
        mode,
        detected: outcome.detected,
        writer_state: outcome.state,
        received,
        detection_time: outcome.detection_time,
    })
}

// ---------------------------------------------------------------------------
// Bulk transfer
// ---------------------------------------------------------------------------

/// Timing and accounting for a bulk transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub bytes_sent: usize,
    pub bytes_received: usize,
    /// Every received byte matched the filler and the lengths agree.
    pub intact: bool,
    /// First write attempt to last byte delivered to the reader.
    pub elapsed: Duration,
    /// First write attempt to the writer's `write_all` returning.
    pub write_elapsed: Duration,
}

impl BulkReport {
    /// Throughput in MiB/s over `elapsed`.
    pub fn throughput_mib_s(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return f64::INFINITY;
        }
        self.bytes_received as f64 / (1024.0 * 1024.0) / secs
    }
}

/// Push `size` filler bytes through a channel in one logical write and read
/// them back `chunk` bytes at a time.
pub fn bulk_transfer(size: usize, chunk: usize, options: ChannelOptions) -> Result<BulkReport> {
    let (writer, mut reader) = pipe_with(options)?;
    let payload = Payload::filled(BULK_FILL, size);

    let peer = spawn_peer(
        "bulk-writer",
        writer,
        move |mut w: PipeWriter| -> Result<(Instant, Duration)> {
            let start = Instant::now();
            w.write_all(payload.as_bytes())?;
            let write_elapsed = start.elapsed();
            w.close()?;
            Ok((start, write_elapsed))
        },
    )?;

    let mut received = Vec::with_capacity(size);
    if let Err(e) = reader.read_into(&mut received, chunk) {
        return Err(abort_handoff(reader, peer, e));
    }
    let delivered = Instant::now();
    reader.close()?;
    let (start, write_elapsed) = peer.join()??;

    let report = BulkReport {
        bytes_sent: size,
        bytes_received: received.len(),
        intact: received.len() == size && received.iter().all(|&b| b == BULK_FILL),
        elapsed: delivered.saturating_duration_since(start),
        write_elapsed,
    };
    tracing::info!(
        bytes = report.bytes_received,
        elapsed_ms = report.elapsed.as_millis() as u64,
        write_ms = report.write_elapsed.as_millis() as u64,
        "bulk transfer"
    );
    Ok(report)
}
