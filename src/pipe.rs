// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Unidirectional byte channel over an anonymous kernel pipe.
//
// `pipe()` returns a connected `(PipeWriter, PipeReader)` pair. Each endpoint
// owns exactly one OS handle and closes it exactly once, either through
// `close()` or on drop. The kernel buffer provides backpressure and ordering;
// no message boundaries are kept, so the reader either knows the length it
// expects or reads until end-of-stream.
//
// A second execution context is started with `spawn_peer`, which moves one
// endpoint into a new thread. The spawning side is left holding only the
// other endpoint, so "close the end you do not use" is enforced by
// ownership rather than by convention.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{ChannelError, Endpoint, Result};
use crate::platform::{self, PipeHandle, WRITABLE_GUARANTEE};

/// Read size used by `read_to_end` when growing the receive buffer.
pub const DEFAULT_READ_CHUNK: usize = 64 * 1024;

/// Per-channel options. The default blocks indefinitely in both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Longest a single read may wait for data or end-of-stream.
    /// A duration too large to form a deadline waits without bound.
    pub read_timeout: Option<Duration>,
    /// Longest a single write may wait for buffer space.
    ///
    /// Only enforced on POSIX. Windows anonymous pipes cannot report free
    /// space, so there a write to a stalled reader still blocks.
    pub write_timeout: Option<Duration>,
}

impl ChannelOptions {
    /// Same timeout for both directions.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            read_timeout: Some(timeout),
            write_timeout: Some(timeout),
        }
    }
}

/// Lifecycle of an endpoint. `Closed` is terminal; only a writer can become
/// `Broken`, and it stays that way until closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Open,
    Broken,
    Closed,
}

/// Result of a single read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were copied into the caller's buffer.
    Data(usize),
    /// The write end is closed and every buffered byte has been consumed.
    EndOfStream,
}

/// Create a connected channel with default options.
pub fn pipe() -> Result<(PipeWriter, PipeReader)> {
    pipe_with(ChannelOptions::default())
}

/// Create a connected channel.
///
/// Fails with `ResourceExhaustion` when the system is out of descriptors or
/// memory.
pub fn pipe_with(options: ChannelOptions) -> Result<(PipeWriter, PipeReader)> {
    let (read, write) = platform::create_pipe().map_err(ChannelError::from_creation)?;
    tracing::debug!(?options, "pipe created");
    Ok((
        PipeWriter {
            handle: Some(write),
            broken: false,
            timeout: options.write_timeout,
            written: 0,
        },
        PipeReader {
            handle: Some(read),
            timeout: options.read_timeout,
            received: 0,
        },
    ))
}

// ---------------------------------------------------------------------------
// Write end
// ---------------------------------------------------------------------------

/// The write end of a channel.
#[derive(Debug)]
pub struct PipeWriter {
    handle: Option<PipeHandle>,
    broken: bool,
    timeout: Option<Duration>,
    written: u64,
}

impl PipeWriter {
    pub fn state(&self) -> EndpointState {
        match (&self.handle, self.broken) {
            (None, _) => EndpointState::Closed,
            (Some(_), true) => EndpointState::Broken,
            (Some(_), false) => EndpointState::Open,
        }
    }

    /// Total bytes accepted by the kernel so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Enqueue as much of `buf` as the pipe accepts in one call.
    ///
    /// Blocks while the pipe is full. Returns `BrokenChannel` once the read
    /// end is closed; from then on every write fails the same way without
    /// touching the pipe.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let handle = self.handle.as_ref().ok_or(ChannelError::ClosedHandle {
            endpoint: Endpoint::Writer,
        })?;
        if self.broken {
            return Err(ChannelError::BrokenChannel);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let chunk = match self.timeout {
            Some(after) => {
                if !handle.wait_writable(after)? {
                    return Err(ChannelError::TimedOut {
                        endpoint: Endpoint::Writer,
                        after,
                    });
                }
                // Readiness only guarantees room for a small write.
                &buf[..buf.len().min(WRITABLE_GUARANTEE)]
            }
            None => buf,
        };

        match handle.write(chunk) {
            Ok(n) => {
                self.written += n as u64;
                Ok(n)
            }
            Err(e) if platform::is_broken_pipe(&e) => {
                self.broken = true;
                tracing::warn!(written = self.written, "write on broken channel");
                Err(ChannelError::BrokenChannel)
            }
            Err(e) => Err(ChannelError::Io(e)),
        }
    }

    /// Write the whole of `buf`, looping over partial writes.
    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let mut rest = buf;
        while !rest.is_empty() {
            let n = self.write(rest)?;
            if n == 0 {
                return Err(ChannelError::Io(io::Error::from(io::ErrorKind::WriteZero)));
            }
            rest = &rest[n..];
        }
        tracing::trace!(len = buf.len(), "write_all complete");
        Ok(())
    }

    /// Release the handle. The reader sees end-of-stream once it has
    /// drained what was written.
    pub fn close(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(ChannelError::ClosedHandle {
            endpoint: Endpoint::Writer,
        })?;
        tracing::debug!(written = self.written, "write end closed");
        handle.close()?;
        Ok(())
    }
}

impl io::Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        PipeWriter::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Read end
// ---------------------------------------------------------------------------

/// The read end of a channel.
#[derive(Debug)]
pub struct PipeReader {
    handle: Option<PipeHandle>,
    timeout: Option<Duration>,
    received: u64,
}

impl PipeReader {
    pub fn state(&self) -> EndpointState {
        if self.handle.is_some() {
            EndpointState::Open
        } else {
            EndpointState::Closed
        }
    }

    /// Total bytes received so far.
    pub fn bytes_read(&self) -> u64 {
        self.received
    }

    /// Read into `buf`, blocking until at least one byte is available or
    /// the writer has closed with nothing left buffered.
    ///
    /// An empty `buf` returns `Data(0)` without touching the pipe.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let handle = self.handle.as_ref().ok_or(ChannelError::ClosedHandle {
            endpoint: Endpoint::Reader,
        })?;
        if buf.is_empty() {
            return Ok(ReadOutcome::Data(0));
        }
        if let Some(after) = self.timeout {
            if !handle.wait_readable(after)? {
                return Err(ChannelError::TimedOut {
                    endpoint: Endpoint::Reader,
                    after,
                });
            }
        }
        match handle.read(buf)? {
            0 => Ok(ReadOutcome::EndOfStream),
            n => {
                self.received += n as u64;
                Ok(ReadOutcome::Data(n))
            }
        }
    }

    /// Read at most `max_bytes` into a fresh buffer. `None` is end-of-stream.
    pub fn read_up_to(&mut self, max_bytes: usize) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; max_bytes];
        match self.read(&mut buf)? {
            ReadOutcome::Data(n) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            ReadOutcome::EndOfStream => Ok(None),
        }
    }

    /// Append everything up to end-of-stream onto `out`, reading at most
    /// `chunk` bytes per call. Returns the number of bytes appended.
    pub fn read_into(&mut self, out: &mut Vec<u8>, chunk: usize) -> Result<usize> {
        let chunk = chunk.max(1);
        let start = out.len();
        loop {
            let filled = out.len();
            out.resize(filled + chunk, 0);
            match self.read(&mut out[filled..]) {
                Ok(ReadOutcome::Data(n)) => out.truncate(filled + n),
                Ok(ReadOutcome::EndOfStream) => {
                    out.truncate(filled);
                    return Ok(out.len() - start);
                }
                Err(e) => {
                    out.truncate(filled);
                    return Err(e);
                }
            }
        }
    }

    /// Read until end-of-stream into a growable buffer.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.read_into(&mut out, DEFAULT_READ_CHUNK)?;
        Ok(out)
    }

    /// Release the handle. A writer still holding the other end will get
    /// `BrokenChannel` on its next write.
    pub fn close(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(ChannelError::ClosedHandle {
            endpoint: Endpoint::Reader,
        })?;
        tracing::debug!(received = self.received, "read end closed");
        handle.close()?;
        Ok(())
    }
}

impl io::Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match PipeReader::read(self, buf)? {
            ReadOutcome::Data(n) => Ok(n),
            ReadOutcome::EndOfStream => Ok(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Peer execution context
// ---------------------------------------------------------------------------

/// A second execution context that owns one channel endpoint.
#[derive(Debug)]
pub struct Peer<T> {
    name: String,
    handle: JoinHandle<T>,
}

/// Run `job(endpoint)` on a new named thread.
///
/// The endpoint moves into the peer; the caller keeps the opposite end.
/// Fails with `ResourceExhaustion` if the thread cannot be created.
pub fn spawn_peer<E, T, F>(name: &str, endpoint: E, job: F) -> Result<Peer<T>>
where
    E: Send + 'static,
    T: Send + 'static,
    F: FnOnce(E) -> T + Send + 'static,
{
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || job(endpoint))
        .map_err(ChannelError::from_creation)?;
    tracing::debug!(peer = name, "peer spawned");
    Ok(Peer {
        name: name.to_string(),
        handle,
    })
}

impl<T> Peer<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the peer's job has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the peer and return its job's result.
    pub fn join(self) -> Result<T> {
        let Self { name, handle } = self;
        handle
            .join()
            .map_err(|_| ChannelError::PeerPanicked { peer: name })
    }
}
