// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error taxonomy for the byte channel.
// The ledger has no error type: "insufficient funds" is an ordinary
// `Withdrawal` value, and end-of-stream is an ordinary `ReadOutcome`.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Which side of a channel an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The write end.
    Writer,
    /// The read end.
    Reader,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Writer => f.write_str("write end"),
            Self::Reader => f.write_str("read end"),
        }
    }
}

/// Errors from channel creation and endpoint operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The system could not allocate the pipe or the peer context
    /// (descriptor/handle limits, out of memory, thread limit).
    #[error("resource exhaustion: {source}")]
    ResourceExhaustion {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Write attempted after the peer's read end was closed.
    #[error("broken channel: read end is closed")]
    BrokenChannel,

    /// Operation on an endpoint that was already closed.
    #[error("operation on closed {endpoint}")]
    ClosedHandle {
        /// The endpoint that was closed.
        endpoint: Endpoint,
    },

    /// A configured read or write timeout elapsed.
    #[error("{endpoint} timed out after {after:?}")]
    TimedOut {
        /// The endpoint whose operation timed out.
        endpoint: Endpoint,
        /// The configured timeout.
        after: Duration,
    },

    /// The peer execution context panicked before finishing its job.
    #[error("peer '{peer}' panicked")]
    PeerPanicked {
        /// Name of the peer thread.
        peer: String,
    },

    /// Any other OS-level failure.
    #[error("channel I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ChannelError {
    /// Returns true if the error should abort the caller's work.
    ///
    /// `BrokenChannel` and `TimedOut` are left to the caller's discretion;
    /// everything else is a resource failure or a programming error.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ResourceExhaustion { .. }
            | Self::ClosedHandle { .. }
            | Self::PeerPanicked { .. }
            | Self::Io(_) => true,

            Self::BrokenChannel | Self::TimedOut { .. } => false,
        }
    }

    /// Classify an OS error from pipe or thread creation.
    pub(crate) fn from_creation(err: io::Error) -> Self {
        if crate::platform::is_exhaustion(&err) {
            Self::ResourceExhaustion { source: err }
        } else {
            Self::Io(err)
        }
    }
}

impl From<ChannelError> for io::Error {
    fn from(err: ChannelError) -> Self {
        let kind = match &err {
            ChannelError::BrokenChannel => io::ErrorKind::BrokenPipe,
            ChannelError::TimedOut { .. } => io::ErrorKind::TimedOut,
            ChannelError::ClosedHandle { .. } => io::ErrorKind::NotConnected,
            ChannelError::ResourceExhaustion { .. } => io::ErrorKind::OutOfMemory,
            ChannelError::PeerPanicked { .. } => io::ErrorKind::Other,
            ChannelError::Io(e) => e.kind(),
        };
        match err {
            ChannelError::Io(e) => e,
            other => io::Error::new(kind, other),
        }
    }
}

/// Result alias for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
