// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors

#[cfg(unix)]
pub mod posix;

#[cfg(windows)]
pub mod windows;

// Re-export the platform-specific implementations under a uniform name.

#[cfg(unix)]
pub use posix::{create_pipe, is_broken_pipe, is_exhaustion, PipeHandle, WRITABLE_GUARANTEE};

#[cfg(windows)]
pub use windows::{create_pipe, is_broken_pipe, is_exhaustion, PipeHandle, WRITABLE_GUARANTEE};
