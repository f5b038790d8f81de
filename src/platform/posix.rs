// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX implementation of the anonymous kernel pipe.
// Thin wrappers over pipe(2), read(2), write(2), poll(2) and close(2);
// retries on EINTR and leaves every other errno to the caller.

use std::io;
use std::time::{Duration, Instant};

/// Largest write the kernel is required to perform without blocking once
/// the pipe reports writable (POSIX `_POSIX_PIPE_BUF`).
pub const WRITABLE_GUARANTEE: usize = 512;

/// One end of a POSIX pipe. Owns the file descriptor.
#[derive(Debug)]
pub struct PipeHandle {
    fd: libc::c_int,
}

/// Create a pipe. Returns `(read_end, write_end)`.
///
/// Both descriptors are close-on-exec so that spawned programs do not
/// inherit a stray write end and keep the reader from seeing EOF. Where
/// pipe2(2) exists the flag is set atomically with creation.
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
    target_os = "illumos",
    target_os = "solaris"
))]
pub fn create_pipe() -> io::Result<(PipeHandle, PipeHandle)> {
    let mut fds = [0 as libc::c_int; 2];
    let ret = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if ret == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok((PipeHandle { fd: fds[0] }, PipeHandle { fd: fds[1] }))
}

/// Create a pipe. Returns `(read_end, write_end)`.
///
/// No pipe2(2) here, so close-on-exec is set right after creation.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
    target_os = "illumos",
    target_os = "solaris"
)))]
pub fn create_pipe() -> io::Result<(PipeHandle, PipeHandle)> {
    let mut fds = [0 as libc::c_int; 2];
    let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if ret == -1 {
        return Err(io::Error::last_os_error());
    }
    let read = PipeHandle { fd: fds[0] };
    let write = PipeHandle { fd: fds[1] };
    read.set_cloexec()?;
    write.set_cloexec()?;
    Ok((read, write))
}

/// Whether `err` means the system ran out of descriptors, memory or threads.
pub fn is_exhaustion(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EMFILE) | Some(libc::ENFILE) | Some(libc::ENOMEM) | Some(libc::EAGAIN)
    )
}

/// Whether `err` from a write means the read end is gone.
pub fn is_broken_pipe(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EPIPE)
}

impl PipeHandle {
    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly",
        target_os = "illumos",
        target_os = "solaris"
    )))]
    fn set_cloexec(&self) -> io::Result<()> {
        let flags = unsafe { libc::fcntl(self.fd, libc::F_GETFD) };
        if flags == -1 {
            return Err(io::Error::last_os_error());
        }
        let ret = unsafe { libc::fcntl(self.fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) };
        if ret == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Read up to `buf.len()` bytes. `Ok(0)` means end-of-stream.
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
            if n >= 0 {
                return Ok(n as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    /// Write up to `buf.len()` bytes; the kernel may accept fewer.
    /// Fails with `EPIPE` when no reader is left.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        loop {
            let n = unsafe { libc::write(self.fd, buf.as_ptr().cast(), buf.len()) };
            if n >= 0 {
                return Ok(n as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    /// Wait until a read would not block (data buffered or writer gone).
    /// Returns `Ok(false)` on timeout.
    pub fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        self.poll(libc::POLLIN, timeout)
    }

    /// Wait until a write of up to `WRITABLE_GUARANTEE` bytes would not
    /// block (space available or reader gone). Returns `Ok(false)` on timeout.
    pub fn wait_writable(&self, timeout: Duration) -> io::Result<bool> {
        self.poll(libc::POLLOUT, timeout)
    }

    fn poll(&self, events: libc::c_short, timeout: Duration) -> io::Result<bool> {
        // A timeout past the end of the clock waits without bound.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let millis = match deadline {
                Some(deadline) => poll_millis(deadline.saturating_duration_since(Instant::now())),
                None => -1,
            };
            let mut pfd = libc::pollfd {
                fd: self.fd,
                events,
                revents: 0,
            };
            let ret = unsafe { libc::poll(&mut pfd, 1, millis) };
            match ret {
                0 => return Ok(false),
                n if n > 0 => return Ok(true),
                _ => {
                    let err = io::Error::last_os_error();
                    if err.kind() != io::ErrorKind::Interrupted {
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Close the descriptor, reporting the result of close(2).
    pub fn close(mut self) -> io::Result<()> {
        let fd = std::mem::replace(&mut self.fd, -1);
        let ret = unsafe { libc::close(fd) };
        if ret == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Round up to whole milliseconds so a sub-millisecond timeout still waits.
fn poll_millis(d: Duration) -> libc::c_int {
    let ms = d.as_nanos().div_ceil(1_000_000);
    ms.min(libc::c_int::MAX as u128) as libc::c_int
}

impl Drop for PipeHandle {
    fn drop(&mut self) {
        if self.fd >= 0 {
            unsafe { libc::close(self.fd) };
        }
    }
}
