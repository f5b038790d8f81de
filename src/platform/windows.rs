// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Windows implementation of the anonymous kernel pipe via CreatePipe.
// Anonymous pipes are synchronous, so readiness is polled with
// PeekNamedPipe instead of waiting on an event.

use std::io;
use std::ptr;
use std::time::{Duration, Instant};

use windows_sys::Win32::Foundation::{
    CloseHandle, ERROR_BROKEN_PIPE, ERROR_NOT_ENOUGH_MEMORY, ERROR_NO_DATA,
    ERROR_NO_SYSTEM_RESOURCES, ERROR_OUTOFMEMORY, ERROR_TOO_MANY_OPEN_FILES, HANDLE,
};
use windows_sys::Win32::Storage::FileSystem::{ReadFile, WriteFile};
use windows_sys::Win32::System::Pipes::{CreatePipe, PeekNamedPipe};

/// Writes of at most this many bytes are issued per call when a write
/// timeout is in effect.
pub const WRITABLE_GUARANTEE: usize = 512;

/// One end of an anonymous pipe. Owns the handle.
#[derive(Debug)]
pub struct PipeHandle {
    handle: HANDLE,
}

unsafe impl Send for PipeHandle {}
unsafe impl Sync for PipeHandle {}

/// Create a pipe. Returns `(read_end, write_end)`.
pub fn create_pipe() -> io::Result<(PipeHandle, PipeHandle)> {
    let mut read: HANDLE = ptr::null_mut();
    let mut write: HANDLE = ptr::null_mut();
    // nSize = 0 selects the system default buffer size.
    let ok = unsafe { CreatePipe(&mut read, &mut write, ptr::null(), 0) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((PipeHandle { handle: read }, PipeHandle { handle: write }))
}

/// Whether `err` means the system ran out of handles or memory.
pub fn is_exhaustion(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error().map(|c| c as u32),
        Some(ERROR_TOO_MANY_OPEN_FILES)
            | Some(ERROR_NOT_ENOUGH_MEMORY)
            | Some(ERROR_OUTOFMEMORY)
            | Some(ERROR_NO_SYSTEM_RESOURCES)
    )
}

/// Whether `err` from a write means the read end is gone.
pub fn is_broken_pipe(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error().map(|c| c as u32),
        Some(ERROR_BROKEN_PIPE) | Some(ERROR_NO_DATA)
    )
}

impl PipeHandle {
    /// Read up to `buf.len()` bytes. `Ok(0)` means end-of-stream.
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(u32::MAX as usize) as u32;
        let mut n = 0u32;
        let ok = unsafe { ReadFile(self.handle, buf.as_mut_ptr(), len, &mut n, ptr::null_mut()) };
        if ok == 0 {
            let err = io::Error::last_os_error();
            // The writer closed its handle: that is end-of-stream, not an error.
            if err.raw_os_error().map(|c| c as u32) == Some(ERROR_BROKEN_PIPE) {
                return Ok(0);
            }
            return Err(err);
        }
        Ok(n as usize)
    }

    /// Write up to `buf.len()` bytes; the call may accept fewer.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len().min(u32::MAX as usize) as u32;
        let mut n = 0u32;
        let ok = unsafe { WriteFile(self.handle, buf.as_ptr(), len, &mut n, ptr::null_mut()) };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    /// Wait until a read would not block. Returns `Ok(false)` on timeout.
    pub fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        // A timeout past the end of the clock waits without bound.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let mut avail = 0u32;
            let ok = unsafe {
                PeekNamedPipe(
                    self.handle,
                    ptr::null_mut(),
                    0,
                    ptr::null_mut(),
                    &mut avail,
                    ptr::null_mut(),
                )
            };
            if ok == 0 {
                let err = io::Error::last_os_error();
                if err.raw_os_error().map(|c| c as u32) == Some(ERROR_BROKEN_PIPE) {
                    return Ok(true);
                }
                return Err(err);
            }
            if avail > 0 {
                return Ok(true);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(false);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Anonymous pipes expose no free-space query; writes are issued in
    /// `WRITABLE_GUARANTEE` slices and may still block on a stalled reader.
    pub fn wait_writable(&self, _timeout: Duration) -> io::Result<bool> {
        Ok(true)
    }

    /// Close the handle, reporting the result of CloseHandle.
    pub fn close(mut self) -> io::Result<()> {
        let handle = std::mem::replace(&mut self.handle, ptr::null_mut());
        if unsafe { CloseHandle(handle) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for PipeHandle {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { CloseHandle(self.handle) };
        }
    }
}
