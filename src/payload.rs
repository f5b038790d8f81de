// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Owning byte buffer handed across a channel.
// The channel itself carries no framing, so a `Payload` is just the bytes
// the sender intends to write, including any terminator it chooses.

/// An owning byte buffer for one channel handoff.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Payload {
    data: Vec<u8>,
}

impl Payload {
    /// Create an empty payload.
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create a payload from raw bytes (copies the data).
    pub fn from_slice(data: &[u8]) -> Self {
        Self { data: data.to_vec() }
    }

    /// Create a payload from text, appending a NUL terminator so the
    /// receiver can find the end of the string without knowing its length.
    pub fn terminated(s: &str) -> Self {
        let mut v = Vec::with_capacity(s.len() + 1);
        v.extend_from_slice(s.as_bytes());
        v.push(0);
        Self { data: v }
    }

    /// `len` copies of `byte`, used as the bulk-transfer filler.
    pub fn filled(byte: u8, len: usize) -> Self {
        Self { data: vec![byte; len] }
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of bytes in the payload.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The text up to (not including) the first NUL, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        let end = self.data.iter().position(|&b| b == 0).unwrap_or(self.data.len());
        std::str::from_utf8(&self.data[..end]).ok()
    }

    /// Consume into the underlying `Vec<u8>`.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field("len", &self.data.len())
            .finish()
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for Payload {
    fn from(s: &[u8]) -> Self {
        Self::from_slice(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::terminated(s)
    }
}
