//! Owned UTF-8 string handed to implementation functions.

use std::fmt;

/// An owned UTF-8 byte string with a trailing NUL terminator.
///
/// The terminator is kept so the bytes can be passed to C code unchanged;
/// [`InteropString::len`] and [`InteropString::as_bytes`] exclude it.
/// A null host string converts to the empty string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct InteropString {
    bytes: Vec<u8>,
}

impl InteropString {
    pub fn empty() -> Self {
        Self { bytes: vec![0] }
    }

    /// Copy `bytes` and append a terminator.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut owned = Vec::with_capacity(bytes.len() + 1);
        owned.extend_from_slice(bytes);
        owned.push(0);
        Self { bytes: owned }
    }

    /// Allocate room for `capacity` bytes and let `fill` write into it.
    ///
    /// `fill` returns the number of bytes it actually wrote; anything beyond
    /// that is discarded. Backends use this to let the host write directly
    /// into the string storage.
    pub fn fill_with(capacity: usize, fill: impl FnOnce(&mut [u8]) -> usize) -> Self {
        let mut bytes = vec![0; capacity + 1];
        let written = fill(&mut bytes[..capacity]).min(capacity);
        bytes.truncate(written);
        bytes.push(0);
        Self { bytes }
    }

    /// Byte length, excluding the terminator.
    pub fn len(&self) -> usize {
        self.bytes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    /// Bytes including the trailing NUL.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    pub fn to_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    pub fn to_string_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl Default for InteropString {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&str> for InteropString {
    fn from(value: &str) -> Self {
        Self::from_bytes(value.as_bytes())
    }
}

impl From<String> for InteropString {
    fn from(value: String) -> Self {
        let mut bytes = value.into_bytes();
        bytes.push(0);
        Self { bytes }
    }
}

impl fmt::Debug for InteropString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InteropString({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for InteropString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}
