//! Byte buffers that cross the boundary with an attached disposer.
//!
//! [`InteropBuffer`] travels both ways; [`ReturnBuffer`] is only ever returned
//! to the host. When a backend converts either of them back to the host it
//! copies the bytes into a host-owned object first and drops the buffer
//! afterwards, so the disposer runs exactly once and strictly after the copy.

use std::fmt;

enum Backing {
    Owned(Vec<u8>),
    Foreign {
        data: *mut u8,
        len: usize,
        dispose: Option<Box<dyn FnOnce()>>,
    },
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Owned(bytes) => bytes,
            Backing::Foreign { data, len, .. } if !data.is_null() => {
                // SAFETY: constructors require `len` readable bytes at `data`
                // for the lifetime of the buffer.
                unsafe { std::slice::from_raw_parts(*data, *len) }
            }
            Backing::Foreign { .. } => &[],
        }
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        match self {
            Backing::Owned(bytes) => bytes.as_mut_ptr(),
            Backing::Foreign { data, .. } => *data,
        }
    }
}

impl Drop for Backing {
    fn drop(&mut self) {
        if let Backing::Foreign { dispose, .. } = self {
            if let Some(dispose) = dispose.take() {
                dispose();
            }
        }
    }
}

// ============================================================================
// InteropBuffer
// ============================================================================

/// A byte buffer with an optional managed resource id.
pub struct InteropBuffer {
    backing: Backing,
    resource_id: i32,
}

impl InteropBuffer {
    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            backing: Backing::Owned(bytes),
            resource_id: 0,
        }
    }

    /// Wrap host memory that the backend keeps alive for the current call.
    ///
    /// # Safety
    ///
    /// `data` must point to `len` bytes that remain valid while the buffer lives.
    pub unsafe fn borrowed(data: *mut u8, len: usize) -> Self {
        Self {
            backing: Backing::Foreign {
                data,
                len,
                dispose: None,
            },
            resource_id: 0,
        }
    }

    /// Wrap native memory released by `dispose` once the buffer is dropped.
    ///
    /// # Safety
    ///
    /// `data` must point to `len` bytes that remain valid until `dispose` runs.
    pub unsafe fn with_disposer(
        data: *mut u8,
        len: usize,
        resource_id: i32,
        dispose: impl FnOnce() + 'static,
    ) -> Self {
        Self {
            backing: Backing::Foreign {
                data,
                len,
                dispose: Some(Box::new(dispose)),
            },
            resource_id,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.backing.bytes()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.backing.as_mut_ptr()
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn resource_id(&self) -> i32 {
        self.resource_id
    }
}

impl Default for InteropBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for InteropBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteropBuffer")
            .field("len", &self.len())
            .field("resource_id", &self.resource_id)
            .finish()
    }
}

// ============================================================================
// ReturnBuffer
// ============================================================================

/// A byte buffer produced by native code and returned to the host.
pub struct ReturnBuffer {
    backing: Backing,
}

impl ReturnBuffer {
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            backing: Backing::Owned(bytes),
        }
    }

    /// # Safety
    ///
    /// `data` must point to `len` bytes that remain valid until `dispose` runs.
    pub unsafe fn with_disposer(data: *mut u8, len: usize, dispose: impl FnOnce() + 'static) -> Self {
        Self {
            backing: Backing::Foreign {
                data,
                len,
                dispose: Some(Box::new(dispose)),
            },
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.backing.bytes()
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ReturnBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReturnBuffer")
            .field("len", &self.len())
            .finish()
    }
}
