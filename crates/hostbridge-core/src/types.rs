//! Canonical native kinds.
//!
//! Every kind has a spelling (`KInt`, `KStringPtr`, ...) that doubles as its
//! name in signature descriptors. The aliases below are those spellings; an
//! export declared with them produces a descriptor the binder can map to a
//! host method signature.

use std::ffi::c_void;
use std::marker::PhantomData;

use crate::buffer::{InteropBuffer, ReturnBuffer};
use crate::length::Length;
use crate::number::InteropNumber;
use crate::string::InteropString;

// ============================================================================
// Kind spellings
// ============================================================================

pub type KBoolean = bool;
pub type KByte = u8;
pub type KInt = i32;
pub type KUInt = u32;
pub type KLong = i64;
pub type KULong = u64;
pub type KFloat = f32;
pub type KDouble = f64;
pub type KNativePointer = NativePointer;
pub type KSerializerBuffer = SerializerBuffer;
pub type KVMObjectHandle = VmObjectHandle;
pub type KStringPtr = InteropString;
pub type KInteropNumber = InteropNumber;
pub type KLength = Length;
pub type KInteropBuffer = InteropBuffer;
pub type KInteropReturnBuffer = ReturnBuffer;
pub type KByteArray = ArrayPtr<u8>;
pub type KIntArray = ArrayPtr<i32>;
pub type KFloatArray = ArrayPtr<f32>;
pub type KVMContext = VmContext;

/// Spelling used for "no return value" in signature descriptors.
pub const VOID_KIND: &str = "void";

// ============================================================================
// NativePointer
// ============================================================================

/// An opaque native address.
///
/// Hosts without a pointer type carry it as a 64-bit integer; the round trip
/// through [`NativePointer::addr`] and [`NativePointer::from_addr`] is exact.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativePointer(*mut c_void);

impl NativePointer {
    pub const NULL: NativePointer = NativePointer(std::ptr::null_mut());

    pub fn new(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub fn from_addr(addr: u64) -> Self {
        Self(addr as usize as *mut c_void)
    }

    pub fn addr(self) -> u64 {
        self.0 as usize as u64
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// Leak a boxed value into a pointer suitable for handing to the host.
    pub fn from_box<T>(value: Box<T>) -> Self {
        Self(Box::into_raw(value).cast())
    }

    /// Reclaim a value previously leaked with [`NativePointer::from_box`].
    ///
    /// # Safety
    ///
    /// The pointer must come from `from_box::<T>` and must not be reclaimed twice.
    pub unsafe fn into_box<T>(self) -> Option<Box<T>> {
        if self.is_null() {
            None
        } else {
            // SAFETY: caller guarantees the pointer was produced by `from_box::<T>`.
            Some(unsafe { Box::from_raw(self.0.cast::<T>()) })
        }
    }
}

impl Default for NativePointer {
    fn default() -> Self {
        Self::NULL
    }
}

/// Pointer to a serializer buffer owned by the managed side.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SerializerBuffer(pub NativePointer);

impl SerializerBuffer {
    pub fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr().cast()
    }
}

/// Handle to a managed object, carried opaquely through native code.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VmObjectHandle(pub NativePointer);

// ============================================================================
// VmContext
// ============================================================================

/// Token identifying the host environment of the current call.
///
/// Context trampolines pass it as the first argument of the implementation.
/// It is only valid for the duration of that call and must not be stored.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmContext(*mut c_void);

impl VmContext {
    pub fn from_env<E>(env: &E) -> Self {
        Self(env as *const E as *mut c_void)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    /// Recover the environment this token was created from.
    ///
    /// # Safety
    ///
    /// The token must have been created by [`VmContext::from_env`] for the same
    /// `E`, and the call that produced it must still be on the stack.
    pub unsafe fn env<'a, E>(self) -> &'a E {
        // SAFETY: upheld by the caller.
        unsafe { &*(self.0 as *const E) }
    }
}

// ============================================================================
// ArrayPtr
// ============================================================================

/// A host array lent to native code for the duration of one call.
///
/// Backends either pin the host storage or copy it into a scratch buffer; in
/// both cases the memory stays valid until the trampoline releases it after
/// the implementation returns. A null host array arrives as a null, empty view.
#[derive(Debug)]
pub struct ArrayPtr<T> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T> Clone for ArrayPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArrayPtr<T> {}

impl<T> ArrayPtr<T> {
    pub fn null() -> Self {
        Self::new(std::ptr::null_mut(), 0)
    }

    pub fn new(ptr: *mut T, len: usize) -> Self {
        Self {
            ptr,
            len,
            _marker: PhantomData,
        }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr
    }

    /// View the elements.
    ///
    /// # Safety
    ///
    /// Only valid while the trampoline that produced this view is running.
    pub unsafe fn as_slice<'a>(&self) -> &'a [T] {
        if self.ptr.is_null() {
            &[]
        } else {
            // SAFETY: backend guarantees `len` initialized elements until release.
            unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
        }
    }

    /// Mutable view of the elements; writes are visible to the host after release.
    ///
    /// # Safety
    ///
    /// Same as [`ArrayPtr::as_slice`], and no other view may be alive.
    pub unsafe fn as_mut_slice<'a>(&self) -> &'a mut [T] {
        if self.ptr.is_null() {
            &mut []
        } else {
            // SAFETY: see above.
            unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
        }
    }
}
