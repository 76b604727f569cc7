//! Canonical kind conversions for JNI.

use std::ffi::c_void;

use hostbridge_core::pending;
use hostbridge_core::types::{ArrayPtr, NativePointer, SerializerBuffer, VmObjectHandle};
use hostbridge_core::{FromHost, HostRef, InteropBuffer, InteropNumber, InteropString, ReturnBuffer, ToHost};

use super::{Jni, JniEnv, JniHost, RELEASE_COMMIT_AND_FREE};

hostbridge_core::value_conversions!([E: JniEnv] Jni<E> {
    bool => u8,
    u8 => i8,
    i32 => i32,
    u32 => i32,
    i64 => i64,
    u64 => i64,
    f32 => f32,
    f64 => f64,
    NativePointer => i64,
    SerializerBuffer => i64,
    VmObjectHandle => i64,
    InteropNumber => f64,
});

// ============================================================================
// Strings
// ============================================================================

impl<E: JniEnv> FromHost<Jni<E>> for InteropString {
    type Interop = E::Ref;
    type Release = ();

    fn convert_from(env: &E, value: E::Ref) -> (Self, ()) {
        if value.is_null() {
            return (InteropString::empty(), ());
        }
        // Buffer is sized in bytes but the region is counted in UTF-16 units.
        let byte_len = env.get_string_utf_length(value).max(0) as usize;
        let unit_len = env.get_string_length(value);
        let string = InteropString::fill_with(byte_len, |buf| {
            env.get_string_utf_region(value, 0, unit_len, buf);
            buf.len()
        });
        match pending::drain(JniHost::new(env), "string conversion") {
            Ok(()) => (string, ()),
            Err(_) => (InteropString::empty(), ()),
        }
    }

    fn release(_env: &E, _value: E::Ref, _release: ()) {}
}

impl<E: JniEnv> ToHost<Jni<E>> for InteropString {
    type Interop = E::Ref;

    fn convert_to(env: &E, value: Self) -> E::Ref {
        env.new_string_utf(value.as_bytes_with_nul())
    }
}

// ============================================================================
// Pinned arrays
// ============================================================================

fn pin<E: JniEnv>(env: &E, array: E::Ref) -> (*mut c_void, usize) {
    if array.is_null() {
        return (std::ptr::null_mut(), 0);
    }
    let len = env.get_array_length(array).max(0) as usize;
    (env.get_primitive_array_critical(array), len)
}

fn unpin<E: JniEnv>(env: &E, array: E::Ref, data: *mut c_void) {
    if !data.is_null() {
        env.release_primitive_array_critical(array, data, RELEASE_COMMIT_AND_FREE);
    }
}

macro_rules! impl_pinned_array {
    ($($elem:ty),*) => {
        $(
            impl<E: JniEnv> FromHost<Jni<E>> for ArrayPtr<$elem> {
                type Interop = E::Ref;
                type Release = *mut c_void;

                fn convert_from(env: &E, value: E::Ref) -> (Self, *mut c_void) {
                    let (data, len) = pin(env, value);
                    let len = if data.is_null() { 0 } else { len };
                    (ArrayPtr::new(data.cast::<$elem>(), len), data)
                }

                fn release(env: &E, value: E::Ref, data: *mut c_void) {
                    unpin(env, value, data);
                }
            }
        )*
    };
}

impl_pinned_array!(u8, i32, f32);

// ============================================================================
// Buffers
// ============================================================================

impl<E: JniEnv> FromHost<Jni<E>> for InteropBuffer {
    type Interop = E::Ref;
    type Release = *mut c_void;

    fn convert_from(env: &E, value: E::Ref) -> (Self, *mut c_void) {
        let (data, len) = pin(env, value);
        if data.is_null() {
            return (InteropBuffer::empty(), data);
        }
        // SAFETY: the array stays pinned until `release`.
        (unsafe { InteropBuffer::borrowed(data.cast(), len) }, data)
    }

    fn release(env: &E, value: E::Ref, data: *mut c_void) {
        unpin(env, value, data);
    }
}

fn new_byte_array<E: JniEnv>(env: &E, bytes: &[u8]) -> E::Ref {
    let Some(len) = crate::host_array_len(bytes.len()) else {
        return <E::Ref as HostRef>::null();
    };
    let array = env.new_byte_array(len);
    if !array.is_null() {
        env.set_byte_array_region(array, 0, bytes);
    }
    array
}

impl<E: JniEnv> ToHost<Jni<E>> for InteropBuffer {
    type Interop = E::Ref;

    fn convert_to(env: &E, value: Self) -> E::Ref {
        let array = new_byte_array(env, value.as_bytes());
        drop(value);
        array
    }
}

impl<E: JniEnv> ToHost<Jni<E>> for ReturnBuffer {
    type Interop = E::Ref;

    fn convert_to(env: &E, value: Self) -> E::Ref {
        let array = new_byte_array(env, value.as_bytes());
        drop(value);
        array
    }
}
