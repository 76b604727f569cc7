//! Canonical kind conversions for ETS.

use hostbridge_core::pending;
use hostbridge_core::types::{ArrayPtr, NativePointer, SerializerBuffer, VmObjectHandle};
use hostbridge_core::{FromHost, HostRef, InteropBuffer, InteropNumber, InteropString, Length, ReturnBuffer, ToHost};

use super::{DOUBLE_CLASS, Ets, EtsEnv, EtsHost, INT_CLASS, RESOURCE_CLASS, STRING_CLASS};

hostbridge_core::value_conversions!([E: EtsEnv] Ets<E> {
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

impl<E: EtsEnv> FromHost<Ets<E>> for InteropString {
    type Interop = E::Ref;
    type Release = ();

    fn convert_from(env: &E, value: E::Ref) -> (Self, ()) {
        if value.is_null() {
            return (InteropString::empty(), ());
        }
        let byte_len = env.get_string_utf_length(value).max(0) as usize;
        let unit_len = env.get_string_length(value);
        let string = InteropString::fill_with(byte_len, |buf| {
            env.get_string_utf_region(value, 0, unit_len, buf);
            buf.len()
        });
        match pending::drain(EtsHost::new(env), "string conversion") {
            Ok(()) => (string, ()),
            Err(_) => (InteropString::empty(), ()),
        }
    }

    fn release(_env: &E, _value: E::Ref, _release: ()) {}
}

impl<E: EtsEnv> ToHost<Ets<E>> for InteropString {
    type Interop = E::Ref;

    fn convert_to(env: &E, value: Self) -> E::Ref {
        env.new_string_utf(value.as_bytes_with_nul())
    }
}

// ============================================================================
// Pinned arrays
// ============================================================================

macro_rules! impl_pinned_array {
    ($($elem:ty => $pin:ident, $unpin:ident);* $(;)?) => {
        $(
            impl<E: EtsEnv> FromHost<Ets<E>> for ArrayPtr<$elem> {
                type Interop = E::Ref;
                /// Whether the array was pinned.
                type Release = bool;

                fn convert_from(env: &E, value: E::Ref) -> (Self, bool) {
                    if value.is_null() {
                        return (ArrayPtr::null(), false);
                    }
                    let len = env.get_array_length(value).max(0) as usize;
                    let data = env.$pin(value);
                    if data.is_null() {
                        return (ArrayPtr::null(), false);
                    }
                    (ArrayPtr::new(data, len), true)
                }

                fn release(env: &E, value: E::Ref, pinned: bool) {
                    if pinned {
                        env.$unpin(value);
                    }
                }
            }
        )*
    };
}

impl_pinned_array! {
    u8 => pin_byte_array, unpin_byte_array;
    i32 => pin_int_array, unpin_int_array;
    f32 => pin_float_array, unpin_float_array;
}

// ============================================================================
// Buffers
// ============================================================================

impl<E: EtsEnv> FromHost<Ets<E>> for InteropBuffer {
    type Interop = E::Ref;
    type Release = bool;

    fn convert_from(env: &E, value: E::Ref) -> (Self, bool) {
        let (array, pinned) = <ArrayPtr<u8> as FromHost<Ets<E>>>::convert_from(env, value);
        if !pinned {
            return (InteropBuffer::empty(), false);
        }
        // SAFETY: the array stays pinned until `release`.
        (unsafe { InteropBuffer::borrowed(array.as_ptr(), array.len()) }, true)
    }

    fn release(env: &E, value: E::Ref, pinned: bool) {
        <ArrayPtr<u8> as FromHost<Ets<E>>>::release(env, value, pinned);
    }
}

/// Copy `bytes` into a fresh host byte array through a short pin.
fn new_byte_array<E: EtsEnv>(env: &E, bytes: &[u8]) -> E::Ref {
    let Some(len) = crate::host_array_len(bytes.len()) else {
        return <E::Ref as HostRef>::null();
    };
    let array = env.new_byte_array(len);
    if array.is_null() || bytes.is_empty() {
        return array;
    }
    let data = env.pin_byte_array(array);
    if !data.is_null() {
        // SAFETY: the new array holds exactly `bytes.len()` elements.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), data, bytes.len()) };
        env.unpin_byte_array(array);
    }
    array
}

impl<E: EtsEnv> ToHost<Ets<E>> for InteropBuffer {
    type Interop = E::Ref;

    fn convert_to(env: &E, value: Self) -> E::Ref {
        let array = new_byte_array(env, value.as_bytes());
        drop(value);
        array
    }
}

impl<E: EtsEnv> ToHost<Ets<E>> for ReturnBuffer {
    type Interop = E::Ref;

    fn convert_to(env: &E, value: Self) -> E::Ref {
        let array = new_byte_array(env, value.as_bytes());
        drop(value);
        array
    }
}

// ============================================================================
// Length
// ============================================================================

fn find_class<E: EtsEnv>(env: &E, name: &str) -> Option<E::Ref> {
    let class = env.find_class(name);
    match pending::drain(EtsHost::new(env), "length class lookup") {
        Ok(()) if !class.is_null() => Some(class),
        _ => None,
    }
}

fn is_instance<E: EtsEnv>(env: &E, value: E::Ref, name: &str) -> Option<E::Ref> {
    find_class(env, name).filter(|class| env.is_instance_of(value, *class))
}

fn classify<E: EtsEnv>(env: &E, value: E::Ref) -> Option<Length> {
    if value.is_null() {
        return None;
    }
    if let Some(class) = is_instance(env, value, DOUBLE_CLASS) {
        let unboxed = env.get_method_id(class, "unboxed", ":D")?;
        return Some(Length::number(env.call_double_method(value, unboxed) as f32));
    }
    if let Some(class) = is_instance(env, value, INT_CLASS) {
        let unboxed = env.get_method_id(class, "unboxed", ":I")?;
        return Some(Length::number(env.call_int_method(value, unboxed) as f32));
    }
    if is_instance(env, value, STRING_CLASS).is_some() {
        let (text, ()) = <InteropString as FromHost<Ets<E>>>::convert_from(env, value);
        return Some(Length::parse(&text.to_string_lossy()));
    }
    if let Some(class) = is_instance(env, value, RESOURCE_CLASS) {
        let id = env.get_method_id(class, "<get>id", ":D")?;
        return Some(Length::resource(env.call_double_method(value, id) as i32));
    }
    None
}

impl<E: EtsEnv> FromHost<Ets<E>> for Length {
    type Interop = E::Ref;
    type Release = ();

    fn convert_from(env: &E, value: E::Ref) -> (Self, ()) {
        let length = classify(env, value).unwrap_or_default();
        if pending::drain(EtsHost::new(env), "length conversion").is_err() {
            return (Length::default(), ());
        }
        (length, ())
    }

    fn release(_env: &E, _value: E::Ref, _release: ()) {}
}
