//! Canonical kind conversions for ANI.

use hostbridge_core::pending;
use hostbridge_core::types::{ArrayPtr, NativePointer, SerializerBuffer, VmObjectHandle};
use hostbridge_core::{FromHost, HostRef, InteropBuffer, InteropNumber, InteropString, Length, ReturnBuffer, ToHost};

use super::{Ani, AniEnv, AniHost, DOUBLE_CLASS, INT_CLASS, RESOURCE_CLASS, STRING_CLASS};

hostbridge_core::value_conversions!([E: AniEnv] Ani<E> {
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

impl<E: AniEnv> FromHost<Ani<E>> for InteropString {
    type Interop = E::Ref;
    type Release = ();

    fn convert_from(env: &E, value: E::Ref) -> (Self, ()) {
        if value.is_null() {
            return (InteropString::empty(), ());
        }
        let byte_len = env.string_get_utf8_size(value);
        let unit_len = env.string_get_utf16_size(value);
        let string = InteropString::fill_with(byte_len, |buf| {
            env.string_get_utf8_substr(value, 0, unit_len, buf).min(buf.len())
        });
        match pending::drain(AniHost::new(env), "string conversion") {
            Ok(()) => (string, ()),
            Err(_) => (InteropString::empty(), ()),
        }
    }

    fn release(_env: &E, _value: E::Ref, _release: ()) {}
}

impl<E: AniEnv> ToHost<Ani<E>> for InteropString {
    type Interop = E::Ref;

    fn convert_to(env: &E, value: Self) -> E::Ref {
        env.string_new_utf8(value.as_bytes())
    }
}

// ============================================================================
// Copied arrays
// ============================================================================

macro_rules! impl_copied_array {
    ($($elem:ty => $get:ident, $set:ident);* $(;)?) => {
        $(
            impl<E: AniEnv> FromHost<Ani<E>> for ArrayPtr<$elem> {
                type Interop = E::Ref;
                /// Scratch copy, written back on release.
                type Release = Option<Vec<$elem>>;

                fn convert_from(env: &E, value: E::Ref) -> (Self, Option<Vec<$elem>>) {
                    if value.is_null() {
                        return (ArrayPtr::null(), None);
                    }
                    let len = env.array_get_length(value);
                    let mut scratch = vec![<$elem>::default(); len];
                    if !env.$get(value, 0, &mut scratch).is_ok() {
                        tracing::debug!(len, "array region read failed");
                        return (ArrayPtr::null(), None);
                    }
                    (ArrayPtr::new(scratch.as_mut_ptr(), len), Some(scratch))
                }

                fn release(env: &E, value: E::Ref, scratch: Option<Vec<$elem>>) {
                    if let Some(scratch) = scratch {
                        if !env.$set(value, 0, &scratch).is_ok() {
                            tracing::debug!(len = scratch.len(), "array write-back failed");
                        }
                    }
                }
            }
        )*
    };
}

impl_copied_array! {
    u8 => array_get_region_byte, array_set_region_byte;
    i32 => array_get_region_int, array_set_region_int;
    f32 => array_get_region_float, array_set_region_float;
}

// ============================================================================
// Buffers
// ============================================================================

impl<E: AniEnv> FromHost<Ani<E>> for InteropBuffer {
    type Interop = E::Ref;
    type Release = Option<Vec<u8>>;

    fn convert_from(env: &E, value: E::Ref) -> (Self, Option<Vec<u8>>) {
        let (array, scratch) = <ArrayPtr<u8> as FromHost<Ani<E>>>::convert_from(env, value);
        if scratch.is_none() {
            return (InteropBuffer::empty(), None);
        }
        // SAFETY: the scratch copy lives in the release ticket until `release`.
        (unsafe { InteropBuffer::borrowed(array.as_ptr(), array.len()) }, scratch)
    }

    fn release(env: &E, value: E::Ref, scratch: Option<Vec<u8>>) {
        <ArrayPtr<u8> as FromHost<Ani<E>>>::release(env, value, scratch);
    }
}

fn new_byte_array<E: AniEnv>(env: &E, bytes: &[u8]) -> E::Ref {
    let array = env.array_new_byte(bytes.len());
    if !array.is_null() && !bytes.is_empty() && !env.array_set_region_byte(array, 0, bytes).is_ok() {
        tracing::debug!(len = bytes.len(), "byte array fill failed");
    }
    array
}

impl<E: AniEnv> ToHost<Ani<E>> for InteropBuffer {
    type Interop = E::Ref;

    fn convert_to(env: &E, value: Self) -> E::Ref {
        let array = new_byte_array(env, value.as_bytes());
        drop(value);
        array
    }
}

impl<E: AniEnv> ToHost<Ani<E>> for ReturnBuffer {
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

fn instance_class<E: AniEnv>(env: &E, value: E::Ref, descriptor: &str) -> Option<E::Ref> {
    let class = env.find_class(descriptor);
    if pending::drain(AniHost::new(env), "length class lookup").is_err() || class.is_null() {
        return None;
    }
    env.object_instance_of(value, class).then_some(class)
}

fn classify<E: AniEnv>(env: &E, value: E::Ref) -> Option<Length> {
    if value.is_null() {
        return None;
    }
    if let Some(class) = instance_class(env, value, DOUBLE_CLASS) {
        let unboxed = env.class_find_method(class, "unboxed", ":D")?;
        return Some(Length::number(env.object_call_method_double(value, unboxed) as f32));
    }
    if let Some(class) = instance_class(env, value, INT_CLASS) {
        let unboxed = env.class_find_method(class, "unboxed", ":I")?;
        return Some(Length::number(env.object_call_method_int(value, unboxed) as f32));
    }
    if instance_class(env, value, STRING_CLASS).is_some() {
        let (text, ()) = <InteropString as FromHost<Ani<E>>>::convert_from(env, value);
        return Some(Length::parse(&text.to_string_lossy()));
    }
    if let Some(class) = instance_class(env, value, RESOURCE_CLASS) {
        let id = env.class_find_method(class, "<get>id", ":D")?;
        return Some(Length::resource(env.object_call_method_double(value, id) as i32));
    }
    None
}

impl<E: AniEnv> FromHost<Ani<E>> for Length {
    type Interop = E::Ref;
    type Release = ();

    fn convert_from(env: &E, value: E::Ref) -> (Self, ()) {
        let length = classify(env, value).unwrap_or_default();
        if pending::drain(AniHost::new(env), "length conversion").is_err() {
            return (Length::default(), ());
        }
        (length, ())
    }

    fn release(_env: &E, _value: E::Ref, _release: ()) {}
}
