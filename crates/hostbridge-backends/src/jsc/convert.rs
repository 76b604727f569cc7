//! Canonical kind conversions for JSC.

use hostbridge_core::types::{ArrayPtr, NativePointer, SerializerBuffer, VmObjectHandle};
use hostbridge_core::{FromHost, InteropBuffer, InteropNumber, InteropString, ReturnBuffer, ToHost};

use super::{Jsc, JscContext};

// ============================================================================
// Numbers
// ============================================================================

macro_rules! number_conversions {
    ($($kind:ty),* $(,)?) => {
        $(
            impl<C: JscContext> FromHost<Jsc<C>> for $kind {
                type Interop = C::Value;
                type Release = ();

                fn convert_from(env: &C, value: C::Value) -> (Self, ()) {
                    if env.is_nullish(value) {
                        return (<$kind>::default(), ());
                    }
                    (env.to_number(value) as $kind, ())
                }

                fn release(_env: &C, _value: C::Value, _release: ()) {}
            }

            impl<C: JscContext> ToHost<Jsc<C>> for $kind {
                type Interop = C::Value;

                fn convert_to(env: &C, value: Self) -> C::Value {
                    env.make_number(value as f64)
                }
            }
        )*
    };
}

number_conversions!(u8, i32, u32, f32, f64);

impl<C: JscContext> FromHost<Jsc<C>> for bool {
    type Interop = C::Value;
    type Release = ();

    fn convert_from(env: &C, value: C::Value) -> (Self, ()) {
        (env.to_boolean(value), ())
    }

    fn release(_env: &C, _value: C::Value, _release: ()) {}
}

impl<C: JscContext> ToHost<Jsc<C>> for bool {
    type Interop = C::Value;

    fn convert_to(env: &C, value: Self) -> C::Value {
        env.make_boolean(value)
    }
}

impl<C: JscContext> FromHost<Jsc<C>> for InteropNumber {
    type Interop = C::Value;
    type Release = ();

    fn convert_from(env: &C, value: C::Value) -> (Self, ()) {
        if env.is_nullish(value) {
            return (InteropNumber::default(), ());
        }
        (InteropNumber::from_f64(env.to_number(value)), ())
    }

    fn release(_env: &C, _value: C::Value, _release: ()) {}
}

impl<C: JscContext> ToHost<Jsc<C>> for InteropNumber {
    type Interop = C::Value;

    fn convert_to(env: &C, value: Self) -> C::Value {
        env.make_number(value.as_f64())
    }
}

impl<C: JscContext> ToHost<Jsc<C>> for () {
    type Interop = C::Value;

    fn convert_to(env: &C, _value: ()) -> C::Value {
        env.undefined()
    }
}

// ============================================================================
// 64-bit integers and pointers
// ============================================================================

/// Kinds carried as BigInt through their decimal text.
trait Decimal: Sized + Default {
    fn parse(text: &str) -> Option<Self>;
    fn render(self) -> String;
}

impl Decimal for i64 {
    fn parse(text: &str) -> Option<Self> {
        text.parse().ok()
    }

    fn render(self) -> String {
        self.to_string()
    }
}

impl Decimal for u64 {
    fn parse(text: &str) -> Option<Self> {
        text.parse().ok()
    }

    fn render(self) -> String {
        self.to_string()
    }
}

impl Decimal for NativePointer {
    fn parse(text: &str) -> Option<Self> {
        text.parse().ok().map(NativePointer::from_addr)
    }

    fn render(self) -> String {
        self.addr().to_string()
    }
}

impl Decimal for SerializerBuffer {
    fn parse(text: &str) -> Option<Self> {
        NativePointer::parse(text).map(SerializerBuffer)
    }

    fn render(self) -> String {
        self.0.render()
    }
}

impl Decimal for VmObjectHandle {
    fn parse(text: &str) -> Option<Self> {
        NativePointer::parse(text).map(VmObjectHandle)
    }

    fn render(self) -> String {
        self.0.render()
    }
}

macro_rules! bigint_conversions {
    ($($kind:ty),* $(,)?) => {
        $(
            impl<C: JscContext> FromHost<Jsc<C>> for $kind {
                type Interop = C::Value;
                type Release = ();

                fn convert_from(env: &C, value: C::Value) -> (Self, ()) {
                    if env.is_nullish(value) {
                        return (<$kind>::default(), ());
                    }
                    let text = env.to_decimal(value);
                    (<$kind as Decimal>::parse(&text).unwrap_or_default(), ())
                }

                fn release(_env: &C, _value: C::Value, _release: ()) {}
            }

            impl<C: JscContext> ToHost<Jsc<C>> for $kind {
                type Interop = C::Value;

                fn convert_to(env: &C, value: Self) -> C::Value {
                    env.make_bigint(&value.render())
                }
            }
        )*
    };
}

bigint_conversions!(i64, u64, NativePointer, SerializerBuffer, VmObjectHandle);

// ============================================================================
// Strings
// ============================================================================

impl<C: JscContext> FromHost<Jsc<C>> for InteropString {
    type Interop = C::Value;
    type Release = ();

    fn convert_from(env: &C, value: C::Value) -> (Self, ()) {
        if env.is_nullish(value) {
            return (InteropString::empty(), ());
        }
        (InteropString::from_bytes(&env.to_utf8(value)), ())
    }

    fn release(_env: &C, _value: C::Value, _release: ()) {}
}

impl<C: JscContext> ToHost<Jsc<C>> for InteropString {
    type Interop = C::Value;

    fn convert_to(env: &C, value: Self) -> C::Value {
        env.make_string(value.as_bytes())
    }
}

// ============================================================================
// Typed arrays
// ============================================================================

/// Element types that can be read from and written to typed array bytes.
pub trait Element: Copy {
    const SIZE: usize;

    fn read(bytes: &[u8]) -> Self;
    fn write(self, out: &mut Vec<u8>);
}

macro_rules! impl_element {
    ($($ty:ty),*) => {
        $(
            impl Element for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn read(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(raw)
                }

                fn write(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

impl_element!(u8, i32, f32);

fn decode<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::SIZE).map(T::read).collect()
}

fn encode<T: Element>(elements: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(elements.len() * T::SIZE);
    for element in elements {
        element.write(&mut out);
    }
    out
}

impl<C: JscContext, T: Element> FromHost<Jsc<C>> for ArrayPtr<T> {
    type Interop = C::Value;
    /// Scratch copy, written back on release.
    type Release = Option<Vec<T>>;

    fn convert_from(env: &C, value: C::Value) -> (Self, Option<Vec<T>>) {
        if env.is_nullish(value) {
            return (ArrayPtr::null(), None);
        }
        match env.typed_array_bytes(value) {
            Some(bytes) => {
                let mut scratch = decode::<T>(&bytes);
                (ArrayPtr::new(scratch.as_mut_ptr(), scratch.len()), Some(scratch))
            }
            None => (ArrayPtr::null(), None),
        }
    }

    fn release(env: &C, value: C::Value, scratch: Option<Vec<T>>) {
        if let Some(scratch) = scratch {
            if !env.set_typed_array_bytes(value, &encode(&scratch)) {
                tracing::debug!(len = scratch.len(), "typed array write-back failed");
            }
        }
    }
}

impl<C: JscContext> FromHost<Jsc<C>> for InteropBuffer {
    type Interop = C::Value;
    type Release = Option<Vec<u8>>;

    fn convert_from(env: &C, value: C::Value) -> (Self, Option<Vec<u8>>) {
        let (array, scratch) = <ArrayPtr<u8> as FromHost<Jsc<C>>>::convert_from(env, value);
        if scratch.is_none() {
            return (InteropBuffer::empty(), None);
        }
        // SAFETY: the scratch copy lives in the release ticket until `release`.
        (unsafe { InteropBuffer::borrowed(array.as_ptr(), array.len()) }, scratch)
    }

    fn release(env: &C, value: C::Value, scratch: Option<Vec<u8>>) {
        <ArrayPtr<u8> as FromHost<Jsc<C>>>::release(env, value, scratch);
    }
}

impl<C: JscContext> ToHost<Jsc<C>> for InteropBuffer {
    type Interop = C::Value;

    fn convert_to(env: &C, value: Self) -> C::Value {
        let array = env.make_uint8_array(value.as_bytes());
        drop(value);
        array
    }
}

impl<C: JscContext> ToHost<Jsc<C>> for ReturnBuffer {
    type Interop = C::Value;

    fn convert_to(env: &C, value: Self) -> C::Value {
        let array = env.make_uint8_array(value.as_bytes());
        drop(value);
        array
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_array_elements_round_trip() {
        let ints = [1_i32, -2, i32::MAX];
        assert_eq!(decode::<i32>(&encode(&ints)), ints);
        let floats = [0.5_f32, -1.25];
        assert_eq!(decode::<f32>(&encode(&floats)), floats);
    }

    #[test]
    fn decimal_pointers_keep_every_bit() {
        let ptr = NativePointer::from_addr(u64::MAX - 7);
        assert_eq!(<NativePointer as Decimal>::parse(&ptr.render()), Some(ptr));
        assert_eq!(<i64 as Decimal>::parse("-9223372036854775808"), Some(i64::MIN));
    }
}
