//! Conversion traits between host representations and canonical kinds.
//!
//! Each backend is named by a marker type implementing [`Backend`]; the marker
//! carries the host environment type. Conversions are keyed on the marker so a
//! single canonical kind (say `i32`) can have one implementation per backend.
//!
//! - [`FromHost`]: host value → canonical value, plus a release ticket
//! - [`ToHost`]: canonical value → host value
//! - [`DirectFromHost`] / [`DirectToHost`]: the same without an environment,
//!   for value kinds on direct (environment-free) calls
//!
//! ## Release discipline
//!
//! `convert_from` hands back a `Release` ticket describing whatever it acquired
//! (a pinned array, a scratch copy). The trampoline passes the ticket to
//! `release` after the implementation returns, exactly once per conversion.
//! Value kinds use `()` as their ticket.

use crate::number::InteropNumber;
use crate::types::{NativePointer, SerializerBuffer, VmObjectHandle};

/// Marker type naming one host runtime.
pub trait Backend {
    /// Per-call host environment.
    type Env;

    /// Short name used in log output.
    const NAME: &'static str;
}

/// An opaque host reference that may be null.
pub trait HostRef: Copy {
    fn null() -> Self;
    fn is_null(&self) -> bool;
}

/// Convert a host argument into a canonical value.
pub trait FromHost<B: Backend>: Sized {
    /// Host representation on the wire.
    type Interop: Copy;
    /// What `release` needs to undo the acquisition.
    type Release;

    fn convert_from(env: &B::Env, value: Self::Interop) -> (Self, Self::Release);

    fn release(env: &B::Env, value: Self::Interop, release: Self::Release);
}

/// Convert a canonical result into a host value.
pub trait ToHost<B: Backend> {
    type Interop;

    fn convert_to(env: &B::Env, value: Self) -> Self::Interop;
}

/// Environment-free argument conversion for direct calls.
pub trait DirectFromHost<B: Backend>: Sized {
    type Interop: Copy;

    fn convert_from(value: Self::Interop) -> Self;
}

/// Environment-free result conversion for direct calls.
pub trait DirectToHost<B: Backend> {
    type Interop;

    fn convert_to(value: Self) -> Self::Interop;
}

// ============================================================================
// Value representations
// ============================================================================

/// Lossless mapping between a value kind and a host primitive.
///
/// Backends use this through [`value_conversions!`](crate::value_conversions)
/// to implement all four conversion traits for kinds that need no environment.
pub trait Repr<H>: Sized {
    fn from_repr(host: H) -> Self;
    fn to_repr(self) -> H;
}

macro_rules! impl_identity_repr {
    ($($ty:ty),*) => {
        $(
            impl Repr<$ty> for $ty {
                fn from_repr(host: $ty) -> Self {
                    host
                }

                fn to_repr(self) -> $ty {
                    self
                }
            }
        )*
    };
}

impl_identity_repr!(bool, u8, i8, i32, u32, i64, u64, f32, f64);

// Unsigned kinds on hosts that only have signed integers keep their bit pattern.
macro_rules! impl_bitcast_repr {
    ($($kind:ty => $host:ty),*) => {
        $(
            impl Repr<$host> for $kind {
                fn from_repr(host: $host) -> Self {
                    host as $kind
                }

                fn to_repr(self) -> $host {
                    self as $host
                }
            }
        )*
    };
}

impl_bitcast_repr!(u8 => i8, u8 => i32, u32 => i32, u64 => i64);

impl Repr<u8> for bool {
    fn from_repr(host: u8) -> Self {
        host != 0
    }

    fn to_repr(self) -> u8 {
        u8::from(self)
    }
}

impl Repr<i32> for bool {
    fn from_repr(host: i32) -> Self {
        host != 0
    }

    fn to_repr(self) -> i32 {
        i32::from(self)
    }
}

impl Repr<i64> for NativePointer {
    fn from_repr(host: i64) -> Self {
        NativePointer::from_addr(host as u64)
    }

    fn to_repr(self) -> i64 {
        self.addr() as i64
    }
}

impl Repr<i64> for SerializerBuffer {
    fn from_repr(host: i64) -> Self {
        SerializerBuffer(NativePointer::from_repr(host))
    }

    fn to_repr(self) -> i64 {
        self.0.to_repr()
    }
}

impl Repr<i64> for VmObjectHandle {
    fn from_repr(host: i64) -> Self {
        VmObjectHandle(NativePointer::from_repr(host))
    }

    fn to_repr(self) -> i64 {
        self.0.to_repr()
    }
}

impl Repr<f64> for InteropNumber {
    fn from_repr(host: f64) -> Self {
        InteropNumber::from_f64(host)
    }

    fn to_repr(self) -> f64 {
        self.as_f64()
    }
}

impl Repr<f64> for f32 {
    fn from_repr(host: f64) -> Self {
        host as f32
    }

    fn to_repr(self) -> f64 {
        f64::from(self)
    }
}

impl Repr<f64> for i32 {
    fn from_repr(host: f64) -> Self {
        host as i32
    }

    fn to_repr(self) -> f64 {
        f64::from(self)
    }
}

impl Repr<f64> for u32 {
    fn from_repr(host: f64) -> Self {
        host as u32
    }

    fn to_repr(self) -> f64 {
        f64::from(self)
    }
}

impl Repr<f64> for u8 {
    fn from_repr(host: f64) -> Self {
        host as u8
    }

    fn to_repr(self) -> f64 {
        f64::from(self)
    }
}

/// Implement [`FromHost`], [`ToHost`], [`DirectFromHost`] and [`DirectToHost`]
/// for value kinds through their [`Repr`] mapping.
///
/// ```ignore
/// value_conversions!([E: JniEnv] Jni<E> {
///     i32 => i32,
///     bool => u8,
///     NativePointer => i64,
/// });
/// ```
#[macro_export]
macro_rules! value_conversions {
    (@kind [$($g:tt)*] $backend:ty, $kind:ty => $host:ty) => {
        impl<$($g)*> $crate::FromHost<$backend> for $kind {
            type Interop = $host;
            type Release = ();

            #[inline]
            fn convert_from(_env: &<$backend as $crate::Backend>::Env, value: $host) -> (Self, ()) {
                (<$kind as $crate::convert::Repr<$host>>::from_repr(value), ())
            }

            #[inline]
            fn release(_env: &<$backend as $crate::Backend>::Env, _value: $host, _release: ()) {}
        }

        impl<$($g)*> $crate::ToHost<$backend> for $kind {
            type Interop = $host;

            #[inline]
            fn convert_to(_env: &<$backend as $crate::Backend>::Env, value: Self) -> $host {
                <$kind as $crate::convert::Repr<$host>>::to_repr(value)
            }
        }

        impl<$($g)*> $crate::DirectFromHost<$backend> for $kind {
            type Interop = $host;

            #[inline]
            fn convert_from(value: $host) -> Self {
                <$kind as $crate::convert::Repr<$host>>::from_repr(value)
            }
        }

        impl<$($g)*> $crate::DirectToHost<$backend> for $kind {
            type Interop = $host;

            #[inline]
            fn convert_to(value: Self) -> $host {
                <$kind as $crate::convert::Repr<$host>>::to_repr(value)
            }
        }
    };

    (@unit [$($g:tt)*] $backend:ty) => {
        impl<$($g)*> $crate::ToHost<$backend> for () {
            type Interop = ();

            #[inline]
            fn convert_to(_env: &<$backend as $crate::Backend>::Env, _value: ()) {}
        }

        impl<$($g)*> $crate::DirectToHost<$backend> for () {
            type Interop = ();

            #[inline]
            fn convert_to(_value: ()) {}
        }
    };

    ($generics:tt $backend:ty { $($kind:ty => $host:ty),* $(,)? }) => {
        $( $crate::value_conversions!(@kind $generics $backend, $kind => $host); )*
        $crate::value_conversions!(@unit $generics $backend);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake;

    impl Backend for Fake {
        type Env = ();
        const NAME: &'static str = "fake";
    }

    value_conversions!([] Fake {
        i32 => i32,
        u32 => i32,
        bool => u8,
        NativePointer => i64,
        InteropNumber => f64,
    });

    #[test]
    fn value_kinds_round_trip() {
        let raw = <u32 as ToHost<Fake>>::convert_to(&(), u32::MAX);
        assert_eq!(raw, -1);
        let (back, ()) = <u32 as FromHost<Fake>>::convert_from(&(), raw);
        assert_eq!(back, u32::MAX);

        assert_eq!(<bool as DirectToHost<Fake>>::convert_to(true), 1);
        assert!(<bool as DirectFromHost<Fake>>::convert_from(2));
    }

    struct Generic<E>(std::marker::PhantomData<E>);

    impl<E: Default + 'static> Backend for Generic<E> {
        type Env = E;
        const NAME: &'static str = "generic";
    }

    value_conversions!([E: Default + 'static] Generic<E> {
        i32 => i32,
        u8 => i32,
    });

    #[test]
    fn generic_backends_cover_every_kind() {
        let raw = <u8 as ToHost<Generic<u16>>>::convert_to(&0, 200);
        assert_eq!(raw, 200);
        let (back, ()) = <i32 as FromHost<Generic<u16>>>::convert_from(&0, -4);
        assert_eq!(back, -4);
        <() as ToHost<Generic<u16>>>::convert_to(&0, ());
    }

    #[test]
    fn pointer_survives_sign_bit() {
        let ptr = NativePointer::from_addr(0xffff_8000_0000_1000);
        let raw = <NativePointer as ToHost<Fake>>::convert_to(&(), ptr);
        assert!(raw < 0);
        let (back, ()) = <NativePointer as FromHost<Fake>>::convert_from(&(), raw);
        assert_eq!(back, ptr);
    }

    #[test]
    fn number_narrows() {
        let (n, ()) = <InteropNumber as FromHost<Fake>>::convert_from(&(), 3.0);
        assert_eq!(n, InteropNumber::Int32(3));
        assert_eq!(<InteropNumber as ToHost<Fake>>::convert_to(&(), n), 3.0);
    }
}
