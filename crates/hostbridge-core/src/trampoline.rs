//! Generic call invokers behind every trampoline.
//!
//! A trampoline is a host-ABI shell (emitted per export by the backend's
//! `*_exports!` macro) around one of these invokers. The invoker does the
//! actual work, identically for every backend and arity:
//!
//! 1. convert each host argument in declared order,
//! 2. call the implementation exactly once,
//! 3. convert the result back to the host,
//! 4. release every converted argument in declared order,
//! 5. return the host result.
//!
//! Releases run unconditionally; nothing is held across the implementation
//! call, so nested callback → managed → native re-entry is fine.
//!
//! Implementations are plain Rust functions. Arity 0 through 16 is supported.

use crate::convert::{Backend, DirectFromHost, DirectToHost, FromHost, ToHost};
use crate::types::VmContext;

/// Invoke an implementation with host arguments and an environment.
pub trait Invoke<B: Backend, Args, Ret> {
    type HostArgs;
    type HostRet;

    fn invoke(&self, env: &B::Env, args: Self::HostArgs) -> Self::HostRet;
}

/// Like [`Invoke`], but the implementation takes a [`VmContext`] first.
pub trait InvokeWithContext<B: Backend, Args, Ret> {
    type HostArgs;
    type HostRet;

    fn invoke_with_context(&self, env: &B::Env, args: Self::HostArgs) -> Self::HostRet;
}

/// Invoke an implementation without any host environment.
///
/// Only value kinds have direct conversions, so only they can appear here.
pub trait InvokeDirect<B: Backend, Args, Ret> {
    type HostArgs;
    type HostRet;

    fn invoke_direct(&self, args: Self::HostArgs) -> Self::HostRet;
}

macro_rules! impl_invokers {
    ($($param:ident $idx:tt),*) => {
        impl<B, F, R, $($param),*> Invoke<B, ($($param,)*), R> for F
        where
            B: Backend,
            F: Fn($($param),*) -> R,
            R: ToHost<B>,
            $($param: FromHost<B>,)*
        {
            type HostArgs = ($(<$param as FromHost<B>>::Interop,)*);
            type HostRet = <R as ToHost<B>>::Interop;

            #[allow(unused_variables, clippy::unused_unit)]
            #[inline]
            fn invoke(&self, env: &B::Env, args: Self::HostArgs) -> Self::HostRet {
                let converted = ($(<$param as FromHost<B>>::convert_from(env, args.$idx),)*);
                let result = (self)($(converted.$idx.0),*);
                let host = <R as ToHost<B>>::convert_to(env, result);
                $(<$param as FromHost<B>>::release(env, args.$idx, converted.$idx.1);)*
                host
            }
        }

        impl<B, F, R, $($param),*> InvokeWithContext<B, ($($param,)*), R> for F
        where
            B: Backend,
            F: Fn(VmContext, $($param),*) -> R,
            R: ToHost<B>,
            $($param: FromHost<B>,)*
        {
            type HostArgs = ($(<$param as FromHost<B>>::Interop,)*);
            type HostRet = <R as ToHost<B>>::Interop;

            #[allow(unused_variables, clippy::unused_unit)]
            #[inline]
            fn invoke_with_context(&self, env: &B::Env, args: Self::HostArgs) -> Self::HostRet {
                let converted = ($(<$param as FromHost<B>>::convert_from(env, args.$idx),)*);
                let result = (self)(VmContext::from_env(env), $(converted.$idx.0),*);
                let host = <R as ToHost<B>>::convert_to(env, result);
                $(<$param as FromHost<B>>::release(env, args.$idx, converted.$idx.1);)*
                host
            }
        }

        impl<B, F, R, $($param),*> InvokeDirect<B, ($($param,)*), R> for F
        where
            B: Backend,
            F: Fn($($param),*) -> R,
            R: DirectToHost<B>,
            $($param: DirectFromHost<B>,)*
        {
            type HostArgs = ($(<$param as DirectFromHost<B>>::Interop,)*);
            type HostRet = <R as DirectToHost<B>>::Interop;

            #[allow(unused_variables, clippy::unused_unit)]
            #[inline]
            fn invoke_direct(&self, args: Self::HostArgs) -> Self::HostRet {
                let result = (self)($(<$param as DirectFromHost<B>>::convert_from(args.$idx)),*);
                <R as DirectToHost<B>>::convert_to(result)
            }
        }
    };
}

impl_invokers!();
impl_invokers!(P0 0);
impl_invokers!(P0 0, P1 1);
impl_invokers!(P0 0, P1 1, P2 2);
impl_invokers!(P0 0, P1 1, P2 2, P3 3);
impl_invokers!(P0 0, P1 1, P2 2, P3 3, P4 4);
impl_invokers!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5);
impl_invokers!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5, P6 6);
impl_invokers!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5, P6 6, P7 7);
impl_invokers!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5, P6 6, P7 7, P8 8);
impl_invokers!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5, P6 6, P7 7, P8 8, P9 9);
impl_invokers!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5, P6 6, P7 7, P8 8, P9 9, P10 10);
impl_invokers!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5, P6 6, P7 7, P8 8, P9 9, P10 10, P11 11);
impl_invokers!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5, P6 6, P7 7, P8 8, P9 9, P10 10, P11 11, P12 12);
impl_invokers!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5, P6 6, P7 7, P8 8, P9 9, P10 10, P11 11, P12 12, P13 13);
impl_invokers!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5, P6 6, P7 7, P8 8, P9 9, P10 10, P11 11, P12 12, P13 13, P14 14);
impl_invokers!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5, P6 6, P7 7, P8 8, P9 9, P10 10, P11 11, P12 12, P13 13, P14 14, P15 15);
