//! Host adapters for hostbridge.
//!
//! Each backend module defines:
//!
//! - a host environment trait (`JniEnv`, `EtsEnv`, `AniEnv`, `JscContext`)
//!   that an embedder implements over the runtime's native interface,
//! - a marker type (`Jni<E>`, `Ets<E>`, ...) carrying the conversions of every
//!   canonical kind,
//! - an `*_exports!` macro emitting the host-ABI shells and a registrar,
//! - a loader binding the export table and resolving the callback dispatcher.
//!
//! The `sim` feature adds [`sim::SimVm`], an in-process VM implementing every
//! host trait, used by the test suites.

#[macro_use]
mod macros;

#[cfg(feature = "ani")]
pub mod ani;
#[cfg(feature = "ets")]
pub mod ets;
#[cfg(feature = "jni")]
pub mod jni;
#[cfg(feature = "jsc")]
pub mod jsc;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
#[cfg(feature = "wasm")]
pub mod wasm;

use hostbridge_registry::{CallbackDispatcher, Exports, LoadReport};

/// A VM that hands out the environment of the calling thread.
///
/// Loaders use it to obtain an environment at load time, and dispatchers use
/// it to deliver asynchronous callbacks.
pub trait HostVm: Sync + 'static {
    /// What the host passes to the load entry point.
    type Raw: Copy;
    type Env;

    /// # Safety
    ///
    /// `raw` must be the VM pointer the host passed to the load entry point.
    unsafe fn from_raw(raw: Self::Raw) -> &'static Self;

    /// Environment of the current thread, attaching it if needed.
    fn get_env(&self) -> Option<&Self::Env>;
}

/// Everything a successful load produced.
#[derive(Debug)]
pub struct Loaded<C, M> {
    pub exports: Exports,
    pub report: LoadReport<C, M>,
}

impl<C: Copy, M: Copy> Loaded<C, M> {
    pub fn dispatcher(&self) -> CallbackDispatcher<C, M> {
        self.report.dispatcher
    }
}

/// Length of a host array holding `len` elements, if the host can index it.
#[cfg(any(feature = "jni", feature = "ets"))]
pub(crate) fn host_array_len(len: usize) -> Option<i32> {
    let host_len = i32::try_from(len).ok();
    if host_len.is_none() {
        tracing::warn!(len, "buffer too large for a host array");
    }
    host_len
}

#[doc(hidden)]
pub mod __private {
    pub use hostbridge_core::types::VOID_KIND;
    pub use hostbridge_core::{
        DirectFromHost, DirectToHost, FromHost, Invoke, InvokeDirect, InvokeWithContext, Signature, ToHost,
    };
    pub use hostbridge_registry::{ExportFlags, ExportsBuilder, LoaderConfig, NativeEntry};
    pub use paste::paste;
    pub use tracing;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(any(feature = "jni", feature = "ets"))]
    fn host_array_len_rejects_oversized_buffers() {
        assert_eq!(host_array_len(0), Some(0));
        assert_eq!(host_array_len(i32::MAX as usize), Some(i32::MAX));
        assert_eq!(host_array_len(i32::MAX as usize + 1), None);
        assert_eq!(host_array_len(usize::MAX), None);
    }
}
