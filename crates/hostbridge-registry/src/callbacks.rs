//! Process-wide callback sink.
//!
//! Implementations that hold the load context call the dispatcher directly.
//! Those that don't go through the sink installed here, once, by the backend's
//! load entry point.
//!
//! The sink follows the single-owner-thread contract: `call_sync` must run on
//! the thread whose VM context it is given, and `post_async` attaches to
//! whatever environment the host provides for the calling thread.

use std::sync::OnceLock;

use hostbridge_core::VmContext;

use crate::dispatcher::{CallbackDispatcher, CallbackHost};
use crate::error::CallbackError;

/// Receiver for native → managed callbacks.
pub trait CallbackSink: Send + Sync {
    fn call_sync(&self, ctx: VmContext, kind: i32, args: &[u8]) -> Result<i32, CallbackError>;

    fn post_async(&self, kind: i32, args: &[u8]) -> Result<(), CallbackError>;
}

/// A VM that can hand out an environment for the current thread.
pub trait AttachHost: Send + Sync {
    type Host: CallbackHost;

    /// Run `f` with the current thread's environment, attaching if needed.
    /// `None` if no environment can be obtained.
    fn with_attached<R>(&self, f: impl FnOnce(&Self::Host) -> R) -> Option<R>;
}

type DispatcherOf<V> = CallbackDispatcher<
    <<V as AttachHost>::Host as CallbackHost>::Class,
    <<V as AttachHost>::Host as CallbackHost>::Method,
>;

/// [`CallbackSink`] over a resolved dispatcher and its VM.
pub struct AttachedDispatcher<V: AttachHost> {
    vm: V,
    dispatcher: DispatcherOf<V>,
}

impl<V: AttachHost> AttachedDispatcher<V> {
    pub fn new(vm: V, dispatcher: DispatcherOf<V>) -> Self {
        Self { vm, dispatcher }
    }
}

impl<V> CallbackSink for AttachedDispatcher<V>
where
    V: AttachHost,
    <V::Host as CallbackHost>::Class: Send + Sync,
    <V::Host as CallbackHost>::Method: Send + Sync,
{
    fn call_sync(&self, ctx: VmContext, kind: i32, args: &[u8]) -> Result<i32, CallbackError> {
        // SAFETY: context tokens are created by the backend's context
        // trampolines from a `V::Host` and are only used during that call.
        let host: &V::Host = unsafe { ctx.env() };
        self.dispatcher.call_sync(host, kind, args)
    }

    fn post_async(&self, kind: i32, args: &[u8]) -> Result<(), CallbackError> {
        self.vm
            .with_attached(|host| self.dispatcher.post_async(host, kind, args))
            .unwrap_or(Err(CallbackError::NotAttached))
    }
}

static CALLBACK_SINK: OnceLock<Box<dyn CallbackSink>> = OnceLock::new();

/// Install the process-wide sink. Only the first call succeeds.
pub fn install(sink: Box<dyn CallbackSink>) -> Result<(), CallbackError> {
    CALLBACK_SINK.set(sink).map_err(|_| {
        tracing::warn!("callback dispatcher already installed");
        CallbackError::AlreadyInstalled
    })
}

pub fn is_installed() -> bool {
    CALLBACK_SINK.get().is_some()
}

fn sink() -> Result<&'static dyn CallbackSink, CallbackError> {
    CALLBACK_SINK
        .get()
        .map(|sink| sink.as_ref())
        .ok_or(CallbackError::NotInstalled)
}

/// Call back into managed code on the thread that owns `ctx`.
pub fn call_sync(ctx: VmContext, kind: i32, args: &[u8]) -> Result<i32, CallbackError> {
    sink()?.call_sync(ctx, kind, args)
}

/// Fire-and-forget callback into managed code.
pub fn post_async(kind: i32, args: &[u8]) -> Result<(), CallbackError> {
    sink()?.post_async(kind, args)
}
