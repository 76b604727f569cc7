//! Binding and callback plumbing for ETS.

use hostbridge_core::{HostRef, PendingException, VmContext};
use hostbridge_core::pending::{self, HostErrors};
use hostbridge_registry::callbacks::{self, AttachHost, AttachedDispatcher};
use hostbridge_registry::classpath::{
    ARKUI_GENERATED_NATIVE_MODULE, ARKUI_NATIVE_MODULE, INTEROP_NATIVE_MODULE, TEST_NATIVE_MODULE,
};
use hostbridge_registry::{
    BindingHost, CallbackHost, DescriptorStyle, Exports, LoadError, LoaderConfig, NativeKind, NativeMethod, Registrar,
    binder,
};

use super::{CRITICAL_NATIVE_PREFIX, EtsEnv, EtsNativeMethod, EtsValue, FAST_NATIVE_PREFIX};
use crate::{HostVm, Loaded};

pub const ETS_NAPI_VERSION: i32 = 0x0001_0000;
pub const ETS_ERR: i32 = -1;

const ERROR_CLASS: &str = "std/core/Error";

/// Adapter giving an [`EtsEnv`] the binder and dispatcher interfaces.
#[repr(transparent)]
pub struct EtsHost<E>(E);

impl<E> EtsHost<E> {
    pub fn new(env: &E) -> &Self {
        // SAFETY: `EtsHost` is a transparent wrapper around `E`.
        unsafe { &*(env as *const E as *const EtsHost<E>) }
    }

    pub fn env(&self) -> &E {
        &self.0
    }
}

impl<E: EtsEnv> HostErrors for EtsHost<E> {
    fn take_pending(&self) -> Option<PendingException> {
        if !self.0.error_check() {
            return None;
        }
        let message = self.0.error_message();
        self.0.error_clear();
        Some(PendingException { message })
    }
}

/// Registered name of a native: fast and critical natives carry a prefix.
pub(crate) fn registered_name(name: &str, kind: NativeKind) -> String {
    match kind {
        NativeKind::Normal => name.to_string(),
        NativeKind::Fast => format!("{FAST_NATIVE_PREFIX}{name}"),
        NativeKind::Critical => format!("{CRITICAL_NATIVE_PREFIX}{name}"),
    }
}

impl<E: EtsEnv> BindingHost for EtsHost<E> {
    type Class = E::Ref;
    type Method = E::MethodId;

    const STYLE: DescriptorStyle = DescriptorStyle::Ets;
    const DEFAULT_CLASSPATHS: &'static [(&'static str, &'static str)] = &[
        (INTEROP_NATIVE_MODULE, "@hostbridge/interop/InteropNativeModule/InteropNativeModule"),
        (TEST_NATIVE_MODULE, "@hostbridge/arkui/generated/arkts/TestNativeModule/TestNativeModule"),
        (ARKUI_NATIVE_MODULE, "@hostbridge/arkui/generated/arkts/ArkUINativeModule/ArkUINativeModule"),
        (
            ARKUI_GENERATED_NATIVE_MODULE,
            "@hostbridge/arkui/generated/arkts/ArkUIGeneratedNativeModule/ArkUIGeneratedNativeModule",
        ),
    ];

    fn find_class(&self, classpath: &str) -> Option<E::Ref> {
        let class = self.0.find_class(classpath);
        (!class.is_null()).then_some(class)
    }

    fn retain_class(&self, class: E::Ref) -> E::Ref {
        self.0.new_global_ref(class)
    }

    fn find_static_method(&self, class: E::Ref, name: &str, descriptor: &str) -> Option<E::MethodId> {
        self.0.get_static_method_id(class, name, descriptor)
    }

    fn bind_native(&self, class: E::Ref, method: &NativeMethod<'_>) -> Result<(), i32> {
        let name = registered_name(method.name, method.kind);
        let native = EtsNativeMethod {
            name: &name,
            signature: method.descriptor,
            fn_ptr: method.entry.as_ptr(),
        };
        match self.0.register_natives(class, &[native]) {
            0 => Ok(()),
            status => Err(status),
        }
    }
}

impl<E: EtsEnv> CallbackHost for EtsHost<E> {
    type Class = E::Ref;
    type Method = E::MethodId;

    fn call_dispatcher(&self, class: E::Ref, method: E::MethodId, kind: i32, args: &[u8]) -> Result<i32, PendingException> {
        let len = i32::try_from(args.len()).map_err(|_| PendingException::with_message("argument buffer too large"))?;
        let array = self.0.new_byte_array(len);
        if let Some(error) = self.take_pending() {
            return Err(error);
        }
        if !args.is_empty() {
            let data = self.0.pin_byte_array(array);
            if data.is_null() {
                return Err(PendingException::with_message("cannot pin callback arguments"));
            }
            // SAFETY: the array was just created with `len` elements.
            unsafe { std::ptr::copy_nonoverlapping(args.as_ptr(), data, args.len()) };
            self.0.unpin_byte_array(array);
        }
        let result = self
            .0
            .call_static_int_method(class, method, &[EtsValue::Int(kind), EtsValue::Object(array), EtsValue::Int(len)]);
        match self.take_pending() {
            Some(error) => Err(error),
            None => Ok(result),
        }
    }
}

// ============================================================================
// VM
// ============================================================================

/// [`AttachHost`] over an ETS VM.
pub struct EtsVm<V: 'static>(pub &'static V);

impl<V> AttachHost for EtsVm<V>
where
    V: HostVm,
    V::Env: EtsEnv,
{
    type Host = EtsHost<V::Env>;

    fn with_attached<R>(&self, f: impl FnOnce(&Self::Host) -> R) -> Option<R> {
        self.0.get_env().map(|env| f(EtsHost::new(env)))
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Bind `exports` on `env` and resolve the dispatcher.
pub fn load<E: EtsEnv>(env: &E, exports: Exports, config: &LoaderConfig) -> Result<Loaded<E::Ref, E::MethodId>, LoadError> {
    let report = binder::load(EtsHost::new(env), &exports, config)?;
    Ok(Loaded { exports, report })
}

/// Body of `EtsNapiOnLoad`. Returns the interface version or [`ETS_ERR`].
pub fn on_load<E>(env: &E, registrars: &[Registrar], config: &LoaderConfig) -> i32
where
    E: EtsEnv,
    E::Ref: Send + Sync + 'static,
    E::MethodId: Send + Sync + 'static,
{
    let loaded = match load(env, Exports::from_registrars(registrars), config) {
        Ok(loaded) => loaded,
        Err(error) => {
            tracing::error!(%error, "EtsNapiOnLoad failed");
            return ETS_ERR;
        }
    };
    match env.get_vm() {
        Some(vm) => {
            let sink = AttachedDispatcher::new(EtsVm(vm), loaded.dispatcher());
            if callbacks::install(Box::new(sink)).is_err() {
                tracing::warn!("keeping previously installed callback dispatcher");
            }
        }
        None => tracing::warn!("no VM handle; asynchronous callbacks unavailable"),
    }
    ETS_NAPI_VERSION
}

/// Raise an `Error` from an implementation running in a context trampoline.
///
/// # Safety
///
/// `ctx` must be the context passed to the current implementation by an ETS
/// context trampoline over `E`.
pub unsafe fn throw_error<E: EtsEnv>(ctx: VmContext, message: &str) {
    // SAFETY: upheld by the caller.
    let env: &E = unsafe { ctx.env() };
    let class = env.find_class(ERROR_CLASS);
    if class.is_null() {
        // The failed lookup leaves its own error pending.
        let _ = pending::drain(EtsHost::new(env), "error class lookup");
        tracing::warn!(message, "cannot raise host error: error class missing");
        return;
    }
    env.throw_error_new(class, message);
}

/// Define `EtsNapiOnLoad` binding the given registrars.
#[macro_export]
macro_rules! ets_on_load {
    (env: $env:ty, registrars: [$($registrar:path),* $(,)?]) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn EtsNapiOnLoad(env: <$env as $crate::ets::EtsEnv>::Raw) -> i32 {
            // SAFETY: the VM passes the environment of the loading thread.
            let env = unsafe { <$env as $crate::ets::EtsEnv>::from_raw(env) };
            let config = $crate::__private::LoaderConfig::default();
            $crate::ets::on_load(env, &[$($registrar),*], &config)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_follow_native_kind() {
        assert_eq!(registered_name("_Get", NativeKind::Normal), "_Get");
        assert_eq!(registered_name("_Get", NativeKind::Fast), "#F$_Get");
        assert_eq!(registered_name("_Get", NativeKind::Critical), "#C$_Get");
    }
}
