//! Binding and callback plumbing for ANI.

use hostbridge_core::{HostRef, PendingException, VmContext};
use hostbridge_core::pending::HostErrors;
use hostbridge_registry::callbacks::{self, AttachHost, AttachedDispatcher};
use hostbridge_registry::classpath::{
    ARKUI_GENERATED_NATIVE_MODULE, ARKUI_NATIVE_MODULE, INTEROP_NATIVE_MODULE, TEST_NATIVE_MODULE,
};
use hostbridge_registry::{
    BindingHost, CallbackHost, DescriptorStyle, Exports, LoadError, LoaderConfig, NativeKind, NativeMethod, Registrar,
    binder,
};

use super::{AniEnv, AniNativeFunction, AniValue};
use crate::{HostVm, Loaded};

pub const ANI_VERSION_1: u32 = 1;
pub const ANI_ERR: i32 = -1;

/// Wrap a classpath as a class descriptor: `a/b/C` becomes `La/b/C;`.
pub fn class_descriptor(classpath: &str) -> String {
    if classpath.starts_with('L') && classpath.ends_with(';') {
        classpath.to_string()
    } else {
        format!("L{classpath};")
    }
}

/// Adapter giving an [`AniEnv`] the binder and dispatcher interfaces.
#[repr(transparent)]
pub struct AniHost<E>(E);

impl<E> AniHost<E> {
    pub fn new(env: &E) -> &Self {
        // SAFETY: `AniHost` is a transparent wrapper around `E`.
        unsafe { &*(env as *const E as *const AniHost<E>) }
    }

    pub fn env(&self) -> &E {
        &self.0
    }
}

impl<E: AniEnv> HostErrors for AniHost<E> {
    fn take_pending(&self) -> Option<PendingException> {
        if !self.0.exist_unhandled_error() {
            return None;
        }
        let message = self.0.error_message();
        self.0.reset_error();
        Some(PendingException { message })
    }
}

impl<E: AniEnv> BindingHost for AniHost<E> {
    type Class = E::Ref;
    type Method = E::MethodId;

    const STYLE: DescriptorStyle = DescriptorStyle::Ani;
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
        let class = self.0.find_class(&class_descriptor(classpath));
        (!class.is_null()).then_some(class)
    }

    fn retain_class(&self, class: E::Ref) -> E::Ref {
        self.0.global_reference_create(class)
    }

    fn find_static_method(&self, class: E::Ref, name: &str, descriptor: &str) -> Option<E::MethodId> {
        self.0.class_find_static_method(class, name, descriptor)
    }

    /// Registration cannot mark a native env-less, so direct shells would be
    /// called with the normal frame.
    fn supports_kind(&self, kind: NativeKind) -> bool {
        kind != NativeKind::Critical
    }

    fn bind_native(&self, class: E::Ref, method: &NativeMethod<'_>) -> Result<(), i32> {
        let native = AniNativeFunction {
            name: method.name,
            signature: method.descriptor,
            pointer: method.entry.as_ptr(),
        };
        match self.0.class_bind_native_methods(class, &[native]) {
            status if status.is_ok() => Ok(()),
            status => Err(status.0),
        }
    }
}

impl<E: AniEnv> CallbackHost for AniHost<E> {
    type Class = E::Ref;
    type Method = E::MethodId;

    fn call_dispatcher(&self, class: E::Ref, method: E::MethodId, kind: i32, args: &[u8]) -> Result<i32, PendingException> {
        let len = i32::try_from(args.len()).map_err(|_| PendingException::with_message("argument buffer too large"))?;
        let array = self.0.array_new_byte(args.len());
        if let Some(error) = self.take_pending() {
            return Err(error);
        }
        if !args.is_empty() && !self.0.array_set_region_byte(array, 0, args).is_ok() {
            return Err(PendingException::with_message("cannot fill callback arguments"));
        }
        let result = self
            .0
            .class_call_static_method_int(class, method, &[AniValue::Int(kind), AniValue::Ref(array), AniValue::Int(len)]);
        match self.take_pending() {
            Some(error) => Err(error),
            None => Ok(result),
        }
    }
}

// ============================================================================
// VM
// ============================================================================

/// [`AttachHost`] over an ANI VM.
pub struct AniVm<V: 'static>(pub &'static V);

impl<V> AttachHost for AniVm<V>
where
    V: HostVm,
    V::Env: AniEnv,
{
    type Host = AniHost<V::Env>;

    fn with_attached<R>(&self, f: impl FnOnce(&Self::Host) -> R) -> Option<R> {
        self.0.get_env().map(|env| f(AniHost::new(env)))
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Bind `exports` on `env` and resolve the dispatcher.
pub fn load<E: AniEnv>(env: &E, exports: Exports, config: &LoaderConfig) -> Result<Loaded<E::Ref, E::MethodId>, LoadError> {
    let report = binder::load(AniHost::new(env), &exports, config)?;
    Ok(Loaded { exports, report })
}

/// Body of `ANI_Constructor`. Returns the interface version or [`ANI_ERR`].
pub fn on_load<E>(env: &E, registrars: &[Registrar], config: &LoaderConfig) -> Result<u32, i32>
where
    E: AniEnv,
    E::Ref: Send + Sync + 'static,
    E::MethodId: Send + Sync + 'static,
{
    let loaded = match load(env, Exports::from_registrars(registrars), config) {
        Ok(loaded) => loaded,
        Err(error) => {
            tracing::error!(%error, "ANI_Constructor failed");
            return Err(ANI_ERR);
        }
    };
    match env.get_vm() {
        Some(vm) => {
            let sink = AttachedDispatcher::new(AniVm(vm), loaded.dispatcher());
            if callbacks::install(Box::new(sink)).is_err() {
                tracing::warn!("keeping previously installed callback dispatcher");
            }
        }
        None => tracing::warn!("no VM handle; asynchronous callbacks unavailable"),
    }
    Ok(ANI_VERSION_1)
}

/// Raise an error from an implementation running in a context trampoline.
///
/// # Safety
///
/// `ctx` must be the context passed to the current implementation by an ANI
/// context trampoline over `E`.
pub unsafe fn throw_error<E: AniEnv>(ctx: VmContext, message: &str) {
    // SAFETY: upheld by the caller.
    let env: &E = unsafe { ctx.env() };
    if !env.throw_error(message).is_ok() {
        tracing::warn!(message, "cannot raise host error");
    }
}

/// Define `ANI_Constructor` binding the given registrars.
///
/// The host passes its VM; the constructor writes the interface version
/// through `result` on success.
#[macro_export]
macro_rules! ani_on_load {
    (vm: $vm:ty, registrars: [$($registrar:path),* $(,)?]) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn ANI_Constructor(vm: <$vm as $crate::HostVm>::Raw, result: *mut u32) -> i32 {
            // SAFETY: the host passes its own VM pointer.
            let vm = unsafe { <$vm as $crate::HostVm>::from_raw(vm) };
            let Some(env) = $crate::HostVm::get_env(vm) else {
                return $crate::ani::ANI_ERR;
            };
            let config = $crate::__private::LoaderConfig::default();
            match $crate::ani::on_load(env, &[$($registrar),*], &config) {
                Ok(version) => {
                    if !result.is_null() {
                        // SAFETY: the host passes a writable slot or null.
                        unsafe { *result = version };
                    }
                    0
                }
                Err(status) => status,
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classpaths_become_descriptors() {
        assert_eq!(class_descriptor("std/core/String"), "Lstd/core/String;");
        assert_eq!(class_descriptor("Lstd/core/String;"), "Lstd/core/String;");
    }
}
