//! Binding and callback plumbing for JNI.

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

use super::{JValue, JniEnv, JniNativeMethod};
use crate::{HostVm, Loaded};

pub const JNI_VERSION_1_8: i32 = 0x0001_0008;
pub const JNI_ERR: i32 = -1;

const RUNTIME_EXCEPTION: &str = "java/lang/RuntimeException";

/// Adapter giving a [`JniEnv`] the binder and dispatcher interfaces.
#[repr(transparent)]
pub struct JniHost<E>(E);

impl<E> JniHost<E> {
    pub fn new(env: &E) -> &Self {
        // SAFETY: `JniHost` is a transparent wrapper around `E`.
        unsafe { &*(env as *const E as *const JniHost<E>) }
    }

    pub fn env(&self) -> &E {
        &self.0
    }
}

impl<E: JniEnv> HostErrors for JniHost<E> {
    fn take_pending(&self) -> Option<PendingException> {
        if !self.0.exception_check() {
            return None;
        }
        let message = self.0.exception_message();
        self.0.exception_clear();
        Some(PendingException { message })
    }
}

impl<E: JniEnv> BindingHost for JniHost<E> {
    type Class = E::Ref;
    type Method = E::MethodId;

    const STYLE: DescriptorStyle = DescriptorStyle::Jni;
    const DEFAULT_CLASSPATHS: &'static [(&'static str, &'static str)] = &[
        (INTEROP_NATIVE_MODULE, "org/hostbridge/interop/InteropNativeModule"),
        (TEST_NATIVE_MODULE, "org/hostbridge/test/TestNativeModule"),
        (ARKUI_NATIVE_MODULE, "org/hostbridge/arkui/ArkUINativeModule"),
        (ARKUI_GENERATED_NATIVE_MODULE, "org/hostbridge/arkui/ArkUIGeneratedNativeModule"),
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

    /// Registration cannot mark a native env-less, so direct shells would be
    /// called with the normal frame.
    fn supports_kind(&self, kind: NativeKind) -> bool {
        kind != NativeKind::Critical
    }

    fn bind_native(&self, class: E::Ref, method: &NativeMethod<'_>) -> Result<(), i32> {
        let native = JniNativeMethod {
            name: method.name,
            signature: method.descriptor,
            fn_ptr: method.entry.as_ptr(),
        };
        match self.0.register_natives(class, &[native]) {
            0 => Ok(()),
            status => Err(status),
        }
    }
}

impl<E: JniEnv> CallbackHost for JniHost<E> {
    type Class = E::Ref;
    type Method = E::MethodId;

    fn call_dispatcher(&self, class: E::Ref, method: E::MethodId, kind: i32, args: &[u8]) -> Result<i32, PendingException> {
        let len = i32::try_from(args.len()).map_err(|_| PendingException::with_message("argument buffer too large"))?;
        let array = self.0.new_byte_array(len);
        if let Some(error) = self.take_pending() {
            return Err(error);
        }
        self.0.set_byte_array_region(array, 0, args);
        let result = self
            .0
            .call_static_int_method(class, method, &[JValue::Int(kind), JValue::Object(array), JValue::Int(len)]);
        match self.take_pending() {
            Some(error) => Err(error),
            None => Ok(result),
        }
    }
}

// ============================================================================
// VM
// ============================================================================

/// [`AttachHost`] over a JVM.
pub struct JniVm<V: 'static>(pub &'static V);

impl<V> AttachHost for JniVm<V>
where
    V: HostVm,
    V::Env: JniEnv,
{
    type Host = JniHost<V::Env>;

    fn with_attached<R>(&self, f: impl FnOnce(&Self::Host) -> R) -> Option<R> {
        self.0.get_env().map(|env| f(JniHost::new(env)))
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Bind `exports` on `env` and resolve the dispatcher.
pub fn load<E: JniEnv>(env: &E, exports: Exports, config: &LoaderConfig) -> Result<Loaded<E::Ref, E::MethodId>, LoadError> {
    let report = binder::load(JniHost::new(env), &exports, config)?;
    Ok(Loaded { exports, report })
}

/// Body of `JNI_OnLoad`: build the export table, bind it and install the
/// process-wide callback sink. Returns the JNI version or [`JNI_ERR`].
pub fn on_load<V>(vm: &'static V, registrars: &[Registrar], config: &LoaderConfig) -> i32
where
    V: HostVm,
    V::Env: JniEnv,
    <V::Env as JniEnv>::Ref: Send + Sync + 'static,
    <V::Env as JniEnv>::MethodId: Send + Sync + 'static,
{
    let Some(env) = vm.get_env() else {
        tracing::error!(error = %LoadError::EnvironmentUnavailable, "JNI_OnLoad failed");
        return JNI_ERR;
    };
    match load(env, Exports::from_registrars(registrars), config) {
        Ok(loaded) => {
            let sink = AttachedDispatcher::new(JniVm(vm), loaded.dispatcher());
            if callbacks::install(Box::new(sink)).is_err() {
                tracing::warn!("keeping previously installed callback dispatcher");
            }
            JNI_VERSION_1_8
        }
        Err(error) => {
            tracing::error!(%error, "JNI_OnLoad failed");
            JNI_ERR
        }
    }
}

/// Raise a `RuntimeException` from an implementation running in a context trampoline.
///
/// # Safety
///
/// `ctx` must be the context passed to the current implementation by a JNI
/// context trampoline over `E`.
pub unsafe fn throw_error<E: JniEnv>(ctx: VmContext, message: &str) {
    // SAFETY: upheld by the caller.
    let env: &E = unsafe { ctx.env() };
    let class = env.find_class(RUNTIME_EXCEPTION);
    if class.is_null() {
        // The failed lookup leaves its own error pending.
        let _ = pending::drain(JniHost::new(env), "error class lookup");
        tracing::warn!(message, "cannot raise host error: exception class missing");
        return;
    }
    env.throw_new(class, message);
}

/// Define `JNI_OnLoad` binding the given registrars.
///
/// ```ignore
/// hostbridge_backends::jni_on_load!(vm: MyJavaVm, registrars: [register_interop, register_ui]);
/// ```
#[macro_export]
macro_rules! jni_on_load {
    (vm: $vm:ty, registrars: [$($registrar:path),* $(,)?]) => {
        #[unsafe(no_mangle)]
        pub extern "system" fn JNI_OnLoad(
            vm: <$vm as $crate::HostVm>::Raw,
            _reserved: *mut ::std::ffi::c_void,
        ) -> i32 {
            // SAFETY: the JVM passes its own `JavaVM*`.
            let vm = unsafe { <$vm as $crate::HostVm>::from_raw(vm) };
            let config = $crate::__private::LoaderConfig::default();
            $crate::jni::on_load(vm, &[$($registrar),*], &config)
        }
    };
}
