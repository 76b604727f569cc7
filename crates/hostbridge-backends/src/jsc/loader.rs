//! Export installation and callback plumbing for JSC.

use hostbridge_core::{PendingException, VmContext};
use hostbridge_registry::callbacks::{self, AttachHost, AttachedDispatcher};
use hostbridge_registry::{
    BindError, CallbackDispatcher, CallbackHost, Exports, LoadError, LoadReport, LoadState, LoaderConfig,
    ModuleReport, Registrar,
};

use super::JscContext;
use crate::{HostVm, Loaded};

/// Adapter giving a [`JscContext`] the dispatcher interface.
#[repr(transparent)]
pub struct JscHost<C>(C);

impl<C> JscHost<C> {
    pub fn new(env: &C) -> &Self {
        // SAFETY: `JscHost` is a transparent wrapper around `C`.
        unsafe { &*(env as *const C as *const JscHost<C>) }
    }

    pub fn env(&self) -> &C {
        &self.0
    }
}

/// The dispatcher is a global function; there is no class or method id.
impl<C: JscContext> CallbackHost for JscHost<C> {
    type Class = C::Value;
    type Method = ();

    fn call_dispatcher(&self, function: C::Value, _method: (), kind: i32, args: &[u8]) -> Result<i32, PendingException> {
        let env = &self.0;
        let len = i32::try_from(args.len()).map_err(|_| PendingException::with_message("argument buffer too large"))?;
        let argv = [
            env.make_number(f64::from(kind)),
            env.make_uint8_array(args),
            env.make_number(f64::from(len)),
        ];
        let result = env.call_function(function, &argv)?;
        Ok(env.to_number(result) as i32)
    }
}

/// [`AttachHost`] over a JSC context owner.
pub struct JscVm<V: 'static>(pub &'static V);

impl<V> AttachHost for JscVm<V>
where
    V: HostVm,
    V::Env: JscContext,
{
    type Host = JscHost<V::Env>;

    fn with_attached<R>(&self, f: impl FnOnce(&Self::Host) -> R) -> Option<R> {
        self.0.get_env().map(|env| f(JscHost::new(env)))
    }
}

/// Arguments of a JSC callback as a slice.
///
/// # Safety
///
/// `argv` must be null or point to `argc` values, as JSC guarantees for the
/// duration of a callback.
pub unsafe fn arguments<'a, V>(argc: usize, argv: *const V) -> &'a [V] {
    if argv.is_null() || argc == 0 {
        &[]
    } else {
        // SAFETY: upheld by the caller.
        unsafe { std::slice::from_raw_parts(argv, argc) }
    }
}

/// Move an error raised during the call into the engine's exception slot.
pub fn finish_call<C: JscContext>(env: &C, exception: *mut C::Value, result: C::Value) -> C::Value {
    match env.take_exception() {
        Some(error) => {
            if !exception.is_null() {
                // SAFETY: JSC passes a writable exception slot or null.
                unsafe { *exception = error };
            }
            env.undefined()
        }
        None => result,
    }
}

/// Install every export as a global function and resolve the dispatcher.
///
/// JSC has no classes, so modules only group records in the report; each
/// module reports [`LoadState::Bound`] with its per-record failures.
pub fn init_exports<C: JscContext>(
    env: &C,
    exports: Exports,
    config: &LoaderConfig,
) -> Result<Loaded<C::Value, ()>, LoadError> {
    let function = env.global_property(&config.dispatcher_method);
    if env.is_nullish(function) {
        tracing::error!(method = config.dispatcher_method.as_str(), "callback dispatcher not found");
        return Err(LoadError::DispatcherUnresolved {
            classpath: String::new(),
            method: config.dispatcher_method.clone(),
            descriptor: String::new(),
        });
    }

    let mut modules = Vec::new();
    for module in exports.modules() {
        let mut report = ModuleReport {
            module: module.to_string(),
            classpath: String::new(),
            state: LoadState::MethodsBinding,
            bound: Vec::new(),
            failed: Vec::new(),
        };
        for record in exports.methods(module) {
            let installed = record
                .signature()
                .map_err(BindError::from)
                .and_then(|_| {
                    if env.set_global_function(record.name(), record.entry()) {
                        Ok(())
                    } else {
                        Err(BindError::Rejected {
                            name: record.name().to_string(),
                            status: -1,
                        })
                    }
                });
            match installed {
                Ok(()) => report.bound.push(record.name().to_string()),
                Err(error) => {
                    tracing::warn!(module, name = record.name(), %error, "failed to install native");
                    report.failed.push((record.name().to_string(), error));
                }
            }
        }
        report.state = LoadState::Bound;
        modules.push(report);
    }

    let dispatcher = CallbackDispatcher::new(function, ());
    Ok(Loaded {
        exports,
        report: LoadReport { modules, dispatcher },
    })
}

/// Body of `InitExports`: install the registrars' exports and the
/// process-wide callback sink.
pub fn on_init<C>(env: &C, registrars: &[Registrar], config: &LoaderConfig) -> bool
where
    C: JscContext,
    C::Value: Send + Sync + 'static,
{
    let loaded = match init_exports(env, Exports::from_registrars(registrars), config) {
        Ok(loaded) => loaded,
        Err(error) => {
            tracing::error!(%error, "InitExports failed");
            return false;
        }
    };
    if let Some(vm) = env.get_vm() {
        let sink = AttachedDispatcher::new(JscVm(vm), loaded.dispatcher());
        if callbacks::install(Box::new(sink)).is_err() {
            tracing::warn!("keeping previously installed callback dispatcher");
        }
    }
    true
}

/// Throw a JS `Error` from an implementation running in a context trampoline.
///
/// # Safety
///
/// `ctx` must be the context passed to the current implementation by a JSC
/// context trampoline over `C`.
pub unsafe fn throw_error<C: JscContext>(ctx: VmContext, message: &str) {
    // SAFETY: upheld by the caller.
    let env: &C = unsafe { ctx.env() };
    env.throw_error(message);
}

/// Define `InitExports(globalContext)` installing the given registrars.
#[macro_export]
macro_rules! jsc_init_exports {
    (context: $ctx:ty, registrars: [$($registrar:path),* $(,)?]) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn InitExports(global: <$ctx as $crate::jsc::JscContext>::Raw) -> bool {
            // SAFETY: the embedder passes its global context.
            let env = unsafe { <$ctx as $crate::jsc::JscContext>::from_raw(global) };
            let config = $crate::__private::LoaderConfig::default();
            $crate::jsc::on_init(env, &[$($registrar),*], &config)
        }
    };
}
