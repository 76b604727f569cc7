//! JSC backend: a JavaScriptCore context.
//!
//! Exports become global functions with the `JSObjectCallAsFunctionCallback`
//! shape, so every shell takes `argc`/`argv` and fills missing arguments with
//! `undefined`. There are no classes to bind; [`init_exports`] installs the
//! functions and looks the callback dispatcher up as a global.
//!
//! JS numbers are doubles, so 64-bit integers and pointers travel as BigInt
//! built from and read back as decimal text.

mod convert;
mod loader;
mod macros;

use std::marker::PhantomData;

use hostbridge_core::{Backend, PendingException};
use hostbridge_registry::NativeEntry;

use crate::HostVm;

pub use loader::{JscHost, JscVm, arguments, finish_call, init_exports, on_init, throw_error};

/// Marker for the JSC backend over context `C`.
pub struct Jsc<C>(PhantomData<fn() -> C>);

impl<C: JscContext> Backend for Jsc<C> {
    type Env = C;
    const NAME: &'static str = "jsc";
}

/// The subset of the JavaScriptCore C API the backend calls.
pub trait JscContext: Sized {
    /// `JSContextRef`.
    type Raw: Copy;
    /// `JSValueRef`.
    type Value: Copy;
    type Vm: HostVm<Env = Self>;

    /// # Safety
    ///
    /// `raw` must be the context the engine passed to the current call.
    unsafe fn from_raw<'a>(raw: Self::Raw) -> &'a Self;

    fn get_vm(&self) -> Option<&'static Self::Vm>;

    fn undefined(&self) -> Self::Value;
    /// `true` for `undefined` and `null`.
    fn is_nullish(&self, value: Self::Value) -> bool;

    fn to_boolean(&self, value: Self::Value) -> bool;
    fn make_boolean(&self, value: bool) -> Self::Value;
    fn to_number(&self, value: Self::Value) -> f64;
    fn make_number(&self, value: f64) -> Self::Value;

    /// UTF-8 copy of the value's string form, without a trailing NUL.
    fn to_utf8(&self, value: Self::Value) -> Vec<u8>;
    fn make_string(&self, utf8: &[u8]) -> Self::Value;

    /// Base-10 text of a BigInt or Number.
    fn to_decimal(&self, value: Self::Value) -> String;
    fn make_bigint(&self, decimal: &str) -> Self::Value;

    /// Copy of a typed array's bytes; `None` if the value is not a typed array.
    fn typed_array_bytes(&self, value: Self::Value) -> Option<Vec<u8>>;
    fn set_typed_array_bytes(&self, value: Self::Value, bytes: &[u8]) -> bool;
    fn make_uint8_array(&self, bytes: &[u8]) -> Self::Value;

    fn global_property(&self, name: &str) -> Self::Value;
    /// Install a shell emitted by `jsc_exports!` as a global function.
    fn set_global_function(&self, name: &str, entry: NativeEntry) -> bool;
    fn call_function(&self, function: Self::Value, args: &[Self::Value]) -> Result<Self::Value, PendingException>;

    /// Record an `Error` to be thrown when the current call returns.
    fn throw_error(&self, message: &str);
    fn take_exception(&self) -> Option<Self::Value>;
}

#[cfg(test)]
mod tests {
    use hostbridge_core::types::*;
    use hostbridge_registry::{ExportsBuilder, LoadError, LoadState, LoaderConfig};

    use super::*;
    use crate::sim::{SimObject, SimRef, SimVm};

    fn answer() -> KInt {
        42
    }

    fn sum(values: KIntArray) -> KInt {
        unsafe { values.as_slice() }.iter().sum()
    }

    fn bump(values: KIntArray) {
        for value in unsafe { values.as_mut_slice() } {
            *value += 1;
        }
    }

    fn same(ptr: KNativePointer) -> KNativePointer {
        ptr
    }

    fn greet(name: KStringPtr) -> KStringPtr {
        format!("hi {}", name.to_string_lossy()).into()
    }

    fn fail(ctx: KVMContext, code: KInt) -> KInt {
        unsafe { throw_error::<SimVm>(ctx, &format!("failed with {code}")) };
        code
    }

    crate::jsc_exports! {
        context: SimVm,
        module: JscUnit,
        registrar: register_unit,
        exports: {
            fn Answer() -> KInt = answer;
            fn Sum(values: KIntArray) -> KInt = sum;
            fn Bump(values: KIntArray) = bump;
            fn Same(ptr: KNativePointer) -> KNativePointer = same;
            fn Greet(name: KStringPtr) -> KStringPtr = greet;
            ctx fn Fail(code: KInt) -> KInt = fail;
        }
    }

    fn loaded_vm() -> SimVm {
        let vm = SimVm::new();
        vm.define_function("callCallbackFromNative", |vm, args| {
            let kind = vm.arg_int(&args[0]).unwrap_or(-1);
            let len = vm.arg_bytes(&args[1]).map_or(0, |bytes| bytes.len() as i32);
            kind * 100 + len
        });
        let mut builder = ExportsBuilder::new();
        builder.register(register_unit);
        let loaded = init_exports(&vm, builder.build(), &LoaderConfig::default()).unwrap();
        assert_eq!(loaded.report.bound_count(), 6);
        assert_eq!(loaded.report.module("JscUnit").unwrap().state, LoadState::Bound);
        vm
    }

    #[test]
    fn globals_convert_arguments_and_results() {
        let vm = loaded_vm();
        let answer = vm.call_global("_Answer", &[]).unwrap();
        assert_eq!(vm.number(answer), Some(42.0));

        let values = vm.new_ints(&[1, 2, 3]);
        let total = vm.call_global("_Sum", &[values]).unwrap();
        assert_eq!(vm.number(total), Some(6.0));

        let greeting = vm.call_global("_Greet", &[vm.new_string("bob")]).unwrap();
        assert_eq!(vm.string(greeting).as_deref(), Some("hi bob"));
    }

    #[test]
    fn missing_arguments_read_as_undefined() {
        let vm = loaded_vm();
        let total = vm.call_global("_Sum", &[]).unwrap();
        assert_eq!(vm.number(total), Some(0.0));
    }

    #[test]
    fn typed_arrays_are_written_back() {
        let vm = loaded_vm();
        let values = vm.new_ints(&[5, 6]);
        vm.call_global("_Bump", &[values]).unwrap();
        assert_eq!(vm.ints(values).unwrap(), vec![6, 7]);
        let counters = vm.counters();
        assert_eq!(counters.typed_reads, 1);
        assert_eq!(counters.typed_writes, 1);
    }

    #[test]
    fn pointers_travel_as_bigint() {
        let vm = loaded_vm();
        let addr = (1_u64 << 52) + 3;
        let result = vm.call_global("_Same", &[vm.new_bigint(&addr.to_string())]).unwrap();
        assert!(matches!(vm.object(result), Some(SimObject::BigInt(text)) if text == addr.to_string()));
    }

    #[test]
    fn thrown_errors_fill_the_exception_slot() {
        let vm = loaded_vm();
        let error = vm.call_global("_Fail", &[vm.new_number(9.0)]).unwrap_err();
        assert_eq!(vm.error_text(error).as_deref(), Some("failed with 9"));
        assert!(JscContext::take_exception(&vm).is_none());
    }

    #[test]
    fn dispatcher_receives_kind_and_bytes() {
        let vm = SimVm::new();
        vm.define_function("callCallbackFromNative", |vm, args| {
            vm.arg_int(&args[0]).unwrap_or(-1) * 100 + vm.arg_bytes(&args[1]).map_or(0, |b| b.len() as i32)
        });
        let loaded = init_exports(&vm, ExportsBuilder::new().build(), &LoaderConfig::default()).unwrap();
        let result = loaded.dispatcher().call_sync(JscHost::new(&vm), 7, &[1; 12]).unwrap();
        assert_eq!(result, 712);
    }

    #[deny(unused_variables)]
    mod no_arguments {
        use super::*;

        fn ping() {}

        crate::jsc_exports! {
            context: SimVm,
            module: JscQuiet,
            registrar: register_quiet,
            exports: {
                fn Ping() = ping;
            }
        }

        #[test]
        fn zero_argument_exports_compile_cleanly() {
            let vm = SimVm::new();
            vm.define_function("callCallbackFromNative", |_, _| 0);
            let mut builder = ExportsBuilder::new();
            builder.register(register_quiet);
            init_exports(&vm, builder.build(), &LoaderConfig::default()).unwrap();
            assert!(vm.call_global("_Ping", &[]).is_ok());
        }
    }

    #[test]
    fn missing_dispatcher_fails_init() {
        let vm = SimVm::new();
        let mut builder = ExportsBuilder::new();
        builder.register(register_unit);
        let error = init_exports(&vm, builder.build(), &LoaderConfig::default()).unwrap_err();
        assert!(matches!(error, LoadError::DispatcherUnresolved { .. }));
        assert!(vm.call_global("_Answer", &[]).is_err());
        assert_eq!(vm.global("_Answer"), SimRef::NULL);
    }
}
