//! ANI backend: the ArkTS native interface, bound with `Class_BindNativeMethods`.
//!
//! ANI hands out no pinned views. Strings are copied through UTF-8 substring
//! reads, and primitive arrays through region reads into a scratch buffer
//! that is written back to the host array on release.

mod convert;
mod loader;
mod macros;

use std::ffi::c_void;
use std::marker::PhantomData;

use hostbridge_core::{Backend, HostRef};

use crate::HostVm;

pub use loader::{ANI_ERR, ANI_VERSION_1, AniHost, AniVm, class_descriptor, load, on_load, throw_error};

/// Marker for the ANI backend over environment `E`.
pub struct Ani<E>(PhantomData<fn() -> E>);

impl<E: AniEnv> Backend for Ani<E> {
    type Env = E;
    const NAME: &'static str = "ani";
}

pub const DOUBLE_CLASS: &str = "Lstd/core/Double;";
pub const INT_CLASS: &str = "Lstd/core/Int;";
pub const STRING_CLASS: &str = "Lstd/core/String;";
pub const RESOURCE_CLASS: &str = "L@hostbridge/arkui/Resource/Resource;";

/// Argument of a static method call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AniValue<R> {
    Int(i32),
    Long(i64),
    Double(f64),
    Ref(R),
}

/// One entry of a `Class_BindNativeMethods` call.
#[derive(Debug, Clone, Copy)]
pub struct AniNativeFunction<'a> {
    pub name: &'a str,
    pub signature: &'a str,
    pub pointer: *const c_void,
}

/// The subset of `ani_env` the backend calls.
///
/// Fallible calls report an [`AniStatus`] and may leave an unhandled error
/// behind; callers check with [`AniEnv::exist_unhandled_error`].
pub trait AniEnv: Sized {
    type Raw: Copy;
    /// `ani_ref` and its subtypes.
    type Ref: HostRef;
    type MethodId: Copy;
    type Vm: HostVm<Env = Self>;

    /// # Safety
    ///
    /// `raw` must be the environment the VM passed to the current native call.
    unsafe fn from_raw<'a>(raw: Self::Raw) -> &'a Self;

    fn get_vm(&self) -> Option<&'static Self::Vm>;

    fn string_get_utf8_size(&self, string: Self::Ref) -> usize;
    fn string_get_utf16_size(&self, string: Self::Ref) -> usize;
    /// Copy `len` UTF-16 units starting at `start` as UTF-8 into `buf`;
    /// returns the number of bytes written.
    fn string_get_utf8_substr(&self, string: Self::Ref, start: usize, len: usize, buf: &mut [u8]) -> usize;
    /// `utf8` excludes the trailing NUL.
    fn string_new_utf8(&self, utf8: &[u8]) -> Self::Ref;

    fn array_get_length(&self, array: Self::Ref) -> usize;
    fn array_get_region_byte(&self, array: Self::Ref, start: usize, buf: &mut [u8]) -> AniStatus;
    fn array_set_region_byte(&self, array: Self::Ref, start: usize, data: &[u8]) -> AniStatus;
    fn array_get_region_int(&self, array: Self::Ref, start: usize, buf: &mut [i32]) -> AniStatus;
    fn array_set_region_int(&self, array: Self::Ref, start: usize, data: &[i32]) -> AniStatus;
    fn array_get_region_float(&self, array: Self::Ref, start: usize, buf: &mut [f32]) -> AniStatus;
    fn array_set_region_float(&self, array: Self::Ref, start: usize, data: &[f32]) -> AniStatus;
    fn array_new_byte(&self, len: usize) -> Self::Ref;

    fn find_class(&self, descriptor: &str) -> Self::Ref;
    fn global_reference_create(&self, object: Self::Ref) -> Self::Ref;
    fn class_bind_native_methods(&self, class: Self::Ref, methods: &[AniNativeFunction<'_>]) -> AniStatus;
    fn class_find_static_method(&self, class: Self::Ref, name: &str, signature: &str) -> Option<Self::MethodId>;
    fn class_call_static_method_int(&self, class: Self::Ref, method: Self::MethodId, args: &[AniValue<Self::Ref>]) -> i32;

    fn object_instance_of(&self, object: Self::Ref, class: Self::Ref) -> bool;
    fn class_find_method(&self, class: Self::Ref, name: &str, signature: &str) -> Option<Self::MethodId>;
    fn object_call_method_double(&self, object: Self::Ref, method: Self::MethodId) -> f64;
    fn object_call_method_int(&self, object: Self::Ref, method: Self::MethodId) -> i32;

    fn exist_unhandled_error(&self) -> bool;
    fn reset_error(&self);
    fn error_message(&self) -> Option<String> {
        None
    }
    fn throw_error(&self, message: &str) -> AniStatus;
}

/// Status code returned by ANI calls; zero is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AniStatus(pub i32);

impl AniStatus {
    pub const OK: AniStatus = AniStatus(0);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

#[cfg(test)]
mod tests {
    use hostbridge_core::types::*;
    use hostbridge_core::{FromHost, Length, LengthKind};
    use hostbridge_registry::{BindError, ExportsBuilder, LoadError, LoaderConfig, NativeKind};

    use super::*;
    use crate::sim::{SimObject, SimRef, SimVm};

    fn double_all(values: KFloatArray) {
        for value in unsafe { values.as_mut_slice() } {
            *value *= 2.0;
        }
    }

    fn byte_len(text: KStringPtr) -> KInt {
        text.len() as KInt
    }

    fn shout(text: KStringPtr) -> KStringPtr {
        text.to_string_lossy().to_uppercase().into()
    }

    fn halve(value: KDouble) -> KDouble {
        value / 2.0
    }

    fn report(ctx: KVMContext, code: KInt) {
        unsafe { throw_error::<SimVm>(ctx, &format!("code {code}")) }
    }

    crate::ani_exports! {
        env: SimVm,
        module: AniUnit,
        registrar: register_unit,
        exports: {
            fn DoubleAll(values: KFloatArray) = double_all;
            fn ByteLen(text: KStringPtr) -> KInt = byte_len;
            fn Shout(text: KStringPtr) -> KStringPtr = shout;
            ctx fn Report(code: KInt) = report;
            direct fn Halve(value: KDouble) -> KDouble = halve;
        }
    }

    fn interop_vm() -> SimVm {
        let vm = SimVm::new();
        let interop = vm.define_class("@hostbridge/interop/InteropNativeModule/InteropNativeModule");
        vm.define_static(interop, "callCallbackFromNative", "I[BI:I", |vm, args| {
            vm.arg_bytes(&args[1]).map_or(-1, |bytes| bytes.len() as i32)
        });
        vm
    }

    #[test]
    fn arrays_are_copied_out_and_written_back() {
        let vm = SimVm::new();
        let values = vm.new_floats(&[1.0, 2.5]);
        ani_AniUnit_DoubleAll(vm.as_raw(), SimRef::NULL, values);
        assert_eq!(vm.floats(values).unwrap(), vec![2.0, 5.0]);
        let counters = vm.counters();
        assert_eq!(counters.region_reads, 1);
        assert_eq!(counters.region_writes, 1);
        assert_eq!(counters.pins, 0);
    }

    #[test]
    fn null_arrays_are_not_written_back() {
        let vm = SimVm::new();
        ani_AniUnit_DoubleAll(vm.as_raw(), SimRef::NULL, SimRef::NULL);
        assert_eq!(vm.counters().region_reads, 0);
        assert_eq!(vm.counters().region_writes, 0);
    }

    #[test]
    fn strings_use_utf8_sizes() {
        let vm = SimVm::new();
        assert_eq!(ani_AniUnit_ByteLen(vm.as_raw(), SimRef::NULL, vm.new_string("héllo")), 6);
        let loud = ani_AniUnit_Shout(vm.as_raw(), SimRef::NULL, vm.new_string("quiet"));
        assert_eq!(vm.string(loud).as_deref(), Some("QUIET"));
    }

    #[test]
    fn resource_lengths_carry_their_id() {
        let vm = SimVm::new();
        let (length, ()) = <Length as FromHost<Ani<SimVm>>>::convert_from(&vm, vm.alloc(SimObject::Resource(11)));
        assert_eq!(length.kind, LengthKind::Resource);
        assert_eq!(length.resource, 11);
    }

    #[test]
    fn classes_are_found_by_descriptor() {
        let vm = interop_vm();
        vm.define_class("test/AniUnit");
        let mut builder = ExportsBuilder::new();
        builder.register(register_unit);
        builder.set_classpath("AniUnit", "test/AniUnit").unwrap();

        let loaded = load(&vm, builder.build(), &LoaderConfig::default()).unwrap();
        assert_eq!(loaded.report.bound_count(), 4);
        assert_eq!(vm.native("_DoubleAll").unwrap().class, "test/AniUnit");
        assert_eq!(vm.native("_Report").unwrap().signature, "I:V");

        let delivered = loaded.dispatcher().call_sync(AniHost::new(&vm), 3, &[0; 5]).unwrap();
        assert_eq!(delivered, 5);
    }

    #[test]
    fn direct_exports_are_not_bound_as_plain_natives() {
        let vm = interop_vm();
        vm.define_class("test/AniUnit");
        let mut builder = ExportsBuilder::new();
        builder.register(register_unit);
        builder.set_classpath("AniUnit", "test/AniUnit").unwrap();

        let loaded = load(&vm, builder.build(), &LoaderConfig::default()).unwrap();
        let module = loaded.report.module("AniUnit").unwrap();
        assert_eq!(
            module.failed,
            vec![(
                "_Halve".to_string(),
                BindError::UnsupportedKind {
                    name: "_Halve".into(),
                    kind: NativeKind::Critical,
                }
            )]
        );
        assert!(vm.native("_Halve").is_none());
        assert!(!vm.exist_unhandled_error());
        assert_eq!(ani_AniUnit_Halve(3.0), 1.5);
    }

    #[test]
    fn context_exports_raise_errors() {
        let vm = SimVm::new();
        ani_AniUnit_Report(vm.as_raw(), SimRef::NULL, 4);
        assert!(vm.exist_unhandled_error());
        assert_eq!(AniEnv::error_message(&vm).as_deref(), Some("code 4"));
    }

    #[test]
    fn missing_dispatcher_is_fatal() {
        let vm = SimVm::new();
        vm.define_class("@hostbridge/interop/InteropNativeModule/InteropNativeModule");
        let error = load(&vm, ExportsBuilder::new().build(), &LoaderConfig::default()).unwrap_err();
        assert!(matches!(error, LoadError::DispatcherUnresolved { .. }));
    }
}
