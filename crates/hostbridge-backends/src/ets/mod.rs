//! ETS backend: an ArkTS static VM, bound through `RegisterNatives` on the
//! ETS native interface.
//!
//! Primitive arrays and byte buffers are pinned for the duration of a call.
//! Natives are registered as fast unless they take the VM context; direct
//! natives are registered as critical. The host reads the flavour from a
//! prefix on the method name.

mod convert;
mod loader;
mod macros;

use std::ffi::c_void;
use std::marker::PhantomData;

use hostbridge_core::{Backend, HostRef};

use crate::HostVm;

pub use loader::{ETS_ERR, ETS_NAPI_VERSION, EtsHost, EtsVm, load, on_load, throw_error};

/// Marker for the ETS backend over environment `E`.
pub struct Ets<E>(PhantomData<fn() -> E>);

impl<E: EtsEnv> Backend for Ets<E> {
    type Env = E;
    const NAME: &'static str = "ets";
}

/// Name prefix of natives registered as fast.
pub const FAST_NATIVE_PREFIX: &str = "#F$";
/// Name prefix of natives registered as critical.
pub const CRITICAL_NATIVE_PREFIX: &str = "#C$";

/// Boxed number and resource classes consulted when classifying a `KLength`.
pub const DOUBLE_CLASS: &str = "std/core/Double";
pub const INT_CLASS: &str = "std/core/Int";
pub const STRING_CLASS: &str = "std/core/String";
pub const RESOURCE_CLASS: &str = "@hostbridge/arkui/Resource/Resource";

/// Argument of a static method call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EtsValue<R> {
    Int(i32),
    Long(i64),
    Double(f64),
    Object(R),
}

/// One entry of a `RegisterNatives` call.
#[derive(Debug, Clone, Copy)]
pub struct EtsNativeMethod<'a> {
    pub name: &'a str,
    pub signature: &'a str,
    pub fn_ptr: *const c_void,
}

/// The subset of `EtsEnv` the backend calls.
///
/// Calls that can throw leave an error pending; callers check with
/// [`EtsEnv::error_check`].
pub trait EtsEnv: Sized {
    type Raw: Copy;
    /// `ets_object` and its subtypes.
    type Ref: HostRef;
    type MethodId: Copy;
    /// The VM owning this environment.
    type Vm: HostVm<Env = Self>;

    /// # Safety
    ///
    /// `raw` must be the environment the VM passed to the current native call.
    unsafe fn from_raw<'a>(raw: Self::Raw) -> &'a Self;

    fn get_vm(&self) -> Option<&'static Self::Vm>;

    fn get_string_utf_length(&self, string: Self::Ref) -> i32;
    fn get_string_length(&self, string: Self::Ref) -> i32;
    fn get_string_utf_region(&self, string: Self::Ref, start: i32, len: i32, buf: &mut [u8]);
    /// `utf` includes the trailing NUL.
    fn new_string_utf(&self, utf: &[u8]) -> Self::Ref;

    fn get_array_length(&self, array: Self::Ref) -> i32;
    fn pin_byte_array(&self, array: Self::Ref) -> *mut u8;
    fn unpin_byte_array(&self, array: Self::Ref);
    fn pin_int_array(&self, array: Self::Ref) -> *mut i32;
    fn unpin_int_array(&self, array: Self::Ref);
    fn pin_float_array(&self, array: Self::Ref) -> *mut f32;
    fn unpin_float_array(&self, array: Self::Ref);
    fn new_byte_array(&self, len: i32) -> Self::Ref;

    fn find_class(&self, name: &str) -> Self::Ref;
    fn new_global_ref(&self, object: Self::Ref) -> Self::Ref;
    fn register_natives(&self, class: Self::Ref, methods: &[EtsNativeMethod<'_>]) -> i32;
    fn get_static_method_id(&self, class: Self::Ref, name: &str, signature: &str) -> Option<Self::MethodId>;
    fn call_static_int_method(&self, class: Self::Ref, method: Self::MethodId, args: &[EtsValue<Self::Ref>]) -> i32;

    fn is_instance_of(&self, object: Self::Ref, class: Self::Ref) -> bool;
    fn get_method_id(&self, class: Self::Ref, name: &str, signature: &str) -> Option<Self::MethodId>;
    fn call_double_method(&self, object: Self::Ref, method: Self::MethodId) -> f64;
    fn call_int_method(&self, object: Self::Ref, method: Self::MethodId) -> i32;

    fn error_check(&self) -> bool;
    fn error_clear(&self);
    fn error_message(&self) -> Option<String> {
        None
    }
    fn throw_error_new(&self, class: Self::Ref, message: &str) -> i32;
}
