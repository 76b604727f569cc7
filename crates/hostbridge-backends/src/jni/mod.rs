//! JNI backend: a JVM, bound through `RegisterNatives` from `JNI_OnLoad`.
//!
//! Strings are copied out as modified UTF-8; primitive arrays and byte
//! buffers are pinned with `GetPrimitiveArrayCritical` for the duration of a
//! call and released with mode 0 (copy back and free).

mod convert;
mod loader;
mod macros;

use std::ffi::c_void;
use std::marker::PhantomData;

use hostbridge_core::{Backend, HostRef};

pub use loader::{JNI_ERR, JNI_VERSION_1_8, JniHost, JniVm, load, on_load, throw_error};

/// Marker for the JNI backend over environment `E`.
pub struct Jni<E>(PhantomData<fn() -> E>);

impl<E: JniEnv> Backend for Jni<E> {
    type Env = E;
    const NAME: &'static str = "jni";
}

/// Release mode: copy back and free the pinned elements.
pub const RELEASE_COMMIT_AND_FREE: i32 = 0;

/// Argument of a static method call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JValue<R> {
    Int(i32),
    Long(i64),
    Double(f64),
    Object(R),
}

/// One entry of a `RegisterNatives` call.
#[derive(Debug, Clone, Copy)]
pub struct JniNativeMethod<'a> {
    pub name: &'a str,
    pub signature: &'a str,
    pub fn_ptr: *const c_void,
}

/// The subset of `JNIEnv` the backend calls.
///
/// Method names mirror the JNI function table. Calls that can throw leave the
/// exception pending; callers check with [`JniEnv::exception_check`].
pub trait JniEnv: Sized {
    /// What the VM passes as the first native argument.
    type Raw: Copy;
    /// `jobject` and its subtypes.
    type Ref: HostRef;
    /// `jmethodID`.
    type MethodId: Copy;

    /// # Safety
    ///
    /// `raw` must be the environment the VM passed to the current native call.
    unsafe fn from_raw<'a>(raw: Self::Raw) -> &'a Self;

    fn get_string_utf_length(&self, string: Self::Ref) -> i32;
    fn get_string_length(&self, string: Self::Ref) -> i32;
    fn get_string_utf_region(&self, string: Self::Ref, start: i32, len: i32, buf: &mut [u8]);
    /// `utf` includes the trailing NUL.
    fn new_string_utf(&self, utf: &[u8]) -> Self::Ref;

    fn get_array_length(&self, array: Self::Ref) -> i32;
    fn get_primitive_array_critical(&self, array: Self::Ref) -> *mut c_void;
    fn release_primitive_array_critical(&self, array: Self::Ref, data: *mut c_void, mode: i32);
    fn new_byte_array(&self, len: i32) -> Self::Ref;
    fn set_byte_array_region(&self, array: Self::Ref, start: i32, bytes: &[u8]);

    fn find_class(&self, name: &str) -> Self::Ref;
    fn new_global_ref(&self, object: Self::Ref) -> Self::Ref;
    fn register_natives(&self, class: Self::Ref, methods: &[JniNativeMethod<'_>]) -> i32;
    fn get_static_method_id(&self, class: Self::Ref, name: &str, signature: &str) -> Option<Self::MethodId>;
    fn call_static_int_method(&self, class: Self::Ref, method: Self::MethodId, args: &[JValue<Self::Ref>]) -> i32;

    fn exception_check(&self) -> bool;
    fn exception_clear(&self);
    /// Description of the pending exception, if the VM can provide one.
    fn exception_message(&self) -> Option<String> {
        None
    }
    fn throw_new(&self, class: Self::Ref, message: &str) -> i32;
}
