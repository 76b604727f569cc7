use std::ffi::c_void;

use crate::jni::{JValue, JniEnv, JniNativeMethod};

use super::{SimArg, SimMethod, SimObject, SimRef, SimVm};

impl From<JValue<SimRef>> for SimArg {
    fn from(value: JValue<SimRef>) -> Self {
        match value {
            JValue::Int(value) => SimArg::Int(value),
            JValue::Long(value) => SimArg::Long(value),
            JValue::Double(value) => SimArg::Double(value),
            JValue::Object(value) => SimArg::Ref(value),
        }
    }
}

impl JniEnv for SimVm {
    type Raw = *const SimVm;
    type Ref = SimRef;
    type MethodId = SimMethod;

    unsafe fn from_raw<'a>(raw: *const SimVm) -> &'a SimVm {
        // SAFETY: shells receive the pointer the test passed in.
        unsafe { &*raw }
    }

    fn get_string_utf_length(&self, string: SimRef) -> i32 {
        self.utf8_len(string) as i32
    }

    fn get_string_length(&self, string: SimRef) -> i32 {
        self.utf16_len(string) as i32
    }

    fn get_string_utf_region(&self, string: SimRef, start: i32, len: i32, buf: &mut [u8]) {
        self.utf8_region(string, start.max(0) as usize, len.max(0) as usize, buf);
    }

    fn new_string_utf(&self, utf: &[u8]) -> SimRef {
        let utf = utf.strip_suffix(&[0]).unwrap_or(utf);
        self.new_string(&String::from_utf8_lossy(utf))
    }

    fn get_array_length(&self, array: SimRef) -> i32 {
        self.array_len(array) as i32
    }

    fn get_primitive_array_critical(&self, array: SimRef) -> *mut c_void {
        self.pin(array)
    }

    fn release_primitive_array_critical(&self, _array: SimRef, _data: *mut c_void, _mode: i32) {
        self.unpin();
    }

    fn new_byte_array(&self, len: i32) -> SimRef {
        self.alloc(SimObject::ByteArray(vec![0; len.max(0) as usize]))
    }

    fn set_byte_array_region(&self, array: SimRef, start: i32, bytes: &[u8]) {
        let start = start.max(0) as usize;
        self.with_object(array, |object| {
            if let SimObject::ByteArray(values) = object {
                if let Some(target) = values.get_mut(start..start + bytes.len()) {
                    target.copy_from_slice(bytes);
                }
            }
        });
    }

    fn find_class(&self, name: &str) -> SimRef {
        self.find_class_or_raise(name)
    }

    fn new_global_ref(&self, object: SimRef) -> SimRef {
        self.global_ref(object)
    }

    fn register_natives(&self, class: SimRef, methods: &[JniNativeMethod<'_>]) -> i32 {
        for method in methods {
            if !self.bind(class, method.name, method.signature, method.fn_ptr) {
                return -1;
            }
        }
        0
    }

    fn get_static_method_id(&self, class: SimRef, name: &str, signature: &str) -> Option<SimMethod> {
        let method = self.find_static(class, name, signature);
        if method.is_none() {
            self.raise(&format!("NoSuchMethodError: {name}{signature}"));
        }
        method
    }

    fn call_static_int_method(&self, _class: SimRef, method: SimMethod, args: &[JValue<SimRef>]) -> i32 {
        let args: Vec<SimArg> = args.iter().copied().map(SimArg::from).collect();
        self.call_static(method, &args)
    }

    fn exception_check(&self) -> bool {
        self.has_pending()
    }

    fn exception_clear(&self) {
        self.clear_pending();
    }

    fn exception_message(&self) -> Option<String> {
        self.pending_message()
    }

    fn throw_new(&self, _class: SimRef, message: &str) -> i32 {
        self.raise(message);
        0
    }
}

