use crate::ets::{EtsEnv, EtsNativeMethod, EtsValue};

use super::{INSTANCE_METHOD, SimArg, SimMethod, SimObject, SimRef, SimVm};

impl From<EtsValue<SimRef>> for SimArg {
    fn from(value: EtsValue<SimRef>) -> Self {
        match value {
            EtsValue::Int(value) => SimArg::Int(value),
            EtsValue::Long(value) => SimArg::Long(value),
            EtsValue::Double(value) => SimArg::Double(value),
            EtsValue::Object(value) => SimArg::Ref(value),
        }
    }
}

impl EtsEnv for SimVm {
    type Raw = *const SimVm;
    type Ref = SimRef;
    type MethodId = SimMethod;
    type Vm = SimVm;

    unsafe fn from_raw<'a>(raw: *const SimVm) -> &'a SimVm {
        // SAFETY: shells receive the pointer the test passed in.
        unsafe { &*raw }
    }

    fn get_vm(&self) -> Option<&'static SimVm> {
        self.static_self()
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

    fn pin_byte_array(&self, array: SimRef) -> *mut u8 {
        match self.object(array) {
            Some(SimObject::ByteArray(_)) => self.pin(array).cast(),
            _ => std::ptr::null_mut(),
        }
    }

    fn unpin_byte_array(&self, _array: SimRef) {
        self.unpin();
    }

    fn pin_int_array(&self, array: SimRef) -> *mut i32 {
        match self.object(array) {
            Some(SimObject::IntArray(_)) => self.pin(array).cast(),
            _ => std::ptr::null_mut(),
        }
    }

    fn unpin_int_array(&self, _array: SimRef) {
        self.unpin();
    }

    fn pin_float_array(&self, array: SimRef) -> *mut f32 {
        match self.object(array) {
            Some(SimObject::FloatArray(_)) => self.pin(array).cast(),
            _ => std::ptr::null_mut(),
        }
    }

    fn unpin_float_array(&self, _array: SimRef) {
        self.unpin();
    }

    fn new_byte_array(&self, len: i32) -> SimRef {
        self.alloc(SimObject::ByteArray(vec![0; len.max(0) as usize]))
    }

    fn find_class(&self, name: &str) -> SimRef {
        self.find_class_or_raise(name)
    }

    fn new_global_ref(&self, object: SimRef) -> SimRef {
        self.global_ref(object)
    }

    fn register_natives(&self, class: SimRef, methods: &[EtsNativeMethod<'_>]) -> i32 {
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
            self.raise(&format!("NoSuchMethodError: {name}:{signature}"));
        }
        method
    }

    fn call_static_int_method(&self, _class: SimRef, method: SimMethod, args: &[EtsValue<SimRef>]) -> i32 {
        let args: Vec<SimArg> = args.iter().copied().map(SimArg::from).collect();
        self.call_static(method, &args)
    }

    fn is_instance_of(&self, object: SimRef, class: SimRef) -> bool {
        self.instance_of(object, class)
    }

    fn get_method_id(&self, _class: SimRef, _name: &str, _signature: &str) -> Option<SimMethod> {
        Some(INSTANCE_METHOD)
    }

    fn call_double_method(&self, object: SimRef, _method: SimMethod) -> f64 {
        self.number(object).unwrap_or_default()
    }

    fn call_int_method(&self, object: SimRef, _method: SimMethod) -> i32 {
        self.number(object).unwrap_or_default() as i32
    }

    fn error_check(&self) -> bool {
        self.has_pending()
    }

    fn error_clear(&self) {
        self.clear_pending();
    }

    fn error_message(&self) -> Option<String> {
        self.pending_message()
    }

    fn throw_error_new(&self, _class: SimRef, message: &str) -> i32 {
        self.raise(message);
        0
    }
}
