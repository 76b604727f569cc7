use crate::ani::{AniEnv, AniNativeFunction, AniStatus, AniValue};

use super::{INSTANCE_METHOD, SimArg, SimMethod, SimObject, SimRef, SimVm};

const INVALID_ARGS: AniStatus = AniStatus(3);

impl From<AniValue<SimRef>> for SimArg {
    fn from(value: AniValue<SimRef>) -> Self {
        match value {
            AniValue::Int(value) => SimArg::Int(value),
            AniValue::Long(value) => SimArg::Long(value),
            AniValue::Double(value) => SimArg::Double(value),
            AniValue::Ref(value) => SimArg::Ref(value),
        }
    }
}

macro_rules! regions {
    ($($get:ident, $set:ident => $variant:ident($elem:ty);)*) => {
        $(
            fn $get(&self, array: SimRef, start: usize, buf: &mut [$elem]) -> AniStatus {
                let copied = self.with_object(array, |object| match object {
                    SimObject::$variant(values) => match values.get(start..start + buf.len()) {
                        Some(source) => {
                            buf.copy_from_slice(source);
                            true
                        }
                        None => false,
                    },
                    _ => false,
                });
                if copied != Some(true) {
                    return INVALID_ARGS;
                }
                self.state().counters.region_reads += 1;
                AniStatus::OK
            }

            fn $set(&self, array: SimRef, start: usize, data: &[$elem]) -> AniStatus {
                let copied = self.with_object(array, |object| match object {
                    SimObject::$variant(values) => match values.get_mut(start..start + data.len()) {
                        Some(target) => {
                            target.copy_from_slice(data);
                            true
                        }
                        None => false,
                    },
                    _ => false,
                });
                if copied != Some(true) {
                    return INVALID_ARGS;
                }
                self.state().counters.region_writes += 1;
                AniStatus::OK
            }
        )*
    };
}

impl AniEnv for SimVm {
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

    fn string_get_utf8_size(&self, string: SimRef) -> usize {
        self.utf8_len(string)
    }

    fn string_get_utf16_size(&self, string: SimRef) -> usize {
        self.utf16_len(string)
    }

    fn string_get_utf8_substr(&self, string: SimRef, start: usize, len: usize, buf: &mut [u8]) -> usize {
        self.utf8_region(string, start, len, buf)
    }

    fn string_new_utf8(&self, utf8: &[u8]) -> SimRef {
        self.new_string(&String::from_utf8_lossy(utf8))
    }

    fn array_get_length(&self, array: SimRef) -> usize {
        self.array_len(array)
    }

    regions! {
        array_get_region_byte, array_set_region_byte => ByteArray(u8);
        array_get_region_int, array_set_region_int => IntArray(i32);
        array_get_region_float, array_set_region_float => FloatArray(f32);
    }

    fn array_new_byte(&self, len: usize) -> SimRef {
        self.alloc(SimObject::ByteArray(vec![0; len]))
    }

    fn find_class(&self, descriptor: &str) -> SimRef {
        self.find_class_or_raise(descriptor)
    }

    fn global_reference_create(&self, object: SimRef) -> SimRef {
        self.global_ref(object)
    }

    fn class_bind_native_methods(&self, class: SimRef, methods: &[AniNativeFunction<'_>]) -> AniStatus {
        for method in methods {
            if !self.bind(class, method.name, method.signature, method.pointer) {
                return INVALID_ARGS;
            }
        }
        AniStatus::OK
    }

    fn class_find_static_method(&self, class: SimRef, name: &str, signature: &str) -> Option<SimMethod> {
        self.find_static(class, name, signature)
    }

    fn class_call_static_method_int(&self, _class: SimRef, method: SimMethod, args: &[AniValue<SimRef>]) -> i32 {
        let args: Vec<SimArg> = args.iter().copied().map(SimArg::from).collect();
        self.call_static(method, &args)
    }

    fn object_instance_of(&self, object: SimRef, class: SimRef) -> bool {
        self.instance_of(object, class)
    }

    fn class_find_method(&self, _class: SimRef, _name: &str, _signature: &str) -> Option<SimMethod> {
        Some(INSTANCE_METHOD)
    }

    fn object_call_method_double(&self, object: SimRef, _method: SimMethod) -> f64 {
        self.number(object).unwrap_or_default()
    }

    fn object_call_method_int(&self, object: SimRef, _method: SimMethod) -> i32 {
        self.number(object).unwrap_or_default() as i32
    }

    fn exist_unhandled_error(&self) -> bool {
        self.has_pending()
    }

    fn reset_error(&self) {
        self.clear_pending();
    }

    fn error_message(&self) -> Option<String> {
        self.pending_message()
    }

    fn throw_error(&self, message: &str) -> AniStatus {
        self.raise(message);
        AniStatus::OK
    }
}
