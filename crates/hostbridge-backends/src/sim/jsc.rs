use hostbridge_core::{HostRef, PendingException};
use hostbridge_registry::NativeEntry;

use crate::jsc::JscContext;

use super::{SimArg, SimObject, SimRef, SimVm};

/// Shape of the shells emitted by `jsc_exports!` over [`SimVm`].
pub type SimJscFunction =
    extern "C" fn(*const SimVm, SimRef, SimRef, usize, *const SimRef, *mut SimRef) -> SimRef;

impl SimVm {
    /// Call an installed global native the way the engine would.
    ///
    /// `Err` carries the thrown value.
    pub fn call_global(&self, name: &str, args: &[SimRef]) -> Result<SimRef, SimRef> {
        let entry = self
            .state()
            .natives
            .iter()
            .find(|native| native.class.is_empty() && native.name == name)
            .map(|native| native.entry());
        let Some(entry) = entry else {
            return Err(self.alloc(SimObject::Error(format!("{name} is not a function"))));
        };
        // SAFETY: only `jsc_exports!` shells over `SimVm` are installed as globals.
        let function: SimJscFunction = unsafe { std::mem::transmute(entry) };
        let mut exception = SimRef::NULL;
        let result = function(self, SimRef::NULL, SimRef::NULL, args.len(), args.as_ptr(), &mut exception);
        if exception.is_null() { Ok(result) } else { Err(exception) }
    }

    /// Message of a thrown `Error` value.
    pub fn error_text(&self, value: SimRef) -> Option<String> {
        match self.object(value)? {
            SimObject::Error(message) => Some(message),
            _ => None,
        }
    }
}

fn typed_bytes(object: &SimObject) -> Option<Vec<u8>> {
    match object {
        SimObject::ByteArray(values) => Some(values.clone()),
        SimObject::IntArray(values) => Some(values.iter().flat_map(|value| value.to_ne_bytes()).collect()),
        SimObject::FloatArray(values) => Some(values.iter().flat_map(|value| value.to_ne_bytes()).collect()),
        _ => None,
    }
}

fn store_typed_bytes(object: &mut SimObject, bytes: &[u8]) -> bool {
    match object {
        SimObject::ByteArray(values) if values.len() == bytes.len() => {
            values.copy_from_slice(bytes);
            true
        }
        SimObject::IntArray(values) if values.len() * 4 == bytes.len() => {
            for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(4)) {
                *value = i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
            true
        }
        SimObject::FloatArray(values) if values.len() * 4 == bytes.len() => {
            for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(4)) {
                *value = f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
            true
        }
        _ => false,
    }
}

impl JscContext for SimVm {
    type Raw = *const SimVm;
    type Value = SimRef;
    type Vm = SimVm;

    unsafe fn from_raw<'a>(raw: *const SimVm) -> &'a SimVm {
        // SAFETY: shells receive the pointer the engine passed in.
        unsafe { &*raw }
    }

    fn get_vm(&self) -> Option<&'static SimVm> {
        self.static_self()
    }

    fn undefined(&self) -> SimRef {
        SimRef::NULL
    }

    fn is_nullish(&self, value: SimRef) -> bool {
        matches!(self.object(value), None | Some(SimObject::Null))
    }

    fn to_boolean(&self, value: SimRef) -> bool {
        match self.object(value) {
            Some(SimObject::Bool(value)) => value,
            Some(SimObject::Number(value)) => value != 0.0 && !value.is_nan(),
            Some(SimObject::String(text)) => !text.is_empty(),
            Some(SimObject::Null) | None => false,
            Some(_) => true,
        }
    }

    fn make_boolean(&self, value: bool) -> SimRef {
        self.alloc(SimObject::Bool(value))
    }

    fn to_number(&self, value: SimRef) -> f64 {
        match self.object(value) {
            Some(SimObject::String(text)) => text.trim().parse().unwrap_or(f64::NAN),
            _ => self.number(value).unwrap_or(f64::NAN),
        }
    }

    fn make_number(&self, value: f64) -> SimRef {
        self.new_number(value)
    }

    fn to_utf8(&self, value: SimRef) -> Vec<u8> {
        match self.object(value) {
            Some(SimObject::String(text)) => text.into_bytes(),
            Some(SimObject::Number(value)) => value.to_string().into_bytes(),
            Some(SimObject::BigInt(text)) => text.into_bytes(),
            Some(SimObject::Bool(value)) => value.to_string().into_bytes(),
            _ => Vec::new(),
        }
    }

    fn make_string(&self, utf8: &[u8]) -> SimRef {
        self.new_string(&String::from_utf8_lossy(utf8))
    }

    fn to_decimal(&self, value: SimRef) -> String {
        match self.object(value) {
            Some(SimObject::BigInt(text)) => text,
            Some(SimObject::Number(value)) => format!("{value:.0}"),
            _ => String::new(),
        }
    }

    fn make_bigint(&self, decimal: &str) -> SimRef {
        self.new_bigint(decimal)
    }

    fn typed_array_bytes(&self, value: SimRef) -> Option<Vec<u8>> {
        let bytes = self.with_object(value, |object| typed_bytes(object)).flatten();
        if bytes.is_some() {
            self.state().counters.typed_reads += 1;
        }
        bytes
    }

    fn set_typed_array_bytes(&self, value: SimRef, bytes: &[u8]) -> bool {
        let stored = self
            .with_object(value, |object| store_typed_bytes(object, bytes))
            .unwrap_or(false);
        if stored {
            self.state().counters.typed_writes += 1;
        }
        stored
    }

    fn make_uint8_array(&self, bytes: &[u8]) -> SimRef {
        self.new_bytes(bytes)
    }

    fn global_property(&self, name: &str) -> SimRef {
        self.global(name)
    }

    fn set_global_function(&self, name: &str, entry: NativeEntry) -> bool {
        self.bind(SimRef::NULL, name, "", entry.as_ptr())
    }

    fn call_function(&self, function: SimRef, args: &[SimRef]) -> Result<SimRef, PendingException> {
        let Some(SimObject::Function(method)) = self.object(function) else {
            return Err(PendingException::with_message("not a function"));
        };
        let args: Vec<SimArg> = args.iter().copied().map(SimArg::Ref).collect();
        let result = self.call_static(method, &args);
        if self.has_pending() {
            let message = self.pending_message();
            self.clear_pending();
            return Err(PendingException { message });
        }
        Ok(self.new_number(f64::from(result)))
    }

    fn throw_error(&self, message: &str) {
        let error = self.alloc(SimObject::Error(message.to_string()));
        self.state().exception = Some(error);
    }

    fn take_exception(&self) -> Option<SimRef> {
        self.state().exception.take()
    }
}
