//! An in-process VM implementing every host interface.
//!
//! [`SimVm`] keeps an object heap behind a mutex and hands out [`SimRef`]
//! handles. It understands enough of each runtime for the loaders and
//! converters to run end to end: classes with static methods, native
//! registration, strings, primitive arrays, boxed numbers, JS values and
//! pending exceptions. Counters record every pin, region copy and typed array
//! copy so tests can check release discipline.
//!
//! Static method handlers run with the heap unlocked and may call back into
//! the VM, including native shells.

#[cfg(feature = "ani")]
mod ani;
#[cfg(feature = "ets")]
mod ets;
#[cfg(feature = "jni")]
mod jni;
#[cfg(feature = "jsc")]
mod jsc;

use std::ffi::c_void;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use hostbridge_core::HostRef;
use rustc_hash::FxHashMap;

use crate::HostVm;

#[cfg(feature = "jsc")]
pub use jsc::SimJscFunction;

/// Handle to an object on the simulated heap; `0` is null (or `undefined`).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SimRef(pub u32);

impl SimRef {
    pub const NULL: SimRef = SimRef(0);
}

impl HostRef for SimRef {
    fn null() -> Self {
        SimRef::NULL
    }

    fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Identifier of a static or instance method.
pub type SimMethod = u32;

/// Argument of a simulated static call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimArg {
    Int(i32),
    Long(i64),
    Double(f64),
    Ref(SimRef),
}

/// Body of a static method or JS function.
pub type SimHandler = Arc<dyn Fn(&SimVm, &[SimArg]) -> i32 + Send + Sync>;

/// Heap objects.
#[derive(Debug, Clone, PartialEq)]
pub enum SimObject {
    Null,
    Bool(bool),
    Number(f64),
    /// Decimal text.
    BigInt(String),
    String(String),
    ByteArray(Vec<u8>),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    BoxedDouble(f64),
    BoxedInt(i32),
    Resource(i32),
    Class(String),
    Function(SimMethod),
    Error(String),
}

/// A native registered by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundNative {
    /// Class the native was bound to; empty for JS globals.
    pub class: String,
    pub name: String,
    pub signature: String,
    entry: usize,
}

impl BoundNative {
    pub fn entry(&self) -> *const c_void {
        self.entry as *const c_void
    }
}

/// Acquire and release counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimCounters {
    /// JNI critical gets and ETS pins.
    pub pins: usize,
    pub unpins: usize,
    /// ANI region copies.
    pub region_reads: usize,
    pub region_writes: usize,
    /// JSC typed array copies.
    pub typed_reads: usize,
    pub typed_writes: usize,
    pub global_refs: usize,
}

#[derive(Default)]
struct SimState {
    objects: Vec<SimObject>,
    classes: FxHashMap<String, SimRef>,
    static_methods: FxHashMap<(SimRef, String, String), SimMethod>,
    handlers: Vec<SimHandler>,
    natives: Vec<BoundNative>,
    rejected: Vec<String>,
    globals: FxHashMap<String, SimRef>,
    pending: Option<String>,
    exception: Option<SimRef>,
    counters: SimCounters,
}

/// Classes every simulated VM starts with.
const BUILTIN_CLASSES: &[&str] = &[
    "java/lang/RuntimeException",
    "std/core/Error",
    "std/core/Double",
    "std/core/Int",
    "std/core/String",
    "@hostbridge/arkui/Resource/Resource",
];

/// Method id answered for every instance method lookup.
const INSTANCE_METHOD: SimMethod = u32::MAX;

/// The simulated VM.
pub struct SimVm {
    state: Mutex<SimState>,
    this: OnceLock<&'static SimVm>,
}

impl Default for SimVm {
    fn default() -> Self {
        Self::new()
    }
}

/// `a/b/C` for both `a/b/C` and `La/b/C;`.
fn normalize(name: &str) -> &str {
    name.strip_prefix('L')
        .and_then(|inner| inner.strip_suffix(';'))
        .unwrap_or(name)
}

impl SimVm {
    pub fn new() -> Self {
        let vm = Self {
            state: Mutex::new(SimState {
                objects: vec![SimObject::Null],
                ..SimState::default()
            }),
            this: OnceLock::new(),
        };
        for class in BUILTIN_CLASSES {
            vm.define_class(class);
        }
        vm
    }

    /// A VM that lives for the rest of the process and can hand out
    /// `&'static` references to itself, as loaders that install the global
    /// callback sink require.
    pub fn leaked() -> &'static SimVm {
        let vm: &'static SimVm = Box::leak(Box::new(SimVm::new()));
        let _ = vm.this.set(vm);
        vm
    }

    pub fn as_raw(&self) -> *const SimVm {
        self
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn static_self(&self) -> Option<&'static SimVm> {
        self.this.get().copied()
    }

    // ------------------------------------------------------------------
    // Heap
    // ------------------------------------------------------------------

    pub fn alloc(&self, object: SimObject) -> SimRef {
        let mut state = self.state();
        state.objects.push(object);
        SimRef((state.objects.len() - 1) as u32)
    }

    pub fn object(&self, handle: SimRef) -> Option<SimObject> {
        if handle.is_null() {
            return None;
        }
        self.state().objects.get(handle.0 as usize).cloned()
    }

    fn with_object<R>(&self, handle: SimRef, f: impl FnOnce(&mut SimObject) -> R) -> Option<R> {
        if handle.is_null() {
            return None;
        }
        self.state().objects.get_mut(handle.0 as usize).map(f)
    }

    pub fn new_string(&self, text: &str) -> SimRef {
        self.alloc(SimObject::String(text.to_string()))
    }

    pub fn new_bytes(&self, bytes: &[u8]) -> SimRef {
        self.alloc(SimObject::ByteArray(bytes.to_vec()))
    }

    pub fn new_ints(&self, values: &[i32]) -> SimRef {
        self.alloc(SimObject::IntArray(values.to_vec()))
    }

    pub fn new_floats(&self, values: &[f32]) -> SimRef {
        self.alloc(SimObject::FloatArray(values.to_vec()))
    }

    pub fn new_number(&self, value: f64) -> SimRef {
        self.alloc(SimObject::Number(value))
    }

    pub fn new_bigint(&self, decimal: &str) -> SimRef {
        self.alloc(SimObject::BigInt(decimal.to_string()))
    }

    pub fn string(&self, handle: SimRef) -> Option<String> {
        match self.object(handle)? {
            SimObject::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn bytes(&self, handle: SimRef) -> Option<Vec<u8>> {
        match self.object(handle)? {
            SimObject::ByteArray(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn ints(&self, handle: SimRef) -> Option<Vec<i32>> {
        match self.object(handle)? {
            SimObject::IntArray(values) => Some(values),
            _ => None,
        }
    }

    pub fn floats(&self, handle: SimRef) -> Option<Vec<f32>> {
        match self.object(handle)? {
            SimObject::FloatArray(values) => Some(values),
            _ => None,
        }
    }

    /// Numeric value of a number-like object.
    pub fn number(&self, handle: SimRef) -> Option<f64> {
        match self.object(handle)? {
            SimObject::Number(value) | SimObject::BoxedDouble(value) => Some(value),
            SimObject::BoxedInt(value) | SimObject::Resource(value) => Some(f64::from(value)),
            SimObject::Bool(value) => Some(f64::from(u8::from(value))),
            SimObject::BigInt(text) => text.parse().ok(),
            _ => None,
        }
    }

    /// Integer view of a call argument.
    pub fn arg_int(&self, arg: &SimArg) -> Option<i32> {
        match *arg {
            SimArg::Int(value) => Some(value),
            SimArg::Long(value) => i32::try_from(value).ok(),
            SimArg::Double(value) => Some(value as i32),
            SimArg::Ref(handle) => self.number(handle).map(|value| value as i32),
        }
    }

    /// Byte array behind a call argument.
    pub fn arg_bytes(&self, arg: &SimArg) -> Option<Vec<u8>> {
        match *arg {
            SimArg::Ref(handle) => self.bytes(handle),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Classes and natives
    // ------------------------------------------------------------------

    /// Define (or look up) a class; ANI-style `L...;` names are accepted.
    pub fn define_class(&self, name: &str) -> SimRef {
        let name = normalize(name);
        if let Some(class) = self.state().classes.get(name).copied() {
            return class;
        }
        let class = self.alloc(SimObject::Class(name.to_string()));
        self.state().classes.insert(name.to_string(), class);
        class
    }

    /// Drop a class, built-in or defined, so later lookups fail.
    pub fn remove_class(&self, name: &str) {
        self.state().classes.remove(normalize(name));
    }

    pub fn class(&self, name: &str) -> Option<SimRef> {
        self.state().classes.get(normalize(name)).copied()
    }

    fn class_name(&self, class: SimRef) -> Option<String> {
        match self.object(class)? {
            SimObject::Class(name) => Some(name),
            _ => None,
        }
    }

    fn add_handler(&self, handler: SimHandler) -> SimMethod {
        let mut state = self.state();
        state.handlers.push(handler);
        (state.handlers.len() - 1) as SimMethod
    }

    /// Define a static int method on `class`.
    pub fn define_static<F>(&self, class: SimRef, name: &str, signature: &str, handler: F) -> SimMethod
    where
        F: Fn(&SimVm, &[SimArg]) -> i32 + Send + Sync + 'static,
    {
        let method = self.add_handler(Arc::new(handler));
        self.state()
            .static_methods
            .insert((class, name.to_string(), signature.to_string()), method);
        method
    }

    fn find_static(&self, class: SimRef, name: &str, signature: &str) -> Option<SimMethod> {
        self.state()
            .static_methods
            .get(&(class, name.to_string(), signature.to_string()))
            .copied()
    }

    fn call_static(&self, method: SimMethod, args: &[SimArg]) -> i32 {
        if method == INSTANCE_METHOD {
            return 0;
        }
        let handler = self.state().handlers.get(method as usize).cloned();
        match handler {
            Some(handler) => handler(self, args),
            None => {
                self.raise(&format!("no method {method}"));
                0
            }
        }
    }

    /// Make registration of natives named `name` fail.
    pub fn reject_native(&self, name: &str) {
        self.state().rejected.push(name.to_string());
    }

    fn bind(&self, class: SimRef, name: &str, signature: &str, entry: *const c_void) -> bool {
        let class = self.class_name(class).unwrap_or_default();
        let mut state = self.state();
        if state.rejected.iter().any(|rejected| name.ends_with(rejected.as_str())) {
            return false;
        }
        state.natives.push(BoundNative {
            class,
            name: name.to_string(),
            signature: signature.to_string(),
            entry: entry as usize,
        });
        true
    }

    pub fn natives(&self) -> Vec<BoundNative> {
        self.state().natives.clone()
    }

    /// The native bound as `name`, if any.
    pub fn native(&self, name: &str) -> Option<BoundNative> {
        self.state().natives.iter().find(|native| native.name == name).cloned()
    }

    fn global_ref(&self, object: SimRef) -> SimRef {
        self.state().counters.global_refs += 1;
        object
    }

    fn instance_of(&self, object: SimRef, class: SimRef) -> bool {
        let (Some(object), Some(class)) = (self.object(object), self.class_name(class)) else {
            return false;
        };
        matches!(
            (class.as_str(), object),
            ("std/core/Double", SimObject::BoxedDouble(_))
                | ("std/core/Int", SimObject::BoxedInt(_))
                | ("std/core/String", SimObject::String(_))
                | ("@hostbridge/arkui/Resource/Resource", SimObject::Resource(_))
        )
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    /// Leave an exception pending, as a throwing host call would.
    pub fn raise(&self, message: &str) {
        self.state().pending = Some(message.to_string());
    }

    pub fn has_pending(&self) -> bool {
        self.state().pending.is_some()
    }

    fn pending_message(&self) -> Option<String> {
        self.state().pending.clone()
    }

    fn clear_pending(&self) {
        self.state().pending = None;
    }

    fn find_class_or_raise(&self, name: &str) -> SimRef {
        match self.class(name) {
            Some(class) => class,
            None => {
                self.raise(&format!("NoClassDefFoundError: {}", normalize(name)));
                SimRef::NULL
            }
        }
    }

    // ------------------------------------------------------------------
    // Strings and arrays
    // ------------------------------------------------------------------

    fn utf8_len(&self, string: SimRef) -> usize {
        self.string(string).map_or(0, |text| text.len())
    }

    fn utf16_len(&self, string: SimRef) -> usize {
        self.string(string).map_or(0, |text| text.encode_utf16().count())
    }

    /// UTF-8 of UTF-16 units `start..start + len`, copied into `buf`.
    fn utf8_region(&self, string: SimRef, start: usize, len: usize, buf: &mut [u8]) -> usize {
        let Some(text) = self.string(string) else {
            return 0;
        };
        let units: Vec<u16> = text.encode_utf16().skip(start).take(len).collect();
        let region = String::from_utf16_lossy(&units);
        let count = region.len().min(buf.len());
        buf[..count].copy_from_slice(&region.as_bytes()[..count]);
        count
    }

    fn array_len(&self, array: SimRef) -> usize {
        match self.object(array) {
            Some(SimObject::ByteArray(values)) => values.len(),
            Some(SimObject::IntArray(values)) => values.len(),
            Some(SimObject::FloatArray(values)) => values.len(),
            _ => 0,
        }
    }

    /// Pointer to an array's storage. The storage does not move while the
    /// array is alive, so the pointer stays valid after the lock is dropped.
    fn pin(&self, array: SimRef) -> *mut c_void {
        let data = self.with_object(array, |object| match object {
            SimObject::ByteArray(values) => values.as_mut_ptr().cast::<c_void>(),
            SimObject::IntArray(values) => values.as_mut_ptr().cast(),
            SimObject::FloatArray(values) => values.as_mut_ptr().cast(),
            _ => std::ptr::null_mut(),
        });
        let data = data.unwrap_or(std::ptr::null_mut());
        if !data.is_null() {
            self.state().counters.pins += 1;
        }
        data
    }

    fn unpin(&self) {
        self.state().counters.unpins += 1;
    }

    pub fn counters(&self) -> SimCounters {
        self.state().counters
    }

    // ------------------------------------------------------------------
    // JS globals
    // ------------------------------------------------------------------

    /// Define a global JS function backed by `handler`.
    pub fn define_function<F>(&self, name: &str, handler: F) -> SimRef
    where
        F: Fn(&SimVm, &[SimArg]) -> i32 + Send + Sync + 'static,
    {
        let method = self.add_handler(Arc::new(handler));
        let function = self.alloc(SimObject::Function(method));
        self.state().globals.insert(name.to_string(), function);
        function
    }

    pub fn global(&self, name: &str) -> SimRef {
        self.state().globals.get(name).copied().unwrap_or(SimRef::NULL)
    }
}

impl HostVm for SimVm {
    type Raw = *const SimVm;
    type Env = SimVm;

    unsafe fn from_raw(raw: *const SimVm) -> &'static SimVm {
        // SAFETY: the caller passes a pointer from `SimVm::leaked`.
        unsafe { &*raw }
    }

    fn get_env(&self) -> Option<&SimVm> {
        Some(self)
    }
}
