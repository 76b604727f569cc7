//! Integration tests for hostbridge across backends.
//!
//! Every test drives the public surface the way an embedder would: declare
//! exports with a backend macro, load them into a simulated VM, then call the
//! bound natives through the entry points the VM recorded.

use std::sync::{Arc, Mutex};

use hostbridge::prelude::*;
use hostbridge::registry::classpath::INTEROP_NATIVE_MODULE;
use hostbridge::registry::{AttachedDispatcher, BindError, LoadError, NativeEntry, NativeKind, RegistrationError};
use hostbridge::{ani, ets, jni};
use hostbridge_backends::sim::{SimRef, SimVm};

// =============================================================================
// Implementations shared by every backend
// =============================================================================

fn answer() -> KInt {
    42
}

fn byte_len(text: KStringPtr) -> KInt {
    text.len() as KInt
}

fn reverse(values: KByteArray) {
    unsafe { values.as_mut_slice() }.reverse();
}

fn same(ptr: KNativePointer) -> KNativePointer {
    ptr
}

fn unbox(ptr: KNativePointer) -> KInt {
    match unsafe { ptr.into_box::<i32>() } {
        Some(value) => *value,
        None => -1,
    }
}

hostbridge::jni_exports! {
    env: SimVm,
    module: Gallery,
    registrar: register_jni_gallery,
    exports: {
        fn Answer() -> KInt = answer;
        fn ByteLen(text: KStringPtr) -> KInt = byte_len;
        fn Reverse(values: KByteArray) = reverse;
        fn Same(ptr: KNativePointer) -> KNativePointer = same;
        direct fn Unbox(ptr: KNativePointer) -> KInt = unbox;
    }
}

hostbridge::ets_exports! {
    env: SimVm,
    module: Gallery,
    registrar: register_ets_gallery,
    exports: {
        fn Answer() -> KInt = answer;
        fn ByteLen(text: KStringPtr) -> KInt = byte_len;
        fn Reverse(values: KByteArray) = reverse;
    }
}

hostbridge::ani_exports! {
    env: SimVm,
    module: Gallery,
    registrar: register_ani_gallery,
    exports: {
        fn Answer() -> KInt = answer;
        fn ByteLen(text: KStringPtr) -> KInt = byte_len;
        fn Reverse(values: KByteArray) = reverse;
    }
}

type Calls = Arc<Mutex<Vec<(i32, Vec<u8>, i32)>>>;

/// Define the interop class, its dispatcher and the `Gallery` class.
fn jni_vm(vm: &SimVm, calls: Calls) {
    let interop = vm.define_class("org/hostbridge/interop/InteropNativeModule");
    vm.define_static(interop, "callCallbackFromNative", "(I[BI)I", move |vm, args| {
        let kind = vm.arg_int(&args[0]).unwrap_or(-1);
        let bytes = vm.arg_bytes(&args[1]).unwrap_or_default();
        let len = vm.arg_int(&args[2]).unwrap_or(-1);
        calls.lock().unwrap().push((kind, bytes, len));
        kind * 2
    });
    vm.define_class("test/Gallery");
}

fn jni_exports() -> Exports {
    let mut builder = ExportsBuilder::new();
    builder.register(register_jni_gallery);
    builder.set_classpath("Gallery", "test/Gallery").unwrap();
    builder.build()
}

fn call_int(vm: &SimVm, name: &str) -> i32 {
    let native = vm.native(name).unwrap_or_else(|| panic!("{name} not bound"));
    let entry: extern "system" fn(*const SimVm, SimRef) -> i32 = unsafe { std::mem::transmute(native.entry()) };
    entry(vm.as_raw(), SimRef::NULL)
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_bound_native_returns_answer() {
    let vm = SimVm::new();
    jni_vm(&vm, Calls::default());

    let loaded = jni::load(&vm, jni_exports(), &LoaderConfig::default()).unwrap();
    assert_eq!(loaded.report.module("Gallery").unwrap().state, LoadState::Bound);
    assert_eq!(loaded.report.bound_count(), 4);
    assert_eq!(call_int(&vm, "_Answer"), 42);
}

#[test]
fn test_natives_bind_with_host_descriptors() {
    let vm = SimVm::new();
    jni_vm(&vm, Calls::default());
    jni::load(&vm, jni_exports(), &LoaderConfig::default()).unwrap();

    assert_eq!(vm.native("_ByteLen").unwrap().signature, "(Ljava/lang/String;)I");
    assert_eq!(vm.native("_Reverse").unwrap().signature, "([B)V");
    assert_eq!(vm.native("_Same").unwrap().signature, "(J)J");
    assert!(vm.natives().iter().all(|native| native.class == "test/Gallery"));
}

#[test]
fn test_wrong_interop_classpath_fails_load() {
    let vm = SimVm::new();
    jni_vm(&vm, Calls::default());
    let config = LoaderConfig::new().with_classpath(INTEROP_NATIVE_MODULE, "org/nowhere/Interop");

    let error = jni::load(&vm, jni_exports(), &config).unwrap_err();
    assert_eq!(
        error,
        LoadError::InteropModuleMissing {
            module: INTEROP_NATIVE_MODULE.to_string(),
            classpath: "org/nowhere/Interop".to_string(),
        }
    );
    assert_eq!(error.state(), LoadState::InteropModuleMissing);
    assert!(vm.natives().is_empty());
}

#[test]
fn test_missing_dispatcher_fails_load() {
    let vm = SimVm::new();
    vm.define_class("org/hostbridge/interop/InteropNativeModule");
    vm.define_class("test/Gallery");

    let error = jni::load(&vm, jni_exports(), &LoaderConfig::default()).unwrap_err();
    assert_eq!(error.state(), LoadState::DispatcherUnresolved);
    assert!(vm.natives().is_empty());
}

#[test]
fn test_missing_module_class_is_skipped() {
    let vm = SimVm::new();
    jni_vm(&vm, Calls::default());
    let mut builder = ExportsBuilder::new();
    builder.register(register_jni_gallery);
    builder.set_classpath("Gallery", "test/Elsewhere").unwrap();

    let loaded = jni::load(&vm, builder.build(), &LoaderConfig::default()).unwrap();
    let gallery = loaded.report.module("Gallery").unwrap();
    assert_eq!(gallery.state, LoadState::ClassMissing);
    assert!(gallery.bound.is_empty());
    assert!(vm.natives().is_empty());
    assert!(!vm.has_pending());
}

#[test]
fn test_malformed_record_leaves_others_bound() {
    let vm = SimVm::new();
    jni_vm(&vm, Calls::default());
    let mut builder = ExportsBuilder::new();
    builder.register(register_jni_gallery);
    builder.set_classpath("Gallery", "test/Gallery").unwrap();
    builder.add_method(
        "Gallery",
        "_Mystery",
        "KInt|KMystery",
        NativeEntry::new(std::ptr::null()),
        ExportFlags::empty(),
    );

    let loaded = jni::load(&vm, builder.build(), &LoaderConfig::default()).unwrap();
    let gallery = loaded.report.module("Gallery").unwrap();
    assert_eq!(gallery.bound.len(), 4);
    assert_eq!(gallery.failed.len(), 2);
    assert_eq!(gallery.failed[1].0, "_Mystery");
    assert_eq!(gallery.failed[1].1, BindError::unknown_kind("KMystery", "KInt|KMystery"));
    assert!(vm.native("_Mystery").is_none());
}

#[test]
fn test_rejected_native_leaves_others_bound() {
    let vm = SimVm::new();
    jni_vm(&vm, Calls::default());
    vm.reject_native("_ByteLen");

    let loaded = jni::load(&vm, jni_exports(), &LoaderConfig::default()).unwrap();
    assert_eq!(loaded.report.bound_count(), 3);
    assert_eq!(loaded.report.failed_count(), 2);
    assert_eq!(call_int(&vm, "_Answer"), 42);
}

#[test]
fn test_direct_export_is_not_registered_with_jni_frame() {
    let vm = SimVm::new();
    jni_vm(&vm, Calls::default());

    let loaded = jni::load(&vm, jni_exports(), &LoaderConfig::default()).unwrap();
    let gallery = loaded.report.module("Gallery").unwrap();
    assert_eq!(
        gallery.failed,
        vec![(
            "_Unbox".to_string(),
            BindError::UnsupportedKind {
                name: "_Unbox".to_string(),
                kind: NativeKind::Critical,
            }
        )]
    );
    assert!(vm.native("_Unbox").is_none());
    assert!(vm.native("_Same").is_some());
    assert!(!vm.has_pending());
}

#[test]
fn test_first_classpath_registration_wins() {
    let mut builder = ExportsBuilder::new();
    builder.set_classpath("Gallery", "test/Gallery").unwrap();
    builder.set_classpath("Gallery", "test/Gallery").unwrap();
    let error = builder.set_classpath("Gallery", "test/Other").unwrap_err();
    assert!(matches!(error, RegistrationError::ClasspathRedefinition { .. }));

    let exports = builder.build();
    assert_eq!(exports.classpath("Gallery"), Some("test/Gallery"));
}

#[test]
fn test_registration_beats_configuration() {
    let vm = SimVm::new();
    jni_vm(&vm, Calls::default());
    let config = LoaderConfig::new().with_classpath("Gallery", "test/Elsewhere");

    let loaded = jni::load(&vm, jni_exports(), &config).unwrap();
    assert_eq!(loaded.report.module("Gallery").unwrap().classpath, "test/Gallery");
    assert_eq!(loaded.report.bound_count(), 4);
}

// =============================================================================
// Conversions
// =============================================================================

#[test]
fn test_string_byte_length_on_every_backend() {
    let vm = SimVm::new();
    let text = vm.new_string("héllo");
    assert_eq!(Java_org_Gallery_ByteLen(vm.as_raw(), SimRef::NULL, text), 6);
    assert_eq!(ets_Gallery_ByteLen(vm.as_raw(), SimRef::NULL, text), 6);
    assert_eq!(ani_Gallery_ByteLen(vm.as_raw(), SimRef::NULL, text), 6);
}

#[test]
fn test_one_release_per_acquire() {
    let vm = SimVm::new();
    let bytes = vm.new_bytes(&[1, 2, 3]);

    Java_org_Gallery_Reverse(vm.as_raw(), SimRef::NULL, bytes);
    ets_Gallery_Reverse(vm.as_raw(), SimRef::NULL, bytes);
    ani_Gallery_Reverse(vm.as_raw(), SimRef::NULL, bytes);

    // Reversed three times.
    assert_eq!(vm.bytes(bytes).unwrap(), vec![3, 2, 1]);
    let counters = vm.counters();
    assert_eq!(counters.pins, 2);
    assert_eq!(counters.unpins, 2);
    assert_eq!(counters.region_reads, 1);
    assert_eq!(counters.region_writes, 1);
}

#[test]
fn test_pointer_round_trip() {
    let vm = SimVm::new();
    let ptr = NativePointer::from_box(Box::new(1234_i32));
    let raw = ptr.addr() as i64;

    assert_eq!(Java_org_Gallery_Same(vm.as_raw(), SimRef::NULL, raw), raw);
    assert_eq!(Java_org_Gallery_Unbox(raw), 1234);
    assert_eq!(Java_org_Gallery_Unbox(0), -1);
}

// =============================================================================
// Callbacks
// =============================================================================

#[test]
fn test_sync_callback_reaches_dispatcher() {
    let calls = Calls::default();
    let vm = SimVm::new();
    jni_vm(&vm, calls.clone());

    let loaded = jni::load(&vm, jni_exports(), &LoaderConfig::default()).unwrap();
    let result = loaded.dispatcher().call_sync(jni::JniHost::new(&vm), 3, &[5; 4]).unwrap();
    assert_eq!(result, 6);
    assert_eq!(calls.lock().unwrap().as_slice(), &[(3, vec![5; 4], 4)]);
}

#[test]
fn test_async_callback_attaches_to_vm() {
    let calls = Calls::default();
    let vm = SimVm::leaked();
    jni_vm(vm, calls.clone());

    let loaded = jni::load(vm, jni_exports(), &LoaderConfig::default()).unwrap();
    let sink = AttachedDispatcher::new(jni::JniVm(vm), loaded.dispatcher());
    let args: Vec<u8> = (0..12).collect();
    sink.post_async(7, &args).unwrap();

    assert_eq!(calls.lock().unwrap().as_slice(), &[(7, args, 12)]);
}

#[test]
fn test_async_callback_errors_are_reported() {
    let vm = SimVm::leaked();
    let interop = vm.define_class("org/hostbridge/interop/InteropNativeModule");
    vm.define_static(interop, "callCallbackFromNative", "(I[BI)I", |vm, _| {
        vm.raise("listener threw");
        0
    });

    let loaded = jni::load(vm, ExportsBuilder::new().build(), &LoaderConfig::default()).unwrap();
    let sink = AttachedDispatcher::new(jni::JniVm(vm), loaded.dispatcher());
    let error = sink.post_async(1, &[]).unwrap_err();
    assert!(error.to_string().contains("listener threw"));
    assert!(!vm.has_pending());
}

#[test]
fn test_ets_and_ani_dispatchers_share_shape() {
    let vm = SimVm::new();
    let interop = vm.define_class("@hostbridge/interop/InteropNativeModule/InteropNativeModule");
    vm.define_static(interop, "callCallbackFromNative", "I[BI:I", |vm, args| {
        vm.arg_int(&args[2]).unwrap_or(-1)
    });
    vm.define_class("test/Gallery");

    let mut builder = ExportsBuilder::new();
    builder.register(register_ets_gallery);
    builder.set_classpath("Gallery", "test/Gallery").unwrap();
    let loaded = ets::load(&vm, builder.build(), &LoaderConfig::default()).unwrap();
    assert_eq!(loaded.dispatcher().call_sync(ets::EtsHost::new(&vm), 1, &[0; 9]).unwrap(), 9);

    let mut builder = ExportsBuilder::new();
    builder.register(register_ani_gallery);
    builder.set_classpath("Gallery", "test/Gallery").unwrap();
    let loaded = ani::load(&vm, builder.build(), &LoaderConfig::default()).unwrap();
    assert_eq!(loaded.dispatcher().call_sync(ani::AniHost::new(&vm), 1, &[0; 5]).unwrap(), 5);

    assert_eq!(vm.natives().len(), 6);
}
