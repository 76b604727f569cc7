//! The process-wide callback sink.
//!
//! The sink can be installed once per process, so everything that depends on
//! it lives in a single test.

use std::sync::{Arc, Mutex};

use hostbridge::jni;
use hostbridge::prelude::*;
use hostbridge::registry::CallbackError;
use hostbridge_backends::sim::SimVm;

fn sink_vm(calls: Arc<Mutex<Vec<(i32, usize)>>>) -> &'static SimVm {
    let vm = SimVm::leaked();
    let interop = vm.define_class("org/hostbridge/interop/InteropNativeModule");
    vm.define_static(interop, "callCallbackFromNative", "(I[BI)I", move |vm, args| {
        let kind = vm.arg_int(&args[0]).unwrap_or(-1);
        let len = vm.arg_int(&args[2]).unwrap_or(-1);
        calls.lock().unwrap().push((kind, len as usize));
        kind + len
    });
    vm
}

#[test]
fn test_sink_lifecycle() {
    assert!(!callbacks::is_installed());
    assert_eq!(callbacks::post_async(1, &[]), Err(CallbackError::NotInstalled));

    let calls = Arc::new(Mutex::new(Vec::new()));
    let vm = sink_vm(calls.clone());
    assert_eq!(jni::on_load(vm, &[], &LoaderConfig::default()), jni::JNI_VERSION_1_8);
    assert!(callbacks::is_installed());

    callbacks::post_async(7, &[0; 12]).unwrap();
    let ctx = KVMContext::from_env(vm);
    assert_eq!(callbacks::call_sync(ctx, 2, &[1, 2, 3]).unwrap(), 5);
    assert_eq!(calls.lock().unwrap().as_slice(), &[(7, 12), (2, 3)]);

    // A second load keeps the first sink.
    let other = sink_vm(Arc::default());
    assert_eq!(jni::on_load(other, &[], &LoaderConfig::default()), jni::JNI_VERSION_1_8);
    callbacks::post_async(4, &[]).unwrap();
    assert_eq!(calls.lock().unwrap().len(), 3);

    // A failing load leaves the installed sink alone.
    let broken = SimVm::leaked();
    assert_eq!(jni::on_load(broken, &[], &LoaderConfig::default()), jni::JNI_ERR);
    assert!(callbacks::is_installed());
}
