//! WASM backend: exports called from JS through the module's linear memory.
//!
//! Value kinds cross as wasm numbers. Strings, arrays and buffers cross as
//! blocks: a 4-byte little-endian payload length followed by the payload.
//! JS allocates argument blocks with [`hostbridge_alloc`] and frees result
//! blocks with [`hostbridge_free`].
//!
//! There are no classes to bind; the registrar only lists exports. The
//! callback dispatcher is the `callCallbackFromNative` import, available on
//! `wasm32` targets.

mod block;
mod convert;
mod macros;

use hostbridge_core::Backend;
use hostbridge_core::VmContext;
use hostbridge_registry::CallbackError;
use hostbridge_registry::callbacks::{self, CallbackSink};

pub use block::{BLOCK_HEADER, alloc_block, block_len, block_payload, block_payload_mut, free_block, hostbridge_alloc, hostbridge_free, new_block};

/// Marker for the WASM backend.
pub struct Wasm;

/// The environment of a WASM call: the module's own linear memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearMemory;

impl Backend for Wasm {
    type Env = LinearMemory;
    const NAME: &'static str = "wasm";
}

#[cfg(target_arch = "wasm32")]
mod host {
    #[link(wasm_import_module = "hostbridge")]
    unsafe extern "C" {
        pub fn callCallbackFromNative(kind: i32, args: *const u8, len: i32) -> i32;
    }
}

/// Call the JS dispatcher with `args` copied into a fresh block.
#[cfg(target_arch = "wasm32")]
pub fn call_callback(kind: i32, args: &[u8]) -> Result<i32, CallbackError> {
    let len = i32::try_from(args.len()).map_err(|_| CallbackError::BufferTooLarge { len: args.len() })?;
    let block = new_block(args);
    // SAFETY: the block holds `len` payload bytes until freed below.
    let result = unsafe { host::callCallbackFromNative(kind, block.add(BLOCK_HEADER), len) };
    // SAFETY: `block` came from `new_block` and is freed once.
    unsafe { free_block(block) };
    Ok(result)
}

/// Off `wasm32` there is no JS host to call.
#[cfg(not(target_arch = "wasm32"))]
pub fn call_callback(_kind: i32, _args: &[u8]) -> Result<i32, CallbackError> {
    Err(CallbackError::NotInstalled)
}

/// [`CallbackSink`] over the dispatcher import.
#[derive(Debug, Default)]
pub struct WasmCallbackSink;

impl CallbackSink for WasmCallbackSink {
    fn call_sync(&self, _ctx: VmContext, kind: i32, args: &[u8]) -> Result<i32, CallbackError> {
        call_callback(kind, args)
    }

    fn post_async(&self, kind: i32, args: &[u8]) -> Result<(), CallbackError> {
        call_callback(kind, args).map(|result| {
            tracing::trace!(kind, result, "async callback result discarded");
        })
    }
}

/// Install [`WasmCallbackSink`] as the process-wide callback sink.
pub fn install_callback_sink() -> Result<(), CallbackError> {
    callbacks::install(Box::new(WasmCallbackSink))
}

/// Raise a host error from an implementation. WASM has no exception channel,
/// so the message is logged.
pub fn throw_error(_ctx: VmContext, message: &str) {
    tracing::error!(message, "native error in wasm export");
}

#[cfg(test)]
mod tests {
    use hostbridge_core::types::*;
    use hostbridge_registry::{ExportFlags, ExportsBuilder};

    use super::*;

    fn mean(values: KFloatArray) -> KFloat {
        let values = unsafe { values.as_slice() };
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f32>() / values.len() as f32
    }

    fn upper(text: KStringPtr) -> KStringPtr {
        text.to_string_lossy().to_uppercase().into()
    }

    fn checked(ctx: KVMContext, value: KInt) -> KBoolean {
        if value < 0 {
            throw_error(ctx, "negative");
        }
        value >= 0
    }

    fn pointer(addr: KNativePointer) -> KNativePointer {
        addr
    }

    crate::wasm_exports! {
        module: WasmUnit,
        registrar: register_unit,
        exports: {
            fn WasmUnitMean(values: KFloatArray) -> KFloat = mean;
            fn WasmUnitUpper(text: KStringPtr) -> KStringPtr = upper;
            ctx fn WasmUnitChecked(value: KInt) -> KBoolean = checked;
            direct fn WasmUnitPointer(addr: KNativePointer) -> KNativePointer = pointer;
        }
    }

    fn float_block(values: &[f32]) -> *mut u8 {
        let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_ne_bytes()).collect();
        new_block(&bytes)
    }

    #[test]
    fn shells_read_blocks() {
        let block = float_block(&[1.0, 2.0, 6.0]);
        assert_eq!(_WasmUnitMean(block), 3.0);
        unsafe { free_block(block) };
        assert_eq!(_WasmUnitMean(std::ptr::null_mut()), 0.0);

        let text = new_block(b"abc");
        let upper = _WasmUnitUpper(text);
        assert_eq!(unsafe { block_payload(upper) }, b"ABC");
        unsafe {
            free_block(text);
            free_block(upper);
        }
    }

    #[test]
    fn context_and_direct_shells() {
        assert_eq!(_WasmUnitChecked(3), 1);
        assert_eq!(_WasmUnitChecked(-1), 0);
        assert_eq!(_WasmUnitPointer(0xdead_beef), 0xdead_beef);
    }

    #[test]
    fn registrar_records_flags() {
        let mut builder = ExportsBuilder::new();
        builder.register(register_unit);
        let exports = builder.build();
        assert_eq!(exports.record_count(), 4);
        let checked = exports.find("WasmUnit", "_WasmUnitChecked").unwrap();
        assert!(checked.flags().contains(ExportFlags::CONTEXT));
        assert_eq!(checked.signature_text(), "KBoolean|KInt");
        let pointer = exports.find("WasmUnit", "_WasmUnitPointer").unwrap();
        assert!(pointer.flags().contains(ExportFlags::DIRECT));
    }

    #[test]
    fn callbacks_need_the_wasm_host() {
        assert!(matches!(call_callback(1, &[]), Err(CallbackError::NotInstalled)));
    }
}
