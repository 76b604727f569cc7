//! Canonical kind conversions for WASM.

use hostbridge_core::types::{ArrayPtr, NativePointer, SerializerBuffer, VmObjectHandle};
use hostbridge_core::{FromHost, InteropBuffer, InteropNumber, InteropString, ReturnBuffer, ToHost};

use super::block::{block_payload, block_payload_mut, new_block};
use super::{LinearMemory, Wasm};

hostbridge_core::value_conversions!([] Wasm {
    bool => i32,
    u8 => i32,
    i32 => i32,
    u32 => i32,
    i64 => i64,
    u64 => i64,
    f32 => f32,
    f64 => f64,
    NativePointer => i64,
    SerializerBuffer => i64,
    VmObjectHandle => i64,
    InteropNumber => f64,
});

impl FromHost<Wasm> for InteropString {
    type Interop = *mut u8;
    type Release = ();

    fn convert_from(_env: &LinearMemory, block: *mut u8) -> (Self, ()) {
        // SAFETY: JS passes null or a block it keeps alive for the call.
        (InteropString::from_bytes(unsafe { block_payload(block) }), ())
    }

    fn release(_env: &LinearMemory, _block: *mut u8, _release: ()) {}
}

impl ToHost<Wasm> for InteropString {
    type Interop = *mut u8;

    fn convert_to(_env: &LinearMemory, value: Self) -> *mut u8 {
        new_block(value.as_bytes())
    }
}

/// Plain element types of array blocks.
pub trait Element: Copy + Default {}

impl Element for u8 {}
impl Element for i32 {}
impl Element for f32 {}

impl<T: Element> FromHost<Wasm> for ArrayPtr<T> {
    type Interop = *mut u8;
    /// Scratch copy, written back on release.
    type Release = Option<Vec<T>>;

    fn convert_from(_env: &LinearMemory, block: *mut u8) -> (Self, Option<Vec<T>>) {
        if block.is_null() {
            return (ArrayPtr::null(), None);
        }
        // SAFETY: JS passes a block it keeps alive for the call.
        let payload = unsafe { block_payload(block) };
        let count = payload.len() / std::mem::size_of::<T>();
        let mut scratch = vec![T::default(); count];
        // SAFETY: `T` is plain data and the scratch holds `count` elements.
        unsafe {
            std::ptr::copy_nonoverlapping(
                payload.as_ptr(),
                scratch.as_mut_ptr().cast::<u8>(),
                count * std::mem::size_of::<T>(),
            )
        };
        (ArrayPtr::new(scratch.as_mut_ptr(), count), Some(scratch))
    }

    fn release(_env: &LinearMemory, block: *mut u8, scratch: Option<Vec<T>>) {
        let Some(scratch) = scratch else {
            return;
        };
        // SAFETY: the block is still alive; the scratch view has ended.
        let payload = unsafe { block_payload_mut(block) };
        let bytes = scratch.len() * std::mem::size_of::<T>();
        // SAFETY: the payload held at least `bytes` bytes when copied out.
        unsafe { std::ptr::copy_nonoverlapping(scratch.as_ptr().cast::<u8>(), payload.as_mut_ptr(), bytes) };
    }
}

impl FromHost<Wasm> for InteropBuffer {
    type Interop = *mut u8;
    type Release = Option<Vec<u8>>;

    fn convert_from(env: &LinearMemory, block: *mut u8) -> (Self, Option<Vec<u8>>) {
        let (array, scratch) = <ArrayPtr<u8> as FromHost<Wasm>>::convert_from(env, block);
        if scratch.is_none() {
            return (InteropBuffer::empty(), None);
        }
        // SAFETY: the scratch copy lives in the release ticket until `release`.
        (unsafe { InteropBuffer::borrowed(array.as_ptr(), array.len()) }, scratch)
    }

    fn release(env: &LinearMemory, block: *mut u8, scratch: Option<Vec<u8>>) {
        <ArrayPtr<u8> as FromHost<Wasm>>::release(env, block, scratch);
    }
}

impl ToHost<Wasm> for InteropBuffer {
    type Interop = *mut u8;

    fn convert_to(_env: &LinearMemory, value: Self) -> *mut u8 {
        let block = new_block(value.as_bytes());
        drop(value);
        block
    }
}

impl ToHost<Wasm> for ReturnBuffer {
    type Interop = *mut u8;

    fn convert_to(_env: &LinearMemory, value: Self) -> *mut u8 {
        let block = new_block(value.as_bytes());
        drop(value);
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wasm::free_block;
    use hostbridge_core::Invoke;

    fn scale(values: ArrayPtr<i32>, factor: i32) -> i32 {
        let values = unsafe { values.as_mut_slice() };
        for value in values.iter_mut() {
            *value *= factor;
        }
        values.len() as i32
    }

    #[test]
    fn array_block_is_written_back() {
        let mut bytes = Vec::new();
        for value in [1_i32, 2, 3] {
            bytes.extend_from_slice(&value.to_ne_bytes());
        }
        let block = new_block(&bytes);
        let count = Invoke::<Wasm, (ArrayPtr<i32>, i32), i32>::invoke(&scale, &LinearMemory, (block, 10));
        assert_eq!(count, 3);
        let payload = unsafe { block_payload(block) };
        let back: Vec<i32> = payload
            .chunks_exact(4)
            .map(|chunk| i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        assert_eq!(back, vec![10, 20, 30]);
        unsafe { free_block(block) };
    }

    #[test]
    fn strings_cross_as_blocks() {
        let block = new_block("héllo".as_bytes());
        let (string, ()) = <InteropString as FromHost<Wasm>>::convert_from(&LinearMemory, block);
        assert_eq!(string.len(), 6);
        unsafe { free_block(block) };

        let out = <InteropString as ToHost<Wasm>>::convert_to(&LinearMemory, InteropString::from("ok"));
        assert_eq!(unsafe { block_payload(out) }, b"ok");
        unsafe { free_block(out) };
    }

    #[test]
    fn null_block_is_empty() {
        let (string, ()) = <InteropString as FromHost<Wasm>>::convert_from(&LinearMemory, std::ptr::null_mut());
        assert!(string.is_empty());
        let (array, scratch) = <ArrayPtr<u8> as FromHost<Wasm>>::convert_from(&LinearMemory, std::ptr::null_mut());
        assert!(array.is_null());
        assert!(scratch.is_none());
    }
}
