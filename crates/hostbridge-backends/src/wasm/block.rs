//! Length-prefixed blocks in linear memory.

use std::alloc::{Layout, alloc, dealloc};

/// Size of the little-endian length prefix.
pub const BLOCK_HEADER: usize = 4;

const BLOCK_ALIGN: usize = 4;

fn layout(payload: usize) -> Option<Layout> {
    Layout::from_size_align(BLOCK_HEADER + payload, BLOCK_ALIGN).ok()
}

/// Allocate a block with room for `len` payload bytes; null on failure.
/// The payload is zeroed.
pub fn alloc_block(len: usize) -> *mut u8 {
    let Ok(prefix) = u32::try_from(len) else {
        return std::ptr::null_mut();
    };
    let Some(layout) = layout(len) else {
        return std::ptr::null_mut();
    };
    // SAFETY: the layout is never zero-sized.
    let block = unsafe { alloc(layout) };
    if block.is_null() {
        return block;
    }
    // SAFETY: the block holds the header followed by `len` bytes.
    unsafe {
        block.cast::<[u8; BLOCK_HEADER]>().write(prefix.to_le_bytes());
        std::ptr::write_bytes(block.add(BLOCK_HEADER), 0, len);
    }
    block
}

/// Allocate a block holding a copy of `bytes`.
pub fn new_block(bytes: &[u8]) -> *mut u8 {
    let block = alloc_block(bytes.len());
    if !block.is_null() {
        // SAFETY: the block has room for `bytes.len()` payload bytes.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), block.add(BLOCK_HEADER), bytes.len()) };
    }
    block
}

/// Payload length recorded in a block's prefix.
///
/// # Safety
///
/// `block` must point to a readable length prefix.
pub unsafe fn block_len(block: *const u8) -> usize {
    // SAFETY: upheld by the caller.
    let prefix = unsafe { block.cast::<[u8; BLOCK_HEADER]>().read() };
    u32::from_le_bytes(prefix) as usize
}

/// # Safety
///
/// `block` must be null or point to a block whose payload stays valid for `'a`.
pub unsafe fn block_payload<'a>(block: *const u8) -> &'a [u8] {
    if block.is_null() {
        return &[];
    }
    // SAFETY: upheld by the caller.
    unsafe { std::slice::from_raw_parts(block.add(BLOCK_HEADER), block_len(block)) }
}

/// # Safety
///
/// Same as [`block_payload`], and no other view of the payload may be alive.
pub unsafe fn block_payload_mut<'a>(block: *mut u8) -> &'a mut [u8] {
    if block.is_null() {
        return &mut [];
    }
    // SAFETY: upheld by the caller.
    unsafe { std::slice::from_raw_parts_mut(block.add(BLOCK_HEADER), block_len(block)) }
}

/// Free a block from [`alloc_block`].
///
/// # Safety
///
/// `block` must be null or come from [`alloc_block`] and not be freed twice.
pub unsafe fn free_block(block: *mut u8) {
    if block.is_null() {
        return;
    }
    // SAFETY: the prefix still records the allocated payload length.
    let len = unsafe { block_len(block) };
    if let Some(layout) = layout(len) {
        // SAFETY: allocated with this layout by `alloc_block`.
        unsafe { dealloc(block, layout) };
    }
}

/// Allocate an argument block for JS to fill.
#[unsafe(no_mangle)]
pub extern "C" fn hostbridge_alloc(len: u32) -> *mut u8 {
    alloc_block(len as usize)
}

/// Free a block returned by an export or [`hostbridge_alloc`].
///
/// # Safety
///
/// See [`free_block`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostbridge_free(block: *mut u8) {
    // SAFETY: upheld by the caller.
    unsafe { free_block(block) }
}
