//! Resize engine (C7): case analysis over in-place, right-coalesce,
//! bilateral-coalesce, and relocate, orchestrating C5 and C6.

use core::ptr::NonNull;

use crate::alloc;
use crate::chunk;
use crate::freelist::Heads;
use crate::release;
use crate::region;
use crate::word::{Offset, WORD_SIZE};

/// Payload reachable by coalescing `off` rightward only, including `off`'s
/// own payload. Doesn't mutate anything — a dry run for the case-B check.
unsafe fn probe_right(base: NonNull<u8>, region_words: u32, off: Offset) -> u32 {
    let mut total = chunk::payload_words(base, off);
    let mut curr = off;
    while let Some(r) = region::right(base, region_words, curr) {
        if !chunk::is_free(base, r) {
            break;
        }
        total += chunk::payload_words(base, r) + 2;
        curr = r;
    }
    total
}

/// Payload reachable by coalescing `off` leftward only, including `off`'s
/// own payload.
unsafe fn probe_left(base: NonNull<u8>, off: Offset) -> u32 {
    let mut total = chunk::payload_words(base, off);
    let mut curr = off;
    while let Some(l) = region::left(base, curr) {
        if !chunk::is_free(base, l) {
            break;
        }
        total += chunk::payload_words(base, l) + 2;
        curr = l;
    }
    total
}

/// Payload reachable by coalescing in both directions at once. `off`'s own
/// payload is counted by both one-directional probes, so it's subtracted
/// once here.
unsafe fn probe_both(base: NonNull<u8>, region_words: u32, off: Offset) -> u32 {
    probe_right(base, region_words, off) + probe_left(base, off) - chunk::payload_words(base, off)
}

/// `resize(p, new_bytes)`: grow or shrink the allocation at `p` in place
/// when possible, falling back to a fresh allocation plus copy otherwise.
///
/// - `p = None` behaves as `allocate(new_bytes, zero = false)`.
/// - `new_bytes = 0` behaves as `release(p)` and returns `None`.
/// - A pointer whose chunk fails its metadata check, or that is already
///   free, is rejected the same way `release` rejects it.
pub(crate) unsafe fn resize(
    base: NonNull<u8>,
    heads: &mut Heads,
    power: u32,
    region_words: u32,
    ptr: Option<NonNull<u8>>,
    new_bytes: usize,
) -> Option<NonNull<u8>> {
    let ptr = match ptr {
        Some(p) => p,
        None => return alloc::allocate(base, heads, power, new_bytes, false),
    };

    if new_bytes == 0 {
        release::release(base, heads, power, region_words, Some(ptr));
        return None;
    }

    let off = chunk::chunk_from_data(base, ptr);
    if !chunk::check_meta(base, off) {
        debug_assert!(false, "resize: corrupt chunk metadata");
        return None;
    }
    if chunk::is_free(base, off) {
        debug_assert!(false, "resize: pointer already free");
        return None;
    }

    let n = alloc::payload_for(new_bytes);
    let old_payload = chunk::payload_words(base, off);

    // Case A: the chunk already has enough room; no split on shrink.
    if old_payload >= n {
        return Some(ptr);
    }

    // Case B: merging right alone provides enough room; no copy needed
    // since the chunk's start address, and therefore the caller's
    // payload, doesn't move.
    if probe_right(base, region_words, off) >= n {
        chunk::set_size(base, off, old_payload as i32);
        let merged = release::coalesce_right(base, heads, power, region_words, off);
        let granted = alloc::take(base, heads, power, merged, n);
        return Some(chunk::data_ptr(base, granted));
    }

    // Case C: merging both directions provides enough room. The chunk's
    // start may shift left, so the payload is moved with overlap-safe
    // semantics (`core::ptr::copy`, i.e. `memmove`).
    if probe_both(base, region_words, off) >= n {
        chunk::set_size(base, off, old_payload as i32);
        let merged = release::coalesce(base, heads, power, region_words, off);
        let granted = alloc::take(base, heads, power, merged, n);
        let dst = chunk::data_ptr(base, granted);
        if dst != ptr {
            core::ptr::copy(ptr.as_ptr(), dst.as_ptr(), old_payload as usize * WORD_SIZE);
        }
        return Some(dst);
    }

    // Case D: no amount of local coalescing fits; relocate.
    let new_ptr = alloc::allocate(base, heads, power, new_bytes, false)?;
    core::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_payload as usize * WORD_SIZE);
    release::release(base, heads, power, region_words, Some(ptr));
    Some(new_ptr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freelist;
    use std::alloc::{alloc_zeroed, dealloc, Layout};

    const POWER: u32 = 2;

    struct TestRegion {
        ptr: NonNull<u8>,
        layout: Layout,
        words: u32,
    }

    impl TestRegion {
        fn new(words: u32) -> Self {
            let layout = Layout::from_size_align(words as usize * 4, 4).unwrap();
            let ptr = unsafe { NonNull::new(alloc_zeroed(layout)).unwrap() };
            Self { ptr, layout, words }
        }
    }

    impl Drop for TestRegion {
        fn drop(&mut self) {
            unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
        }
    }

    /// Lays out five 8-byte (2-word) allocations back to back in a 20-word
    /// region.
    unsafe fn five_chunks(region: &TestRegion, heads: &mut Heads) -> [NonNull<u8>; 5] {
        let mut ptrs = [NonNull::dangling(); 5];
        for i in 0..5 {
            chunk::set_size(region.ptr, Offset((i * 4) as u32), 2);
            freelist::insert(region.ptr, heads, POWER, Offset((i * 4) as u32));
        }
        for i in 0..5 {
            ptrs[i] = alloc::allocate(region.ptr, heads, POWER, 8, false).unwrap();
        }
        ptrs
    }

    #[test]
    fn case_a_shrink_is_a_no_op_and_keeps_the_pointer() {
        let region = TestRegion::new(20);
        let mut heads = freelist::empty_heads();
        unsafe {
            let ptrs = five_chunks(&region, &mut heads);
            let p = resize(region.ptr, &mut heads, POWER, region.words, Some(ptrs[2]), 4);
            assert_eq!(p, Some(ptrs[2]));
        }
    }

    #[test]
    fn case_b_right_coalesce_grows_in_place() {
        // Release 0,4,1,3 leaving chunk 2 taken with both neighbors free,
        // then grow chunk 2 to 12 bytes (3 words): satisfied purely by
        // coalescing right, so the pointer is unchanged.
        let region = TestRegion::new(20);
        let mut heads = freelist::empty_heads();
        unsafe {
            let ptrs = five_chunks(&region, &mut heads);
            core::ptr::copy_nonoverlapping(b"hello\0".as_ptr(), ptrs[2].as_ptr(), 6);

            for &i in &[0usize, 4, 1, 3] {
                release::release(region.ptr, &mut heads, POWER, region.words, Some(ptrs[i]));
            }

            let p = resize(region.ptr, &mut heads, POWER, region.words, Some(ptrs[2]), 12).unwrap();
            assert_eq!(p, ptrs[2]);

            let bytes = core::slice::from_raw_parts(p.as_ptr(), 5);
            assert_eq!(bytes, b"hello");

            let off = chunk::chunk_from_data(region.ptr, p);
            assert_eq!(chunk::read_header(region.ptr, off), -3);
        }
    }

    #[test]
    fn case_d_relocates_when_no_neighbor_can_help() {
        let region = TestRegion::new(20);
        let mut heads = freelist::empty_heads();
        unsafe {
            let ptrs = five_chunks(&region, &mut heads);
            core::ptr::copy_nonoverlapping(b"hello\0".as_ptr(), ptrs[2].as_ptr(), 6);

            // No neighbors released: nothing free anywhere, must relocate
            // or fail. With the region fully packed, it fails.
            let p = resize(region.ptr, &mut heads, POWER, region.words, Some(ptrs[2]), 40);
            assert_eq!(p, None);
        }
    }

    #[test]
    fn resize_none_pointer_behaves_as_allocate() {
        let region = TestRegion::new(20);
        let mut heads = freelist::empty_heads();
        unsafe {
            chunk::set_size(region.ptr, Offset(0), 18);
            freelist::insert(region.ptr, &mut heads, POWER, Offset(0));
            let p = resize(region.ptr, &mut heads, POWER, region.words, None, 8);
            assert!(p.is_some());
        }
    }

    #[test]
    fn resize_to_zero_releases_and_returns_none() {
        let region = TestRegion::new(20);
        let mut heads = freelist::empty_heads();
        unsafe {
            chunk::set_size(region.ptr, Offset(0), 18);
            freelist::insert(region.ptr, &mut heads, POWER, Offset(0));
            let p = alloc::allocate(region.ptr, &mut heads, POWER, 8, false).unwrap();
            let r = resize(region.ptr, &mut heads, POWER, region.words, Some(p), 0);
            assert_eq!(r, None);
            assert!(chunk::is_free(region.ptr, chunk::chunk_from_data(region.ptr, p)));
        }
    }
}
