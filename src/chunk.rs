//! Chunk layout and boundary-tag primitives.
//!
//! A chunk is `header | payload words... | footer`. The header's sign bit
//! carries free/taken status and its magnitude is the payload word count;
//! the footer is a verbatim copy kept for O(1) neighbor-walking and a
//! corruption check. When a chunk is free, its first two payload words
//! double as the free list's forward/backward links (see `freelist`).
//!
//! Every function here is `unsafe`: callers must guarantee `base` points to
//! a live region of at least `off + space` words and that `off` names the
//! header of an actual chunk.

use core::ptr::NonNull;

use crate::word::{Offset, WORD_SIZE};

/// Every chunk holds at least this many payload words, free or taken, so a
/// free chunk always has room for both list links.
pub(crate) const MIN_PAYLOAD: u32 = 2;

#[inline]
unsafe fn word_ptr(base: NonNull<u8>, off: Offset) -> *mut u32 {
    base.as_ptr().add(off.0 as usize * WORD_SIZE).cast()
}

/// Reads the raw word at `off`, aliasing concerns left to the caller.
#[inline]
pub(crate) unsafe fn read_raw(base: NonNull<u8>, off: Offset) -> u32 {
    word_ptr(base, off).read_unaligned()
}

#[inline]
pub(crate) unsafe fn write_raw(base: NonNull<u8>, off: Offset, val: u32) {
    word_ptr(base, off).write_unaligned(val);
}

#[inline]
pub(crate) unsafe fn read_header(base: NonNull<u8>, off: Offset) -> i32 {
    read_raw(base, off) as i32
}

#[inline]
pub(crate) unsafe fn write_header(base: NonNull<u8>, off: Offset, val: i32) {
    write_raw(base, off, val as u32);
}

/// `|header|`, the chunk's payload word count.
#[inline]
pub(crate) unsafe fn payload_words(base: NonNull<u8>, off: Offset) -> u32 {
    read_header(base, off).unsigned_abs()
}

/// Whether the chunk at `off` is free (positive header).
#[inline]
pub(crate) unsafe fn is_free(base: NonNull<u8>, off: Offset) -> bool {
    read_header(base, off) >= 0
}

/// The offset of the footer word, given the chunk's payload size.
#[inline]
pub(crate) fn footer_offset(off: Offset, payload: u32) -> Offset {
    Offset(off.0 + 1 + payload)
}

/// Total words occupied by a chunk of the given payload size: payload + 2 tag words.
#[inline]
pub(crate) fn space(payload: u32) -> u32 {
    payload + 2
}

/// `header == footer`, the metadata-integrity check.
#[inline]
pub(crate) unsafe fn check_meta(base: NonNull<u8>, off: Offset) -> bool {
    let header = read_header(base, off);
    let footer = read_header(base, footer_offset(off, header.unsigned_abs()));
    header == footer
}

/// Writes `signed_payload` to both header and footer.
///
/// The footer is derived from `signed_payload`'s magnitude, so this must be
/// called with the chunk's *new* size — it cannot be used to change a
/// chunk's size and its sign independently of each other, which matches the
/// source's `set_size`.
#[inline]
pub(crate) unsafe fn set_size(base: NonNull<u8>, off: Offset, signed_payload: i32) {
    write_header(base, off, signed_payload);
    write_header(base, footer_offset(off, signed_payload.unsigned_abs()), signed_payload);
}

/// Address of the first payload word — what `allocate` hands back to the caller.
#[inline]
pub(crate) unsafe fn data_ptr(base: NonNull<u8>, off: Offset) -> NonNull<u8> {
    NonNull::new_unchecked(base.as_ptr().add((off.0 as usize + 1) * WORD_SIZE))
}

/// The chunk whose payload begins at `ptr` (one word before it).
#[inline]
pub(crate) unsafe fn chunk_from_data(base: NonNull<u8>, ptr: NonNull<u8>) -> Offset {
    let byte_off = ptr.as_ptr() as usize - base.as_ptr() as usize;
    Offset((byte_off / WORD_SIZE) as u32 - 1)
}

/// Derives a chunk's header offset from the offset of its footer word.
#[inline]
pub(crate) unsafe fn chunk_from_footer(base: NonNull<u8>, footer_off: Offset) -> Offset {
    let payload = (read_header(base, footer_off)).unsigned_abs();
    Offset(footer_off.0 - 1 - payload)
}

// -- free-list link accessors (alias the first two payload words) --

#[inline]
pub(crate) unsafe fn read_link_next(base: NonNull<u8>, off: Offset) -> Offset {
    Offset(read_raw(base, Offset(off.0 + 1)))
}

#[inline]
pub(crate) unsafe fn write_link_next(base: NonNull<u8>, off: Offset, next: Offset) {
    write_raw(base, Offset(off.0 + 1), next.0);
}

#[inline]
pub(crate) unsafe fn read_link_prev(base: NonNull<u8>, off: Offset) -> Offset {
    Offset(read_raw(base, Offset(off.0 + 2)))
}

#[inline]
pub(crate) unsafe fn write_link_prev(base: NonNull<u8>, off: Offset, prev: Offset) {
    write_raw(base, Offset(off.0 + 2), prev.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::alloc::{alloc_zeroed, dealloc, Layout};

    struct TestRegion {
        ptr: NonNull<u8>,
        layout: Layout,
    }

    impl TestRegion {
        fn new(words: usize) -> Self {
            let layout = Layout::from_size_align(words * WORD_SIZE, WORD_SIZE).unwrap();
            let ptr = unsafe { NonNull::new(alloc_zeroed(layout)).unwrap() };
            Self { ptr, layout }
        }
    }

    impl Drop for TestRegion {
        fn drop(&mut self) {
            unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
        }
    }

    #[test]
    fn set_size_writes_matching_header_and_footer() {
        let region = TestRegion::new(8);
        unsafe {
            set_size(region.ptr, Offset(0), 6);
            assert_eq!(read_header(region.ptr, Offset(0)), 6);
            assert_eq!(read_header(region.ptr, Offset(7)), 6);
            assert!(check_meta(region.ptr, Offset(0)));
        }
    }

    #[test]
    fn negative_size_marks_taken_and_round_trips() {
        let region = TestRegion::new(8);
        unsafe {
            set_size(region.ptr, Offset(0), -6);
            assert!(!is_free(region.ptr, Offset(0)));
            assert_eq!(payload_words(region.ptr, Offset(0)), 6);
            assert!(check_meta(region.ptr, Offset(0)));
        }
    }

    #[test]
    fn data_ptr_and_chunk_from_data_are_inverse() {
        let region = TestRegion::new(8);
        unsafe {
            set_size(region.ptr, Offset(0), -6);
            let p = data_ptr(region.ptr, Offset(0));
            assert_eq!(chunk_from_data(region.ptr, p), Offset(0));
        }
    }

    #[test]
    fn chunk_from_footer_derives_header_offset() {
        let region = TestRegion::new(8);
        unsafe {
            set_size(region.ptr, Offset(0), 6);
            let footer = footer_offset(Offset(0), 6);
            assert_eq!(footer, Offset(7));
            assert_eq!(chunk_from_footer(region.ptr, footer), Offset(0));
        }
    }

    #[test]
    fn check_meta_detects_corruption() {
        let region = TestRegion::new(8);
        unsafe {
            set_size(region.ptr, Offset(0), 6);
            write_raw(region.ptr, Offset(7), 0xDEAD_BEEF);
            assert!(!check_meta(region.ptr, Offset(0)));
        }
    }
}
