//! Physical neighbor traversal (C3).
//!
//! Chunks tile the region back-to-back with no gaps, so the chunk
//! physically to the right of `off` always begins at `off + space(payload)`,
//! and the chunk to the left is found by reading the footer word just
//! before `off` and walking backward by its payload size. Both directions
//! are O(1) regardless of chunk size.

use core::ptr::NonNull;

use crate::chunk;
use crate::word::Offset;

/// The chunk immediately to the right of `off`, or `None` if `off` is the
/// last chunk in the region (its end coincides with `region_words`).
#[inline]
pub(crate) unsafe fn right(
    base: NonNull<u8>,
    region_words: u32,
    off: Offset,
) -> Option<Offset> {
    let payload = chunk::payload_words(base, off);
    let next = off.0 + chunk::space(payload);
    if next >= region_words {
        None
    } else {
        Some(Offset(next))
    }
}

/// The chunk immediately to the left of `off`, or `None` if `off` is the
/// first chunk in the region.
#[inline]
pub(crate) unsafe fn left(base: NonNull<u8>, off: Offset) -> Option<Offset> {
    if off.0 == 0 {
        return None;
    }
    let prev_footer = Offset(off.0 - 1);
    Some(chunk::chunk_from_footer(base, prev_footer))
}
