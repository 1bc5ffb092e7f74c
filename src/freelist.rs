//! Segregated, sorted free lists (C4).
//!
//! Free chunks are bucketed by payload size into `CLASSES` classes, each an
//! intrusive doubly-linked list (links live in the chunk's own first two
//! payload words, see `chunk::read_link_*`) kept sorted by ascending
//! payload size. A best-fit search starts in the smallest class that can
//! possibly hold the request and widens outward, so the first chunk found
//! in the right class is already good enough — no list is ever scanned
//! past its first member larger than the request.

use core::ptr::NonNull;

use crate::chunk;
use crate::word::Offset;

/// Number of size classes. Matches the source allocator's fixed bucket count.
pub(crate) const CLASSES: usize = 8;

pub(crate) type Heads = [Offset; CLASSES];

pub(crate) fn empty_heads() -> Heads {
    [Offset::NIL; CLASSES]
}

/// Maps a payload word count to a size class under the given `power`.
///
/// Class `i` holds payloads `< 2^((i+1)*power)`, except the last class,
/// which also catches everything too big for the others. `power` controls
/// how finely the classes subdivide the size range; a `power` of 1 doubles
/// the threshold each class, a larger `power` spreads classes further
/// apart. Intermediate thresholds are computed in `u64` so that large
/// `power` values widen classes instead of wrapping.
#[inline]
pub(crate) fn class_of(power: u32, payload: u32) -> usize {
    let mut threshold: u64 = 1u64 << power;
    for i in 0..CLASSES {
        if (payload as u64) < threshold {
            return i;
        }
        threshold <<= power;
    }
    CLASSES - 1
}

/// Inserts a free chunk into its class, keeping the class sorted by
/// ascending payload size.
pub(crate) unsafe fn insert(base: NonNull<u8>, heads: &mut Heads, power: u32, off: Offset) {
    let payload = chunk::payload_words(base, off);
    let class = class_of(power, payload);

    let mut prev = Offset::NIL;
    let mut curr = heads[class];
    while !curr.is_nil() {
        if chunk::payload_words(base, curr) >= payload {
            break;
        }
        prev = curr;
        curr = chunk::read_link_next(base, curr);
    }

    chunk::write_link_next(base, off, curr);
    chunk::write_link_prev(base, off, prev);

    if prev.is_nil() {
        heads[class] = off;
    } else {
        chunk::write_link_next(base, prev, off);
    }
    if !curr.is_nil() {
        chunk::write_link_prev(base, curr, off);
    }
}

/// Unlinks a chunk from its class's free list. `off` must currently be free
/// and present in `heads`.
pub(crate) unsafe fn remove(base: NonNull<u8>, heads: &mut Heads, power: u32, off: Offset) {
    let payload = chunk::payload_words(base, off);
    let class = class_of(power, payload);

    let prev = chunk::read_link_prev(base, off);
    let next = chunk::read_link_next(base, off);

    if prev.is_nil() {
        heads[class] = next;
    } else {
        chunk::write_link_next(base, prev, next);
    }
    if !next.is_nil() {
        chunk::write_link_prev(base, next, prev);
    }
}

/// Scans a single class for the first chunk able to hold `n` payload words.
/// Since the class is sorted, the first fit found is the best fit available
/// in that class.
unsafe fn search_class(base: NonNull<u8>, heads: &Heads, class: usize, n: u32) -> Offset {
    let mut curr = heads[class];
    while !curr.is_nil() {
        if chunk::payload_words(base, curr) >= n {
            return curr;
        }
        curr = chunk::read_link_next(base, curr);
    }
    Offset::NIL
}

/// Finds the best-fitting free chunk for `n` payload words, widening from
/// `class_of(power, n)` outward until a class yields a fit or all classes
/// are exhausted.
pub(crate) unsafe fn find_best(base: NonNull<u8>, heads: &Heads, power: u32, n: u32) -> Offset {
    let start = class_of(power, n);
    for class in start..CLASSES {
        let found = search_class(base, heads, class, n);
        if !found.is_nil() {
            return found;
        }
    }
    Offset::NIL
}
