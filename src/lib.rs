//! A bounded-buffer heap allocator.
//!
//! [`Allocator`] partitions a caller-supplied, fixed-size region of memory
//! into variable-sized chunks and services [`allocate`](Allocator::allocate),
//! [`clear_allocate`](Allocator::clear_allocate), [`resize`](Allocator::resize),
//! and [`release`](Allocator::release) requests entirely within that region.
//! It never calls out to the system allocator, never grows the region, and
//! is not thread-safe on its own — wrap it in a mutex if you need to share
//! it across threads.
//!
//! Two techniques do the work:
//! - **Boundary-tag coalescing**: every chunk is bracketed by a signed
//!   header/footer word pair encoding payload size and free/taken status,
//!   so physically adjacent free chunks can be merged in O(1).
//! - **Segregated, sorted free lists**: free chunks are bucketed into a
//!   small, fixed number of size classes, each kept sorted by ascending
//!   size, so a best-fit search never scans past the first chunk that fits.
//!
//! See `DESIGN.md` for how each module traces back to its source.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

mod alloc;
mod chunk;
#[cfg(feature = "counters")]
mod counters;
mod freelist;
mod region;
mod release;
mod resize;
mod word;

#[cfg(feature = "counters")]
pub use counters::Counters;

use core::ptr::NonNull;

use freelist::Heads;
use word::Offset;

/// A heap allocator over a single caller-supplied region.
///
/// `Allocator` holds only out-of-region bookkeeping (free-list heads, the
/// region's base pointer and word count, the size-class exponent, and —
/// with the `counters` feature — running statistics); every chunk header,
/// footer, and free-list link lives inside the region itself.
///
/// All methods are `unsafe`: the caller must not touch the region directly
/// while the allocator is live, must not use a pointer returned by one
/// `Allocator` with another, and must not use a pointer after it has been
/// released or relocated by `resize`.
pub struct Allocator {
    base: NonNull<u8>,
    words: u32,
    power: u32,
    heads: Heads,
    #[cfg(feature = "counters")]
    counters: Counters,
}

impl Allocator {
    /// Claims `region` for allocation, establishing one free chunk spanning
    /// the whole thing.
    ///
    /// `power` controls how finely free chunks are bucketed into size
    /// classes (see [`module-level docs`](crate)); `power = 2` is a
    /// reasonable default.
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts `power >= 1`, `region.len() >= 16`,
    /// `region.len() % 4 == 0`, and that the region's word count fits
    /// below the `NIL` sentinel. These are caller-contract violations, not
    /// recoverable conditions, so release builds trust the caller instead
    /// of paying for the check.
    ///
    /// # Safety
    ///
    /// `region` must outlive every pointer this allocator hands out, and
    /// nothing but this `Allocator` may read or write it for as long as
    /// it's claimed.
    pub unsafe fn init(region: &mut [u8], power: u32) -> Self {
        debug_assert!(power >= 1, "power must be at least 1");
        debug_assert!(region.len() >= 16, "region must be at least 16 bytes");
        debug_assert_eq!(region.len() % word::WORD_SIZE, 0, "region length must be a multiple of 4");

        let words = (region.len() / word::WORD_SIZE) as u32;
        debug_assert!((words as u64) < word::NIL as u64, "region exceeds the addressable word count");

        let base = NonNull::new_unchecked(region.as_mut_ptr());
        let mut heads = freelist::empty_heads();

        let payload = words - 2;
        chunk::set_size(base, Offset(0), payload as i32);
        freelist::insert(base, &mut heads, power, Offset(0));

        #[allow(unused_mut)]
        let mut allocator = Self {
            base,
            words,
            power,
            heads,
            #[cfg(feature = "counters")]
            counters: Counters::new(),
        };
        #[cfg(feature = "counters")]
        allocator.counters.refresh_live(allocator.base, allocator.words);
        allocator
    }

    /// Allocates `bytes` bytes, returning `None` if `bytes == 0` or no free
    /// chunk is large enough. Payload contents are unspecified.
    ///
    /// # Safety
    ///
    /// See the type-level safety section. The returned pointer is valid
    /// for reads and writes of `bytes` bytes until released or relocated.
    pub unsafe fn allocate(&mut self, bytes: usize) -> Option<NonNull<u8>> {
        let result = alloc::allocate(self.base, &mut self.heads, self.power, bytes, false);
        self.account(result);
        result
    }

    /// Allocates room for `count` elements of `elem_size` bytes each, zeroed.
    /// Returns `None` on overflow in `count * elem_size`, if the product is
    /// zero, or if no free chunk is large enough.
    ///
    /// # Safety
    ///
    /// Same contract as [`allocate`](Self::allocate).
    pub unsafe fn clear_allocate(&mut self, count: usize, elem_size: usize) -> Option<NonNull<u8>> {
        let bytes = count.checked_mul(elem_size)?;
        let result = alloc::allocate(self.base, &mut self.heads, self.power, bytes, true);
        self.account(result);
        result
    }

    /// Resizes the allocation at `ptr` to `new_bytes`, preserving the first
    /// `min(old_bytes, new_bytes)` bytes of content.
    ///
    /// - `ptr = None` behaves as `allocate(new_bytes)`.
    /// - `new_bytes = 0` behaves as `release(ptr)` and returns `None`.
    /// - Otherwise returns `None` only if growing requires relocation and
    ///   no free chunk is large enough; `ptr` remains valid in that case.
    ///
    /// # Safety
    ///
    /// `ptr`, if present, must be a pointer this allocator previously
    /// returned and not yet released. After this call, only the returned
    /// pointer (if any) is valid — `ptr` itself must not be used again,
    /// even if resize happened to return the same address.
    pub unsafe fn resize(&mut self, ptr: Option<NonNull<u8>>, new_bytes: usize) -> Option<NonNull<u8>> {
        let result = resize::resize(self.base, &mut self.heads, self.power, self.words, ptr, new_bytes);
        #[cfg(feature = "counters")]
        {
            if let Some(p) = result {
                if ptr != Some(p) {
                    let off = chunk::chunk_from_data(self.base, p);
                    let words = chunk::payload_words(self.base, off);
                    self.counters.record_grant(words);
                }
            }
            self.counters.refresh_live(self.base, self.words);
        }
        result
    }

    /// Releases the allocation at `ptr` back to the allocator, coalescing
    /// it with any free physical neighbors. `ptr = None` is a no-op.
    ///
    /// # Safety
    ///
    /// `ptr`, if present, must be a pointer this allocator previously
    /// returned and not yet released; it must not be used again after this
    /// call.
    pub unsafe fn release(&mut self, ptr: Option<NonNull<u8>>) {
        release::release(self.base, &mut self.heads, self.power, self.words, ptr);
        #[cfg(feature = "counters")]
        self.counters.refresh_live(self.base, self.words);
    }

    /// Current allocation statistics. Only available with the `counters`
    /// feature enabled.
    #[cfg(feature = "counters")]
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    #[cfg(feature = "counters")]
    unsafe fn account(&mut self, result: Option<NonNull<u8>>) {
        if let Some(p) = result {
            let off = chunk::chunk_from_data(self.base, p);
            let words = chunk::payload_words(self.base, off);
            self.counters.record_grant(words);
        }
        self.counters.refresh_live(self.base, self.words);
    }

    #[cfg(not(feature = "counters"))]
    #[inline]
    unsafe fn account(&mut self, _result: Option<NonNull<u8>>) {}
}
