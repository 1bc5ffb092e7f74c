//! Ambient instrumentation (C9), feature-gated and zero-cost when disabled.
//!
//! A small struct of running totals that `Allocator`'s public methods
//! refresh after each operation, purely for observability. Nothing here
//! influences an allocation decision, and with the `counters` feature off
//! this module and every call into it disappear entirely.

use core::ptr::NonNull;

use crate::chunk;
use crate::region;
use crate::word::Offset;

/// Live and lifetime statistics about the allocator's region.
#[derive(Debug, Default, Clone, Copy)]
pub struct Counters {
    allocation_count: u64,
    total_allocation_count: u64,
    allocated_words: u64,
    total_allocated_words: u64,
    available_words: u64,
    fragment_count: u64,
}

impl Counters {
    pub(crate) const fn new() -> Self {
        Self {
            allocation_count: 0,
            total_allocation_count: 0,
            allocated_words: 0,
            total_allocated_words: 0,
            available_words: 0,
            fragment_count: 0,
        }
    }

    /// Live allocations currently outstanding.
    pub fn allocation_count(&self) -> u64 {
        self.allocation_count
    }

    /// Allocations made over the allocator's lifetime, including released ones.
    pub fn total_allocation_count(&self) -> u64 {
        self.total_allocation_count
    }

    /// Payload words currently handed out to live allocations.
    pub fn allocated_words(&self) -> u64 {
        self.allocated_words
    }

    /// Payload words handed out over the allocator's lifetime.
    pub fn total_allocated_words(&self) -> u64 {
        self.total_allocated_words
    }

    /// Payload words currently sitting in free lists.
    pub fn available_words(&self) -> u64 {
        self.available_words
    }

    /// Number of free chunks, a proxy for external fragmentation.
    pub fn fragment_count(&self) -> u64 {
        self.fragment_count
    }

    /// Bumps the lifetime counters for a just-granted allocation of
    /// `granted_words` payload words. Called once per successful
    /// `allocate`/`clear_allocate`/relocating `resize`.
    pub(crate) fn record_grant(&mut self, granted_words: u32) {
        self.total_allocation_count += 1;
        self.total_allocated_words += granted_words as u64;
    }

    /// Recomputes the live counters by walking the region once: every
    /// chunk is either taken (counts toward `allocation_count` /
    /// `allocated_words`) or free (counts toward `fragment_count` /
    /// `available_words`). Called after every public operation.
    pub(crate) unsafe fn refresh_live(&mut self, base: NonNull<u8>, region_words: u32) {
        let mut allocation_count = 0u64;
        let mut allocated_words = 0u64;
        let mut available_words = 0u64;
        let mut fragment_count = 0u64;

        let mut curr = Some(Offset(0));
        while let Some(off) = curr {
            let payload = chunk::payload_words(base, off);
            if chunk::is_free(base, off) {
                fragment_count += 1;
                available_words += payload as u64;
            } else {
                allocation_count += 1;
                allocated_words += payload as u64;
            }
            curr = region::right(base, region_words, off);
        }

        self.allocation_count = allocation_count;
        self.allocated_words = allocated_words;
        self.available_words = available_words;
        self.fragment_count = fragment_count;
    }
}
