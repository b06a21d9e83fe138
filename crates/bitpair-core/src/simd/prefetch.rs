//! CPU cache prefetch utilities for the intersection kernels.
//!
//! Provides software prefetching hints to warm up CPU caches before
//! word-level data access, reducing memory latency in the probe kernel and
//! the blocked pair drivers.

/// L2 cache line size in bytes (standard for modern x86_64 CPUs).
pub const L2_CACHE_LINE_BYTES: usize = 64;

/// How many probe iterations ahead the sparse kernel prefetches.
///
/// A cache line of `u32` positions holds sixteen entries; a lookahead of
/// eight keeps the hint well inside the already-resident tail of the
/// position list while giving the load enough lead time.
pub const PREFETCH_LOOKAHEAD: usize = 8;

/// Prefetches the start of a word slice into L1 cache (T0 hint).
///
/// # Platform Support
///
/// - **x86_64**: Uses `_mm_prefetch` with `_MM_HINT_T0`
/// - **Other**: No-op (graceful degradation)
///
/// This function is safe because prefetch instructions are hints and
/// cannot cause memory faults even with invalid addresses.
#[inline]
pub fn prefetch_words(words: &[u64]) {
    if words.is_empty() {
        return;
    }

    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: _mm_prefetch is a hint instruction that cannot cause
        // memory faults; the pointer is derived from a valid slice
        // reference (non-empty check above).
        unsafe {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
            _mm_prefetch::<_MM_HINT_T0>(words.as_ptr().cast::<i8>());
        }
    }
}

/// Prefetches the word at `index` into L1 cache (T0 hint).
///
/// Out-of-range indices are ignored, so callers can issue lookahead hints
/// without guarding the tail of their loop.
#[inline]
pub fn prefetch_word_at(words: &[u64], index: usize) {
    if index >= words.len() {
        return;
    }

    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: `index` is in range (checked above) and prefetch hints
        // never fault.
        unsafe {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
            _mm_prefetch::<_MM_HINT_T0>(words.as_ptr().add(index).cast::<i8>());
        }
    }
}
