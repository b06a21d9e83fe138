//! Probe kernel for sparsely populated bitmap vectors.
//!
//! When one operand of a pair carries only a handful of set bits, scanning
//! the full dense buffers wastes bandwidth: probing the other bitmap at
//! each listed position costs `O(min(n1, n2))` loads instead of `O(W/64)`
//! words. The sparse-aware driver switches to this kernel below a
//! configurable set-bit cutoff.

use super::prefetch::{prefetch_word_at, PREFETCH_LOOKAHEAD};

/// Intersection popcount via the shorter of two set-bit position lists.
///
/// `p1` and `p2` list the set-bit indices of `b1` and `b2` in strictly
/// ascending order. The shorter list is iterated and each position is
/// tested against the other dense bitmap, so the result equals
/// `intersect_scalar(b1, b2)` whenever the lists are faithful.
///
/// # Panics
///
/// Panics if a position addresses a word beyond the probed bitmap.
#[inline]
#[must_use]
pub fn intersect_sparse(b1: &[u64], b2: &[u64], p1: &[u32], p2: &[u32]) -> u64 {
    if p1.len() <= p2.len() {
        probe_positions(b2, p1)
    } else {
        probe_positions(b1, p2)
    }
}

/// Tests each listed bit position against a dense bitmap and counts hits.
///
/// Issues a T0 prefetch for the word probed [`PREFETCH_LOOKAHEAD`]
/// iterations ahead; the position list itself streams sequentially and
/// needs no hint.
#[inline]
fn probe_positions(dense: &[u64], positions: &[u32]) -> u64 {
    let mut count = 0u64;

    for (i, &pos) in positions.iter().enumerate() {
        if let Some(&ahead) = positions.get(i + PREFETCH_LOOKAHEAD) {
            prefetch_word_at(dense, (ahead >> 6) as usize);
        }

        let word = (pos >> 6) as usize;
        count += (dense[word] >> (pos & 63)) & 1;
    }

    count
}
