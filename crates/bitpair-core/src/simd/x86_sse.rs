//! 128-bit Harley–Seal intersection kernel for x86_64 (SSE4.1 + POPCNT).
//!
//! The narrowest SIMD width has no cheap in-register popcount, so the
//! carry-save tree is popcounted by extracting both 64-bit halves and using
//! the hardware `popcnt` instruction, accumulating into a scalar counter.
//!
//! All functions require runtime SSE4.1 + POPCNT detection before calling.

#![allow(clippy::cast_sign_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]

use std::arch::x86_64::{
    __m128i, _mm_and_si128, _mm_cvtsi128_si64, _mm_loadu_si128, _mm_or_si128, _mm_setzero_si128,
    _mm_unpackhi_epi64, _mm_xor_si128,
};

/// Carry-save adder: returns `(sum, carry)` with `sum = a ^ b ^ c` and
/// `carry = majority(a, b, c)`, applied bitwise across the 128-bit lane.
#[inline]
#[target_feature(enable = "sse4.1")]
unsafe fn csa128(a: __m128i, b: __m128i, c: __m128i) -> (__m128i, __m128i) {
    let u = _mm_xor_si128(a, b);
    let sum = _mm_xor_si128(u, c);
    let carry = _mm_or_si128(_mm_and_si128(a, b), _mm_and_si128(u, c));
    (sum, carry)
}

/// Popcount of one 128-bit register via its two 64-bit halves.
#[inline]
#[target_feature(enable = "sse4.1", enable = "popcnt")]
unsafe fn popcnt128(v: __m128i) -> u64 {
    let lo = _mm_cvtsi128_si64(v) as u64;
    let hi = _mm_cvtsi128_si64(_mm_unpackhi_epi64(v, v)) as u64;
    u64::from(lo.count_ones()) + u64::from(hi.count_ones())
}

/// SSE4.1 Harley–Seal popcount of `a AND b`.
///
/// Processes sixteen 128-bit words (32 `u64`) per iteration through a
/// carry-save adder tree, popcounting only the `sixteens` carry per chunk.
/// Remaining full SIMD words are popcounted directly and the odd trailing
/// `u64`, if any, is handled scalar. Every tail contribution accumulates
/// into the running count.
///
/// # Safety
///
/// Caller must ensure the CPU supports SSE4.1 and POPCNT (enforced by
/// `#[target_feature]` and runtime detection in the dispatch layer).
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1", enable = "popcnt")]
pub(crate) unsafe fn intersect_sse(a: &[u64], b: &[u64]) -> u64 {
    // SAFETY: This function is only called after runtime feature detection
    // confirms SSE4.1 + POPCNT.
    // - `_mm_loadu_si128` handles unaligned loads safely
    // - Pointer arithmetic stays within bounds: SIMD offsets cover
    //   `n_simd * 2 <= len` words, the scalar tail covers the rest
    let len = a.len().min(b.len());
    let n_simd = len / 2;
    let limit = n_simd - n_simd % 16;

    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    // Loads the AND of the k-th 128-bit word of each operand.
    let and_at = |k: usize| -> __m128i {
        // SAFETY: callers pass k < n_simd, so k * 2 + 1 < len and both
        // unaligned loads stay in bounds.
        unsafe {
            let va = _mm_loadu_si128(a_ptr.add(k * 2).cast::<__m128i>());
            let vb = _mm_loadu_si128(b_ptr.add(k * 2).cast::<__m128i>());
            _mm_and_si128(va, vb)
        }
    };

    let mut ones = _mm_setzero_si128();
    let mut twos = _mm_setzero_si128();
    let mut fours = _mm_setzero_si128();
    let mut eights = _mm_setzero_si128();
    let mut cnt = 0u64;

    let mut i = 0;
    while i < limit {
        let (s, twos_a) = csa128(ones, and_at(i), and_at(i + 1));
        ones = s;
        let (s, twos_b) = csa128(ones, and_at(i + 2), and_at(i + 3));
        ones = s;
        let (s, fours_a) = csa128(twos, twos_a, twos_b);
        twos = s;
        let (s, twos_a) = csa128(ones, and_at(i + 4), and_at(i + 5));
        ones = s;
        let (s, twos_b) = csa128(ones, and_at(i + 6), and_at(i + 7));
        ones = s;
        let (s, fours_b) = csa128(twos, twos_a, twos_b);
        twos = s;
        let (s, eights_a) = csa128(fours, fours_a, fours_b);
        fours = s;
        let (s, twos_a) = csa128(ones, and_at(i + 8), and_at(i + 9));
        ones = s;
        let (s, twos_b) = csa128(ones, and_at(i + 10), and_at(i + 11));
        ones = s;
        let (s, fours_a) = csa128(twos, twos_a, twos_b);
        twos = s;
        let (s, twos_a) = csa128(ones, and_at(i + 12), and_at(i + 13));
        ones = s;
        let (s, twos_b) = csa128(ones, and_at(i + 14), and_at(i + 15));
        ones = s;
        let (s, fours_b) = csa128(twos, twos_a, twos_b);
        twos = s;
        let (s, eights_b) = csa128(fours, fours_a, fours_b);
        fours = s;
        let (s, sixteens) = csa128(eights, eights_a, eights_b);
        eights = s;

        cnt += popcnt128(sixteens);
        i += 16;
    }

    // Fold the residual accumulators: each level weighs a power of two.
    cnt <<= 4;
    cnt += popcnt128(eights) << 3;
    cnt += popcnt128(fours) << 2;
    cnt += popcnt128(twos) << 1;
    cnt += popcnt128(ones);

    // Remaining full 128-bit words.
    while i < n_simd {
        cnt += popcnt128(and_at(i));
        i += 1;
    }

    // Odd trailing u64.
    if len % 2 == 1 {
        cnt += u64::from((a[len - 1] & b[len - 1]).count_ones());
    }

    cnt
}
