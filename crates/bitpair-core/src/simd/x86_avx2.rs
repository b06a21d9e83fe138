//! 256-bit Harley–Seal intersection kernel for x86_64 (AVX2).
//!
//! AVX2 has no packed popcount instruction, so per-register popcounts use
//! two nibble lookup tables combined with a sum-of-absolute-differences,
//! yielding per-byte popcounts summed into the four 64-bit lanes. The
//! chunk counter therefore stays in a vector register until the final
//! horizontal sum.
//!
//! Based on the Harley–Seal scheme of Lemire, Kurz and Mula, "Faster
//! Population Counts using AVX2 Instructions" (arXiv:1611.07612).
//!
//! All functions require runtime AVX2 detection before calling.

#![allow(clippy::cast_sign_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::wildcard_imports)]

use std::arch::x86_64::*;

/// Carry-save adder: returns `(sum, carry)` with `sum = a ^ b ^ c` and
/// `carry = majority(a, b, c)`, applied bitwise across the 256-bit lane.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn csa256(a: __m256i, b: __m256i, c: __m256i) -> (__m256i, __m256i) {
    let u = _mm256_xor_si256(a, b);
    let sum = _mm256_xor_si256(u, c);
    let carry = _mm256_or_si256(_mm256_and_si256(a, b), _mm256_and_si256(u, c));
    (sum, carry)
}

/// Per-lane popcount of a 256-bit register, summed into its four u64 lanes.
///
/// The first table maps a low nibble to `popcount + 4`, the second maps a
/// high nibble to `4 - popcount`; their byte-wise absolute difference is
/// exactly `popcount(lo) + popcount(hi)`, which `_mm256_sad_epu8` sums per
/// 8-byte group.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn popcnt256(v: __m256i) -> __m256i {
    let lookup_lo = _mm256_setr_epi8(
        4, 5, 5, 6, 5, 6, 6, 7, 5, 6, 6, 7, 6, 7, 7, 8, 4, 5, 5, 6, 5, 6, 6, 7, 5, 6, 6, 7, 6, 7,
        7, 8,
    );
    let lookup_hi = _mm256_setr_epi8(
        4, 3, 3, 2, 3, 2, 2, 1, 3, 2, 2, 1, 2, 1, 1, 0, 4, 3, 3, 2, 3, 2, 2, 1, 3, 2, 2, 1, 2, 1,
        1, 0,
    );
    let low_mask = _mm256_set1_epi8(0x0f);

    let lo = _mm256_and_si256(v, low_mask);
    let hi = _mm256_and_si256(_mm256_srli_epi16::<4>(v), low_mask);
    let cnt_lo = _mm256_shuffle_epi8(lookup_lo, lo);
    let cnt_hi = _mm256_shuffle_epi8(lookup_hi, hi);

    _mm256_sad_epu8(cnt_lo, cnt_hi)
}

/// Horizontal sum of the four u64 lanes of a counter register.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn hsum256_epi64(v: __m256i) -> u64 {
    let mut lanes = [0u64; 4];
    _mm256_storeu_si256(lanes.as_mut_ptr().cast::<__m256i>(), v);
    lanes[0] + lanes[1] + lanes[2] + lanes[3]
}

/// AVX2 Harley–Seal popcount of `a AND b`.
///
/// Processes sixteen 256-bit words (64 `u64`) per iteration through a
/// carry-save adder tree, popcounting only the `sixteens` carry per chunk
/// into a lane-wise u64 counter. Remaining full SIMD words are popcounted
/// directly; up to three trailing `u64` are handled scalar.
///
/// # Safety
///
/// Caller must ensure the CPU supports AVX2 (enforced by
/// `#[target_feature]` and runtime detection in the dispatch layer).
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn intersect_avx2(a: &[u64], b: &[u64]) -> u64 {
    // SAFETY: This function is only called after runtime feature detection
    // confirms AVX2.
    // - `_mm256_loadu_si256` handles unaligned loads safely
    // - Pointer arithmetic stays within bounds: SIMD offsets cover
    //   `n_simd * 4 <= len` words, the scalar tail covers the rest
    let len = a.len().min(b.len());
    let n_simd = len / 4;
    let limit = n_simd - n_simd % 16;

    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    // Loads the AND of the k-th 256-bit word of each operand.
    let and_at = |k: usize| -> __m256i {
        // SAFETY: callers pass k < n_simd, so k * 4 + 3 < len and both
        // unaligned loads stay in bounds.
        unsafe {
            let va = _mm256_loadu_si256(a_ptr.add(k * 4).cast::<__m256i>());
            let vb = _mm256_loadu_si256(b_ptr.add(k * 4).cast::<__m256i>());
            _mm256_and_si256(va, vb)
        }
    };

    let mut cnt = _mm256_setzero_si256();
    let mut ones = _mm256_setzero_si256();
    let mut twos = _mm256_setzero_si256();
    let mut fours = _mm256_setzero_si256();
    let mut eights = _mm256_setzero_si256();

    let mut i = 0;
    while i < limit {
        let (s, twos_a) = csa256(ones, and_at(i), and_at(i + 1));
        ones = s;
        let (s, twos_b) = csa256(ones, and_at(i + 2), and_at(i + 3));
        ones = s;
        let (s, fours_a) = csa256(twos, twos_a, twos_b);
        twos = s;
        let (s, twos_a) = csa256(ones, and_at(i + 4), and_at(i + 5));
        ones = s;
        let (s, twos_b) = csa256(ones, and_at(i + 6), and_at(i + 7));
        ones = s;
        let (s, fours_b) = csa256(twos, twos_a, twos_b);
        twos = s;
        let (s, eights_a) = csa256(fours, fours_a, fours_b);
        fours = s;
        let (s, twos_a) = csa256(ones, and_at(i + 8), and_at(i + 9));
        ones = s;
        let (s, twos_b) = csa256(ones, and_at(i + 10), and_at(i + 11));
        ones = s;
        let (s, fours_a) = csa256(twos, twos_a, twos_b);
        twos = s;
        let (s, twos_a) = csa256(ones, and_at(i + 12), and_at(i + 13));
        ones = s;
        let (s, twos_b) = csa256(ones, and_at(i + 14), and_at(i + 15));
        ones = s;
        let (s, fours_b) = csa256(twos, twos_a, twos_b);
        twos = s;
        let (s, eights_b) = csa256(fours, fours_a, fours_b);
        fours = s;
        let (s, sixteens) = csa256(eights, eights_a, eights_b);
        eights = s;

        cnt = _mm256_add_epi64(cnt, popcnt256(sixteens));
        i += 16;
    }

    // Fold the residual accumulators: each level weighs a power of two.
    cnt = _mm256_slli_epi64::<4>(cnt);
    cnt = _mm256_add_epi64(cnt, _mm256_slli_epi64::<3>(popcnt256(eights)));
    cnt = _mm256_add_epi64(cnt, _mm256_slli_epi64::<2>(popcnt256(fours)));
    cnt = _mm256_add_epi64(cnt, _mm256_slli_epi64::<1>(popcnt256(twos)));
    cnt = _mm256_add_epi64(cnt, popcnt256(ones));

    // Remaining full 256-bit words.
    while i < n_simd {
        cnt = _mm256_add_epi64(cnt, popcnt256(and_at(i)));
        i += 1;
    }

    let mut count = hsum256_epi64(cnt);

    // Up to three trailing u64.
    for k in (n_simd * 4)..len {
        count += u64::from((a[k] & b[k]).count_ones());
    }

    count
}
