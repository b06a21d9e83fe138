//! 512-bit Harley–Seal intersection kernel for x86_64 (AVX-512BW).
//!
//! The ternary-logic instruction fuses each carry-save adder into two
//! opcodes (`0x96` = three-way XOR for the sum, `0xe8` = majority for the
//! carry). Per-register popcounts use the classic bit-slice reduction
//! (masks 0x55 / 0x33 / 0x0F) finished with a sum-of-absolute-differences
//! into the eight 64-bit lanes.
//!
//! Based on the Harley–Seal scheme of Lemire, Kurz and Mula, "Faster
//! Population Counts using AVX2 Instructions" (arXiv:1611.07612).
//!
//! All functions require runtime AVX-512BW detection before calling.

#![allow(clippy::cast_sign_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::wildcard_imports)]

use std::arch::x86_64::*;

/// Carry-save adder: returns `(sum, carry)` fused into two ternary-logic
/// ops; `sum = a ^ b ^ c`, `carry = majority(a, b, c)`.
#[inline]
#[target_feature(enable = "avx512f")]
unsafe fn csa512(a: __m512i, b: __m512i, c: __m512i) -> (__m512i, __m512i) {
    let sum = _mm512_ternarylogic_epi32::<0x96>(a, b, c);
    let carry = _mm512_ternarylogic_epi32::<0xe8>(a, b, c);
    (sum, carry)
}

/// Per-lane popcount of a 512-bit register, summed into its eight u64
/// lanes via the bit-slice reduction.
#[inline]
#[target_feature(enable = "avx512f", enable = "avx512bw")]
unsafe fn popcnt512(v: __m512i) -> __m512i {
    let m1 = _mm512_set1_epi8(0x55);
    let m2 = _mm512_set1_epi8(0x33);
    let m4 = _mm512_set1_epi8(0x0f);

    let t1 = _mm512_sub_epi8(v, _mm512_and_si512(_mm512_srli_epi16::<1>(v), m1));
    let t2 = _mm512_add_epi8(
        _mm512_and_si512(t1, m2),
        _mm512_and_si512(_mm512_srli_epi16::<2>(t1), m2),
    );
    let t3 = _mm512_and_si512(_mm512_add_epi8(t2, _mm512_srli_epi16::<4>(t2)), m4);

    _mm512_sad_epu8(t3, _mm512_setzero_si512())
}

/// AVX-512BW Harley–Seal popcount of `a AND b`.
///
/// Processes sixteen 512-bit words (128 `u64`) per iteration through a
/// ternary-logic carry-save adder tree, popcounting only the `sixteens`
/// carry per chunk into a lane-wise u64 counter. Remaining full SIMD words
/// are popcounted directly; up to seven trailing `u64` are handled scalar.
///
/// # Safety
///
/// Caller must ensure the CPU supports AVX-512F and AVX-512BW (enforced by
/// `#[target_feature]` and runtime detection in the dispatch layer).
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn intersect_avx512(a: &[u64], b: &[u64]) -> u64 {
    // SAFETY: This function is only called after runtime feature detection
    // confirms AVX-512BW.
    // - `_mm512_loadu_epi64` handles unaligned loads safely
    // - Pointer arithmetic stays within bounds: SIMD offsets cover
    //   `n_simd * 8 <= len` words, the scalar tail covers the rest
    let len = a.len().min(b.len());
    let n_simd = len / 8;
    let limit = n_simd - n_simd % 16;

    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    // Loads the AND of the k-th 512-bit word of each operand.
    let and_at = |k: usize| -> __m512i {
        // SAFETY: callers pass k < n_simd, so k * 8 + 7 < len and both
        // unaligned loads stay in bounds.
        unsafe {
            let va = _mm512_loadu_epi64(a_ptr.add(k * 8).cast::<i64>());
            let vb = _mm512_loadu_epi64(b_ptr.add(k * 8).cast::<i64>());
            _mm512_and_si512(va, vb)
        }
    };

    let mut cnt = _mm512_setzero_si512();
    let mut ones = _mm512_setzero_si512();
    let mut twos = _mm512_setzero_si512();
    let mut fours = _mm512_setzero_si512();
    let mut eights = _mm512_setzero_si512();

    let mut i = 0;
    while i < limit {
        let (s, twos_a) = csa512(ones, and_at(i), and_at(i + 1));
        ones = s;
        let (s, twos_b) = csa512(ones, and_at(i + 2), and_at(i + 3));
        ones = s;
        let (s, fours_a) = csa512(twos, twos_a, twos_b);
        twos = s;
        let (s, twos_a) = csa512(ones, and_at(i + 4), and_at(i + 5));
        ones = s;
        let (s, twos_b) = csa512(ones, and_at(i + 6), and_at(i + 7));
        ones = s;
        let (s, fours_b) = csa512(twos, twos_a, twos_b);
        twos = s;
        let (s, eights_a) = csa512(fours, fours_a, fours_b);
        fours = s;
        let (s, twos_a) = csa512(ones, and_at(i + 8), and_at(i + 9));
        ones = s;
        let (s, twos_b) = csa512(ones, and_at(i + 10), and_at(i + 11));
        ones = s;
        let (s, fours_a) = csa512(twos, twos_a, twos_b);
        twos = s;
        let (s, twos_a) = csa512(ones, and_at(i + 12), and_at(i + 13));
        ones = s;
        let (s, twos_b) = csa512(ones, and_at(i + 14), and_at(i + 15));
        ones = s;
        let (s, fours_b) = csa512(twos, twos_a, twos_b);
        twos = s;
        let (s, eights_b) = csa512(fours, fours_a, fours_b);
        fours = s;
        let (s, sixteens) = csa512(eights, eights_a, eights_b);
        eights = s;

        cnt = _mm512_add_epi64(cnt, popcnt512(sixteens));
        i += 16;
    }

    // Fold the residual accumulators: each level weighs a power of two.
    cnt = _mm512_slli_epi64::<4>(cnt);
    cnt = _mm512_add_epi64(cnt, _mm512_slli_epi64::<3>(popcnt512(eights)));
    cnt = _mm512_add_epi64(cnt, _mm512_slli_epi64::<2>(popcnt512(fours)));
    cnt = _mm512_add_epi64(cnt, _mm512_slli_epi64::<1>(popcnt512(twos)));
    cnt = _mm512_add_epi64(cnt, popcnt512(ones));

    // Remaining full 512-bit words.
    while i < n_simd {
        cnt = _mm512_add_epi64(cnt, popcnt512(and_at(i)));
        i += 1;
    }

    let mut count = _mm512_reduce_add_epi64(cnt) as u64;

    // Up to seven trailing u64.
    for k in (n_simd * 8)..len {
        count += u64::from((a[k] & b[k]).count_ones());
    }

    count
}
