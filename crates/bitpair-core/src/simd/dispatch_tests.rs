//! Tests for runtime SIMD detection, alignment advice and the engine.

use super::{
    intersect_scalar, intersect_words, required_alignment, simd_level, warmup, IntersectEngine,
    SimdLevel,
};

#[test]
fn test_simd_level_cached() {
    let level1 = simd_level();
    let level2 = simd_level();
    assert_eq!(level1, level2, "SIMD level should be consistent");

    match level1 {
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41 | SimdLevel::Scalar => {}
    }
}

#[test]
fn test_required_alignment_matches_level() {
    let alignment = required_alignment();
    assert!(matches!(alignment, 8 | 16 | 32 | 64));

    let expected = match simd_level() {
        SimdLevel::Avx512 => 64,
        SimdLevel::Avx2 => 32,
        SimdLevel::Sse41 => 16,
        SimdLevel::Scalar => 8,
    };
    assert_eq!(alignment, expected);
}

#[test]
fn test_intersect_words_matches_scalar() {
    // Spans the scalar path (short), every fallback tier and the widest
    // kernel threshold.
    for &len in &[0usize, 2, 16, 31, 32, 63, 64, 127, 128, 500] {
        let a: Vec<u64> = (0..len as u64).map(|i| i.wrapping_mul(0x0101_0101_0101_0101)).collect();
        let b: Vec<u64> = (0..len as u64).map(|i| !i.rotate_left(7)).collect();
        assert_eq!(
            intersect_words(&a, &b),
            intersect_scalar(&a, &b),
            "dispatch diverged at {len} words"
        );
    }
}

#[test]
#[should_panic(expected = "bitmap word counts must match")]
fn test_intersect_words_length_mismatch_panics() {
    let a = vec![0u64; 4];
    let b = vec![0u64; 5];
    let _ = intersect_words(&a, &b);
}

#[test]
fn test_warmup_runs() {
    warmup();
    // Warmup must leave the cached level in place.
    let _ = simd_level();
}

#[test]
fn test_engine_matches_scalar() {
    for &len in &[2usize, 32, 64, 128, 300] {
        let engine = IntersectEngine::new(len);
        assert_eq!(engine.words_per_vector(), len);

        let a = vec![0xDEAD_BEEF_DEAD_BEEFu64; len];
        let b = vec![0x0F0F_0F0F_F0F0_F0F0u64; len];
        assert_eq!(engine.intersect(&a, &b), intersect_scalar(&a, &b));
    }
}

#[test]
fn test_engine_is_copy() {
    let engine = IntersectEngine::new(16);
    let copy = engine;
    let a = vec![!0u64; 16];
    assert_eq!(engine.intersect(&a, &a), copy.intersect(&a, &a));
}

#[test]
fn test_engine_debug_reports_level() {
    let engine = IntersectEngine::new(8);
    let debug = format!("{engine:?}");
    assert!(debug.contains("IntersectEngine"));
    assert!(debug.contains("words_per_vector"));
}

#[test]
fn test_engine_resolution_stable() {
    // Two engines for the same width must produce identical sums; the
    // kernel choice is a pure function of (level, width).
    let a: Vec<u64> = (0..256u64).map(|i| i.wrapping_mul(0x9E37_79B9)).collect();
    let b: Vec<u64> = (0..256u64).map(|i| i.wrapping_mul(0x85EB_CA6B)).collect();

    let first = IntersectEngine::new(256).intersect(&a, &b);
    let second = IntersectEngine::new(256).intersect(&a, &b);
    assert_eq!(first, second);
}
