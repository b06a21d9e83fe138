//! Runtime SIMD level detection and kernel resolution.
//!
//! This module provides:
//! - `SimdLevel` enum for representing detected SIMD capability
//! - `simd_level()` for cached runtime detection
//! - `required_alignment()` mapping the level to a buffer alignment
//! - `warmup()` for eliminating cold-start latency
//! - `intersect_words()` with per-call dispatch
//! - `IntersectEngine` resolving the kernel once per vector width

use tracing::{debug, trace};

use super::scalar;

// =============================================================================
// Cached SIMD Level Detection
// =============================================================================

/// SIMD capability level detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimdLevel {
    /// AVX-512BW available (`x86_64` only).
    Avx512,
    /// AVX2 available (`x86_64` only).
    Avx2,
    /// SSE4.1 + POPCNT available (`x86_64` only).
    Sse41,
    /// Scalar fallback.
    Scalar,
}

/// Minimum words per vector before the 512-bit kernel pays off (16 lanes).
const MIN_WORDS_AVX512: usize = 128;
/// Minimum words per vector before the 256-bit kernel pays off.
const MIN_WORDS_AVX2: usize = 64;
/// Minimum words per vector before the 128-bit kernel pays off.
const MIN_WORDS_SSE: usize = 32;

/// Cached SIMD level - detected once at first use.
static SIMD_LEVEL: std::sync::OnceLock<SimdLevel> = std::sync::OnceLock::new();

/// Detects the best available SIMD level for the current CPU.
///
/// `is_x86_feature_detected!` performs both the CPUID capability check and
/// the XCR0 OS-enablement check, so a flag only survives when the kernel
/// actually saves the corresponding register state. Each tier also demands
/// the features of every narrower tier it may fall back to.
fn detect_simd_level() -> SimdLevel {
    let level = probe_simd_level();
    debug!(?level, "runtime SIMD capability detected");
    level
}

fn probe_simd_level() -> SimdLevel {
    #[cfg(target_arch = "x86_64")]
    {
        let has_sse = is_x86_feature_detected!("sse4.1") && is_x86_feature_detected!("popcnt");
        if has_sse {
            if is_x86_feature_detected!("avx2") {
                if is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512bw") {
                    return SimdLevel::Avx512;
                }
                return SimdLevel::Avx2;
            }
            return SimdLevel::Sse41;
        }
    }

    SimdLevel::Scalar
}

/// Returns the cached SIMD capability level.
///
/// Detection runs at most once per process; concurrent first callers all
/// observe the same value.
#[inline]
#[must_use]
pub fn simd_level() -> SimdLevel {
    *SIMD_LEVEL.get_or_init(detect_simd_level)
}

/// Minimum buffer alignment (bytes) recommended for collection buffers.
///
/// Returns 64, 32, 16 or 8 depending on the widest kernel this CPU can
/// run. Kernels use unaligned loads, so a less aligned buffer is a
/// throughput concern rather than a correctness one; [`crate::AlignedBitmaps`]
/// honors this value.
#[inline]
#[must_use]
pub fn required_alignment() -> u32 {
    match simd_level() {
        SimdLevel::Avx512 => 64,
        SimdLevel::Avx2 => 32,
        SimdLevel::Sse41 => 16,
        SimdLevel::Scalar => 8,
    }
}

/// Warms up capability detection and the widest kernel path.
///
/// Call once at startup in latency-sensitive applications so the first
/// real intersection does not pay the detection and instruction-decode
/// cost.
#[inline]
pub fn warmup() {
    let _ = simd_level();

    let a = vec![!0u64; MIN_WORDS_AVX512];
    let b = vec![!0u64; MIN_WORDS_AVX512];
    for _ in 0..3 {
        let _ = intersect_words(&a, &b);
    }
}

// =============================================================================
// Kernel resolution
// =============================================================================

/// Resolves the best kernel for (level, words per vector).
///
/// The widest kernel whose minimum width is met wins; a wide-SIMD CPU with
/// a short vector falls through to the next narrower kernel rather than
/// straight to scalar. The choice is a pure function of its arguments, so
/// it is stable for the process lifetime.
fn resolve_kernel(level: SimdLevel, words_per_vector: usize) -> fn(&[u64], &[u64]) -> u64 {
    match level {
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 if words_per_vector >= MIN_WORDS_AVX512 => |a, b| {
            // SAFETY: simd_level() confirmed AVX-512BW support at resolution.
            unsafe { super::intersect_avx512(a, b) }
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 if words_per_vector >= MIN_WORDS_AVX2 => |a, b| {
            // SAFETY: both levels imply AVX2 support (detection demands it).
            unsafe { super::intersect_avx2(a, b) }
        },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx512 | SimdLevel::Avx2 | SimdLevel::Sse41
            if words_per_vector >= MIN_WORDS_SSE =>
        {
            |a, b| {
                // SAFETY: every non-scalar level implies SSE4.1 + POPCNT
                // support (detection demands it).
                unsafe { super::intersect_sse(a, b) }
            }
        }
        _ => scalar::intersect_scalar,
    }
}

/// Intersection popcount of two word arrays with per-call dispatch.
///
/// Equivalent to `IntersectEngine::new(a.len()).intersect(a, b)`; prefer
/// an [`IntersectEngine`] when the same width is used repeatedly.
///
/// # Panics
///
/// Panics when `a.len() != b.len()`.
#[inline]
#[must_use]
pub fn intersect_words(a: &[u64], b: &[u64]) -> u64 {
    assert_eq!(a.len(), b.len(), "bitmap word counts must match");
    resolve_kernel(simd_level(), a.len())(a, b)
}

// =============================================================================
// IntersectEngine — zero-overhead dispatch via a cached function pointer
// =============================================================================

/// Zero-overhead SIMD dispatch via a cached function pointer.
///
/// Eliminates per-call match dispatch by resolving the best kernel once at
/// construction time for a given vector width. The blocked pair drivers
/// build one engine per call and reuse it for every pair; callers running
/// their own loops over a fixed width should do the same.
///
/// Uses a bare `fn` pointer (not `dyn Fn`), so the per-pair cost is a
/// single indirect call and the engine is `Copy`.
///
/// # Example
///
/// ```
/// use bitpair_core::IntersectEngine;
///
/// let engine = IntersectEngine::new(128);
/// let a = vec![0xF0F0_F0F0_F0F0_F0F0u64; 128];
/// let b = vec![0xFFFF_0000_FFFF_0000u64; 128];
/// let count = engine.intersect(&a, &b);
/// assert_eq!(count, 128 * 16);
/// ```
#[derive(Clone, Copy)]
pub struct IntersectEngine {
    kernel_fn: fn(&[u64], &[u64]) -> u64,
    words_per_vector: usize,
}

impl std::fmt::Debug for IntersectEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntersectEngine")
            .field("words_per_vector", &self.words_per_vector)
            .field("simd_level", &simd_level())
            .finish_non_exhaustive()
    }
}

impl IntersectEngine {
    /// Creates an engine resolved for the given vector width in words.
    #[must_use]
    pub fn new(words_per_vector: usize) -> Self {
        let level = simd_level();
        trace!(words_per_vector, ?level, "resolved intersect kernel");
        Self {
            kernel_fn: resolve_kernel(level, words_per_vector),
            words_per_vector,
        }
    }

    /// Intersection popcount through the pre-resolved kernel.
    #[allow(clippy::inline_always)] // Single indirect call on the per-pair hot path
    #[inline(always)]
    #[must_use]
    pub fn intersect(&self, a: &[u64], b: &[u64]) -> u64 {
        debug_assert_eq!(a.len(), b.len(), "bitmap word counts must match");
        debug_assert_eq!(
            a.len(),
            self.words_per_vector,
            "bitmap width mismatch with engine"
        );
        (self.kernel_fn)(a, b)
    }

    /// Returns the vector width in words this engine was resolved for.
    #[inline]
    #[must_use]
    pub fn words_per_vector(&self) -> usize {
        self.words_per_vector
    }
}
