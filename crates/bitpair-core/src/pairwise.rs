//! Cache-blocked all-pairs drivers over a bitmap collection.
//!
//! The N×N upper-triangular pair space is tiled into square blocks of B
//! rows so the left operand of a pair stays resident in L2 across a block
//! of columns. B is derived from a working-set byte target and the vector
//! width; the summation itself is a plain u64 accumulation, so the result
//! is identical for every block size.
//!
//! Two drivers share the tiling: the dense driver runs the resolved SIMD
//! kernel on every pair, the sparse-aware driver probes set-bit position
//! lists for pairs where either vector falls below a set-bit cutoff.

use serde::{Deserialize, Serialize};

use crate::simd::{intersect_sparse, prefetch_words, IntersectEngine};

/// Default working-set target in bytes driving the block size.
pub const DEFAULT_BLOCK_TARGET_BYTES: usize = 262_144;

/// Default set-bit count below which a pair takes the sparse probe kernel.
pub const DEFAULT_SPARSE_CUTOFF: u32 = 50;

/// Block rows used when a vector is too wide for even one row to meet the
/// working-set target.
const FALLBACK_BLOCK_ROWS: usize = 3;

/// Tunables for the blocked pair drivers.
///
/// The defaults match the documented constants; embedders with known cache
/// geometry or bit-density profiles can override per call through the
/// `*_with_config` entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairwiseConfig {
    /// Working-set target in bytes for one block of left-operand rows.
    pub block_target_bytes: usize,
    /// Set-bit count below which the sparse kernel handles a pair.
    pub sparse_cutoff: u32,
}

impl Default for PairwiseConfig {
    fn default() -> Self {
        Self {
            block_target_bytes: DEFAULT_BLOCK_TARGET_BYTES,
            sparse_cutoff: DEFAULT_SPARSE_CUTOFF,
        }
    }
}

/// Number of block rows fitting the working-set target for a vector width.
pub(crate) fn block_rows(words_per_vector: usize, target_bytes: usize) -> usize {
    let rows = target_bytes / (words_per_vector * std::mem::size_of::<u64>());
    if rows == 0 {
        FALLBACK_BLOCK_ROWS
    } else {
        rows
    }
}

/// Visits every unordered pair `(u, v)` with `u < v < n_vectors` exactly
/// once in blocked order, summing the closure's contributions.
///
/// Row indices are grouped into blocks of `block_rows`. For each full
/// block: the diagonal pairs inside the block, then full square blocks to
/// its right, then the residual right-edge columns. Rows left over after
/// the last full block pair off among themselves in a plain triangular
/// tail.
fn for_each_pair_blocked<F>(n_vectors: usize, block_rows: usize, mut pair: F) -> u64
where
    F: FnMut(usize, usize) -> u64,
{
    let mut total = 0u64;
    let b = block_rows;

    let mut i = 0;
    while i + b <= n_vectors {
        // Diagonal block at (i, i).
        for u in i..i + b {
            for v in (u + 1)..(i + b) {
                total += pair(u, v);
            }
        }

        // Full square blocks to the right.
        let mut j = i + b;
        while j + b <= n_vectors {
            for u in i..i + b {
                for v in j..j + b {
                    total += pair(u, v);
                }
            }
            j += b;
        }

        // Right-edge residual columns.
        for v in j..n_vectors {
            for u in i..i + b {
                total += pair(u, v);
            }
        }

        i += b;
    }

    // Triangular tail over the remaining rows.
    for u in i..n_vectors {
        for v in (u + 1)..n_vectors {
            total += pair(u, v);
        }
    }

    total
}

/// Sum of `popcount(B_u AND B_v)` over all unordered pairs of the
/// collection, with default tunables.
///
/// `data` holds `n_vectors` bitmaps of `words_per_vector` words each,
/// vector `i` occupying words `[i * words_per_vector, (i + 1) *
/// words_per_vector)`.
#[inline]
#[must_use]
pub fn pairwise_intersect_count(data: &[u64], n_vectors: usize, words_per_vector: usize) -> u64 {
    pairwise_intersect_count_with_config(
        data,
        n_vectors,
        words_per_vector,
        &PairwiseConfig::default(),
    )
}

/// Dense all-pairs sum with explicit tunables.
#[must_use]
pub fn pairwise_intersect_count_with_config(
    data: &[u64],
    n_vectors: usize,
    words_per_vector: usize,
    config: &PairwiseConfig,
) -> u64 {
    debug_assert!(
        data.len() >= n_vectors * words_per_vector,
        "buffer shorter than the collection it claims to hold"
    );

    if n_vectors < 2 || words_per_vector == 0 {
        return 0;
    }

    let engine = IntersectEngine::new(words_per_vector);
    let rows = block_rows(words_per_vector, config.block_target_bytes);
    let row = |r: usize| &data[r * words_per_vector..(r + 1) * words_per_vector];

    for_each_pair_blocked(n_vectors, rows, |u, v| {
        if v + 1 < n_vectors {
            prefetch_words(row(v + 1));
        }
        engine.intersect(row(u), row(v))
    })
}

/// Sparse-aware all-pairs sum with default tunables.
///
/// `n_alts[i]` counts the set bits of vector `i`; its bit positions live
/// in `alt_positions[alt_offsets[i]..alt_offsets[i] + n_alts[i]]` in
/// strictly ascending order. Pairs where either count falls below the
/// cutoff are probed through the position lists instead of the dense
/// kernel; the result is identical either way for faithful lists.
#[inline]
#[must_use]
pub fn pairwise_intersect_count_sparse(
    data: &[u64],
    n_vectors: usize,
    words_per_vector: usize,
    n_alts: &[u32],
    alt_positions: &[u32],
    alt_offsets: &[u32],
) -> u64 {
    pairwise_intersect_count_sparse_with_config(
        data,
        n_vectors,
        words_per_vector,
        n_alts,
        alt_positions,
        alt_offsets,
        &PairwiseConfig::default(),
    )
}

/// Sparse-aware all-pairs sum with explicit tunables.
#[must_use]
pub fn pairwise_intersect_count_sparse_with_config(
    data: &[u64],
    n_vectors: usize,
    words_per_vector: usize,
    n_alts: &[u32],
    alt_positions: &[u32],
    alt_offsets: &[u32],
    config: &PairwiseConfig,
) -> u64 {
    debug_assert!(
        data.len() >= n_vectors * words_per_vector,
        "buffer shorter than the collection it claims to hold"
    );
    debug_assert_eq!(n_alts.len(), n_vectors, "one set-bit count per vector");
    debug_assert_eq!(alt_offsets.len(), n_vectors, "one list offset per vector");

    if n_vectors < 2 || words_per_vector == 0 {
        return 0;
    }

    let engine = IntersectEngine::new(words_per_vector);
    let rows = block_rows(words_per_vector, config.block_target_bytes);
    let cutoff = config.sparse_cutoff;
    let row = |r: usize| &data[r * words_per_vector..(r + 1) * words_per_vector];
    let positions = |r: usize| {
        let start = alt_offsets[r] as usize;
        &alt_positions[start..start + n_alts[r] as usize]
    };

    for_each_pair_blocked(n_vectors, rows, |u, v| {
        if n_alts[u] < cutoff || n_alts[v] < cutoff {
            intersect_sparse(row(u), row(v), positions(u), positions(v))
        } else {
            engine.intersect(row(u), row(v))
        }
    })
}
