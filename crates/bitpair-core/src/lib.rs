//! # `bitpair` Core
//!
//! SIMD-accelerated all-pairs bitmap intersection counting.
//!
//! Given a collection of N equally wide bitmap vectors, `bitpair` computes
//! the sum over every unordered pair of the population count of their
//! bitwise AND. The all-pairs reduction dominates pairwise set-similarity
//! and genotype workloads, so the crate focuses entirely on its throughput:
//!
//! - **Harley–Seal kernels**: carry-save popcount reduction at 128, 256 and
//!   512 bits (SSE4.1, AVX2, AVX-512BW) with a scalar fallback
//! - **Runtime dispatch**: the best supported kernel is detected once per
//!   process and resolved to a bare function pointer per vector width
//! - **Cache-blocked driver**: the upper-triangular pair space is tiled so
//!   the left operand stays resident in L2 across a block of columns
//! - **Sparse-aware driver**: vectors with few set bits are probed through
//!   an explicit position list instead of a full dense scan
//!
//! ## Quick Start
//!
//! ```rust
//! use bitpair_core::{pairwise_intersect_count, AlignedBitmaps};
//!
//! fn main() -> Result<(), bitpair_core::Error> {
//!     // Three vectors of 128 bits (2 words) each.
//!     let mut maps = AlignedBitmaps::zeroed(3, 2)?;
//!     maps.set_bit(0, 0);
//!     maps.set_bit(1, 0);
//!     maps.set_bit(2, 65);
//!
//!     // Only the pair (0, 1) shares a bit.
//!     let total = pairwise_intersect_count(maps.words(), 3, 2);
//!     assert_eq!(total, 1);
//!     Ok(())
//! }
//! ```
//!
//! The collection is a single contiguous `&[u64]` buffer, vector `i`
//! occupying words `[i * words_per_vector, (i + 1) * words_per_vector)`.
//! Buffers allocated through [`AlignedBitmaps`] satisfy the alignment
//! reported by [`required_alignment`]; plain `Vec<u64>` buffers work too,
//! at a potential throughput cost on wide-SIMD machines.

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]

pub mod collection;
#[cfg(test)]
mod collection_tests;
pub mod error;
pub mod pairwise;
pub mod simd;

pub use collection::{AlignedBitmaps, SparseIndex};
pub use error::{Error, Result};
pub use pairwise::{
    pairwise_intersect_count, pairwise_intersect_count_sparse,
    pairwise_intersect_count_sparse_with_config, pairwise_intersect_count_with_config,
    PairwiseConfig, DEFAULT_BLOCK_TARGET_BYTES, DEFAULT_SPARSE_CUTOFF,
};
pub use simd::{
    intersect_words, required_alignment, simd_level, warmup, IntersectEngine, SimdLevel,
};
