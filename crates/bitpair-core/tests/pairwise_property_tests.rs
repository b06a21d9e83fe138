//! Property-based equivalence tests for the all-pairs drivers.
//!
//! These compare the public entry points against a naive upper-triangle
//! double loop on randomized collections: every kernel path, block size
//! and sparse/dense routing decision must produce the identical u64 sum.

use proptest::collection::vec as pvec;
use proptest::prelude::*;

use bitpair_core::{
    intersect_words, pairwise_intersect_count, pairwise_intersect_count_sparse_with_config,
    pairwise_intersect_count_with_config, PairwiseConfig, SparseIndex,
};

const PROP_CASES: u32 = 128;

/// Naive ground truth for the all-pairs sum.
fn naive_pairwise(data: &[u64], n_vectors: usize, words: usize) -> u64 {
    let row = |r: usize| &data[r * words..(r + 1) * words];
    let mut total = 0u64;
    for u in 0..n_vectors {
        for v in (u + 1)..n_vectors {
            total += row(u)
                .iter()
                .zip(row(v))
                .map(|(x, y)| u64::from((x & y).count_ones()))
                .sum::<u64>();
        }
    }
    total
}

/// A collection of up to 16 vectors of up to 48 words, dense words.
fn dense_collection() -> impl Strategy<Value = (usize, usize, Vec<u64>)> {
    (0usize..16, 1usize..48)
        .prop_flat_map(|(n, w)| pvec(any::<u64>(), n * w).prop_map(move |data| (n, w, data)))
}

/// A collection whose words carry ~4 set bits each, so per-vector set-bit
/// counts land on both sides of realistic cutoffs.
fn sparse_collection() -> impl Strategy<Value = (usize, usize, Vec<u64>)> {
    (0usize..16, 1usize..48).prop_flat_map(|(n, w)| {
        pvec((any::<u64>(), any::<u64>(), any::<u64>(), any::<u64>()), n * w)
            .prop_map(move |quads| (n, w, quads.iter().map(|(a, b, c, d)| a & b & c & d).collect()))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROP_CASES))]

    #[test]
    fn prop_blocked_driver_matches_naive((n, w, data) in dense_collection()) {
        prop_assert_eq!(
            pairwise_intersect_count(&data, n, w),
            naive_pairwise(&data, n, w)
        );
    }

    #[test]
    fn prop_block_target_never_changes_sum(
        (n, w, data) in dense_collection(),
        target in 8usize..(1 << 20),
    ) {
        let config = PairwiseConfig {
            block_target_bytes: target,
            ..PairwiseConfig::default()
        };
        prop_assert_eq!(
            pairwise_intersect_count_with_config(&data, n, w, &config),
            naive_pairwise(&data, n, w)
        );
    }

    #[test]
    fn prop_sparse_driver_matches_naive(
        (n, w, data) in sparse_collection(),
        cutoff in 0u32..400,
    ) {
        let index = SparseIndex::from_words(&data, n, w).unwrap();
        let config = PairwiseConfig {
            sparse_cutoff: cutoff,
            ..PairwiseConfig::default()
        };
        prop_assert_eq!(
            pairwise_intersect_count_sparse_with_config(
                &data,
                n,
                w,
                index.counts(),
                index.positions(),
                index.offsets(),
                &config,
            ),
            naive_pairwise(&data, n, w)
        );
    }

    #[test]
    fn prop_single_pair_dispatch_matches_naive(words in pvec((any::<u64>(), any::<u64>()), 0..600)) {
        let a: Vec<u64> = words.iter().map(|(x, _)| *x).collect();
        let b: Vec<u64> = words.iter().map(|(_, y)| *y).collect();
        let expected: u64 = a
            .iter()
            .zip(&b)
            .map(|(x, y)| u64::from((x & y).count_ones()))
            .sum();
        prop_assert_eq!(intersect_words(&a, &b), expected);
    }
}
