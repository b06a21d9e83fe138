#![allow(clippy::cast_possible_truncation)]
//! Tests for owned collections and sparse indexes.

use crate::collection::{AlignedBitmaps, SparseIndex};
use crate::error::Error;
use crate::simd::required_alignment;

#[test]
fn test_zeroed_is_zero_and_aligned() {
    let maps = AlignedBitmaps::zeroed(5, 4).unwrap();
    assert_eq!(maps.n_vectors(), 5);
    assert_eq!(maps.words_per_vector(), 4);
    assert_eq!(maps.words().len(), 20);
    assert!(maps.words().iter().all(|&w| w == 0));

    let alignment = required_alignment() as usize;
    assert_eq!(maps.words().as_ptr() as usize % alignment, 0);
}

#[test]
fn test_zeroed_empty_collections() {
    for (n, w) in [(0usize, 0usize), (0, 4), (3, 0)] {
        let maps = AlignedBitmaps::zeroed(n, w).unwrap();
        assert!(maps.words().is_empty());
    }
}

#[test]
fn test_zeroed_size_overflow() {
    let err = AlignedBitmaps::zeroed(usize::MAX, 2).unwrap_err();
    assert!(matches!(err, Error::SizeOverflow { .. }));
}

#[test]
fn test_set_bit_round_trip() {
    let mut maps = AlignedBitmaps::zeroed(2, 2).unwrap();
    maps.set_bit(0, 0);
    maps.set_bit(0, 63);
    maps.set_bit(1, 64);
    maps.set_bit(1, 127);

    assert_eq!(maps.row(0), &[1 | 1 << 63, 0]);
    assert_eq!(maps.row(1), &[0, 1 | 1 << 63]);
}

#[test]
#[should_panic(expected = "beyond vector width")]
fn test_set_bit_out_of_range_panics() {
    let mut maps = AlignedBitmaps::zeroed(1, 2).unwrap();
    maps.set_bit(0, 128);
}

#[test]
fn test_from_rows_copies_values() {
    let rows: [&[u64]; 3] = [&[1, 2], &[3, 4], &[5, 6]];
    let maps = AlignedBitmaps::from_rows(&rows).unwrap();
    assert_eq!(maps.words(), &[1, 2, 3, 4, 5, 6]);
    assert_eq!(maps.row(1), &[3, 4]);
}

#[test]
fn test_from_rows_width_mismatch() {
    let rows: [&[u64]; 2] = [&[1, 2], &[3]];
    let err = AlignedBitmaps::from_rows(&rows).unwrap_err();
    match err {
        Error::WidthMismatch {
            index,
            got,
            expected,
        } => {
            assert_eq!(index, 1);
            assert_eq!(got, 1);
            assert_eq!(expected, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_debug_output() {
    let maps = AlignedBitmaps::zeroed(2, 3).unwrap();
    let debug = format!("{maps:?}");
    assert!(debug.contains("AlignedBitmaps"));
    assert!(debug.contains("n_vectors"));
}

#[test]
fn test_sparse_index_enumerates_ascending() {
    let data = vec![0b1010u64, 1 << 63, 0, 1];
    let index = SparseIndex::from_words(&data, 2, 2).unwrap();

    // Positions are vector-relative bit indices.
    assert_eq!(index.counts(), &[3, 1]);
    assert_eq!(index.offsets(), &[0, 3]);
    assert_eq!(index.positions(), &[1, 3, 127, 64]);

    for vector in 0..2 {
        let start = index.offsets()[vector] as usize;
        let list = &index.positions()[start..start + index.counts()[vector] as usize];
        assert!(list.windows(2).all(|w| w[0] < w[1]), "positions not ascending");
        for &pos in list {
            let word = data[vector * 2 + (pos as usize >> 6)];
            assert_eq!(word >> (pos & 63) & 1, 1, "listed bit {pos} not set");
        }
    }
}

#[test]
fn test_sparse_index_counts_match_popcount() {
    let data: Vec<u64> = (0..12u64).map(|i| i.wrapping_mul(0x5851_F42D_4C95_7F2D)).collect();
    let index = SparseIndex::from_words(&data, 4, 3).unwrap();

    for vector in 0..4 {
        let expected: u32 = data[vector * 3..(vector + 1) * 3]
            .iter()
            .map(|w| w.count_ones())
            .sum();
        assert_eq!(index.counts()[vector], expected);
    }
}

#[test]
fn test_sparse_index_buffer_too_small() {
    let err = SparseIndex::from_words(&[0u64; 3], 2, 2).unwrap_err();
    assert!(matches!(
        err,
        Error::BufferTooSmall { got: 3, needed: 4 }
    ));
}

#[test]
fn test_sparse_index_empty_collection() {
    let index = SparseIndex::from_words(&[], 0, 8).unwrap();
    assert!(index.counts().is_empty());
    assert!(index.positions().is_empty());
    assert!(index.offsets().is_empty());
}

#[test]
fn test_error_messages() {
    let err = Error::BufferTooSmall { got: 1, needed: 2 };
    assert!(!err.to_string().is_empty());

    let err = Error::AllocationFailed {
        bytes: 64,
        alignment: 64,
    };
    assert!(err.to_string().contains("64"));
}
