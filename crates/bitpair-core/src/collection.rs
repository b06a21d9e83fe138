//! Owned bitmap collections and sparse set-bit indexes.
//!
//! The counting entry points operate on borrowed `&[u64]` buffers; this
//! module supplies the two owned helpers most callers want on top:
//!
//! - [`AlignedBitmaps`] — a contiguous collection buffer allocated at the
//!   alignment reported by [`crate::required_alignment`]
//! - [`SparseIndex`] — the per-vector set-bit counts, positions and
//!   offsets consumed by the sparse-aware driver

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use crate::error::{Error, Result};
use crate::simd::required_alignment;

/// An owned collection of `n_vectors` bitmaps of `words_per_vector` words,
/// allocated at the alignment the widest local kernel prefers.
///
/// Vector `i` occupies words `[i * words_per_vector, (i + 1) *
/// words_per_vector)` of [`words`](Self::words); the whole buffer is
/// zero-initialized on construction.
pub struct AlignedBitmaps {
    ptr: NonNull<u64>,
    layout: Layout,
    n_vectors: usize,
    words_per_vector: usize,
}

impl AlignedBitmaps {
    /// Allocates a zeroed collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeOverflow`] when the byte size does not fit in
    /// `usize` and [`Error::AllocationFailed`] on allocator failure.
    pub fn zeroed(n_vectors: usize, words_per_vector: usize) -> Result<Self> {
        let bytes = n_vectors
            .checked_mul(words_per_vector)
            .and_then(|w| w.checked_mul(std::mem::size_of::<u64>()))
            .ok_or(Error::SizeOverflow {
                n_vectors,
                words_per_vector,
            })?;
        let alignment = (required_alignment() as usize).max(std::mem::align_of::<u64>());
        let layout = Layout::from_size_align(bytes, alignment).map_err(|_| Error::SizeOverflow {
            n_vectors,
            words_per_vector,
        })?;

        let ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            // SAFETY: `alloc_zeroed` requires a non-zero layout size,
            // checked above; the layout comes from std APIs and is
            // therefore well-formed.
            let raw = unsafe { alloc_zeroed(layout) };
            NonNull::new(raw.cast::<u64>()).ok_or(Error::AllocationFailed {
                bytes: layout.size(),
                alignment,
            })?
        };

        Ok(Self {
            ptr,
            layout,
            n_vectors,
            words_per_vector,
        })
    }

    /// Builds a collection by copying equally wide rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WidthMismatch`] when any row differs in width from
    /// the first, plus the allocation errors of [`Self::zeroed`].
    pub fn from_rows(rows: &[&[u64]]) -> Result<Self> {
        let words_per_vector = rows.first().map_or(0, |r| r.len());
        for (index, r) in rows.iter().enumerate() {
            if r.len() != words_per_vector {
                return Err(Error::WidthMismatch {
                    index,
                    got: r.len(),
                    expected: words_per_vector,
                });
            }
        }

        let mut maps = Self::zeroed(rows.len(), words_per_vector)?;
        for (index, r) in rows.iter().enumerate() {
            maps.row_mut(index).copy_from_slice(r);
        }
        Ok(maps)
    }

    /// Number of vectors in the collection.
    #[inline]
    #[must_use]
    pub fn n_vectors(&self) -> usize {
        self.n_vectors
    }

    /// Width of each vector in 64-bit words.
    #[inline]
    #[must_use]
    pub fn words_per_vector(&self) -> usize {
        self.words_per_vector
    }

    /// The whole collection buffer, ready for the counting entry points.
    #[inline]
    #[must_use]
    pub fn words(&self) -> &[u64] {
        // SAFETY: `ptr` covers `n_vectors * words_per_vector` initialized
        // words (zeroed at allocation); the dangling pointer case only
        // occurs for length 0, where `from_raw_parts` accepts any aligned
        // pointer.
        unsafe {
            std::slice::from_raw_parts(self.ptr.as_ptr(), self.n_vectors * self.words_per_vector)
        }
    }

    /// Mutable view of the whole collection buffer.
    #[inline]
    pub fn words_mut(&mut self) -> &mut [u64] {
        // SAFETY: see `words`; `&mut self` guarantees exclusive access.
        unsafe {
            std::slice::from_raw_parts_mut(
                self.ptr.as_ptr(),
                self.n_vectors * self.words_per_vector,
            )
        }
    }

    /// Borrow of vector `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= n_vectors`.
    #[inline]
    #[must_use]
    pub fn row(&self, index: usize) -> &[u64] {
        let start = index * self.words_per_vector;
        &self.words()[start..start + self.words_per_vector]
    }

    /// Mutable borrow of vector `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= n_vectors`.
    #[inline]
    pub fn row_mut(&mut self, index: usize) -> &mut [u64] {
        let start = index * self.words_per_vector;
        let words = self.words_per_vector;
        &mut self.words_mut()[start..start + words]
    }

    /// Sets bit `bit` of vector `vector`.
    ///
    /// Bit `k` lives in word `k >> 6` under mask `1 << (k & 63)`.
    ///
    /// # Panics
    ///
    /// Panics when `vector` or `bit` is out of range.
    #[inline]
    pub fn set_bit(&mut self, vector: usize, bit: usize) {
        assert!(
            bit < self.words_per_vector * 64,
            "bit {bit} beyond vector width"
        );
        self.row_mut(vector)[bit >> 6] |= 1u64 << (bit & 63);
    }
}

impl std::fmt::Debug for AlignedBitmaps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBitmaps")
            .field("n_vectors", &self.n_vectors)
            .field("words_per_vector", &self.words_per_vector)
            .field("alignment", &self.layout.align())
            .finish_non_exhaustive()
    }
}

impl Drop for AlignedBitmaps {
    fn drop(&mut self) {
        if self.layout.size() > 0 {
            // SAFETY: `ptr` was produced by `alloc_zeroed(self.layout)` in
            // `zeroed`; the zero-size case never allocates and is excluded
            // above.
            unsafe {
                dealloc(self.ptr.as_ptr().cast::<u8>(), self.layout);
            }
        }
    }
}

// SAFETY: `AlignedBitmaps` owns its allocation outright; no aliasing
// references are stored, and mutation requires `&mut self`. Heap
// allocations are not thread-affine, so ownership transfer across threads
// is sound.
unsafe impl Send for AlignedBitmaps {}
// SAFETY: shared references only expose read access to the buffer.
unsafe impl Sync for AlignedBitmaps {}

/// Per-vector set-bit counts, positions and list offsets for the
/// sparse-aware driver.
///
/// Positions are stored per vector in strictly ascending order; vector
/// `i`'s list occupies `positions()[offsets()[i]..offsets()[i] +
/// counts()[i]]`. All three arrays use `u32`, matching the driver's
/// consumption format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseIndex {
    counts: Vec<u32>,
    positions: Vec<u32>,
    offsets: Vec<u32>,
}

impl SparseIndex {
    /// Enumerates the set bits of a collection buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferTooSmall`] when the buffer cannot hold the
    /// claimed collection and [`Error::PositionOverflow`] when the total
    /// set-bit count exceeds the `u32` index range.
    pub fn from_words(data: &[u64], n_vectors: usize, words_per_vector: usize) -> Result<Self> {
        let needed = n_vectors
            .checked_mul(words_per_vector)
            .ok_or(Error::SizeOverflow {
                n_vectors,
                words_per_vector,
            })?;
        if data.len() < needed {
            return Err(Error::BufferTooSmall {
                got: data.len(),
                needed,
            });
        }

        let mut counts = Vec::with_capacity(n_vectors);
        let mut offsets = Vec::with_capacity(n_vectors);
        let mut positions = Vec::new();

        for vector in 0..n_vectors {
            let start = positions.len();
            let row = &data[vector * words_per_vector..(vector + 1) * words_per_vector];

            for (word_index, &word) in row.iter().enumerate() {
                let base = (word_index as u64) * 64;
                let mut w = word;
                while w != 0 {
                    let bit = u64::from(w.trailing_zeros());
                    let count = positions.len();
                    let pos = u32::try_from(base + bit)
                        .map_err(|_| Error::PositionOverflow { count })?;
                    positions.push(pos);
                    // Clear the least significant set bit.
                    w &= w - 1;
                }
            }

            let count = positions.len() - start;
            counts.push(u32::try_from(count).map_err(|_| Error::PositionOverflow { count })?);
            offsets.push(u32::try_from(start).map_err(|_| Error::PositionOverflow {
                count: positions.len(),
            })?);
        }

        Ok(Self {
            counts,
            positions,
            offsets,
        })
    }

    /// Per-vector set-bit counts (`n_alts`).
    #[inline]
    #[must_use]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// The shared ascending position buffer (`alt_positions`).
    #[inline]
    #[must_use]
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Per-vector start offsets into the position buffer (`alt_offsets`).
    #[inline]
    #[must_use]
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }
}
