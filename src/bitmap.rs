//! Generic bit-plane utilities.
//!
//! Every plane in [`crate::bitplanes::BitPlanes`] is a packed
//! `BitVec<u8, Lsb0>`, one bit per code byte. `bitvec` scans a full machine
//! word at a time for `count_ones`/`first_one`, giving hardware
//! popcount/ctz where available without resorting to `unsafe` intrinsics
//! ourselves.

use std::collections::TryReserveError;

use bitvec::prelude::*;

pub type BitPlane = BitVec<u8, Lsb0>;
pub type BitPlaneSlice = BitSlice<u8, Lsb0>;

/// Number of set bits in `bitmap[start_bit..end_bit]`.
///
/// # Panics
/// Panics if `start_bit > end_bit` or `end_bit > bitmap.len()`, same as
/// slicing a `BitSlice` directly.
#[must_use]
pub fn popcount_range(bitmap: &BitPlaneSlice, start_bit: usize, end_bit: usize) -> usize {
    bitmap[start_bit..end_bit].count_ones()
}

/// Index of the first set bit at or after `start_bit`, or `None` if none
/// exists.
///
/// # Panics
/// Panics if `start_bit > bitmap.len()`.
#[must_use]
pub fn find_next_set(bitmap: &BitPlaneSlice, start_bit: usize) -> Option<usize> {
    bitmap[start_bit..].first_one().map(|i| i + start_bit)
}

/// Allocate a plane of `len` clear bits, or report the allocation failure
/// rather than aborting the process.
pub fn new_plane(len: usize) -> Result<BitPlane, TryReserveError> {
    let mut storage: Vec<u8> = Vec::new();
    storage.try_reserve_exact(len.div_ceil(8))?;
    storage.resize(len.div_ceil(8), 0);
    let mut plane = BitPlane::from_vec(storage);
    plane.truncate(len);
    Ok(plane)
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn popcount_range_counts_only_within_bounds() {
        let mut plane = new_plane(16).unwrap();
        plane.set(0, true);
        plane.set(5, true);
        plane.set(15, true);
        assert_eq!(popcount_range(&plane, 0, 16), 3);
        assert_eq!(popcount_range(&plane, 1, 15), 1);
        assert_eq!(popcount_range(&plane, 0, 0), 0);
    }

    #[test]
    fn find_next_set_skips_clear_prefix() {
        let mut plane = new_plane(10).unwrap();
        plane.set(7, true);
        assert_eq!(find_next_set(&plane, 0), Some(7));
        assert_eq!(find_next_set(&plane, 7), Some(7));
        assert_eq!(find_next_set(&plane, 8), None);
    }

    #[test]
    fn find_next_set_on_empty_plane() {
        let plane = new_plane(0).unwrap();
        assert_eq!(find_next_set(&plane, 0), None);
    }
}
