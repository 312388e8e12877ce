//! Integral coordinate arithmetic.
//!
//! Differences are taken in `i128` so every width up to 64 bits, signed or
//! unsigned, is exact without wrapping.

use super::{IntCoord, nudge_partial_ratio};
use crate::dimension::DimensionError;

pub(super) const fn unsigned_width(value: i128, size: usize) -> u64 {
    let mask = if size >= 8 {
        u64::MAX as u128
    } else {
        (1u128 << (size * 8)) - 1
    };

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let width = ((value as u128) & mask) as u64;
    width
}

fn extent_i128<T: IntCoord>(extent: T) -> i128 {
    i128::from(extent.extent_width())
}

fn saturating_u64(value: i128) -> u64 {
    u64::try_from(value).unwrap_or(if value < 0 { 0 } else { u64::MAX })
}

pub(super) fn tile_idx<T: IntCoord>(value: T, start: T, extent: T) -> u64 {
    let extent = extent_i128(extent);
    if extent == 0 {
        return 0;
    }

    saturating_u64((value.to_i128() - start.to_i128()).div_euclid(extent))
}

fn tile_low_i128<T: IntCoord>(idx: u64, start: T, extent: T) -> i128 {
    i128::from(idx)
        .saturating_mul(extent_i128(extent))
        .saturating_add(start.to_i128())
}

pub(super) fn tile_coord_low<T: IntCoord>(idx: u64, start: T, extent: T) -> T {
    T::saturating_from_i128(tile_low_i128(idx, start, extent))
}

pub(super) fn tile_coord_high<T: IntCoord>(idx: u64, start: T, extent: T) -> T {
    let high = tile_low_i128(idx, start, extent)
        .saturating_add(extent_i128(extent))
        .saturating_sub(1);

    T::saturating_from_i128(high)
}

pub(super) fn expand_to_tile<T: IntCoord>(lo: T, hi: T, start: T, extent: T) -> (T, T) {
    let extent = extent_i128(extent);
    if extent == 0 {
        return (lo, hi);
    }
    let start = start.to_i128();

    let new_lo = (lo.to_i128() - start).div_euclid(extent) * extent + start;
    let new_hi = ((hi.to_i128() - start).div_euclid(extent) + 1) * extent - 1 + start;

    (
        T::saturating_from_i128(new_lo),
        T::saturating_from_i128(new_hi),
    )
}

pub(super) fn coincides_with_tiles<T: IntCoord>(lo: T, hi: T, start: T, extent: T) -> bool {
    let extent = extent_i128(extent);
    if extent == 0 {
        return false;
    }
    let start = start.to_i128();

    (lo.to_i128() - start).rem_euclid(extent) == 0
        && (hi.to_i128() - start + 1).rem_euclid(extent) == 0
}

pub(super) fn cell_count<T: IntCoord>(lo: T, hi: T) -> u64 {
    saturating_u64(hi.to_i128() - lo.to_i128() + 1)
}

pub(super) fn tile_num<T: IntCoord>(lo: T, hi: T, start: T, extent: T) -> u64 {
    let extent = extent_i128(extent);
    if extent == 0 {
        return 1;
    }
    let start = start.to_i128();

    let first = (lo.to_i128() - start).div_euclid(extent);
    let last = (hi.to_i128() - start).div_euclid(extent);

    saturating_u64(last - first + 1)
}

pub(super) fn ceil_to_tile<T: IntCoord>(lo: T, tile_num: u64, start: T, extent: T) -> Option<T> {
    let extent = extent_i128(extent);
    if extent == 0 {
        return None;
    }
    let start = start.to_i128();

    let mid = i128::from(tile_num)
        .checked_add(1)?
        .checked_mul(extent)?
        .checked_add(lo.to_i128())?;
    let floored = (mid - start).div_euclid(extent).checked_mul(extent)? + start;

    T::from_i128(floored - 1)
}

#[allow(clippy::cast_precision_loss)]
pub(super) fn overlap_ratio<T: IntCoord>(r1: (T, T), r2: (T, T)) -> f64 {
    let (a_lo, a_hi) = (r1.0.to_i128(), r1.1.to_i128());
    let (b_lo, b_hi) = (r2.0.to_i128(), r2.1.to_i128());

    if a_lo > b_hi || a_hi < b_lo {
        return 0.0;
    }
    if a_lo <= b_lo && b_hi <= a_hi {
        return 1.0;
    }

    let overlap = a_hi.min(b_hi) - a_lo.max(b_lo) + 1;
    let denom = b_hi - b_lo + 1;

    nudge_partial_ratio(overlap as f64 / denom as f64)
}

pub(super) fn splitting_value<T: IntCoord>(lo: T, hi: T) -> Option<T> {
    let (lo_wide, hi_wide) = (lo.to_i128(), hi.to_i128());
    let split = lo_wide + (hi_wide - lo_wide).div_euclid(2);

    if split >= hi_wide {
        return None;
    }

    T::from_i128(split)
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(super) fn map_to_uint64<T: IntCoord>(value: T, lo: T, hi: T, max_bucket: u64) -> u64 {
    let range = hi.to_i128() - lo.to_i128();
    if range <= 0 {
        return 0;
    }

    let norm = (value.to_i128() - lo.to_i128()) as f64 / range as f64;

    (norm * max_bucket as f64) as u64
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub(super) fn map_from_uint64<T: IntCoord>(value: u64, lo: T, hi: T, max_bucket: u64) -> T {
    if max_bucket == 0 {
        return lo;
    }
    let (lo_wide, hi_wide) = (lo.to_i128(), hi.to_i128());
    let range = (hi_wide - lo_wide) as f64;

    let norm = (value as f64 + 1.0) / max_bucket as f64;
    let offset = (norm * range - 1.0).ceil() as i128;

    T::saturating_from_i128((lo_wide + offset).clamp(lo_wide, hi_wide))
}

pub(super) fn check_tile_extent<T: IntCoord>(lo: T, hi: T, extent: T) -> Result<(), DimensionError> {
    let width = extent.extent_width();
    if width == 0 {
        return Err(DimensionError::NonPositiveExtent);
    }

    let range = cell_count(lo, hi);
    if width > range {
        return Err(DimensionError::ExtentExceedsDomain {
            extent: width.to_string(),
            range: range.to_string(),
        });
    }

    let last_tile = tile_idx(hi, lo, extent);
    let expanded_hi = tile_low_i128(last_tile, lo, extent) + i128::from(width) - 1;
    if expanded_hi > T::MAX.to_i128() {
        return Err(DimensionError::ExpandedDomainOverflow {
            datatype: T::DATATYPE,
        });
    }

    Ok(())
}
