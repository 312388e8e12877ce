//! Floating-point coordinate arithmetic.

use super::{FloatCoord, nudge_partial_ratio};
use crate::dimension::DimensionError;
use num_traits::{Float, NumCast};

fn from_index<T: FloatCoord>(idx: u64) -> T {
    <T as NumCast>::from(idx).unwrap_or_else(T::infinity)
}

fn raw_tile_idx<T: FloatCoord>(value: T, start: T, extent: T) -> u64 {
    let q = Float::floor((value - start) / extent);

    <u64 as NumCast>::from(q).unwrap_or(if q < T::zero() { 0 } else { u64::MAX })
}

pub(super) fn tile_coord_low<T: FloatCoord>(idx: u64, start: T, extent: T) -> T {
    start + from_index::<T>(idx) * extent
}

pub(super) fn tile_coord_high<T: FloatCoord>(idx: u64, start: T, extent: T) -> T {
    FloatCoord::next_down(tile_coord_low(idx.saturating_add(1), start, extent))
}

// Floor division can land one tile off near boundaries; settle against the
// same bounds `tile_coord_low` produces so the two always agree.
pub(super) fn tile_idx<T: FloatCoord>(value: T, start: T, extent: T) -> u64 {
    if !(extent > T::zero()) {
        return 0;
    }

    let mut idx = raw_tile_idx(value, start, extent);
    if idx > 0 && tile_coord_low(idx, start, extent) > value {
        idx -= 1;
    } else if idx < u64::MAX && tile_coord_low(idx + 1, start, extent) <= value {
        idx += 1;
    }

    idx
}

pub(super) fn coincides_with_tiles<T: FloatCoord>(lo: T, hi: T, start: T, extent: T) -> bool {
    if !(extent > T::zero()) {
        return false;
    }

    tile_coord_low(tile_idx(lo, start, extent), start, extent) == lo
        && tile_coord_high(tile_idx(hi, start, extent), start, extent) == hi
}

pub(super) fn tile_num<T: FloatCoord>(lo: T, hi: T, start: T, extent: T) -> u64 {
    if !(extent > T::zero()) {
        return 1;
    }

    tile_idx(hi, start, extent)
        .saturating_sub(tile_idx(lo, start, extent))
        .saturating_add(1)
}

pub(super) fn ceil_to_tile<T: FloatCoord>(lo: T, tile_num: u64, start: T, extent: T) -> Option<T> {
    let mid = lo + from_index::<T>(tile_num.saturating_add(1)) * extent;
    if !Float::is_finite(mid) {
        return None;
    }

    let floored = tile_coord_low(tile_idx(mid, start, extent), start, extent);
    let split = FloatCoord::next_down(floored);

    Float::is_finite(split).then_some(split)
}

pub(super) fn overlap_ratio<T: FloatCoord>(r1: (T, T), r2: (T, T)) -> f64 {
    let (mut a_lo, mut a_hi) = (r1.0.widen(), r1.1.widen());
    let (mut b_lo, mut b_hi) = (r2.0.widen(), r2.1.widen());

    if a_lo > b_hi || a_hi < b_lo {
        return 0.0;
    }
    if a_lo <= b_lo && b_hi <= a_hi {
        return 1.0;
    }

    // Halve everything when any operand could overflow the subtraction.
    let half_max = f64::MAX / 2.0;
    if [a_lo, a_hi, b_lo, b_hi].iter().any(|v| v.abs() > half_max) {
        a_lo /= 2.0;
        a_hi /= 2.0;
        b_lo /= 2.0;
        b_hi /= 2.0;
    }

    let overlap = a_hi.min(b_hi) - a_lo.max(b_lo);
    let denom = b_hi - b_lo;
    if denom == 0.0 {
        return 0.5;
    }

    let ratio = overlap / denom;
    if ratio.is_nan() {
        return 0.5;
    }

    nudge_partial_ratio(ratio)
}

pub(super) fn splitting_value<T: FloatCoord>(lo: T, hi: T) -> Option<T> {
    if !(lo < hi) {
        return None;
    }

    let split = T::midpoint(lo, hi);
    if split >= hi || split < lo {
        return Some(lo);
    }

    Some(split)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(super) fn map_to_uint64<T: FloatCoord>(value: T, lo: T, hi: T, max_bucket: u64) -> u64 {
    let range = hi.widen() - lo.widen();
    if !(range > 0.0) {
        return 0;
    }

    let norm = (value.widen() - lo.widen()) / range;

    (norm * max_bucket as f64) as u64
}

#[allow(clippy::cast_precision_loss)]
pub(super) fn map_from_uint64<T: FloatCoord>(value: u64, lo: T, hi: T, max_bucket: u64) -> T {
    if max_bucket == 0 {
        return lo;
    }
    let range = hi.widen() - lo.widen();

    let norm = (value as f64 + 1.0) / max_bucket as f64;
    let mapped = (norm * range).next_down() + lo.widen();

    T::narrow(mapped.clamp(lo.widen(), hi.widen()))
}

pub(super) fn check_tile_extent<T: FloatCoord>(lo: T, hi: T, extent: T) -> Result<(), DimensionError> {
    if !Float::is_finite(extent) {
        return Err(DimensionError::NonFiniteExtent);
    }
    if !(extent > T::zero()) {
        return Err(DimensionError::NonPositiveExtent);
    }

    let range = hi - lo;
    if range > T::zero() && extent > range {
        return Err(DimensionError::ExtentExceedsDomain {
            extent: format!("{extent:?}"),
            range: format!("{range:?}"),
        });
    }

    Ok(())
}
