//! Module: range
//! Responsibility: untyped closed intervals over one physical type.
//! Does not own: per-type arithmetic (see `coord`) or domain bounds.
//! Boundary: typed access asserts encoded width; width mismatches are caller bugs.

#[cfg(test)]
mod tests;

use crate::{coord::CoordValue, error::GeometryError};
use derive_more::{Deref, DerefMut, IntoIterator};
use tessera_primitives::Datatype;
use thiserror::Error as ThisError;

///
/// RangeError
///
/// Malformed-range failures raised at construction and validation.
///

#[derive(Debug, ThisError)]
pub enum RangeError {
    #[error("range is empty")]
    Empty,

    #[error("range contains NaN")]
    NaN,

    #[error("range bounds are inverted: {lo} > {hi}")]
    Inverted { lo: String, hi: String },

    #[error("range encoding has wrong length: {len} bytes (expected {expected})")]
    EncodedLength { len: usize, expected: usize },
}

impl From<RangeError> for GeometryError {
    fn from(err: RangeError) -> Self {
        Self::range_validation(err.to_string())
    }
}

///
/// Range
///
/// Closed interval `[start, end]` stored as raw bytes.
/// Fixed-size types hold two little-endian values back to back; the string
/// type holds two independently sized byte sequences.
///

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Range {
    data: Vec<u8>,
    var_start_len: Option<usize>,
}

impl Range {
    /// Build a validated fixed-size range from typed bounds.
    pub fn new<T: CoordValue>(lo: T, hi: T) -> Result<Self, GeometryError> {
        check_fixed_bounds(lo, hi)?;

        Ok(Self::from_bounds(lo, hi))
    }

    /// Build a validated variable-length range; bounds compare bytewise.
    pub fn new_var(start: impl AsRef<[u8]>, end: impl AsRef<[u8]>) -> Result<Self, GeometryError> {
        let (start, end) = (start.as_ref(), end.as_ref());
        if start > end {
            return Err(RangeError::Inverted {
                lo: String::from_utf8_lossy(start).into_owned(),
                hi: String::from_utf8_lossy(end).into_owned(),
            }
            .into());
        }

        Ok(Self::from_var_bounds(start, end))
    }

    /// Wrap an already-encoded fixed pair. Only the length is checked here;
    /// call `validate` once the datatype is known.
    pub fn from_fixed_bytes(bytes: &[u8]) -> Result<Self, GeometryError> {
        if bytes.is_empty() {
            return Err(RangeError::Empty.into());
        }
        if bytes.len() % 2 != 0 {
            return Err(RangeError::EncodedLength {
                len: bytes.len(),
                expected: bytes.len() + 1,
            }
            .into());
        }

        Ok(Self {
            data: bytes.to_vec(),
            var_start_len: None,
        })
    }

    /// Unchecked typed constructor for bounds already known to be ordered.
    pub(crate) fn from_bounds<T: CoordValue>(lo: T, hi: T) -> Self {
        let mut data = Vec::with_capacity(T::SIZE * 2);
        lo.write_le(&mut data);
        hi.write_le(&mut data);

        Self {
            data,
            var_start_len: None,
        }
    }

    /// Unchecked variable-length constructor.
    pub(crate) fn from_var_bounds(start: &[u8], end: &[u8]) -> Self {
        let mut data = Vec::with_capacity(start.len() + end.len());
        data.extend_from_slice(start);
        data.extend_from_slice(end);

        Self {
            data,
            var_start_len: Some(start.len()),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty() && self.var_start_len.is_none()
    }

    #[must_use]
    pub const fn is_var(&self) -> bool {
        self.var_start_len.is_some()
    }

    /// Raw encoded bytes: both fixed values, or start followed by end.
    #[must_use]
    pub const fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    #[must_use]
    pub fn start_bytes(&self) -> &[u8] {
        match self.var_start_len {
            Some(len) => &self.data[..len],
            None => &self.data[..self.data.len() / 2],
        }
    }

    #[must_use]
    pub fn end_bytes(&self) -> &[u8] {
        match self.var_start_len {
            Some(len) => &self.data[len..],
            None => &self.data[self.data.len() / 2..],
        }
    }

    #[must_use]
    pub fn start_as<T: CoordValue>(&self) -> T {
        self.debug_assert_width::<T>();
        T::read_le(self.start_bytes())
    }

    #[must_use]
    pub fn end_as<T: CoordValue>(&self) -> T {
        self.debug_assert_width::<T>();
        T::read_le(self.end_bytes())
    }

    /// Both bounds decoded as `T`.
    #[must_use]
    pub fn bounds<T: CoordValue>(&self) -> (T, T) {
        (self.start_as(), self.end_as())
    }

    /// True when start and end are the same value.
    #[must_use]
    pub fn unary(&self) -> bool {
        self.start_bytes() == self.end_bytes()
    }

    /// Check this range against the datatype it is meant to hold.
    pub fn validate(&self, datatype: Datatype) -> Result<(), GeometryError> {
        if self.is_empty() {
            return Err(RangeError::Empty.into());
        }

        dispatch_datatype!(datatype,
            T => {
                let expected = T::SIZE * 2;
                if self.is_var() || self.data.len() != expected {
                    return Err(RangeError::EncodedLength {
                        len: self.data.len(),
                        expected,
                    }
                    .into());
                }
                let (lo, hi) = self.bounds::<T>();
                check_fixed_bounds(lo, hi)
            },
            string => {
                if self.start_bytes() > self.end_bytes() {
                    return Err(RangeError::Inverted {
                        lo: String::from_utf8_lossy(self.start_bytes()).into_owned(),
                        hi: String::from_utf8_lossy(self.end_bytes()).into_owned(),
                    }
                    .into());
                }
                Ok(())
            },
        )
    }

    /// Clamp both endpoints into `bounds`.
    pub fn crop<T: CoordValue>(&mut self, bounds: &Self) {
        let (lo, hi) = self.bounds::<T>();
        let (min, max) = bounds.bounds::<T>();

        let lo = if lo < min { min } else { lo };
        let hi = if hi > max { max } else { hi };
        *self = Self::from_bounds(lo, hi);
    }

    /// Clamp both endpoints into `bounds`, comparing bytewise.
    pub fn crop_var(&mut self, bounds: &Self) {
        let start = self.start_bytes().max(bounds.start_bytes()).to_vec();
        let end = self.end_bytes().min(bounds.end_bytes()).to_vec();
        *self = Self::from_var_bounds(&start, &end);
    }

    /// True when `self` lies entirely inside `superset`.
    #[must_use]
    pub fn is_subset<T: CoordValue>(&self, superset: &Self) -> bool {
        let (lo, hi) = self.bounds::<T>();
        let (min, max) = superset.bounds::<T>();

        lo >= min && hi <= max
    }

    #[must_use]
    pub fn is_subset_var(&self, superset: &Self) -> bool {
        self.start_bytes() >= superset.start_bytes() && self.end_bytes() <= superset.end_bytes()
    }

    fn debug_assert_width<T: CoordValue>(&self) {
        debug_assert!(
            !self.is_var() && self.data.len() == T::SIZE * 2,
            "range of {} bytes read as {}",
            self.data.len(),
            T::DATATYPE,
        );
    }
}

fn check_fixed_bounds<T: CoordValue>(lo: T, hi: T) -> Result<(), GeometryError> {
    if lo.is_nan() || hi.is_nan() {
        return Err(RangeError::NaN.into());
    }
    if lo > hi {
        return Err(RangeError::Inverted {
            lo: format!("{lo:?}"),
            hi: format!("{hi:?}"),
        }
        .into());
    }

    Ok(())
}

///
/// NDRange
///
/// One range per dimension, in dimension order.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Eq, Hash, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct NDRange(Vec<Range>);

impl NDRange {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub const fn from_vec(ranges: Vec<Range>) -> Self {
        Self(ranges)
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Range> {
        self.0
    }
}

impl FromIterator<Range> for NDRange {
    fn from_iter<I: IntoIterator<Item = Range>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
