use super::DimensionError;
use crate::{coord::CoordValue, error::GeometryError, range::Range};

///
/// FixedAxis
///
/// Typed domain and tile extent of one fixed-size dimension.
/// Built once per dimension; all typed geometry runs through here.
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedAxis<T> {
    lo: T,
    hi: T,
    extent: Option<T>,
}

impl<T: CoordValue> FixedAxis<T> {
    pub(crate) fn new(lo: T, hi: T, extent: Option<T>) -> Result<Self, GeometryError> {
        Range::new(lo, hi)?;
        if !lo.is_finite() || !hi.is_finite() {
            return Err(DimensionError::NonFiniteDomain.into());
        }
        if let Some(extent) = extent {
            T::check_tile_extent(lo, hi, extent)?;
        }

        Ok(Self { lo, hi, extent })
    }

    #[must_use]
    pub const fn domain(&self) -> (T, T) {
        (self.lo, self.hi)
    }

    #[must_use]
    pub const fn tile_extent(&self) -> Option<T> {
        self.extent
    }

    #[must_use]
    pub const fn is_integral(&self) -> bool {
        T::DATATYPE.is_integer()
    }

    /// Decode one encoded coordinate of this axis.
    pub(crate) fn decode(&self, bytes: &[u8]) -> T {
        T::read_le(bytes)
    }

    /// Decode the bounds of a range encoded for this axis.
    pub(crate) fn bounds_of(&self, range: &Range) -> (T, T) {
        range.bounds::<T>()
    }

    /// Tile index of `value`; always 0 without an extent.
    #[must_use]
    pub fn tile_idx(&self, value: T) -> u64 {
        self.extent
            .map_or(0, |extent| T::tile_idx(value, self.lo, extent))
    }

    #[must_use]
    pub fn tile_coord_low(&self, idx: u64) -> T {
        self.extent
            .map_or(self.lo, |extent| T::tile_coord_low(idx, self.lo, extent))
    }

    #[must_use]
    pub fn tile_coord_high(&self, idx: u64) -> T {
        self.extent
            .map_or(self.hi, |extent| T::tile_coord_high(idx, self.lo, extent))
    }

    /// Lowest coordinate of the tile containing `value`.
    #[must_use]
    pub fn round_to_tile(&self, value: T) -> T {
        self.tile_coord_low(self.tile_idx(value))
    }

    #[must_use]
    pub fn expand_to_tile(&self, bounds: (T, T)) -> (T, T) {
        self.extent.map_or(bounds, |extent| {
            T::expand_to_tile(bounds.0, bounds.1, self.lo, extent)
        })
    }

    #[must_use]
    pub fn coincides_with_tiles(&self, bounds: (T, T)) -> bool {
        self.extent.is_some_and(|extent| {
            T::coincides_with_tiles(bounds.0, bounds.1, self.lo, extent)
        })
    }

    #[must_use]
    pub fn tile_num(&self, bounds: (T, T)) -> u64 {
        self.extent
            .map_or(1, |extent| T::tile_num(bounds.0, bounds.1, self.lo, extent))
    }

    /// Number of tiles spanning the whole domain.
    #[must_use]
    pub fn domain_tile_num(&self) -> u64 {
        self.tile_num((self.lo, self.hi))
    }

    #[must_use]
    pub fn ceil_to_tile(&self, lo: T, tile_num: u64) -> Option<T> {
        let extent = self.extent?;
        T::ceil_to_tile(lo, tile_num, self.lo, extent)
    }

    #[must_use]
    pub fn oob(&self, value: T) -> bool {
        value < self.lo || value > self.hi
    }

    #[must_use]
    pub fn crop(&self, bounds: (T, T)) -> (T, T) {
        let lo = if bounds.0 < self.lo { self.lo } else { bounds.0 };
        let hi = if bounds.1 > self.hi { self.hi } else { bounds.1 };
        (lo, hi)
    }

    #[must_use]
    pub fn map_to_uint64(&self, value: T, max_bucket: u64) -> u64 {
        T::map_to_uint64(value, self.lo, self.hi, max_bucket)
    }

    #[must_use]
    pub fn map_from_uint64(&self, value: u64, max_bucket: u64) -> T {
        T::map_from_uint64(value, self.lo, self.hi, max_bucket)
    }
}
