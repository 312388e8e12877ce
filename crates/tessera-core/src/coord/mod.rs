//! Module: coord
//! Responsibility: per-physical-type coordinate arithmetic behind one trait.
//! Does not own: range storage or dimension bookkeeping.
//! Boundary: every typed geometry operation bottoms out in `CoordValue`.

mod float;
mod integer;


use crate::dimension::DimensionError;
use std::{cmp::Ordering, fmt::Debug};
use tessera_primitives::Datatype;

///
/// CoordValue
///
/// Fixed-size physical coordinate type.
/// One implementation per datatype; selected once when a dimension is built.
///

pub trait CoordValue: Copy + Debug + PartialOrd + Send + Sync + 'static {
    const DATATYPE: Datatype;
    const SIZE: usize;
    const MIN: Self;
    const MAX: Self;

    /// Append the little-endian encoding of `self`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Decode from the first `SIZE` bytes of `bytes`.
    fn read_le(bytes: &[u8]) -> Self;

    fn is_nan(self) -> bool;

    fn is_finite(self) -> bool;

    /// Total comparison used by cell ordering; NaN never reaches here.
    fn coord_cmp(&self, other: &Self) -> Ordering;

    /// Tile index of `value` relative to `start`.
    fn tile_idx(value: Self, start: Self, extent: Self) -> u64;

    /// Lowest coordinate inside tile `idx`.
    fn tile_coord_low(idx: u64, start: Self, extent: Self) -> Self;

    /// Highest coordinate inside tile `idx`.
    fn tile_coord_high(idx: u64, start: Self, extent: Self) -> Self;

    /// Snap `[lo, hi]` outward to tile boundaries.
    fn expand_to_tile(lo: Self, hi: Self, start: Self, extent: Self) -> (Self, Self);

    fn coincides_with_tiles(lo: Self, hi: Self, start: Self, extent: Self) -> bool;

    /// Cell count of `[lo, hi]`, or `u64::MAX` when not countable.
    fn cell_count(lo: Self, hi: Self) -> u64;

    /// Number of tiles `[lo, hi]` intersects.
    fn tile_num(lo: Self, hi: Self, start: Self, extent: Self) -> u64;

    /// Last coordinate before the tile boundary `tile_num + 1` extents past `lo`.
    fn ceil_to_tile(lo: Self, tile_num: u64, start: Self, extent: Self) -> Option<Self>;

    /// Fraction of `r2` covered by `r1`, with 0.0 and 1.0 reserved for exact answers.
    fn overlap_ratio(r1: (Self, Self), r2: (Self, Self)) -> f64;

    /// Split point of `[lo, hi]`, or `None` when the range cannot be split.
    fn splitting_value(lo: Self, hi: Self) -> Option<Self>;

    /// Smallest representable value strictly greater than `value`.
    fn successor(value: Self) -> Option<Self>;

    fn map_to_uint64(value: Self, lo: Self, hi: Self, max_bucket: u64) -> u64;

    fn map_from_uint64(value: u64, lo: Self, hi: Self, max_bucket: u64) -> Self;

    /// Validate a tile extent against the domain `[lo, hi]`.
    fn check_tile_extent(lo: Self, hi: Self, extent: Self) -> Result<(), DimensionError>;
}

///
/// IntCoord
///
/// Integral coordinates. Tile-run arithmetic and cell-slab iteration are
/// defined only over these.
///

pub trait IntCoord: CoordValue + Eq + Ord + std::hash::Hash {
    fn to_i128(self) -> i128;

    fn from_i128(value: i128) -> Option<Self>;

    fn saturating_from_i128(value: i128) -> Self;

    /// Extent interpreted as an unsigned magnitude of the same width.
    fn extent_width(self) -> u64;
}

///
/// FloatCoord
///
/// Floating-point coordinates.
///

pub trait FloatCoord: CoordValue + num_traits::Float {
    /// Lossless widening to f64.
    fn widen(self) -> f64;

    /// Narrowing conversion from f64, rounding to nearest.
    fn narrow(value: f64) -> Self;

    fn next_up(self) -> Self;

    fn next_down(self) -> Self;

    /// Midpoint computed in a wider intermediate before narrowing back.
    fn midpoint(lo: Self, hi: Self) -> Self;
}

/// Move a partial ratio strictly inside (0, 1) so that 0.0 and 1.0 stay decisive.
pub(crate) fn nudge_partial_ratio(ratio: f64) -> f64 {
    if ratio >= 1.0 {
        1.0_f64.next_down()
    } else if ratio <= 0.0 {
        0.0_f64.next_up()
    } else {
        ratio
    }
}

macro_rules! impl_coord_common {
    ($ty:ty, $datatype:ident) => {
        const DATATYPE: Datatype = Datatype::$datatype;
        const SIZE: usize = std::mem::size_of::<$ty>();
        const MIN: Self = <$ty>::MIN;
        const MAX: Self = <$ty>::MAX;

        fn write_le(self, out: &mut Vec<u8>) {
            out.extend_from_slice(&self.to_le_bytes());
        }

        fn read_le(bytes: &[u8]) -> Self {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            buf.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
            <$ty>::from_le_bytes(buf)
        }
    };
}

macro_rules! impl_int_coord {
    ($($ty:ty => $datatype:ident),* $(,)?) => {
        $(
            impl CoordValue for $ty {
                impl_coord_common!($ty, $datatype);

                fn is_nan(self) -> bool {
                    false
                }

                fn is_finite(self) -> bool {
                    true
                }

                fn coord_cmp(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }

                fn tile_idx(value: Self, start: Self, extent: Self) -> u64 {
                    integer::tile_idx(value, start, extent)
                }

                fn tile_coord_low(idx: u64, start: Self, extent: Self) -> Self {
                    integer::tile_coord_low(idx, start, extent)
                }

                fn tile_coord_high(idx: u64, start: Self, extent: Self) -> Self {
                    integer::tile_coord_high(idx, start, extent)
                }

                fn expand_to_tile(lo: Self, hi: Self, start: Self, extent: Self) -> (Self, Self) {
                    integer::expand_to_tile(lo, hi, start, extent)
                }

                fn coincides_with_tiles(lo: Self, hi: Self, start: Self, extent: Self) -> bool {
                    integer::coincides_with_tiles(lo, hi, start, extent)
                }

                fn cell_count(lo: Self, hi: Self) -> u64 {
                    integer::cell_count(lo, hi)
                }

                fn tile_num(lo: Self, hi: Self, start: Self, extent: Self) -> u64 {
                    integer::tile_num(lo, hi, start, extent)
                }

                fn ceil_to_tile(lo: Self, tile_num: u64, start: Self, extent: Self) -> Option<Self> {
                    integer::ceil_to_tile(lo, tile_num, start, extent)
                }

                fn overlap_ratio(r1: (Self, Self), r2: (Self, Self)) -> f64 {
                    integer::overlap_ratio(r1, r2)
                }

                fn splitting_value(lo: Self, hi: Self) -> Option<Self> {
                    integer::splitting_value(lo, hi)
                }

                fn successor(value: Self) -> Option<Self> {
                    value.checked_add(1)
                }

                fn map_to_uint64(value: Self, lo: Self, hi: Self, max_bucket: u64) -> u64 {
                    integer::map_to_uint64(value, lo, hi, max_bucket)
                }

                fn map_from_uint64(value: u64, lo: Self, hi: Self, max_bucket: u64) -> Self {
                    integer::map_from_uint64(value, lo, hi, max_bucket)
                }

                fn check_tile_extent(lo: Self, hi: Self, extent: Self) -> Result<(), DimensionError> {
                    integer::check_tile_extent(lo, hi, extent)
                }
            }

            impl IntCoord for $ty {
                fn to_i128(self) -> i128 {
                    i128::from(self)
                }

                fn from_i128(value: i128) -> Option<Self> {
                    Self::try_from(value).ok()
                }

                fn saturating_from_i128(value: i128) -> Self {
                    Self::try_from(value).unwrap_or(if value < 0 { Self::MIN } else { Self::MAX })
                }

                fn extent_width(self) -> u64 {
                    integer::unsigned_width(i128::from(self), std::mem::size_of::<$ty>())
                }
            }
        )*
    };
}

macro_rules! impl_float_coord {
    ($($ty:ty => $datatype:ident, midpoint = $midpoint:expr),* $(,)?) => {
        $(
            impl CoordValue for $ty {
                impl_coord_common!($ty, $datatype);

                fn is_nan(self) -> bool {
                    <$ty>::is_nan(self)
                }

                fn is_finite(self) -> bool {
                    <$ty>::is_finite(self)
                }

                fn coord_cmp(&self, other: &Self) -> Ordering {
                    self.partial_cmp(other).unwrap_or(Ordering::Equal)
                }

                fn tile_idx(value: Self, start: Self, extent: Self) -> u64 {
                    float::tile_idx(value, start, extent)
                }

                fn tile_coord_low(idx: u64, start: Self, extent: Self) -> Self {
                    float::tile_coord_low(idx, start, extent)
                }

                fn tile_coord_high(idx: u64, start: Self, extent: Self) -> Self {
                    float::tile_coord_high(idx, start, extent)
                }

                fn expand_to_tile(lo: Self, hi: Self, _start: Self, _extent: Self) -> (Self, Self) {
                    (lo, hi)
                }

                fn coincides_with_tiles(lo: Self, hi: Self, start: Self, extent: Self) -> bool {
                    float::coincides_with_tiles(lo, hi, start, extent)
                }

                fn cell_count(_lo: Self, _hi: Self) -> u64 {
                    u64::MAX
                }

                fn tile_num(lo: Self, hi: Self, start: Self, extent: Self) -> u64 {
                    float::tile_num(lo, hi, start, extent)
                }

                fn ceil_to_tile(lo: Self, tile_num: u64, start: Self, extent: Self) -> Option<Self> {
                    float::ceil_to_tile(lo, tile_num, start, extent)
                }

                fn overlap_ratio(r1: (Self, Self), r2: (Self, Self)) -> f64 {
                    float::overlap_ratio(r1, r2)
                }

                fn splitting_value(lo: Self, hi: Self) -> Option<Self> {
                    float::splitting_value(lo, hi)
                }

                fn successor(value: Self) -> Option<Self> {
                    let next = <$ty>::next_up(value);
                    next.is_finite().then_some(next)
                }

                fn map_to_uint64(value: Self, lo: Self, hi: Self, max_bucket: u64) -> u64 {
                    float::map_to_uint64(value, lo, hi, max_bucket)
                }

                fn map_from_uint64(value: u64, lo: Self, hi: Self, max_bucket: u64) -> Self {
                    float::map_from_uint64(value, lo, hi, max_bucket)
                }

                fn check_tile_extent(lo: Self, hi: Self, extent: Self) -> Result<(), DimensionError> {
                    float::check_tile_extent(lo, hi, extent)
                }
            }

            impl FloatCoord for $ty {
                #[allow(clippy::cast_lossless)]
                fn widen(self) -> f64 {
                    self as f64
                }

                #[allow(clippy::cast_possible_truncation)]
                fn narrow(value: f64) -> Self {
                    value as Self
                }

                fn next_up(self) -> Self {
                    <$ty>::next_up(self)
                }

                fn next_down(self) -> Self {
                    <$ty>::next_down(self)
                }

                fn midpoint(lo: Self, hi: Self) -> Self {
                    let midpoint: fn(Self, Self) -> Self = $midpoint;
                    midpoint(lo, hi)
                }
            }
        )*
    };
}

impl_int_coord!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
);

impl_float_coord!(
    f32 => Float32, midpoint = |lo, hi| {
        #[allow(clippy::cast_possible_truncation)]
        let mid = ((f64::from(lo) + f64::from(hi)) / 2.0) as f32;
        mid
    },
    f64 => Float64, midpoint = |lo, hi| lo / 2.0 + hi / 2.0,
);

/// Run `$fixed` with `$t` bound to the Rust type of a fixed-size datatype,
/// or `$var` for the string type.
macro_rules! dispatch_datatype {
    ($datatype:expr, $t:ident => $fixed:expr, string => $var:expr $(,)?) => {
        match $datatype {
            ::tessera_primitives::Datatype::Int8 => {
                type $t = i8;
                $fixed
            }
            ::tessera_primitives::Datatype::Int16 => {
                type $t = i16;
                $fixed
            }
            ::tessera_primitives::Datatype::Int32 => {
                type $t = i32;
                $fixed
            }
            ::tessera_primitives::Datatype::Int64 => {
                type $t = i64;
                $fixed
            }
            ::tessera_primitives::Datatype::Uint8 => {
                type $t = u8;
                $fixed
            }
            ::tessera_primitives::Datatype::Uint16 => {
                type $t = u16;
                $fixed
            }
            ::tessera_primitives::Datatype::Uint32 => {
                type $t = u32;
                $fixed
            }
            ::tessera_primitives::Datatype::Uint64 => {
                type $t = u64;
                $fixed
            }
            ::tessera_primitives::Datatype::Float32 => {
                type $t = f32;
                $fixed
            }
            ::tessera_primitives::Datatype::Float64 => {
                type $t = f64;
                $fixed
            }
            ::tessera_primitives::Datatype::StringAscii => $var,
        }
    };
}

/// Like `dispatch_datatype!`, but binds `$t` only for integral datatypes and
/// runs `$other` for floats and strings.
macro_rules! dispatch_integer {
    ($datatype:expr, $t:ident => $int:expr, other => $other:expr $(,)?) => {
        match $datatype {
            ::tessera_primitives::Datatype::Int8 => {
                type $t = i8;
                $int
            }
            ::tessera_primitives::Datatype::Int16 => {
                type $t = i16;
                $int
            }
            ::tessera_primitives::Datatype::Int32 => {
                type $t = i32;
                $int
            }
            ::tessera_primitives::Datatype::Int64 => {
                type $t = i64;
                $int
            }
            ::tessera_primitives::Datatype::Uint8 => {
                type $t = u8;
                $int
            }
            ::tessera_primitives::Datatype::Uint16 => {
                type $t = u16;
                $int
            }
            ::tessera_primitives::Datatype::Uint32 => {
                type $t = u32;
                $int
            }
            ::tessera_primitives::Datatype::Uint64 => {
                type $t = u64;
                $int
            }
            ::tessera_primitives::Datatype::Float32
            | ::tessera_primitives::Datatype::Float64
            | ::tessera_primitives::Datatype::StringAscii => $other,
        }
    };
}
