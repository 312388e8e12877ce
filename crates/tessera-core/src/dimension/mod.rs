//! Module: dimension
//! Responsibility: one coordinate axis and every typed geometry operation on it.
//! Does not own: multi-dimensional ordering or counting (see `domain`).
//! Boundary: the physical type is fixed at construction by the `Axis` variant;
//! a Range of another type reaching these methods is a caller bug.

mod axis;
pub(crate) mod string;


pub use axis::FixedAxis;

use crate::{
    config::FilterConfig,
    coord::CoordValue,
    error::{ErrorOrigin, GeometryError},
    range::{Range, RangeError},
};
use std::cmp::Ordering;
use tessera_primitives::Datatype;
use thiserror::Error as ThisError;

///
/// DimensionError
///
/// Dimension construction and coordinate-check failures.
///

#[derive(Debug, ThisError)]
pub enum DimensionError {
    #[error("tile extent must be greater than zero")]
    NonPositiveExtent,

    #[error("tile extent must be finite")]
    NonFiniteExtent,

    #[error("tile extent {extent} exceeds the domain range {range}")]
    ExtentExceedsDomain { extent: String, range: String },

    #[error("domain upper bound expanded to a tile multiple exceeds the {datatype} maximum")]
    ExpandedDomainOverflow { datatype: Datatype },

    #[error("tile extents are not supported on {datatype} dimensions")]
    ExtentNotSupported { datatype: Datatype },

    #[error("{datatype} dimensions do not carry a domain")]
    DomainNotSupported { datatype: Datatype },

    #[error("domain bounds must be finite")]
    NonFiniteDomain,

    #[error("coordinate {coord} is out of domain bounds [{lo}, {hi}] on dimension '{name}'")]
    OutOfBounds {
        coord: String,
        lo: String,
        hi: String,
        name: String,
    },

    #[error("range is outside the domain of dimension '{name}'")]
    RangeOutsideDomain { name: String },

    #[error("cannot compute a bounding range over an empty coordinate column")]
    EmptyColumn,

    #[error("coordinate column of {len} bytes is not a multiple of {width}")]
    ColumnLength { len: usize, width: usize },
}

impl From<DimensionError> for GeometryError {
    fn from(err: DimensionError) -> Self {
        match err {
            DimensionError::ExpandedDomainOverflow { .. } => {
                Self::overflow(ErrorOrigin::Dimension, err.to_string())
            }
            _ => Self::dimension_validation(err.to_string()),
        }
    }
}

///
/// CellValNum
///
/// Values per cell: one for fixed-size types, variable for strings.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CellValNum {
    Fixed(u32),
    Var,
}

///
/// Axis
///
/// Exhaustive per-type dispatch. Adding a datatype fails every match below.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Axis {
    Int8(FixedAxis<i8>),
    Int16(FixedAxis<i16>),
    Int32(FixedAxis<i32>),
    Int64(FixedAxis<i64>),
    Uint8(FixedAxis<u8>),
    Uint16(FixedAxis<u16>),
    Uint32(FixedAxis<u32>),
    Uint64(FixedAxis<u64>),
    Float32(FixedAxis<f32>),
    Float64(FixedAxis<f64>),
    StringAscii,
}

/// Run `$fixed` with `$a` bound to the typed axis, or `$var` for strings.
macro_rules! with_axis {
    ($axis:expr, $a:ident => $fixed:expr, string => $var:expr $(,)?) => {
        match $axis {
            Axis::Int8($a) => $fixed,
            Axis::Int16($a) => $fixed,
            Axis::Int32($a) => $fixed,
            Axis::Int64($a) => $fixed,
            Axis::Uint8($a) => $fixed,
            Axis::Uint16($a) => $fixed,
            Axis::Uint32($a) => $fixed,
            Axis::Uint64($a) => $fixed,
            Axis::Float32($a) => $fixed,
            Axis::Float64($a) => $fixed,
            Axis::StringAscii => $var,
        }
    };
}

impl Axis {
    #[must_use]
    pub const fn datatype(&self) -> Datatype {
        match self {
            Self::Int8(_) => Datatype::Int8,
            Self::Int16(_) => Datatype::Int16,
            Self::Int32(_) => Datatype::Int32,
            Self::Int64(_) => Datatype::Int64,
            Self::Uint8(_) => Datatype::Uint8,
            Self::Uint16(_) => Datatype::Uint16,
            Self::Uint32(_) => Datatype::Uint32,
            Self::Uint64(_) => Datatype::Uint64,
            Self::Float32(_) => Datatype::Float32,
            Self::Float64(_) => Datatype::Float64,
            Self::StringAscii => Datatype::StringAscii,
        }
    }
}

///
/// AxisValue
///
/// Links a coordinate type to its `Axis` variant.
///

pub trait AxisValue: CoordValue {
    fn wrap(axis: FixedAxis<Self>) -> Axis;

    fn unwrap(axis: &Axis) -> Option<&FixedAxis<Self>>;
}

macro_rules! impl_axis_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl AxisValue for $ty {
                fn wrap(axis: FixedAxis<Self>) -> Axis {
                    Axis::$variant(axis)
                }

                fn unwrap(axis: &Axis) -> Option<&FixedAxis<Self>> {
                    match axis {
                        Axis::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_axis_value!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
);

pub(crate) fn bounds_overlap<K: PartialOrd>(r1: (K, K), r2: (K, K)) -> bool {
    !(r1.0 > r2.1 || r1.1 < r2.0)
}

/// True when `r1` lies inside `r2`.
pub(crate) fn bounds_covered<K: PartialOrd>(r1: (K, K), r2: (K, K)) -> bool {
    r1.0 >= r2.0 && r1.1 <= r2.1
}

fn encode<T: CoordValue>(value: T) -> Vec<u8> {
    let mut out = Vec::with_capacity(T::SIZE);
    value.write_le(&mut out);
    out
}

fn var_bounds(range: &Range) -> (&[u8], &[u8]) {
    (range.start_bytes(), range.end_bytes())
}

// Ranges must be sorted with non-decreasing starts and ends; the window is
// every range whose end reaches `mbr.0` and whose start does not pass `mbr.1`.
fn relevant_window<'r, K: Copy + PartialOrd>(
    ranges: &'r [Range],
    mbr: (K, K),
    bounds: impl Fn(&'r Range) -> (K, K),
) -> Vec<usize> {
    let all: Vec<(K, K)> = ranges.iter().map(&bounds).collect();
    let first = all.partition_point(|b| b.1 < mbr.0);
    let window = all[first..].partition_point(|b| b.0 <= mbr.1);

    (first..first + window)
        .filter(|&i| bounds_overlap(all[i], mbr))
        .collect()
}

///
/// Dimension
///
/// One named axis: physical type, domain, optional tile extent and an
/// opaque filter list owned by the storage layer.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Dimension {
    name: String,
    filters: Vec<String>,
    domain: Range,
    tile_extent: Option<Vec<u8>>,
    axis: Axis,
}

impl Dimension {
    /// Build a dimension from an encoded domain and optional encoded extent.
    pub fn new(
        name: impl Into<String>,
        datatype: Datatype,
        domain: Range,
        tile_extent: Option<&[u8]>,
    ) -> Result<Self, GeometryError> {
        dispatch_datatype!(datatype,
            T => {
                domain.validate(datatype)?;
                let (lo, hi) = domain.bounds::<T>();
                let extent = match tile_extent {
                    Some(bytes) if bytes.len() != T::SIZE => {
                        return Err(RangeError::EncodedLength {
                            len: bytes.len(),
                            expected: T::SIZE,
                        }
                        .into());
                    }
                    Some(bytes) => Some(T::read_le(bytes)),
                    None => None,
                };
                Self::fixed::<T>(name, lo, hi, extent)
            },
            string => {
                if tile_extent.is_some() {
                    return Err(DimensionError::ExtentNotSupported { datatype }.into());
                }
                if !domain.is_empty() {
                    return Err(DimensionError::DomainNotSupported { datatype }.into());
                }
                Ok(Self::string(name))
            },
        )
    }

    /// Build a fixed-size dimension from typed bounds.
    pub fn fixed<T: AxisValue>(
        name: impl Into<String>,
        lo: T,
        hi: T,
        extent: Option<T>,
    ) -> Result<Self, GeometryError> {
        let axis = FixedAxis::new(lo, hi, extent)?;

        Ok(Self {
            name: name.into(),
            filters: Vec::new(),
            domain: Range::from_bounds(lo, hi),
            tile_extent: extent.map(encode),
            axis: T::wrap(axis),
        })
    }

    /// Build a variable-length string dimension; it has no domain or extent.
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filters: Vec::new(),
            domain: Range::default(),
            tile_extent: None,
            axis: Axis::StringAscii,
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: Vec<String>) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn datatype(&self) -> Datatype {
        self.axis.datatype()
    }

    #[must_use]
    pub const fn cell_val_num(&self) -> CellValNum {
        match self.axis {
            Axis::StringAscii => CellValNum::Var,
            _ => CellValNum::Fixed(1),
        }
    }

    #[must_use]
    pub const fn is_var(&self) -> bool {
        matches!(self.axis, Axis::StringAscii)
    }

    #[must_use]
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    #[must_use]
    pub const fn domain(&self) -> &Range {
        &self.domain
    }

    #[must_use]
    pub fn tile_extent(&self) -> Option<&[u8]> {
        self.tile_extent.as_deref()
    }

    #[must_use]
    pub const fn has_tile_extent(&self) -> bool {
        self.tile_extent.is_some()
    }

    #[must_use]
    pub const fn axis(&self) -> &Axis {
        &self.axis
    }

    /// Typed view of this dimension, if it holds `T`.
    #[must_use]
    pub fn typed<T: AxisValue>(&self) -> Option<&FixedAxis<T>> {
        T::unwrap(&self.axis)
    }

    ///
    /// TILES
    ///

    /// Floor-division tile number of `value` relative to `domain_start`.
    #[must_use]
    pub fn tile_idx<T: CoordValue>(value: T, domain_start: T, extent: T) -> u64 {
        T::tile_idx(value, domain_start, extent)
    }

    /// Tile index of an encoded coordinate; 0 for strings.
    #[must_use]
    pub fn tile_idx_of(&self, coord: &[u8]) -> u64 {
        with_axis!(&self.axis, a => a.tile_idx(a.decode(coord)), string => 0)
    }

    /// Encoded low bound of tile `idx`; `None` for strings.
    #[must_use]
    pub fn tile_coord_low(&self, idx: u64) -> Option<Vec<u8>> {
        with_axis!(&self.axis, a => Some(encode(a.tile_coord_low(idx))), string => None)
    }

    /// Encoded high bound of tile `idx`; `None` for strings.
    #[must_use]
    pub fn tile_coord_high(&self, idx: u64) -> Option<Vec<u8>> {
        with_axis!(&self.axis, a => Some(encode(a.tile_coord_high(idx))), string => None)
    }

    /// Snap `range` outward to tile boundaries; integral types with an extent only.
    pub fn expand_to_tile(&self, range: &mut Range) {
        with_axis!(&self.axis,
            a => {
                let (lo, hi) = a.expand_to_tile(a.bounds_of(range));
                *range = Range::from_bounds(lo, hi);
            },
            string => {},
        );
    }

    #[must_use]
    pub fn coincides_with_tiles(&self, range: &Range) -> bool {
        with_axis!(&self.axis,
            a => a.coincides_with_tiles(a.bounds_of(range)),
            string => false,
        )
    }

    /// Number of tiles `range` intersects; 1 for strings or without an extent.
    #[must_use]
    pub fn tile_num(&self, range: &Range) -> u64 {
        with_axis!(&self.axis, a => a.tile_num(a.bounds_of(range)), string => 1)
    }

    /// Cell count of `range`; `u64::MAX` for floats, strings, or overflow.
    #[must_use]
    pub fn domain_range(&self, range: &Range) -> u64 {
        with_axis!(&self.axis,
            a => {
                let (lo, hi) = a.bounds_of(range);
                CoordValue::cell_count(lo, hi)
            },
            string => u64::MAX,
        )
    }

    /// Coordinate just before the boundary `tile_num + 1` tiles past the
    /// start of `range`; `None` without an extent or on overflow.
    #[must_use]
    pub fn ceil_to_tile(&self, range: &Range, tile_num: u64) -> Option<Vec<u8>> {
        with_axis!(&self.axis,
            a => a.ceil_to_tile(a.bounds_of(range).0, tile_num).map(encode),
            string => None,
        )
    }

    ///
    /// PREDICATES
    ///

    #[must_use]
    pub fn overlap(&self, r1: &Range, r2: &Range) -> bool {
        with_axis!(&self.axis,
            a => bounds_overlap(a.bounds_of(r1), a.bounds_of(r2)),
            string => bounds_overlap(var_bounds(r1), var_bounds(r2)),
        )
    }

    /// True when `r1` lies inside `r2`.
    #[must_use]
    pub fn covered(&self, r1: &Range, r2: &Range) -> bool {
        with_axis!(&self.axis,
            a => bounds_covered(a.bounds_of(r1), a.bounds_of(r2)),
            string => bounds_covered(var_bounds(r1), var_bounds(r2)),
        )
    }

    /// True when the encoded coordinate lies inside `range`.
    #[must_use]
    pub fn contains(&self, range: &Range, coord: &[u8]) -> bool {
        with_axis!(&self.axis,
            a => {
                let (lo, hi) = a.bounds_of(range);
                let value = a.decode(coord);
                lo <= value && value <= hi
            },
            string => range.start_bytes() <= coord && coord <= range.end_bytes(),
        )
    }

    /// Fraction of `r2` covered by `r1`.
    ///
    /// Exactly 1.0 only for containment and exactly 0.0 only for disjoint
    /// ranges; every partial overlap lands strictly inside (0, 1).
    #[must_use]
    pub fn overlap_ratio(&self, r1: &Range, r2: &Range) -> f64 {
        with_axis!(&self.axis,
            a => CoordValue::overlap_ratio(a.bounds_of(r1), a.bounds_of(r2)),
            string => string::overlap_ratio(var_bounds(r1), var_bounds(r2)),
        )
    }

    ///
    /// SPLITTING
    ///

    /// Split `range` at `value` into `[lo, value]` and `[next(value), hi]`.
    /// Returns `None` when `value` is not inside `[lo, hi)`.
    #[must_use]
    pub fn split_range(&self, range: &Range, value: &[u8]) -> Option<(Range, Range)> {
        with_axis!(&self.axis,
            a => {
                let (lo, hi) = a.bounds_of(range);
                let split = a.decode(value);
                if split < lo || split >= hi {
                    return None;
                }
                let next = CoordValue::successor(split)?;
                Some((Range::from_bounds(lo, split), Range::from_bounds(next, hi)))
            },
            string => {
                let (lo, hi) = var_bounds(range);
                let (first_end, second_start) = string::split_range(lo, hi, value)?;
                Some((
                    Range::from_var_bounds(lo, &first_end),
                    Range::from_var_bounds(&second_start, hi),
                ))
            },
        )
    }

    /// Encoded split point of `range`, or `None` when it is unsplittable.
    #[must_use]
    pub fn splitting_value(&self, range: &Range) -> Option<Vec<u8>> {
        self.splitting_value_with_config(range, &FilterConfig::default())
    }

    #[must_use]
    pub fn splitting_value_with_config(
        &self,
        range: &Range,
        config: &FilterConfig,
    ) -> Option<Vec<u8>> {
        with_axis!(&self.axis,
            a => {
                let (lo, hi) = a.bounds_of(range);
                CoordValue::splitting_value(lo, hi).map(encode)
            },
            string => {
                let (lo, hi) = var_bounds(range);
                string::splitting_value(lo, hi, config.max_string_split_depth)
            },
        )
    }

    ///
    /// BUCKETING
    ///

    /// Normalize a coordinate into `[0, max_bucket]`; strings keep the
    /// leading `bits` bits of their big-endian prefix instead.
    #[must_use]
    pub fn map_to_uint64(&self, coord: &[u8], bits: u32, max_bucket: u64) -> u64 {
        with_axis!(&self.axis,
            a => a.map_to_uint64(a.decode(coord), max_bucket),
            string => string::map_to_uint64(coord, bits),
        )
    }

    /// Lossy inverse of `map_to_uint64`.
    #[must_use]
    pub fn map_from_uint64(&self, value: u64, bits: u32, max_bucket: u64) -> Vec<u8> {
        with_axis!(&self.axis,
            a => encode(a.map_from_uint64(value, max_bucket)),
            string => string::map_from_uint64(value, bits),
        )
    }

    ///
    /// RANGE LISTS
    ///

    /// Indexes of `ranges` that intersect `mbr`.
    ///
    /// `ranges` must be sorted with non-decreasing starts and ends.
    #[must_use]
    pub fn relevant_ranges(&self, ranges: &[Range], mbr: &Range) -> Vec<usize> {
        with_axis!(&self.axis,
            a => relevant_window(ranges, a.bounds_of(mbr), |r| a.bounds_of(r)),
            string => relevant_window(ranges, var_bounds(mbr), var_bounds),
        )
    }

    /// For each index in `relevant`, whether `mbr` lies fully inside that range.
    #[must_use]
    pub fn covered_vec(&self, ranges: &[Range], mbr: &Range, relevant: &[usize]) -> Vec<bool> {
        relevant
            .iter()
            .map(|&i| self.covered(mbr, &ranges[i]))
            .collect()
    }

    ///
    /// DOMAIN CHECKS
    ///

    /// Fail when `coord` lies outside the domain. Not applicable to strings.
    pub fn oob(&self, coord: &[u8]) -> Result<(), GeometryError> {
        with_axis!(&self.axis,
            a => {
                let value = a.decode(coord);
                if a.oob(value) {
                    let (lo, hi) = a.domain();
                    return Err(DimensionError::OutOfBounds {
                        coord: format!("{value:?}"),
                        lo: format!("{lo:?}"),
                        hi: format!("{hi:?}"),
                        name: self.name.clone(),
                    }
                    .into());
                }
                Ok(())
            },
            string => Ok(()),
        )
    }

    /// Validate a query range and require it to lie inside the domain.
    pub fn check_range(&self, range: &Range) -> Result<(), GeometryError> {
        range.validate(self.datatype())?;
        if !self.is_var() && !self.covered(range, &self.domain) {
            return Err(DimensionError::RangeOutsideDomain {
                name: self.name.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Clamp `range` into the domain. No-op for strings.
    pub fn crop_range(&self, range: &mut Range) {
        with_axis!(&self.axis,
            a => {
                let (lo, hi) = a.crop(a.bounds_of(range));
                *range = Range::from_bounds(lo, hi);
            },
            string => {},
        );
    }

    /// Clamp `range` into arbitrary `bounds` of this dimension's type.
    pub fn crop_to(&self, range: &mut Range, bounds: &Range) {
        with_axis!(&self.axis,
            a => {
                let (lo, hi) = a.bounds_of(range);
                let (min, max) = a.bounds_of(bounds);
                let lo = if lo < min { min } else { lo };
                let hi = if hi > max { max } else { hi };
                *range = Range::from_bounds(lo, hi);
            },
            string => range.crop_var(bounds),
        );
    }

    /// Grow `dst` to include `src`; an empty `dst` becomes `src`.
    pub fn expand_range(&self, src: &Range, dst: &mut Range) {
        if dst.is_empty() {
            *dst = src.clone();
            return;
        }

        with_axis!(&self.axis,
            a => {
                let (s_lo, s_hi) = a.bounds_of(src);
                let (d_lo, d_hi) = a.bounds_of(dst);
                let lo = if s_lo < d_lo { s_lo } else { d_lo };
                let hi = if s_hi > d_hi { s_hi } else { d_hi };
                *dst = Range::from_bounds(lo, hi);
            },
            string => {
                let lo = src.start_bytes().min(dst.start_bytes()).to_vec();
                let hi = src.end_bytes().max(dst.end_bytes()).to_vec();
                *dst = Range::from_var_bounds(&lo, &hi);
            },
        );
    }

    /// Grow `range` to include one encoded coordinate.
    pub fn expand_range_v(&self, value: &[u8], range: &mut Range) {
        let point = if self.is_var() {
            Range::from_var_bounds(value, value)
        } else {
            let mut doubled = Vec::with_capacity(value.len() * 2);
            doubled.extend_from_slice(value);
            doubled.extend_from_slice(value);
            Range::from_fixed_bytes(&doubled).unwrap_or_default()
        };

        if !point.is_empty() {
            self.expand_range(&point, range);
        }
    }

    /// Bounding range of a decoded fixed-size coordinate column.
    pub fn compute_mbr(&self, values: &[u8]) -> Result<Range, GeometryError> {
        let Some(width) = self.datatype().size() else {
            return Err(RangeError::EncodedLength {
                len: values.len(),
                expected: 0,
            }
            .into());
        };
        if values.is_empty() {
            return Err(DimensionError::EmptyColumn.into());
        }
        if values.len() % width != 0 {
            return Err(DimensionError::ColumnLength {
                len: values.len(),
                width,
            }
            .into());
        }

        let mut mbr = Range::default();
        for value in values.chunks_exact(width) {
            self.expand_range_v(value, &mut mbr);
        }

        Ok(mbr)
    }

    /// Bounding range of a decoded string column given start offsets.
    pub fn compute_mbr_var(&self, offsets: &[u64], data: &[u8]) -> Result<Range, GeometryError> {
        if offsets.is_empty() {
            return Err(DimensionError::EmptyColumn.into());
        }

        let mut mbr = Range::default();
        for i in 0..offsets.len() {
            let value = var_cell(offsets, data, i).ok_or_else(|| {
                GeometryError::dimension_validation(format!(
                    "string offset {i} is outside the {} byte value buffer",
                    data.len()
                ))
            })?;
            self.expand_range_v(value, &mut mbr);
        }

        Ok(mbr)
    }

    /// Order two encoded coordinates of this dimension.
    #[must_use]
    pub fn compare_coords(&self, a: &[u8], b: &[u8]) -> Ordering {
        with_axis!(&self.axis,
            axis => axis.decode(a).coord_cmp(&axis.decode(b)),
            string => a.cmp(b),
        )
    }
}

/// Slice cell `i` out of an offsets + data string column.
fn var_cell<'a>(offsets: &[u64], data: &'a [u8], i: usize) -> Option<&'a [u8]> {
    let start = usize::try_from(*offsets.get(i)?).ok()?;
    let end = match offsets.get(i + 1) {
        Some(&next) => usize::try_from(next).ok()?,
        None => data.len(),
    };

    data.get(start..end)
}
