//! Module: domain
//! Responsibility: the ordered dimension tuple, cell/tile ordering, and
//! multi-dimensional tile and cell counting.
//! Does not own: per-axis arithmetic (see `dimension`) or flat tile runs (see `tile`).
//! Boundary: coordinate tuples and NDRanges are always in dimension order.


use crate::{
    COUNT_OVERFLOW, IntCoord,
    dimension::{AxisValue, Dimension},
    error::{ErrorOrigin, GeometryError},
    range::{NDRange, Range},
    tile,
};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeSet, fmt};
use thiserror::Error as ThisError;

///
/// DomainError
///

#[derive(Debug, ThisError)]
pub enum DomainError {
    #[error("domain must contain at least one dimension")]
    Empty,

    #[error("duplicate dimension name '{name}'")]
    DuplicateName { name: String },

    #[error("expected {expected} per-dimension entries, got {got}")]
    DimensionCount { expected: usize, got: usize },

    #[error("tile order must be row-major or column-major, got {layout}")]
    UnsupportedTileOrder { layout: Layout },

    #[error("{op} is not supported for {layout} order")]
    UnsupportedOrder { op: &'static str, layout: Layout },

    #[error("tile runs require every dimension to share one integral datatype with a tile extent")]
    TileRunDatatype,
}

impl From<DomainError> for GeometryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Empty
            | DomainError::DuplicateName { .. }
            | DomainError::DimensionCount { .. } => {
                Self::validation(ErrorOrigin::Domain, err.to_string())
            }
            DomainError::UnsupportedTileOrder { .. }
            | DomainError::UnsupportedOrder { .. }
            | DomainError::TileRunDatatype => Self::domain_configuration(err.to_string()),
        }
    }
}

///
/// Layout
///
/// Linearization order for cells or tiles.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    RowMajor,
    ColMajor,
    Hilbert,
}

impl Layout {
    #[must_use]
    pub const fn is_row_or_col(self) -> bool {
        matches!(self, Self::RowMajor | Self::ColMajor)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RowMajor => "row-major",
            Self::ColMajor => "col-major",
            Self::Hilbert => "hilbert",
        };
        write!(f, "{label}")
    }
}

///
/// CoordSource
///
/// Anything that yields one encoded coordinate per dimension.
///

pub trait CoordSource {
    fn coord(&self, dim: usize) -> &[u8];
}

impl<C: AsRef<[u8]>> CoordSource for [C] {
    fn coord(&self, dim: usize) -> &[u8] {
        self[dim].as_ref()
    }
}

impl<C: AsRef<[u8]>> CoordSource for Vec<C> {
    fn coord(&self, dim: usize) -> &[u8] {
        self[dim].as_ref()
    }
}

impl<C: AsRef<[u8]>, const N: usize> CoordSource for [C; N] {
    fn coord(&self, dim: usize) -> &[u8] {
        self[dim].as_ref()
    }
}

///
/// Domain
///
/// Name-unique, ordered dimensions plus the cell and tile orders.
/// Immutable once built and safe to share across queries.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Domain {
    dimensions: Vec<Dimension>,
    cell_order: Layout,
    tile_order: Layout,
}

impl Domain {
    pub fn new(
        dimensions: Vec<Dimension>,
        cell_order: Layout,
        tile_order: Layout,
    ) -> Result<Self, GeometryError> {
        if let Err(err) = Self::check_dimensions(&dimensions, tile_order) {
            tracing::debug!(error = %err, "rejected domain");
            return Err(err.into());
        }

        Ok(Self {
            dimensions,
            cell_order,
            tile_order,
        })
    }

    fn check_dimensions(dimensions: &[Dimension], tile_order: Layout) -> Result<(), DomainError> {
        if dimensions.is_empty() {
            return Err(DomainError::Empty);
        }
        if !tile_order.is_row_or_col() {
            return Err(DomainError::UnsupportedTileOrder { layout: tile_order });
        }

        let mut seen = BTreeSet::new();
        for dim in dimensions {
            if !seen.insert(dim.name()) {
                return Err(DomainError::DuplicateName {
                    name: dim.name().to_string(),
                });
            }
        }

        Ok(())
    }

    #[must_use]
    pub const fn dim_num(&self) -> usize {
        self.dimensions.len()
    }

    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    #[must_use]
    pub fn dimension(&self, idx: usize) -> Option<&Dimension> {
        self.dimensions.get(idx)
    }

    /// Position and dimension carrying `name`.
    #[must_use]
    pub fn dimension_by_name(&self, name: &str) -> Option<(usize, &Dimension)> {
        self.dimensions
            .iter()
            .enumerate()
            .find(|(_, dim)| dim.name() == name)
    }

    #[must_use]
    pub const fn cell_order(&self) -> Layout {
        self.cell_order
    }

    #[must_use]
    pub const fn tile_order(&self) -> Layout {
        self.tile_order
    }

    /// True when every dimension is fixed-size.
    #[must_use]
    pub fn all_dims_fixed(&self) -> bool {
        self.dimensions.iter().all(|dim| !dim.is_var())
    }

    /// Dimension positions in the order `layout` compares them.
    fn dim_order(&self, layout: Layout) -> impl Iterator<Item = usize> + use<> {
        let n = self.dim_num();
        let col_major = layout == Layout::ColMajor;
        (0..n).map(move |i| if col_major { n - 1 - i } else { i })
    }

    ///
    /// ORDERING
    ///

    /// Lexicographic cell comparison; column-major compares the last dimension first.
    pub fn cell_order_cmp<A, B>(&self, a: &A, b: &B) -> Result<Ordering, GeometryError>
    where
        A: CoordSource + ?Sized,
        B: CoordSource + ?Sized,
    {
        if !self.cell_order.is_row_or_col() {
            return Err(DomainError::UnsupportedOrder {
                op: "cell comparison",
                layout: self.cell_order,
            }
            .into());
        }

        for d in self.dim_order(self.cell_order) {
            let ord = self.dimensions[d].compare_coords(a.coord(d), b.coord(d));
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }

        Ok(Ordering::Equal)
    }

    /// Compare the tiles holding `a` and `b`, skipping string dimensions and
    /// dimensions without a tile extent.
    pub fn tile_order_cmp<A, B>(&self, a: &A, b: &B) -> Result<Ordering, GeometryError>
    where
        A: CoordSource + ?Sized,
        B: CoordSource + ?Sized,
    {
        if !self.tile_order.is_row_or_col() {
            return Err(DomainError::UnsupportedOrder {
                op: "tile comparison",
                layout: self.tile_order,
            }
            .into());
        }

        for d in self.dim_order(self.tile_order) {
            let dim = &self.dimensions[d];
            if dim.is_var() || !dim.has_tile_extent() {
                continue;
            }

            let ord = dim.tile_idx_of(a.coord(d)).cmp(&dim.tile_idx_of(b.coord(d)));
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }

        Ok(Ordering::Equal)
    }

    ///
    /// COUNTING
    ///

    /// Tiles intersected by `ndrange`; `COUNT_OVERFLOW` when the product
    /// does not fit.
    pub fn tile_num(&self, ndrange: &NDRange) -> Result<u64, GeometryError> {
        self.check_dim_count(ndrange.len())?;

        Ok(self.product(ndrange, Dimension::tile_num))
    }

    /// Cells in `ndrange`; `COUNT_OVERFLOW` when uncountable or too large.
    pub fn cell_num(&self, ndrange: &NDRange) -> Result<u64, GeometryError> {
        self.check_dim_count(ndrange.len())?;

        Ok(self.product(ndrange, Dimension::domain_range))
    }

    fn product(&self, ndrange: &NDRange, count: impl Fn(&Dimension, &Range) -> u64) -> u64 {
        let mut total: u64 = 1;
        for (dim, range) in self.dimensions.iter().zip(ndrange.iter()) {
            let n = count(dim, range);
            if n == COUNT_OVERFLOW {
                return COUNT_OVERFLOW;
            }
            total = match total.checked_mul(n) {
                Some(total) => total,
                None => return COUNT_OVERFLOW,
            };
        }

        total
    }

    ///
    /// NDRANGE OPS
    ///

    /// The full domain as an NDRange.
    #[must_use]
    pub fn domain_ndrange(&self) -> NDRange {
        self.dimensions
            .iter()
            .map(|dim| dim.domain().clone())
            .collect()
    }

    /// Validate `ndrange` against dimension count, types and bounds.
    pub fn check_ndrange(&self, ndrange: &NDRange) -> Result<(), GeometryError> {
        self.check_dim_count(ndrange.len())?;
        for (dim, range) in self.dimensions.iter().zip(ndrange.iter()) {
            dim.check_range(range)?;
        }

        Ok(())
    }

    fn check_dim_count(&self, got: usize) -> Result<(), GeometryError> {
        if got != self.dim_num() {
            return Err(DomainError::DimensionCount {
                expected: self.dim_num(),
                got,
            }
            .into());
        }

        Ok(())
    }

    /// Grow `dst` to cover `src`; an empty `dst` becomes a copy of `src`.
    pub fn expand_ndrange(&self, src: &NDRange, dst: &mut NDRange) {
        if dst.is_empty() {
            *dst = src.clone();
            return;
        }

        for ((dim, s), d) in self.dimensions.iter().zip(src.iter()).zip(dst.iter_mut()) {
            dim.expand_range(s, d);
        }
    }

    /// Clamp every range of `ndrange` into the matching range of `bounds`.
    pub fn crop_ndrange(&self, bounds: &NDRange, ndrange: &mut NDRange) {
        for ((dim, b), r) in self.dimensions.iter().zip(bounds.iter()).zip(ndrange.iter_mut()) {
            dim.crop_to(r, b);
        }
    }

    /// Snap every range outward to tile boundaries.
    pub fn expand_to_tiles(&self, ndrange: &mut NDRange) {
        for (dim, r) in self.dimensions.iter().zip(ndrange.iter_mut()) {
            dim.expand_to_tile(r);
        }
    }

    /// True when `a` lies inside `b` on every dimension.
    #[must_use]
    pub fn covered(&self, a: &NDRange, b: &NDRange) -> bool {
        self.dimensions
            .iter()
            .zip(a.iter().zip(b.iter()))
            .all(|(dim, (ra, rb))| dim.covered(ra, rb))
    }

    #[must_use]
    pub fn overlap(&self, a: &NDRange, b: &NDRange) -> bool {
        self.dimensions
            .iter()
            .zip(a.iter().zip(b.iter()))
            .all(|(dim, (ra, rb))| dim.overlap(ra, rb))
    }

    /// Expected fraction of `mbr` returned by `query`.
    ///
    /// Keeps the per-dimension guarantee: exactly 1.0 for containment,
    /// exactly 0.0 for disjointness, strictly between otherwise.
    #[must_use]
    pub fn overlap_ratio(&self, query: &NDRange, mbr: &NDRange) -> f64 {
        let mut ratio = 1.0;
        for (dim, (q, m)) in self.dimensions.iter().zip(query.iter().zip(mbr.iter())) {
            let r = dim.overlap_ratio(q, m);
            if r == 0.0 {
                return 0.0;
            }
            ratio *= r;
        }

        if ratio == 0.0 {
            // partial product underflowed; stay out of the decisive zero
            0.0_f64.next_up()
        } else {
            ratio
        }
    }

    ///
    /// TILE COORDINATES
    ///

    /// Per-dimension tile index of a cell; 0 on string dimensions.
    pub fn get_tile_coords<C: CoordSource + ?Sized>(&self, coords: &C) -> Vec<u64> {
        self.dimensions
            .iter()
            .enumerate()
            .map(|(d, dim)| dim.tile_idx_of(coords.coord(d)))
            .collect()
    }

    /// Inclusive tile-index bounds of `subarray` on every dimension.
    pub fn tile_domain(&self, subarray: &NDRange) -> Result<Vec<(u64, u64)>, GeometryError> {
        self.check_dim_count(subarray.len())?;

        Ok(self
            .dimensions
            .iter()
            .zip(subarray.iter())
            .map(|(dim, r)| {
                if dim.is_var() {
                    (0, 0)
                } else {
                    (dim.tile_idx_of(r.start_bytes()), dim.tile_idx_of(r.end_bytes()))
                }
            })
            .collect())
    }

    /// Tile bounds over the whole domain.
    #[must_use]
    pub fn domain_tile_domain(&self) -> Vec<(u64, u64)> {
        self.dimensions
            .iter()
            .map(|dim| (0, dim.tile_num(dim.domain()).saturating_sub(1)))
            .collect()
    }

    /// Flattened tile-order position of `tile_coords` within the whole domain.
    pub fn get_tile_pos(&self, tile_coords: &[u64]) -> Result<u64, GeometryError> {
        self.get_tile_pos_in(&self.domain_tile_domain(), tile_coords)
    }

    /// Flattened tile-order position of `tile_coords` within `tile_domain`.
    pub fn get_tile_pos_in(
        &self,
        tile_domain: &[(u64, u64)],
        tile_coords: &[u64],
    ) -> Result<u64, GeometryError> {
        self.check_dim_count(tile_domain.len())?;
        self.check_dim_count(tile_coords.len())?;

        let mut pos: u64 = 0;
        let mut stride: u64 = 1;

        // innermost dimension first
        for d in self.dim_order(self.tile_order).collect::<Vec<_>>().into_iter().rev() {
            let (lo, hi) = tile_domain[d];
            let offset = tile_coords[d].saturating_sub(lo);
            pos = pos.saturating_add(offset.saturating_mul(stride));
            stride = stride.saturating_mul(hi.saturating_sub(lo).saturating_add(1));
        }

        Ok(pos)
    }

    /// Advance `tile_coords` to its successor in tile order within
    /// `tile_domain`. Returns false once the odometer runs past the end.
    pub fn get_next_tile_coords(
        &self,
        tile_domain: &[(u64, u64)],
        tile_coords: &mut [u64],
    ) -> Result<bool, GeometryError> {
        self.check_dim_count(tile_domain.len())?;
        self.check_dim_count(tile_coords.len())?;

        let order: Vec<usize> = self.dim_order(self.tile_order).collect();

        for (pos, &d) in order.iter().enumerate().rev() {
            let (lo, hi) = tile_domain[d];
            if tile_coords[d] < hi {
                tile_coords[d] += 1;
                return Ok(true);
            }
            if pos == 0 {
                // past the outermost dimension
                tile_coords[d] = hi.saturating_add(1);
                return Ok(false);
            }
            tile_coords[d] = lo;
        }

        Ok(false)
    }

    /// Coordinate bounds of the tile at `tile_coords`. String dimensions
    /// contribute their (empty) domain.
    pub fn get_tile_subarray(&self, tile_coords: &[u64]) -> Result<NDRange, GeometryError> {
        self.check_dim_count(tile_coords.len())?;

        Ok(self
            .dimensions
            .iter()
            .zip(tile_coords)
            .map(|(dim, &idx)| match (dim.tile_coord_low(idx), dim.tile_coord_high(idx)) {
                (Some(lo), Some(hi)) => {
                    let mut bytes = lo;
                    bytes.extend_from_slice(&hi);
                    Range::from_fixed_bytes(&bytes).unwrap_or_else(|_| dim.domain().clone())
                }
                _ => dim.domain().clone(),
            })
            .collect())
    }

    ///
    /// TILE RUNS
    ///

    /// True when the flat tile run `[start_tile, start_tile + num_tiles)`
    /// forms a hyper-rectangle over the whole domain.
    pub fn is_rectangular_tile_run(
        &self,
        start_tile: u64,
        num_tiles: u64,
    ) -> Result<bool, GeometryError> {
        Ok(self.tile_run_ndrange(start_tile, num_tiles)?.is_some())
    }

    /// NDRange covered by a flat tile run, or `None` when the run is not
    /// rectangular or its bounds do not fit the datatype.
    ///
    /// Needs every dimension to share one integral datatype and carry a tile extent.
    pub fn tile_run_ndrange(
        &self,
        start_tile: u64,
        num_tiles: u64,
    ) -> Result<Option<NDRange>, GeometryError> {
        let datatype = self.dimensions[0].datatype();
        if self
            .dimensions
            .iter()
            .any(|dim| dim.datatype() != datatype || !dim.has_tile_extent())
        {
            return Err(DomainError::TileRunDatatype.into());
        }

        dispatch_integer!(datatype,
            T => Ok(self.typed_tile_run::<T>(start_tile, num_tiles)),
            other => Err(DomainError::TileRunDatatype.into()),
        )
    }

    fn typed_tile_run<T: IntCoord + AxisValue>(
        &self,
        start_tile: u64,
        num_tiles: u64,
    ) -> Option<NDRange> {
        let mut domain = Vec::with_capacity(self.dim_num());
        let mut extents = Vec::with_capacity(self.dim_num());
        for dim in &self.dimensions {
            let axis = dim.typed::<T>()?;
            domain.push(axis.domain());
            extents.push(axis.tile_extent()?);
        }

        let bounds =
            tile::domain_tile_offset(self.tile_order, &extents, &domain, start_tile, num_tiles)?;

        Some(
            bounds
                .into_iter()
                .map(|(lo, hi)| Range::from_bounds(lo, hi))
                .collect(),
        )
    }
}
