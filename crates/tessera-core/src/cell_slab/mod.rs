//! Module: cell_slab
//! Responsibility: walk a multi-range subarray as contiguous runs of cells
//! that never cross a tile boundary.
//! Does not own: reading or copying the cells a slab names.
//! Boundary: query ranges in, `CellSlab` descriptors out.


use crate::{
    coord::IntCoord,
    dimension::{AxisValue, FixedAxis},
    domain::{Domain, Layout},
    error::{ErrorOrigin, GeometryError},
    obs::sink::{self, MetricsEvent},
    range::Range,
};

///
/// CellSlab
///
/// One run of cells along the slab dimension.
/// `coords` is the first cell of the run; `tile_coords` names the tile
/// holding the whole run.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CellSlab<T> {
    pub tile_coords: Vec<u64>,
    pub coords: Vec<T>,
    pub length: u64,
}

///
/// SlabRange
/// Part of one query range that falls inside a single tile.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct SlabRange<T> {
    start: T,
    end: T,
    tile_idx: u64,
    len: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum IterState {
    Initial,
    Iterating,
    End,
}

///
/// CellSlabIter
///
/// Single-pass iterator over the cell slabs of a subarray.
/// Row-major slabs run along the last dimension, column-major slabs along
/// the first; every other dimension advances one coordinate at a time.
///

#[derive(Debug)]
pub struct CellSlabIter<'a, T> {
    domain: &'a Domain,
    ranges: &'a [Vec<Range>],
    layout: Layout,
    state: IterState,
    split: Vec<Vec<SlabRange<T>>>,
    cursor: Vec<usize>,
    coords: Vec<T>,
    slabs: u64,
}

impl<'a, T: IntCoord + AxisValue> CellSlabIter<'a, T> {
    /// `ranges` holds the query ranges of each dimension, sorted and
    /// non-overlapping within a dimension.
    #[must_use]
    pub const fn new(domain: &'a Domain, ranges: &'a [Vec<Range>], layout: Layout) -> Self {
        Self {
            domain,
            ranges,
            layout,
            state: IterState::Initial,
            split: Vec::new(),
            cursor: Vec::new(),
            coords: Vec::new(),
            slabs: 0,
        }
    }

    /// Validate the subarray, split it at tile boundaries and position the
    /// iterator on the first slab.
    pub fn begin(&mut self) -> Result<(), GeometryError> {
        if self.state != IterState::Initial {
            return Err(GeometryError::configuration(
                ErrorOrigin::CellSlab,
                "cell slab iteration has already begun",
            ));
        }
        if !self.layout.is_row_or_col() {
            return Err(GeometryError::configuration(
                ErrorOrigin::CellSlab,
                format!("cell slabs need a row-major or col-major layout, got {}", self.layout),
            ));
        }
        if self.ranges.len() != self.domain.dim_num() {
            return Err(Self::invalid(format!(
                "subarray has {} dimensions, domain has {}",
                self.ranges.len(),
                self.domain.dim_num()
            )));
        }

        let mut split = Vec::with_capacity(self.ranges.len());
        for (dim, ranges) in self.domain.dimensions().iter().zip(self.ranges) {
            let axis = dim.typed::<T>().ok_or_else(|| {
                Self::invalid(format!(
                    "dimension '{}' holds {}, not {}",
                    dim.name(),
                    dim.datatype(),
                    T::DATATYPE
                ))
            })?;
            if ranges.is_empty() {
                return Err(Self::invalid(format!(
                    "dimension '{}' has no query ranges",
                    dim.name()
                )));
            }

            let mut parts = Vec::new();
            for range in ranges {
                dim.check_range(range)?;
                let (lo, hi) = range.bounds::<T>();
                split_at_tiles(axis, lo, hi, &mut parts).ok_or_else(|| {
                    GeometryError::overflow(
                        ErrorOrigin::CellSlab,
                        format!("tile split of dimension '{}' overflowed", dim.name()),
                    )
                })?;
            }
            split.push(parts);
        }

        tracing::debug!(
            layout = %self.layout,
            dims = split.len(),
            sub_ranges = split.iter().map(Vec::len).sum::<usize>(),
            "cell slab iteration started"
        );

        self.cursor = vec![0; split.len()];
        self.coords = split.iter().map(|parts| parts[0].start).collect();
        self.split = split;
        self.state = IterState::Iterating;

        Ok(())
    }

    /// True once every slab has been produced.
    #[must_use]
    pub fn end(&self) -> bool {
        self.state == IterState::End
    }

    /// The slab the iterator is positioned on, if iteration is underway.
    #[must_use]
    pub fn cell_slab(&self) -> Option<CellSlab<T>> {
        if self.state != IterState::Iterating {
            return None;
        }

        let slab_dim = self.slab_dim();
        Some(CellSlab {
            tile_coords: self
                .split
                .iter()
                .zip(&self.cursor)
                .map(|(parts, &at)| parts[at].tile_idx)
                .collect(),
            coords: self.coords.clone(),
            length: self.split[slab_dim][self.cursor[slab_dim]].len,
        })
    }

    /// Move to the next slab, carrying outward through the dimensions.
    pub fn advance(&mut self) {
        if self.state != IterState::Iterating {
            return;
        }
        self.slabs += 1;

        if self.step_range(self.slab_dim()) {
            return;
        }
        for dim in self.carry_order() {
            if self.step_coord(dim) {
                return;
            }
        }

        self.state = IterState::End;
        tracing::trace!(slabs = self.slabs, "cell slab iteration finished");
        sink::record(MetricsEvent::CellSlabsProduced { slabs: self.slabs });
    }

    ///
    /// CURSOR
    ///

    fn slab_dim(&self) -> usize {
        match self.layout {
            Layout::ColMajor => 0,
            _ => self.split.len() - 1,
        }
    }

    /// Dimensions other than the slab dimension, innermost first.
    fn carry_order(&self) -> Vec<usize> {
        let dims = self.split.len();
        match self.layout {
            Layout::ColMajor => (1..dims).collect(),
            _ => (0..dims.saturating_sub(1)).rev().collect(),
        }
    }

    /// Jump to the next sub-range of `dim`, wrapping to the first one on
    /// overflow. Returns false when it wrapped.
    fn step_range(&mut self, dim: usize) -> bool {
        let next = self.cursor[dim] + 1;
        if next < self.split[dim].len() {
            self.cursor[dim] = next;
            self.coords[dim] = self.split[dim][next].start;
            return true;
        }

        self.cursor[dim] = 0;
        self.coords[dim] = self.split[dim][0].start;
        false
    }

    fn step_coord(&mut self, dim: usize) -> bool {
        let current = self.split[dim][self.cursor[dim]];
        if self.coords[dim] < current.end
            && let Some(next) = T::successor(self.coords[dim])
        {
            self.coords[dim] = next;
            return true;
        }

        self.step_range(dim)
    }

    fn invalid(message: String) -> GeometryError {
        GeometryError::validation(ErrorOrigin::CellSlab, message)
    }
}

impl<T: IntCoord + AxisValue> Iterator for CellSlabIter<'_, T> {
    type Item = CellSlab<T>;

    /// Yields nothing until `begin` has succeeded.
    fn next(&mut self) -> Option<Self::Item> {
        let slab = self.cell_slab()?;
        self.advance();
        Some(slab)
    }
}

/// Append the tile-aligned pieces of `[lo, hi]` to `out`.
fn split_at_tiles<T: IntCoord>(
    axis: &FixedAxis<T>,
    lo: T,
    hi: T,
    out: &mut Vec<SlabRange<T>>,
) -> Option<()> {
    let (mut start, end) = (lo.to_i128(), hi.to_i128());

    let Some(extent) = axis.tile_extent() else {
        return push_pieces(start, end, 0, out);
    };

    let width = i128::from(extent.extent_width());
    let origin = axis.domain().0.to_i128();
    while start <= end {
        let idx = (start - origin) / width;
        let stop = (origin + (idx + 1) * width - 1).min(end);
        push_pieces(start, stop, u64::try_from(idx).ok()?, out)?;
        start = stop + 1;
    }

    Some(())
}

/// Append `[start, end]` of one tile, cut so no piece holds more than
/// `u64::MAX` cells. Only a full 64-bit span needs a second piece.
fn push_pieces<T: IntCoord>(
    mut start: i128,
    end: i128,
    tile_idx: u64,
    out: &mut Vec<SlabRange<T>>,
) -> Option<()> {
    let max_len = i128::from(u64::MAX);

    while start <= end {
        let stop = end.min(start + max_len - 1);
        out.push(SlabRange {
            start: T::from_i128(start)?,
            end: T::from_i128(stop)?,
            tile_idx,
            len: u64::try_from(stop - start + 1).ok()?,
        });
        start = stop + 1;
    }

    Some(())
}
