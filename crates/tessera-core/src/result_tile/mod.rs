//! Module: result_tile
//! Responsibility: per-tile keep/drop bitmaps, overwrite masks and
//! multiplicity counts against query ranges.
//! Does not own: tile fetch or decoding; buffers arrive already decoded.
//! Boundary: one instance per query per tile, used by one thread at a time.

/// Bind `$contains` to a monomorphized "coordinate lies in `$range`" check
/// for the physical type of `$datatype`, then run `$body`.
macro_rules! with_range_check {
    ($datatype:expr, $range:expr, $contains:ident => $body:expr) => {
        dispatch_datatype!($datatype,
            T => {
                let (lo, hi) = $range.bounds::<T>();
                let $contains = move |coord: &[u8]| {
                    let value = <T as $crate::CoordValue>::read_le(coord);
                    lo <= value && value <= hi
                };
                $body
            },
            string => {
                let (lo, hi) = ($range.start_bytes(), $range.end_bytes());
                let $contains = move |coord: &[u8]| lo <= coord && coord <= hi;
                $body
            },
        )
    };
}

mod coords;
mod count;
mod dense;
mod sparse;

#[cfg(test)]
mod tests;

pub use coords::{CellCoords, CoordBuffers, DimColumn};
pub use count::ResultBitmap;
pub use dense::FragmentDomain;

use crate::{
    config::FilterConfig,
    dimension::Dimension,
    domain::{Domain, Layout},
    error::GeometryError,
    obs::sink::{self, FilterKind, MetricsEvent},
    range::{NDRange, Range},
};
use coords::TileCoords;

///
/// ResultTile
///
/// Decoded coordinates of one fetched tile paired with the array domain.
///

#[derive(Clone, Debug)]
pub struct ResultTile<'d> {
    domain: &'d Domain,
    frag_idx: usize,
    tile_idx: u64,
    coords: TileCoords,
    config: FilterConfig,
}

impl<'d> ResultTile<'d> {
    /// Attach coordinate buffers to a tile, validating their layout once.
    pub fn new(
        domain: &'d Domain,
        frag_idx: usize,
        tile_idx: u64,
        buffers: CoordBuffers,
    ) -> Result<Self, GeometryError> {
        Self::with_config(domain, frag_idx, tile_idx, buffers, FilterConfig::default())
    }

    pub fn with_config(
        domain: &'d Domain,
        frag_idx: usize,
        tile_idx: u64,
        buffers: CoordBuffers,
        config: FilterConfig,
    ) -> Result<Self, GeometryError> {
        config.validate()?;
        let coords = TileCoords::new(domain.dimensions(), buffers)?;

        Ok(Self {
            domain,
            frag_idx,
            tile_idx,
            coords,
            config,
        })
    }

    #[must_use]
    pub const fn domain(&self) -> &'d Domain {
        self.domain
    }

    #[must_use]
    pub const fn frag_idx(&self) -> usize {
        self.frag_idx
    }

    #[must_use]
    pub const fn tile_idx(&self) -> u64 {
        self.tile_idx
    }

    #[must_use]
    pub const fn cell_num(&self) -> usize {
        self.coords.cell_num()
    }

    #[must_use]
    pub const fn stores_zipped_coords(&self) -> bool {
        self.coords.is_zipped()
    }

    #[must_use]
    pub const fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Encoded coordinate of cell `pos` on dimension `dim`.
    #[must_use]
    pub fn coord(&self, pos: usize, dim: usize) -> &[u8] {
        self.coords.coord(pos, dim)
    }

    /// All coordinates of cell `pos`, for domain comparisons.
    #[must_use]
    pub const fn cell(&self, pos: usize) -> CellCoords<'_> {
        CellCoords {
            coords: &self.coords,
            pos,
        }
    }

    /// Bounding NDRange of every stored coordinate.
    pub fn compute_mbr(&self) -> Result<NDRange, GeometryError> {
        if self.cell_num() == 0 {
            return Err(GeometryError::result_tile_validation(
                "cannot compute a bounding range of an empty tile",
            ));
        }

        Ok(self
            .domain
            .dimensions()
            .iter()
            .enumerate()
            .map(|(d, dim)| {
                let mut mbr = Range::default();
                for pos in 0..self.cell_num() {
                    dim.expand_range_v(self.coord(pos, d), &mut mbr);
                }
                mbr
            })
            .collect())
    }

    ///
    /// SHARED CHECKS
    ///

    fn checked_dim(&self, dim_idx: usize) -> Result<&'d Dimension, GeometryError> {
        self.domain.dimension(dim_idx).ok_or_else(|| {
            GeometryError::result_tile_validation(format!(
                "dimension index {dim_idx} is out of bounds for {} dimensions",
                self.domain.dim_num()
            ))
        })
    }

    fn check_bitmap_len(&self, len: usize, what: &str) -> Result<(), GeometryError> {
        if len == self.cell_num() {
            Ok(())
        } else {
            Err(GeometryError::result_tile_validation(format!(
                "{what} holds {len} cells, tile holds {}",
                self.cell_num()
            )))
        }
    }

    /// True when cells are sorted on `dim_idx` under `cell_order`.
    fn is_sorted_dim(&self, dim_idx: usize, cell_order: Layout) -> bool {
        match cell_order {
            Layout::RowMajor => dim_idx == 0,
            Layout::ColMajor => dim_idx + 1 == self.domain.dim_num(),
            Layout::Hilbert => false,
        }
    }

    /// Split `cells` into the configured number of partitions when every
    /// partition holds more than one cell. The last one takes the remainder.
    fn partitions(&self, cells: std::ops::Range<usize>) -> Option<Vec<std::ops::Range<usize>>> {
        let partitions = self.config.string_partitions;
        let size = cells.len() / partitions;
        if size <= 1 {
            return None;
        }

        let mut out = Vec::with_capacity(partitions);
        let mut start = cells.start;
        for p in 0..partitions {
            let end = if p + 1 == partitions {
                cells.end
            } else {
                start + size
            };
            out.push(start..end);
            start = end;
        }

        Some(out)
    }

    fn record_filtered(kind: FilterKind, cells: usize, kept: usize) {
        sink::record(MetricsEvent::CellsFiltered {
            kind,
            cells: cells as u64,
            kept: kept as u64,
        });
    }

    fn record_shortcuts(shortcuts: usize) {
        if shortcuts > 0 {
            tracing::trace!(shortcuts, "string partitions resolved without per-cell checks");
            sink::record(MetricsEvent::PartitionShortcut {
                partitions: shortcuts as u64,
            });
        }
    }
}

fn count_set(bitmap: &[u8]) -> usize {
    bitmap.iter().filter(|&&bit| bit != 0).count()
}
