//! Module: tile
//! Responsibility: conversions between flat runs of tile positions and
//! axis-aligned coordinate hyper-rectangles.
//! Does not own: tile storage or fetch; inputs are plain typed bounds.
//! Boundary: index math is in u64 tile-count space; coordinate math fails
//! closed instead of wrapping.


use crate::{
    IntCoord,
    domain::Layout,
    obs::sink::{self, MetricsEvent},
};

/// Dimension position `i` in tile order (0 is outermost).
const fn dim_at(tile_order: Layout, dim_num: usize, i: usize) -> usize {
    match tile_order {
        Layout::ColMajor => dim_num - 1 - i,
        Layout::RowMajor | Layout::Hilbert => i,
    }
}

fn dim_tile_num<T: IntCoord>(bounds: (T, T), extent: T) -> u64 {
    T::tile_num(bounds.0, bounds.1, bounds.0, extent)
}

/// Tile count of the hyper-row one level below each tile-order position.
///
/// Returns `D + 1` entries: entry `i` is the number of tiles spanned by
/// positions `i..D`, so entry 0 is the whole domain and entry `D` is 1.
#[must_use]
pub fn compute_hyperrow_sizes<T: IntCoord>(
    tile_order: Layout,
    extents: &[T],
    domain: &[(T, T)],
) -> Vec<u64> {
    let dim_num = extents.len();
    let mut sizes = vec![1_u64; dim_num + 1];

    for i in (0..dim_num).rev() {
        let d = dim_at(tile_order, dim_num, i);
        sizes[i] = sizes[i + 1].saturating_mul(dim_tile_num(domain[d], extents[d]));
    }

    sizes
}

/// True when `[start_tile, start_tile + num_tiles)` is an axis-aligned
/// hyper-rectangle of tiles under `tile_order`.
#[must_use]
pub fn is_rectangular_domain<T: IntCoord>(
    tile_order: Layout,
    extents: &[T],
    domain: &[(T, T)],
    start_tile: u64,
    num_tiles: u64,
) -> bool {
    let sizes = compute_hyperrow_sizes(tile_order, extents, domain);

    is_rectangular_run(&sizes, start_tile, num_tiles)
}

fn is_rectangular_run(sizes: &[u64], start_tile: u64, num_tiles: u64) -> bool {
    if num_tiles == 0 {
        return false;
    }
    match start_tile.checked_add(num_tiles) {
        Some(end) if end <= sizes[0] => {}
        _ => return false,
    }

    // each level must either stay inside one hyper-row or cover whole ones
    sizes.windows(2).all(|pair| {
        let hyperrow = pair[1];
        let offset = start_tile % hyperrow;

        offset + num_tiles <= hyperrow || (offset == 0 && num_tiles % hyperrow == 0)
    })
}

/// Coordinate bounds, per dimension, of the tile run
/// `[start_tile, start_tile + num_tiles)`.
///
/// Returns `None` when the run is not rectangular or a bound does not fit `T`.
#[must_use]
pub fn domain_tile_offset<T: IntCoord>(
    tile_order: Layout,
    extents: &[T],
    domain: &[(T, T)],
    start_tile: u64,
    num_tiles: u64,
) -> Option<Vec<(T, T)>> {
    let sizes = compute_hyperrow_sizes(tile_order, extents, domain);
    if !is_rectangular_run(&sizes, start_tile, num_tiles) {
        tracing::debug!(start_tile, num_tiles, "tile run is not a hyper-rectangle");
        sink::record(MetricsEvent::TileRunRejected);
        return None;
    }

    let dim_num = extents.len();
    let last_tile = start_tile + num_tiles - 1;
    let mut bounds = vec![(T::MIN, T::MIN); dim_num];

    for i in 0..dim_num {
        let d = dim_at(tile_order, dim_num, i);
        let hyperrow = sizes[i + 1];
        let tiles = dim_tile_num(domain[d], extents[d]);

        let first = (start_tile / hyperrow) % tiles;
        let last = (last_tile / hyperrow) % tiles;

        let (dom_lo, dom_hi) = (domain[d].0.to_i128(), domain[d].1.to_i128());
        let extent = i128::from(extents[d].extent_width());

        let lo = i128::from(first)
            .checked_mul(extent)?
            .checked_add(dom_lo)?;
        let hi = i128::from(last)
            .checked_add(1)?
            .checked_mul(extent)?
            .checked_add(dom_lo)?
            .checked_sub(1)?
            .min(dom_hi);

        bounds[d] = (T::from_i128(lo)?, T::from_i128(hi)?);
    }

    Some(bounds)
}
