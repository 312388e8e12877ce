//! Module: estimate
//! Responsibility: advisory result-size estimates from tile bounding ranges.
//! Does not own: filtering; an estimate never decides which cells are read.

use crate::{
    domain::Domain,
    error::{ErrorOrigin, GeometryError},
    range::NDRange,
};

///
/// TileSummary
///
/// What the estimator needs from fragment metadata about one tile.
///

#[derive(Clone, Debug, PartialEq)]
pub struct TileSummary {
    pub mbr: NDRange,
    pub cell_num: u64,
}

impl TileSummary {
    #[must_use]
    pub const fn new(mbr: NDRange, cell_num: u64) -> Self {
        Self { mbr, cell_num }
    }
}

/// Expected bytes returned by `query` over `tiles`.
///
/// Fully covered tiles count exactly and disjoint tiles count nothing.
/// Partially covered tiles contribute their overlap fraction, rounded up.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn estimate_result_size(
    domain: &Domain,
    query: &NDRange,
    tiles: &[TileSummary],
    cell_size: u64,
) -> Result<u64, GeometryError> {
    check_dims(domain, query.len(), "query")?;

    let mut total: u64 = 0;
    for tile in tiles {
        check_dims(domain, tile.mbr.len(), "tile bounding range")?;

        let bytes = tile.cell_num.saturating_mul(cell_size);
        let ratio = domain.overlap_ratio(query, &tile.mbr);
        let contribution = if ratio == 1.0 {
            bytes
        } else if ratio == 0.0 {
            0
        } else {
            (ratio * bytes as f64).ceil() as u64
        };

        total = total.saturating_add(contribution);
    }

    Ok(total)
}

fn check_dims(domain: &Domain, got: usize, what: &str) -> Result<(), GeometryError> {
    if got == domain.dim_num() {
        return Ok(());
    }

    Err(GeometryError::validation(
        ErrorOrigin::Domain,
        format!("{what} has {got} ranges, domain has {}", domain.dim_num()),
    ))
}
