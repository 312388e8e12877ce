use super::{ResultTile, count_set};
use crate::{
    error::GeometryError,
    obs::sink::FilterKind,
    range::{NDRange, Range},
};

///
/// FragmentDomain
///
/// What dense filtering needs to know about another fragment: whether it is
/// dense and the coordinates it actually wrote.
///

#[derive(Clone, Debug, PartialEq)]
pub struct FragmentDomain {
    pub dense: bool,
    pub non_empty_domain: NDRange,
}

impl FragmentDomain {
    #[must_use]
    pub const fn dense(non_empty_domain: NDRange) -> Self {
        Self {
            dense: true,
            non_empty_domain,
        }
    }

    #[must_use]
    pub const fn sparse(non_empty_domain: NDRange) -> Self {
        Self {
            dense: false,
            non_empty_domain,
        }
    }
}

impl ResultTile<'_> {
    /// Narrow `result_bitmap` to cells inside `range` on `dim_idx`.
    ///
    /// On the last dimension, surviving cells that a later dense fragment
    /// also covers are flagged in `overwritten_bitmap`; later writes win.
    /// `fragments` is indexed like `frag_idx`, oldest first.
    pub fn compute_results_dense(
        &self,
        dim_idx: usize,
        range: &Range,
        fragments: &[FragmentDomain],
        result_bitmap: &mut [u8],
        overwritten_bitmap: &mut [u8],
    ) -> Result<(), GeometryError> {
        let dim = self.checked_dim(dim_idx)?;
        self.check_bitmap_len(result_bitmap.len(), "result bitmap")?;
        self.check_bitmap_len(overwritten_bitmap.len(), "overwritten bitmap")?;
        range.validate(dim.datatype())?;

        with_range_check!(dim.datatype(), range, contains => {
            for (pos, bit) in result_bitmap.iter_mut().enumerate() {
                *bit &= u8::from(contains(self.coord(pos, dim_idx)));
            }
        });

        if dim_idx + 1 == self.domain.dim_num() {
            let later = fragments.get(self.frag_idx + 1..).unwrap_or_default();
            for fragment in later {
                if fragment.non_empty_domain.len() != self.domain.dim_num() {
                    return Err(GeometryError::result_tile_validation(format!(
                        "fragment domain has {} ranges, expected {}",
                        fragment.non_empty_domain.len(),
                        self.domain.dim_num()
                    )));
                }
            }

            for (pos, bit) in result_bitmap.iter().enumerate() {
                if *bit == 0 {
                    continue;
                }
                if later
                    .iter()
                    .any(|fragment| fragment.dense && self.fragment_covers(fragment, pos))
                {
                    overwritten_bitmap[pos] = 1;
                }
            }
        }

        Self::record_filtered(FilterKind::Dense, self.cell_num(), count_set(result_bitmap));

        Ok(())
    }

    fn fragment_covers(&self, fragment: &FragmentDomain, pos: usize) -> bool {
        self.domain
            .dimensions()
            .iter()
            .zip(fragment.non_empty_domain.iter())
            .enumerate()
            .all(|(d, (dim, ned))| dim.contains(ned, self.coord(pos, d)))
    }
}
