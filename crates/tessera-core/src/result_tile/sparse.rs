use super::{ResultTile, count_set};
use crate::{domain::Layout, error::GeometryError, obs::sink::FilterKind, range::Range};
use std::ops::Range as CellRange;

impl ResultTile<'_> {
    /// Narrow `result_bitmap` to cells inside `range` on `dim_idx`.
    ///
    /// String coordinates on the dimension the cell order sorts by are
    /// checked per partition when a partition starts and ends on the same
    /// value. Elsewhere, blocks already fully excluded are skipped.
    pub fn compute_results_sparse(
        &self,
        dim_idx: usize,
        range: &Range,
        result_bitmap: &mut [u8],
        cell_order: Layout,
    ) -> Result<(), GeometryError> {
        let dim = self.checked_dim(dim_idx)?;
        self.check_bitmap_len(result_bitmap.len(), "result bitmap")?;
        range.validate(dim.datatype())?;

        let partitions = if dim.is_var() && self.is_sorted_dim(dim_idx, cell_order) {
            self.partitions(0..self.cell_num())
        } else {
            None
        };

        with_range_check!(dim.datatype(), range, contains => {
            match &partitions {
                Some(partitions) => {
                    let shortcuts = self.narrow_partitioned(dim_idx, partitions, result_bitmap, contains);
                    Self::record_shortcuts(shortcuts);
                }
                None => self.narrow_skipping_zeros(dim_idx, result_bitmap, contains),
            }
        });

        Self::record_filtered(FilterKind::Sparse, self.cell_num(), count_set(result_bitmap));

        Ok(())
    }

    fn narrow_partitioned(
        &self,
        dim_idx: usize,
        partitions: &[CellRange<usize>],
        bitmap: &mut [u8],
        contains: impl Fn(&[u8]) -> bool,
    ) -> usize {
        let mut shortcuts = 0;

        for part in partitions {
            let first = self.coord(part.start, dim_idx);
            let last = self.coord(part.end - 1, dim_idx);

            if first == last {
                shortcuts += 1;
                if !contains(first) {
                    bitmap[part.clone()].fill(0);
                }
                continue;
            }

            for pos in part.clone() {
                if bitmap[pos] != 0 && !contains(self.coord(pos, dim_idx)) {
                    bitmap[pos] = 0;
                }
            }
        }

        shortcuts
    }

    fn narrow_skipping_zeros(
        &self,
        dim_idx: usize,
        bitmap: &mut [u8],
        contains: impl Fn(&[u8]) -> bool,
    ) {
        let chunk = self.config.zero_skip_chunk;

        for (block_idx, block) in bitmap.chunks_mut(chunk).enumerate() {
            if block.iter().all(|&bit| bit == 0) {
                continue;
            }

            let base = block_idx * chunk;
            for (offset, bit) in block.iter_mut().enumerate() {
                if *bit != 0 && !contains(self.coord(base + offset, dim_idx)) {
                    *bit = 0;
                }
            }
        }
    }
}
