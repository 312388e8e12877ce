use super::ResultTile;
use crate::{domain::Layout, error::GeometryError, obs::sink::FilterKind, range::Range};

///
/// ResultBitmap
///
/// Per-cell state narrowed by counting filters.
/// A `u8` bitmap records membership; a `u64` bitmap records how many
/// query range combinations hit the cell.
///

pub trait ResultBitmap: Copy + Eq + Send + Sync + 'static {
    /// Membership only needs one matching range, so the scan can stop early.
    const STOP_AT_FIRST: bool;

    fn is_set(self) -> bool;

    /// Fold the number of ranges on one dimension that hold the cell.
    fn apply(&mut self, count: u64);
}

impl ResultBitmap for u8 {
    const STOP_AT_FIRST: bool = true;

    fn is_set(self) -> bool {
        self != 0
    }

    fn apply(&mut self, count: u64) {
        if count == 0 {
            *self = 0;
        }
    }
}

impl ResultBitmap for u64 {
    const STOP_AT_FIRST: bool = false;

    fn is_set(self) -> bool {
        self != 0
    }

    fn apply(&mut self, count: u64) {
        *self = self.saturating_mul(count);
    }
}

/// Bind `$count` to a monomorphized "how many of the selected ranges hold
/// this coordinate" closure for the physical type of `$datatype`.
macro_rules! with_range_counter {
    ($datatype:expr, $ranges:expr, $indexes:expr, $stop:expr, $count:ident => $body:expr) => {
        dispatch_datatype!($datatype,
            T => {
                let bounds = SortedBounds::new(
                    $indexes.iter().map(|&i| $ranges[i].bounds::<T>()).collect(),
                );
                let $count = |coord: &[u8]| {
                    bounds.count(<T as $crate::CoordValue>::read_le(coord), $stop)
                };
                $body
            },
            string => {
                let bounds: SortedBounds<&[u8]> = SortedBounds::new(
                    $indexes
                        .iter()
                        .map(|&i| ($ranges[i].start_bytes(), $ranges[i].end_bytes()))
                        .collect(),
                );
                let $count = |coord: &[u8]| bounds.count(coord, $stop);
                $body
            },
        )
    };
}

///
/// SortedBounds
///
/// Range bounds sorted by end, plus the smallest start of every suffix.
/// Ranges ending before a value form a prefix, and the scan past that
/// prefix stops once no remaining range starts at or before the value.
///

struct SortedBounds<K> {
    bounds: Vec<(K, K)>,
    suffix_min_start: Vec<K>,
}

impl<K: Copy + PartialOrd> SortedBounds<K> {
    fn new(bounds: Vec<(K, K)>) -> Self {
        let mut suffix_min_start: Vec<K> = bounds.iter().map(|&(start, _)| start).collect();
        for i in (1..suffix_min_start.len()).rev() {
            if suffix_min_start[i] < suffix_min_start[i - 1] {
                suffix_min_start[i - 1] = suffix_min_start[i];
            }
        }

        Self {
            bounds,
            suffix_min_start,
        }
    }

    /// Bounds that may hold `value`: every one ends at or after it.
    fn candidates(&self, value: K) -> impl Iterator<Item = (K, K)> + '_ {
        let first = self.bounds.partition_point(|&(_, end)| end < value);

        self.bounds[first..]
            .iter()
            .zip(&self.suffix_min_start[first..])
            .take_while(move |&(_, &min_start)| min_start <= value)
            .map(|(&bound, _)| bound)
    }

    fn count(&self, value: K, stop_at_first: bool) -> u64 {
        let mut count = 0;

        for (start, _) in self.candidates(value) {
            if start <= value {
                count += 1;
                if stop_at_first {
                    break;
                }
            }
        }

        count
    }
}

impl ResultTile<'_> {
    /// Narrow `result_count` over cells `[min_cell, max_cell)` by how many
    /// of `ranges[range_indexes]` hold each cell on `dim_idx`.
    ///
    /// `range_indexes` must list ranges sorted by their end bound. Cells
    /// already at zero are not checked, and zero blocks of
    /// `zero_skip_chunk` cells are skipped whole.
    #[expect(clippy::too_many_arguments)]
    pub fn compute_results_count_sparse<B: ResultBitmap>(
        &self,
        dim_idx: usize,
        ranges: &[Range],
        range_indexes: &[usize],
        result_count: &mut [B],
        cell_order: Layout,
        min_cell: usize,
        max_cell: usize,
    ) -> Result<(), GeometryError> {
        let dim = self.checked_dim(dim_idx)?;
        self.check_bitmap_len(result_count.len(), "result count")?;
        if min_cell > max_cell || max_cell > self.cell_num() {
            return Err(GeometryError::result_tile_validation(format!(
                "cell window [{min_cell}, {max_cell}) does not fit a tile of {} cells",
                self.cell_num()
            )));
        }
        for &idx in range_indexes {
            let range = ranges.get(idx).ok_or_else(|| {
                GeometryError::result_tile_validation(format!(
                    "range index {idx} is out of bounds for {} ranges",
                    ranges.len()
                ))
            })?;
            range.validate(dim.datatype())?;
        }

        let partitions = if dim.is_var() && self.is_sorted_dim(dim_idx, cell_order) {
            self.partitions(min_cell..max_cell)
        } else {
            None
        };

        with_range_counter!(dim.datatype(), ranges, range_indexes, B::STOP_AT_FIRST, count_at => {
            let mut shortcuts = 0;

            match &partitions {
                Some(partitions) => {
                    for part in partitions {
                        let first = self.coord(part.start, dim_idx);
                        let last = self.coord(part.end - 1, dim_idx);

                        if first == last {
                            shortcuts += 1;
                            let count = count_at(first);
                            for cell in &mut result_count[part.clone()] {
                                if cell.is_set() {
                                    cell.apply(count);
                                }
                            }
                        } else {
                            for pos in part.clone() {
                                if result_count[pos].is_set() {
                                    result_count[pos].apply(count_at(self.coord(pos, dim_idx)));
                                }
                            }
                        }
                    }
                }
                None => {
                    let chunk = self.config.zero_skip_chunk;
                    let window = &mut result_count[min_cell..max_cell];

                    for (block_idx, block) in window.chunks_mut(chunk).enumerate() {
                        if !block.iter().any(|cell| cell.is_set()) {
                            continue;
                        }

                        let base = min_cell + block_idx * chunk;
                        for (offset, cell) in block.iter_mut().enumerate() {
                            if cell.is_set() {
                                cell.apply(count_at(self.coord(base + offset, dim_idx)));
                            }
                        }
                    }
                }
            }

            Self::record_shortcuts(shortcuts);
        });

        let kept = result_count[min_cell..max_cell]
            .iter()
            .filter(|cell| cell.is_set())
            .count();
        Self::record_filtered(FilterKind::Count, max_cell - min_cell, kept);

        Ok(())
    }
}
