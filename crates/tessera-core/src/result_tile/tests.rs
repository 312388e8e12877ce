use super::*;
use crate::{
    config::FilterConfig,
    obs::sink::{MetricsEvent, MetricsSink, with_metrics_sink},
};
use proptest::prelude::*;
use std::cell::RefCell;

fn int_dim(name: &str, lo: i32, hi: i32, extent: i32) -> Dimension {
    Dimension::fixed(name, lo, hi, Some(extent)).expect("dimension should build")
}

fn line() -> Domain {
    Domain::new(vec![int_dim("x", 1, 20, 5)], Layout::RowMajor, Layout::RowMajor)
        .expect("domain should build")
}

fn square() -> Domain {
    Domain::new(
        vec![int_dim("rows", 1, 4, 4), int_dim("cols", 1, 4, 4)],
        Layout::RowMajor,
        Layout::RowMajor,
    )
    .expect("domain should build")
}

fn strings() -> Domain {
    Domain::new(vec![Dimension::string("key")], Layout::RowMajor, Layout::RowMajor)
        .expect("domain should build")
}

fn range(lo: i32, hi: i32) -> Range {
    Range::new(lo, hi).expect("range should build")
}

fn var_range(lo: &str, hi: &str) -> Range {
    Range::new_var(lo, hi).expect("range should build")
}

fn scenario_tile(domain: &Domain) -> ResultTile<'_> {
    let column = DimColumn::from_values(&[2_i32, 4, 5, 10, 12, 18]);
    ResultTile::new(domain, 0, 0, CoordBuffers::Unzipped(vec![column])).expect("tile should build")
}

/// Every cell of the 4x4 square in row-major order.
fn square_cells() -> (Vec<i32>, Vec<i32>) {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    for r in 1..=4 {
        for c in 1..=4 {
            rows.push(r);
            cols.push(c);
        }
    }

    (rows, cols)
}

fn zipped(rows: &[i32], cols: &[i32]) -> CoordBuffers {
    let mut bytes = Vec::new();
    for (r, c) in rows.iter().zip(cols) {
        bytes.extend_from_slice(&r.to_le_bytes());
        bytes.extend_from_slice(&c.to_le_bytes());
    }

    CoordBuffers::Zipped(bytes)
}

#[derive(Default)]
struct RecordingSink {
    events: RefCell<Vec<MetricsEvent>>,
}

impl MetricsSink for RecordingSink {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

///
/// CONSTRUCTION
///

#[test]
fn construction_rejects_mismatched_buffers() {
    let domain = square();

    let err = ResultTile::new(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![DimColumn::from_values(&[1_i32, 2])]),
    )
    .expect_err("one column for two dimensions");
    assert!(err.is_validation());

    let err = ResultTile::new(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![
            DimColumn::from_values(&[1_i32, 2]),
            DimColumn::from_values(&[1_i32]),
        ]),
    )
    .expect_err("columns with different cell counts");
    assert!(err.is_validation());

    let err = ResultTile::new(&domain, 0, 0, CoordBuffers::Zipped(vec![0; 7]))
        .expect_err("zipped buffer with a partial cell");
    assert!(err.is_validation());

    let strings = strings();
    let err = ResultTile::new(&strings, 0, 0, CoordBuffers::Zipped(Vec::new()))
        .expect_err("strings cannot be zipped");
    assert!(err.is_validation());
}

#[test]
fn invalid_config_is_rejected() {
    let domain = line();
    let config = FilterConfig {
        string_partitions: 0,
        ..FilterConfig::default()
    };

    let err = ResultTile::with_config(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![DimColumn::from_values(&[1_i32])]),
        config,
    )
    .expect_err("zero partitions");
    assert!(err.is_configuration());
}

#[test]
fn accessors_expose_tile_identity() {
    let domain = line();
    let tile = scenario_tile(&domain);

    assert_eq!(tile.cell_num(), 6);
    assert_eq!(tile.frag_idx(), 0);
    assert_eq!(tile.tile_idx(), 0);
    assert!(!tile.stores_zipped_coords());
    assert_eq!(tile.coord(3, 0), 10_i32.to_le_bytes());
}

#[test]
fn zipped_and_unzipped_coords_agree() {
    let domain = square();
    let (rows, cols) = square_cells();

    let zipped_tile = ResultTile::new(&domain, 0, 0, zipped(&rows, &cols)).expect("zipped tile");
    let unzipped_tile = ResultTile::new(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![
            DimColumn::from_values(&rows),
            DimColumn::from_values(&cols),
        ]),
    )
    .expect("unzipped tile");

    assert!(zipped_tile.stores_zipped_coords());
    for pos in 0..16 {
        for d in 0..2 {
            assert_eq!(zipped_tile.coord(pos, d), unzipped_tile.coord(pos, d));
        }
    }

    let ordering = domain
        .cell_order_cmp(&zipped_tile.cell(1), &unzipped_tile.cell(4))
        .expect("comparable");
    assert_eq!(ordering, std::cmp::Ordering::Less);
}

#[test]
fn mixed_columns_resolve_one_accessor_per_dimension() {
    let domain = Domain::new(
        vec![Dimension::string("key"), int_dim("x", 1, 20, 5)],
        Layout::RowMajor,
        Layout::RowMajor,
    )
    .expect("domain should build");
    let tile = ResultTile::new(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![
            DimColumn::from_strings(&["ab", "", "xyz"]),
            DimColumn::from_values(&[3_i32, 7, 11]),
        ]),
    )
    .expect("tile");

    assert_eq!(tile.cell_num(), 3);
    assert_eq!(tile.coord(0, 0), b"ab");
    assert_eq!(tile.coord(1, 0), b"");
    assert_eq!(tile.coord(2, 0), b"xyz");
    assert_eq!(tile.coord(2, 1), 11_i32.to_le_bytes());

    let err = ResultTile::new(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![
            DimColumn::Var {
                offsets: vec![0, 3, 1],
                data: b"abcd".to_vec(),
            },
            DimColumn::from_values(&[3_i32, 7, 11]),
        ]),
    )
    .expect_err("unsorted offsets");
    assert!(err.is_validation());

    let err = ResultTile::new(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![
            DimColumn::Var {
                offsets: vec![0, 9],
                data: b"abcd".to_vec(),
            },
            DimColumn::from_values(&[3_i32, 7]),
        ]),
    )
    .expect_err("offset past the data");
    assert!(err.is_validation());
}

#[test]
fn tile_mbr_bounds_every_coordinate() {
    let domain = line();
    let tile = scenario_tile(&domain);

    let mbr = tile.compute_mbr().expect("non-empty tile");
    assert_eq!(mbr[0].bounds::<i32>(), (2, 18));

    let empty = ResultTile::new(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![DimColumn::from_values::<i32>(&[])]),
    )
    .expect("empty tile builds");
    assert!(empty.compute_mbr().is_err());
}

///
/// SPARSE
///

#[test]
fn sparse_filter_keeps_cells_in_range() {
    let domain = line();
    let tile = scenario_tile(&domain);
    let mut bitmap = vec![1_u8; 6];

    tile.compute_results_sparse(0, &range(3, 6), &mut bitmap, Layout::RowMajor)
        .expect("filter");

    assert_eq!(bitmap, vec![0, 1, 1, 0, 0, 0]);
}

#[test]
fn sparse_filter_never_sets_cleared_cells() {
    let domain = line();
    let tile = scenario_tile(&domain);
    let mut bitmap = vec![1, 0, 1, 1, 0, 1];

    tile.compute_results_sparse(0, &range(1, 20), &mut bitmap, Layout::RowMajor)
        .expect("filter");

    assert_eq!(bitmap, vec![1, 0, 1, 1, 0, 1]);
}

#[test]
fn sparse_filter_skips_fully_cleared_blocks() {
    let domain = line();
    let values: Vec<i32> = (1..=20).collect();
    let config = FilterConfig {
        zero_skip_chunk: 4,
        ..FilterConfig::default()
    };
    let tile = ResultTile::with_config(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![DimColumn::from_values(&values)]),
        config,
    )
    .expect("tile");

    let mut bitmap = vec![1_u8; 20];
    bitmap[4..8].fill(0);
    tile.compute_results_sparse(0, &range(3, 10), &mut bitmap, Layout::RowMajor)
        .expect("filter");

    let kept: Vec<usize> = (0..20).filter(|&i| bitmap[i] == 1).collect();
    assert_eq!(kept, vec![2, 3, 8, 9]);
}

#[test]
fn sparse_filter_matches_across_storage_layouts() {
    let domain = square();
    let (rows, cols) = square_cells();
    let zipped_tile = ResultTile::new(&domain, 0, 0, zipped(&rows, &cols)).expect("zipped tile");
    let unzipped_tile = ResultTile::new(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![
            DimColumn::from_values(&rows),
            DimColumn::from_values(&cols),
        ]),
    )
    .expect("unzipped tile");

    let mut a = vec![1_u8; 16];
    let mut b = vec![1_u8; 16];
    for tile_bitmap in [(&zipped_tile, &mut a), (&unzipped_tile, &mut b)] {
        let (tile, bitmap) = tile_bitmap;
        tile.compute_results_sparse(0, &range(2, 3), bitmap, Layout::RowMajor)
            .expect("rows");
        tile.compute_results_sparse(1, &range(4, 4), bitmap, Layout::RowMajor)
            .expect("cols");
    }

    assert_eq!(a, b);
    assert_eq!(a.iter().filter(|&&bit| bit == 1).count(), 2);
    assert_eq!(a[7], 1);
    assert_eq!(a[11], 1);
}

#[test]
fn sparse_filter_rejects_bad_inputs() {
    let domain = line();
    let tile = scenario_tile(&domain);

    let mut short = vec![1_u8; 5];
    let err = tile
        .compute_results_sparse(0, &range(3, 6), &mut short, Layout::RowMajor)
        .expect_err("bitmap length mismatch");
    assert!(err.is_validation());

    let mut bitmap = vec![1_u8; 6];
    let err = tile
        .compute_results_sparse(1, &range(3, 6), &mut bitmap, Layout::RowMajor)
        .expect_err("dimension out of bounds");
    assert!(err.is_validation());

    let wide = Range::new(3_i64, 6).expect("range");
    assert!(
        tile.compute_results_sparse(0, &wide, &mut bitmap, Layout::RowMajor)
            .is_err()
    );
}

///
/// STRING PARTITIONS
///

fn sorted_keys() -> Vec<&'static str> {
    vec!["a", "a", "a", "a", "b", "b", "c", "c", "c", "c", "c", "d"]
}

#[test]
fn sorted_strings_use_partition_shortcut() {
    let domain = strings();
    let keys = sorted_keys();
    let config = FilterConfig {
        string_partitions: 3,
        ..FilterConfig::default()
    };
    let tile = ResultTile::with_config(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![DimColumn::from_strings(&keys)]),
        config,
    )
    .expect("tile");

    let sink = RecordingSink::default();
    let mut bitmap = vec![1_u8; keys.len()];
    with_metrics_sink(&sink, || {
        tile.compute_results_sparse(0, &var_range("b", "c"), &mut bitmap, Layout::RowMajor)
    })
    .expect("filter");

    assert_eq!(bitmap, vec![0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 0]);
    assert!(
        sink.events
            .borrow()
            .contains(&MetricsEvent::PartitionShortcut { partitions: 1 })
    );
}

#[test]
fn unsorted_string_dimension_checks_each_cell() {
    let domain = strings();
    let keys = ["d", "a", "c", "b", "a", "c", "b", "d"];
    let tile = ResultTile::new(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![DimColumn::from_strings(&keys)]),
    )
    .expect("tile");

    let sink = RecordingSink::default();
    let mut bitmap = vec![1_u8; keys.len()];
    with_metrics_sink(&sink, || {
        tile.compute_results_sparse(0, &var_range("b", "c"), &mut bitmap, Layout::Hilbert)
    })
    .expect("filter");

    assert_eq!(bitmap, vec![0, 0, 1, 1, 0, 1, 1, 0]);
    assert!(
        !sink
            .events
            .borrow()
            .iter()
            .any(|event| matches!(event, MetricsEvent::PartitionShortcut { .. }))
    );
}

///
/// DENSE
///

#[test]
fn dense_filter_flags_cells_overwritten_by_later_fragments() {
    let domain = square();
    let (rows, cols) = square_cells();
    let tile = ResultTile::new(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![
            DimColumn::from_values(&rows),
            DimColumn::from_values(&cols),
        ]),
    )
    .expect("tile");

    let fragments = vec![
        FragmentDomain::dense(NDRange::from_vec(vec![range(1, 4), range(1, 4)])),
        FragmentDomain::dense(NDRange::from_vec(vec![range(1, 2), range(1, 4)])),
        FragmentDomain::sparse(NDRange::from_vec(vec![range(1, 4), range(1, 4)])),
    ];
    let mut bitmap = vec![1_u8; 16];
    let mut overwritten = vec![0_u8; 16];

    tile.compute_results_dense(0, &range(1, 4), &fragments, &mut bitmap, &mut overwritten)
        .expect("rows");
    assert!(overwritten.iter().all(|&bit| bit == 0));

    tile.compute_results_dense(1, &range(2, 3), &fragments, &mut bitmap, &mut overwritten)
        .expect("cols");

    for pos in 0..16 {
        let (r, c) = (rows[pos], cols[pos]);
        let kept = (2..=3).contains(&c);
        assert_eq!(bitmap[pos], u8::from(kept), "cell ({r}, {c})");
        assert_eq!(overwritten[pos], u8::from(kept && r <= 2), "cell ({r}, {c})");
    }
}

#[test]
fn dense_filter_from_newest_fragment_never_overwrites() {
    let domain = square();
    let (rows, cols) = square_cells();
    let tile = ResultTile::new(
        &domain,
        1,
        0,
        CoordBuffers::Unzipped(vec![
            DimColumn::from_values(&rows),
            DimColumn::from_values(&cols),
        ]),
    )
    .expect("tile");

    let fragments = vec![
        FragmentDomain::dense(NDRange::from_vec(vec![range(1, 4), range(1, 4)])),
        FragmentDomain::dense(NDRange::from_vec(vec![range(1, 4), range(1, 4)])),
    ];
    let mut bitmap = vec![1_u8; 16];
    let mut overwritten = vec![0_u8; 16];

    tile.compute_results_dense(1, &range(1, 4), &fragments, &mut bitmap, &mut overwritten)
        .expect("cols");

    assert!(bitmap.iter().all(|&bit| bit == 1));
    assert!(overwritten.iter().all(|&bit| bit == 0));
}

#[test]
fn dense_filter_rejects_malformed_fragment_domains() {
    let domain = square();
    let (rows, cols) = square_cells();
    let tile = ResultTile::new(&domain, 0, 0, zipped(&rows, &cols)).expect("tile");

    let fragments = vec![
        FragmentDomain::dense(NDRange::from_vec(vec![range(1, 4), range(1, 4)])),
        FragmentDomain::dense(NDRange::from_vec(vec![range(1, 4)])),
    ];
    let mut bitmap = vec![1_u8; 16];
    let mut overwritten = vec![0_u8; 16];

    let err = tile
        .compute_results_dense(1, &range(1, 4), &fragments, &mut bitmap, &mut overwritten)
        .expect_err("fragment domain is one-dimensional");
    assert!(err.is_validation());
}

///
/// COUNT
///

fn count_ranges() -> Vec<Range> {
    vec![range(1, 3), range(4, 4), range(2, 5)]
}

#[test]
fn count_multiplies_matching_ranges() {
    let domain = line();
    let tile = ResultTile::new(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![DimColumn::from_values(&[2_i32, 4, 5, 10])]),
    )
    .expect("tile");

    let mut counts = vec![1_u64; 4];
    tile.compute_results_count_sparse(
        0,
        &count_ranges(),
        &[0, 1, 2],
        &mut counts,
        Layout::RowMajor,
        0,
        4,
    )
    .expect("count");
    assert_eq!(counts, vec![2, 2, 1, 0]);

    let mut bitmap = vec![1_u8; 4];
    tile.compute_results_count_sparse(
        0,
        &count_ranges(),
        &[0, 1, 2],
        &mut bitmap,
        Layout::RowMajor,
        0,
        4,
    )
    .expect("membership");
    assert_eq!(bitmap, vec![1, 1, 1, 0]);
}

#[test]
fn count_only_touches_the_cell_window() {
    let domain = line();
    let tile = ResultTile::new(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![DimColumn::from_values(&[2_i32, 4, 5, 10])]),
    )
    .expect("tile");

    let mut counts = vec![1_u64, 1, 0, 1];
    tile.compute_results_count_sparse(
        0,
        &count_ranges(),
        &[0, 1, 2],
        &mut counts,
        Layout::RowMajor,
        1,
        3,
    )
    .expect("count");

    assert_eq!(counts, vec![1, 2, 0, 1]);
}

#[test]
fn count_skips_zero_blocks_of_a_sparse_count_vector() {
    let domain = line();
    let values: Vec<i32> = (1..=20).collect();
    let config = FilterConfig {
        zero_skip_chunk: 4,
        ..FilterConfig::default()
    };
    let tile = ResultTile::with_config(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![DimColumn::from_values(&values)]),
        config,
    )
    .expect("tile");

    let mut counts = vec![0_u64; 20];
    counts[3] = 3;
    counts[9] = 3;
    counts[10] = 3;
    counts[17] = 3;
    counts[19] = 5;
    tile.compute_results_count_sparse(
        0,
        &[range(3, 10)],
        &[0],
        &mut counts,
        Layout::RowMajor,
        2,
        18,
    )
    .expect("count");

    let set: Vec<(usize, u64)> = counts
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count != 0)
        .map(|(pos, &count)| (pos, count))
        .collect();
    assert_eq!(set, vec![(3, 3), (9, 3), (19, 5)]);
}

#[test]
fn count_rejects_bad_windows_and_indexes() {
    let domain = line();
    let tile = scenario_tile(&domain);
    let mut counts = vec![1_u64; 6];

    let err = tile
        .compute_results_count_sparse(0, &count_ranges(), &[0], &mut counts, Layout::RowMajor, 4, 2)
        .expect_err("inverted window");
    assert!(err.is_validation());

    let err = tile
        .compute_results_count_sparse(0, &count_ranges(), &[0], &mut counts, Layout::RowMajor, 0, 7)
        .expect_err("window past the tile");
    assert!(err.is_validation());

    let err = tile
        .compute_results_count_sparse(0, &count_ranges(), &[3], &mut counts, Layout::RowMajor, 0, 6)
        .expect_err("range index out of bounds");
    assert!(err.is_validation());
}

#[test]
fn string_count_uses_partitions_on_sorted_dimension() {
    let domain = strings();
    let keys = sorted_keys();
    let config = FilterConfig {
        string_partitions: 3,
        ..FilterConfig::default()
    };
    let tile = ResultTile::with_config(
        &domain,
        0,
        0,
        CoordBuffers::Unzipped(vec![DimColumn::from_strings(&keys)]),
        config,
    )
    .expect("tile");

    let ranges = vec![var_range("a", "a"), var_range("a", "b"), var_range("c", "z")];
    let mut counts = vec![1_u64; keys.len()];
    tile.compute_results_count_sparse(0, &ranges, &[0, 1, 2], &mut counts, Layout::RowMajor, 0, 12)
        .expect("count");

    assert_eq!(counts, vec![2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1]);
}

fn naive_count(values: &[i32], ranges: &[(i32, i32)]) -> Vec<u64> {
    values
        .iter()
        .map(|v| ranges.iter().filter(|(lo, hi)| lo <= v && v <= hi).count() as u64)
        .collect()
}

fn sorted_by_end(mut ranges: Vec<(i32, i32)>) -> Vec<(i32, i32)> {
    for r in &mut ranges {
        if r.0 > r.1 {
            *r = (r.1, r.0);
        }
    }
    ranges.sort_by_key(|&(_, hi)| hi);
    ranges
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn count_matches_naive_scan(
        values in prop::collection::vec(1_i32..=20, 1..40),
        raw in prop::collection::vec((1_i32..=20, 1_i32..=20), 0..6),
    ) {
        let domain = line();
        let tile = ResultTile::new(
            &domain,
            0,
            0,
            CoordBuffers::Unzipped(vec![DimColumn::from_values(&values)]),
        )
        .expect("tile");

        let bounds = sorted_by_end(raw);
        let ranges: Vec<Range> = bounds.iter().map(|&(lo, hi)| range(lo, hi)).collect();
        let indexes: Vec<usize> = (0..ranges.len()).collect();

        let mut counts = vec![1_u64; values.len()];
        tile.compute_results_count_sparse(
            0, &ranges, &indexes, &mut counts, Layout::RowMajor, 0, values.len(),
        )
        .expect("count");

        prop_assert_eq!(counts, naive_count(&values, &bounds));
    }

    #[test]
    fn sorted_string_count_matches_naive_scan(
        keys in prop::collection::vec("[a-d]{1,2}", 1..40),
        raw in prop::collection::vec(("[a-d]{1,2}", "[a-d]{1,2}"), 0..5),
    ) {
        let mut keys = keys;
        keys.sort();
        let domain = strings();
        let config = FilterConfig { string_partitions: 4, ..FilterConfig::default() };
        let tile = ResultTile::with_config(
            &domain,
            0,
            0,
            CoordBuffers::Unzipped(vec![DimColumn::from_strings(&keys)]),
            config,
        )
        .expect("tile");

        let mut bounds: Vec<(String, String)> = raw
            .into_iter()
            .map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
            .collect();
        bounds.sort_by(|a, b| a.1.cmp(&b.1));
        let ranges: Vec<Range> = bounds.iter().map(|(lo, hi)| var_range(lo, hi)).collect();
        let indexes: Vec<usize> = (0..ranges.len()).collect();

        let mut counts = vec![1_u64; keys.len()];
        tile.compute_results_count_sparse(
            0, &ranges, &indexes, &mut counts, Layout::RowMajor, 0, keys.len(),
        )
        .expect("count");

        let expected: Vec<u64> = keys
            .iter()
            .map(|k| bounds.iter().filter(|(lo, hi)| lo <= k && k <= hi).count() as u64)
            .collect();
        prop_assert_eq!(counts, expected);
    }

    #[test]
    fn sparse_filter_matches_naive_scan(
        values in prop::collection::vec(1_i32..=20, 1..40),
        lo in 1_i32..=20,
        span in 0_i32..10,
    ) {
        let hi = (lo + span).min(20);
        let domain = line();
        let tile = ResultTile::new(
            &domain,
            0,
            0,
            CoordBuffers::Unzipped(vec![DimColumn::from_values(&values)]),
        )
        .expect("tile");

        let mut bitmap = vec![1_u8; values.len()];
        tile.compute_results_sparse(0, &range(lo, hi), &mut bitmap, Layout::RowMajor)
            .expect("filter");

        let expected: Vec<u8> = values.iter().map(|v| u8::from(lo <= *v && *v <= hi)).collect();
        prop_assert_eq!(bitmap, expected);
    }
}
