use serde::{Deserialize, Serialize};
use std::cell::RefCell;

///
/// FilterCounters
/// Ephemeral, in-memory counters for tile filtering and iteration.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FilterCounters {
    // Filter entrypoints
    pub dense_calls: u64,
    pub sparse_calls: u64,
    pub count_calls: u64,

    // Cells touched
    pub cells_scanned: u64,
    pub cells_kept: u64,

    // Shortcuts
    pub partition_shortcuts: u64,

    // Iteration
    pub cell_slabs: u64,
    pub tile_runs_rejected: u64,
}

///
/// MetricsReport
/// Point-in-time copy of the counters.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MetricsReport {
    pub counters: FilterCounters,
}

thread_local! {
    static FILTER_STATE: RefCell<FilterCounters> = RefCell::new(FilterCounters::default());
}

/// Borrow counters immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&FilterCounters) -> R) -> R {
    FILTER_STATE.with(|m| f(&m.borrow()))
}

/// Borrow counters mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut FilterCounters) -> R) -> R {
    FILTER_STATE.with(|m| f(&mut m.borrow_mut()))
}

pub(crate) fn report() -> MetricsReport {
    MetricsReport {
        counters: with_state(Clone::clone),
    }
}

pub(crate) fn reset_all() {
    with_state_mut(|m| *m = FilterCounters::default());
}
