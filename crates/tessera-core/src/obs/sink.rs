//! Metrics sink boundary.
//!
//! Filtering and iteration code MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// FilterKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterKind {
    Dense,
    Sparse,
    Count,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    CellsFiltered {
        kind: FilterKind,
        cells: u64,
        kept: u64,
    },
    PartitionShortcut {
        partitions: u64,
    },
    CellSlabsProduced {
        slabs: u64,
    },
    TileRunRejected,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into the filter counters.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::CellsFiltered { kind, cells, kept } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        FilterKind::Dense => m.dense_calls = m.dense_calls.saturating_add(1),
                        FilterKind::Sparse => m.sparse_calls = m.sparse_calls.saturating_add(1),
                        FilterKind::Count => m.count_calls = m.count_calls.saturating_add(1),
                    }
                    m.cells_scanned = m.cells_scanned.saturating_add(cells);
                    m.cells_kept = m.cells_kept.saturating_add(kept);
                });
            }

            MetricsEvent::PartitionShortcut { partitions } => {
                metrics::with_state_mut(|m| {
                    m.partition_shortcuts = m.partition_shortcuts.saturating_add(partitions);
                });
            }

            MetricsEvent::CellSlabsProduced { slabs } => {
                metrics::with_state_mut(|m| {
                    m.cell_slabs = m.cell_slabs.saturating_add(slabs);
                });
            }

            MetricsEvent::TileRunRejected => {
                metrics::with_state_mut(|m| {
                    m.tile_runs_rejected = m.tile_runs_rejected.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` comes from a live `&dyn MetricsSink` installed by `with_metrics_sink`,
        //   which restores the previous slot on every exit, unwinding included.
        // - `record` is synchronous and never keeps `ptr` past this call.
        // - Only a shared reference is materialized, matching the installing borrow.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current thread's filter counters.
#[must_use]
pub fn metrics_report() -> metrics::MetricsReport {
    metrics::report()
}

/// Reset all filter counters on the current thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - The erased pointer is installed only for this dynamic scope and `Guard`
    //   restores the previous slot on all exits, including panic.
    // - `record` dereferences it synchronously and never persists it.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink<'a> {
        calls: &'a AtomicUsize,
    }

    impl MetricsSink for CountingSink<'_> {
        fn record(&self, _: MetricsEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn with_metrics_sink_routes_and_restores_nested_overrides() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });

        let outer_calls = AtomicUsize::new(0);
        let inner_calls = AtomicUsize::new(0);
        let outer = CountingSink {
            calls: &outer_calls,
        };
        let inner = CountingSink {
            calls: &inner_calls,
        };

        record(MetricsEvent::TileRunRejected);
        assert_eq!(outer_calls.load(Ordering::SeqCst), 0);

        with_metrics_sink(&outer, || {
            record(MetricsEvent::TileRunRejected);
            assert_eq!(outer_calls.load(Ordering::SeqCst), 1);

            with_metrics_sink(&inner, || {
                record(MetricsEvent::CellSlabsProduced { slabs: 3 });
            });

            // inner override restored to outer
            record(MetricsEvent::PartitionShortcut { partitions: 1 });
        });

        assert_eq!(outer_calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| {
            assert!(cell.borrow().is_none());
        });
    }

    #[test]
    fn with_metrics_sink_restores_override_on_panic() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });

        let calls = AtomicUsize::new(0);
        let sink = CountingSink { calls: &calls };

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(&sink, || {
                record(MetricsEvent::TileRunRejected);
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();
        assert!(panicked);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        SINK_OVERRIDE.with(|cell| {
            assert!(cell.borrow().is_none());
        });
    }

    #[test]
    fn global_sink_accumulates_counters() {
        metrics_reset_all();

        record(MetricsEvent::CellsFiltered {
            kind: FilterKind::Sparse,
            cells: 10,
            kept: 4,
        });
        record(MetricsEvent::CellsFiltered {
            kind: FilterKind::Count,
            cells: 6,
            kept: 6,
        });
        record(MetricsEvent::CellSlabsProduced { slabs: 5 });
        record(MetricsEvent::TileRunRejected);

        let counters = metrics_report().counters;
        assert_eq!(counters.sparse_calls, 1);
        assert_eq!(counters.count_calls, 1);
        assert_eq!(counters.cells_scanned, 16);
        assert_eq!(counters.cells_kept, 10);
        assert_eq!(counters.cell_slabs, 5);
        assert_eq!(counters.tile_runs_rejected, 1);

        metrics_reset_all();
        assert_eq!(metrics_report().counters, metrics::FilterCounters::default());
    }
}
