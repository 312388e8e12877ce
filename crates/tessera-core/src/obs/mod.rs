//! Observability: filtering counters and the sink boundary they flow through.
//!
//! Geometry code never touches `metrics` directly; it records `MetricsEvent`s.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{FilterCounters, MetricsReport};
pub use sink::{FilterKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
