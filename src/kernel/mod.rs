//! Kernel team metadata: `kernel-series.yaml` and SRU tracking bugs.

pub mod series;
pub mod workflow;

pub use series::{KernelSeries, RouteTarget, RoutingEntry, SeriesEntry, SeriesLookup, SourceEntry};
pub use workflow::{KernelSruBug, parse_tracker_title, process_sru_bug};
