pub mod collector;
pub mod exporter;
pub mod sink;
pub mod stats;

pub use collector::{Metrics, MetricsCollector};
pub use exporter::{ExportFormat, Exporter};
pub use sink::{Event, MetricSink, ServiceCheckStatus};
pub use stats::{CheckStats, RunOutcome};
