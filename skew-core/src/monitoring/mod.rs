//! Observability surface.

pub mod metrics;

pub use metrics::PipelineMetrics;
