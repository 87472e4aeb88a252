//! Prometheus metrics for the pipeline stages.
//!
//! The components keep their own atomic counters; this registry mirrors them
//! into Prometheus families so any sink can scrape or log the rendered text.
//! Export transport is the host's concern.

use prometheus::{Encoder, Histogram, HistogramOpts, IntGauge, Registry, TextEncoder};
use tracing::info;

/// Gauge and histogram families for the four pipeline stages.
pub struct PipelineMetrics {
    registry: Registry,

    pub packets_received: IntGauge,
    pub packets_processed: IntGauge,

    pub active_alphas: IntGauge,
    pub signals_generated: IntGauge,

    pub symbols_tracked: IntGauge,
    pub signals_buffered: IntGauge,

    pub validations_total: IntGauge,
    pub validations_approved: IntGauge,
    pub validations_rejected: IntGauge,
    pub validations_slow: IntGauge,
    pub validation_latency: Histogram,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let packets_received = IntGauge::new(
            "skew_feed_packets_received",
            "Datagrams received by the feed dispatcher",
        )?;
        registry.register(Box::new(packets_received.clone()))?;

        let packets_processed = IntGauge::new(
            "skew_feed_packets_processed",
            "Datagrams decoded into canonical ticks",
        )?;
        registry.register(Box::new(packets_processed.clone()))?;

        let active_alphas =
            IntGauge::new("skew_engine_active_alphas", "Strategies registered in the engine")?;
        registry.register(Box::new(active_alphas.clone()))?;

        let signals_generated =
            IntGauge::new("skew_engine_signals_generated", "Alpha signals emitted")?;
        registry.register(Box::new(signals_generated.clone()))?;

        let symbols_tracked =
            IntGauge::new("skew_aggregator_symbols", "Symbols with buffered signals")?;
        registry.register(Box::new(symbols_tracked.clone()))?;

        let signals_buffered =
            IntGauge::new("skew_aggregator_signals_buffered", "Signals currently buffered")?;
        registry.register(Box::new(signals_buffered.clone()))?;

        let validations_total =
            IntGauge::new("skew_risk_validations_total", "Orders presented to the battery")?;
        registry.register(Box::new(validations_total.clone()))?;

        let validations_approved =
            IntGauge::new("skew_risk_validations_approved", "Orders approved")?;
        registry.register(Box::new(validations_approved.clone()))?;

        let validations_rejected =
            IntGauge::new("skew_risk_validations_rejected", "Orders rejected")?;
        registry.register(Box::new(validations_rejected.clone()))?;

        let validations_slow = IntGauge::new(
            "skew_risk_validations_slow",
            "Validations that blew the 50us budget",
        )?;
        registry.register(Box::new(validations_slow.clone()))?;

        let validation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "skew_risk_validation_seconds",
                "Risk validation wall time",
            )
            .buckets(vec![1e-6, 5e-6, 1e-5, 2.5e-5, 5e-5, 1e-4, 1e-3]),
        )?;
        registry.register(Box::new(validation_latency.clone()))?;

        info!("Pipeline metrics registry initialized");

        Ok(Self {
            registry,
            packets_received,
            packets_processed,
            active_alphas,
            signals_generated,
            symbols_tracked,
            signals_buffered,
            validations_total,
            validations_approved,
            validations_rejected,
            validations_slow,
            validation_latency,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every family in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder
            .encode(&self.registry.gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_renders_families() {
        let metrics = PipelineMetrics::new().unwrap();
        metrics.packets_received.set(42);
        metrics.validations_total.set(7);
        metrics.validation_latency.observe(1.2e-5);

        let text = metrics.render();
        assert!(text.contains("skew_feed_packets_received 42"));
        assert!(text.contains("skew_risk_validations_total 7"));
        assert!(text.contains("skew_risk_validation_seconds_bucket"));
    }
}
