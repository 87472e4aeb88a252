//! Alpha signals and portfolio targets.
//!
//! An [`AlphaSignal`] is a bounded directional score: `signal` in
//! `[-1.0, 1.0]`, `confidence` in `[0.0, 1.0]`. The constructor clamps both
//! so no strategy can leak an out-of-range value downstream, however its
//! arithmetic went.

use serde::{Deserialize, Serialize};

/// Directional score emitted by a single strategy for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaSignal {
    /// Stable identifier of the producing strategy.
    pub alpha_id: String,
    pub symbol: String,
    /// Direction and strength, clamped to `[-1.0, 1.0]`.
    pub signal: f64,
    /// Self-assessed quality, clamped to `[0.0, 1.0]`.
    pub confidence: f64,
    pub timestamp_ns: i64,
}

impl AlphaSignal {
    /// Build a signal, clamping `signal` and `confidence` to their ranges.
    pub fn new(
        alpha_id: impl Into<String>,
        symbol: impl Into<String>,
        signal: f64,
        confidence: f64,
        timestamp_ns: i64,
    ) -> Self {
        Self {
            alpha_id: alpha_id.into(),
            symbol: symbol.into(),
            signal: signal.clamp(-1.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            timestamp_ns,
        }
    }
}

/// Desired holding for a symbol, derived from aggregated signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPosition {
    pub symbol: String,
    pub target_quantity: f64,
    pub current_quantity: f64,
    pub timestamp_ns: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_clamped_to_range() {
        let sig = AlphaSignal::new("alpha", "AAPL", 3.5, 1.7, 1);
        assert_eq!(sig.signal, 1.0);
        assert_eq!(sig.confidence, 1.0);

        let sig = AlphaSignal::new("alpha", "AAPL", -3.5, -0.2, 1);
        assert_eq!(sig.signal, -1.0);
        assert_eq!(sig.confidence, 0.0);
    }

    #[test]
    fn test_in_range_values_untouched() {
        let sig = AlphaSignal::new("alpha", "AAPL", -0.25, 0.6, 42);
        assert_eq!(sig.signal, -0.25);
        assert_eq!(sig.confidence, 0.6);
        assert_eq!(sig.timestamp_ns, 42);
    }
}
