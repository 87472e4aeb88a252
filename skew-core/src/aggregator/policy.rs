//! Pluggable signal aggregation policies.

use crate::core::AlphaSignal;

/// Signals below this confidence are ignored by every policy.
pub const MIN_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// Collapses a buffer of signals into one directional score.
pub trait AggregationPolicy: Send + Sync {
    fn aggregate(&self, signals: &[AlphaSignal]) -> f64;
    fn name(&self) -> &'static str;
}

/// Confidence-weighted mean of the qualifying signals.
#[derive(Debug, Default)]
pub struct WeightedAverage;

impl AggregationPolicy for WeightedAverage {
    fn aggregate(&self, signals: &[AlphaSignal]) -> f64 {
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for sig in signals {
            if sig.confidence >= MIN_CONFIDENCE_THRESHOLD {
                weighted_sum += sig.signal * sig.confidence;
                total_weight += sig.confidence;
            }
        }
        if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            0.0
        }
    }

    fn name(&self) -> &'static str {
        "WeightedAverage"
    }
}

/// Median of the qualifying signals; robust to outlier alphas.
#[derive(Debug, Default)]
pub struct Median;

impl AggregationPolicy for Median {
    fn aggregate(&self, signals: &[AlphaSignal]) -> f64 {
        let mut values: Vec<f64> = signals
            .iter()
            .filter(|s| s.confidence >= MIN_CONFIDENCE_THRESHOLD)
            .map(|s| s.signal)
            .collect();

        if values.is_empty() {
            return 0.0;
        }

        values.sort_by(f64::total_cmp);
        let mid = values.len() / 2;
        if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        }
    }

    fn name(&self) -> &'static str {
        "Median"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(signal: f64, confidence: f64) -> AlphaSignal {
        AlphaSignal::new("alpha", "AAPL", signal, confidence, 1)
    }

    #[test]
    fn test_weighted_average_filters_and_weights() {
        let signals = vec![sig(0.8, 0.9), sig(-0.4, 0.5), sig(0.2, 0.2)];
        let result = WeightedAverage.aggregate(&signals);
        // (0.8*0.9 - 0.4*0.5) / (0.9 + 0.5)
        assert!((result - 0.52 / 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_average_empty_after_filter() {
        let signals = vec![sig(0.9, 0.1), sig(-0.9, 0.2)];
        assert_eq!(WeightedAverage.aggregate(&signals), 0.0);
        assert_eq!(WeightedAverage.aggregate(&[]), 0.0);
    }

    #[test]
    fn test_median_odd_and_even() {
        let odd = vec![sig(0.9, 0.9), sig(-0.3, 0.9), sig(0.1, 0.9)];
        assert_eq!(Median.aggregate(&odd), 0.1);

        let even = vec![sig(0.4, 0.9), sig(-0.2, 0.9), sig(0.6, 0.9), sig(0.0, 0.9)];
        assert!((Median.aggregate(&even) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_median_keeps_zero_signals() {
        // A confident zero-valued signal is a real opinion, not filler.
        let signals = vec![sig(0.0, 0.9), sig(0.0, 0.8), sig(1.0, 0.9)];
        assert_eq!(Median.aggregate(&signals), 0.0);
    }

    #[test]
    fn test_median_low_confidence_filtered() {
        let signals = vec![sig(1.0, 0.1), sig(-0.5, 0.9)];
        assert_eq!(Median.aggregate(&signals), -0.5);
    }
}
