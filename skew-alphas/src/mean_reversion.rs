//! Mean reversion on a rolling z-score.
//!
//! Keeps the last `window` trade prices. Once the window is full, each tick
//! scores the current price against the window mean in population standard
//! deviations and leans the other way: a price far above the mean is a
//! sell, far below a buy. Flat windows (sigma below [`MIN_STD_DEV`])
//! produce nothing.

use std::collections::VecDeque;

use skew_core::core::AlphaSignal;
use skew_core::data::CanonicalTick;
use skew_core::engine::Alpha;

/// Default rolling window length.
pub const DEFAULT_WINDOW: usize = 20;

/// Below this standard deviation the window is considered flat.
const MIN_STD_DEV: f64 = 1e-6;

/// Z-score magnitude that maps to full confidence.
const FULL_CONFIDENCE_Z: f64 = 3.0;

pub struct MeanReversionAlpha {
    alpha_id: String,
    window: usize,
    prices: VecDeque<f64>,
    initialized: bool,
    last_update_ns: i64,
}

impl MeanReversionAlpha {
    pub fn new(alpha_id: impl Into<String>, window: usize) -> Self {
        let window = window.max(2);
        Self {
            alpha_id: alpha_id.into(),
            window,
            prices: VecDeque::with_capacity(window),
            initialized: false,
            last_update_ns: 0,
        }
    }

    pub fn with_default_window(alpha_id: impl Into<String>) -> Self {
        Self::new(alpha_id, DEFAULT_WINDOW)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn last_update_ns(&self) -> i64 {
        self.last_update_ns
    }

    fn mean(&self) -> f64 {
        self.prices.iter().sum::<f64>() / self.prices.len() as f64
    }

    /// Population standard deviation (divide by N).
    fn std_dev(&self, mean: f64) -> f64 {
        let variance = self
            .prices
            .iter()
            .map(|p| {
                let diff = p - mean;
                diff * diff
            })
            .sum::<f64>()
            / self.prices.len() as f64;
        variance.sqrt()
    }
}

impl Alpha for MeanReversionAlpha {
    fn alpha_id(&self) -> &str {
        &self.alpha_id
    }

    fn initialize(&mut self) {
        self.prices.clear();
        self.initialized = true;
    }

    fn shutdown(&mut self) {
        self.prices.clear();
        self.initialized = false;
    }

    fn is_active(&self) -> bool {
        self.initialized
    }

    fn on_tick(&mut self, tick: &CanonicalTick) -> Option<AlphaSignal> {
        if !self.initialized {
            return None;
        }

        self.prices.push_back(tick.last);
        if self.prices.len() > self.window {
            self.prices.pop_front();
        }
        if self.prices.len() < self.window {
            return None;
        }

        let mean = self.mean();
        let std_dev = self.std_dev(mean);
        if std_dev < MIN_STD_DEV {
            return None;
        }

        let z_score = (tick.last - mean) / std_dev;
        let confidence = (z_score.abs() / FULL_CONFIDENCE_Z).min(1.0);

        self.last_update_ns = tick.timestamp_ns;
        Some(AlphaSignal::new(
            &self.alpha_id,
            &tick.symbol,
            -z_score,
            confidence,
            tick.timestamp_ns,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::tick;

    fn feed(alpha: &mut MeanReversionAlpha, prices: &[f64]) -> Vec<Option<AlphaSignal>> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| alpha.on_tick(&tick("AAPL", p, i as i64)))
            .collect()
    }

    #[test]
    fn test_inactive_until_initialized() {
        let mut alpha = MeanReversionAlpha::new("mr-0", 3);
        assert!(!alpha.is_active());
        assert!(alpha.on_tick(&tick("AAPL", 10.0, 1)).is_none());

        alpha.initialize();
        assert!(alpha.is_active());
    }

    #[test]
    fn test_warmup_produces_no_signal() {
        let mut alpha = MeanReversionAlpha::new("mr-0", 5);
        alpha.initialize();

        // First W-1 ticks can never emit.
        for i in 0..4 {
            assert!(alpha.on_tick(&tick("AAPL", 100.0 + i as f64, i)).is_none());
        }
    }

    #[test]
    fn test_flat_window_emits_nothing() {
        let mut alpha = MeanReversionAlpha::new("mr-0", 3);
        alpha.initialize();
        let signals = feed(&mut alpha, &[10.0, 10.0, 10.0, 10.0]);
        assert!(signals.iter().all(Option::is_none));
    }

    #[test]
    fn test_spike_leans_against_move() {
        // Window [10, 10, 13]: mean 11, population sigma sqrt(2),
        // z = 2/sqrt(2) ~= 1.414. Signal clamps to -1, confidence z/3.
        let mut alpha = MeanReversionAlpha::new("mr-0", 3);
        alpha.initialize();

        let signals = feed(&mut alpha, &[10.0, 10.0, 10.0, 13.0]);
        assert!(signals[..3].iter().all(Option::is_none));

        let signal = signals[3].as_ref().unwrap();
        assert_eq!(signal.signal, -1.0);
        let expected_conf = (2.0 / 2.0_f64.sqrt()) / 3.0;
        assert!((signal.confidence - expected_conf).abs() < 1e-9);
        assert_eq!(signal.alpha_id, "mr-0");
        assert_eq!(signal.symbol, "AAPL");
    }

    #[test]
    fn test_below_mean_is_positive_signal() {
        let mut alpha = MeanReversionAlpha::new("mr-0", 3);
        alpha.initialize();
        let signals = feed(&mut alpha, &[10.0, 10.0, 10.0, 7.0]);
        let signal = signals[3].as_ref().unwrap();
        assert!(signal.signal > 0.0);
    }

    #[test]
    fn test_signal_and_confidence_bounded() {
        let mut alpha = MeanReversionAlpha::new("mr-0", 4);
        alpha.initialize();
        let signals = feed(
            &mut alpha,
            &[100.0, 100.1, 99.9, 100.0, 250.0, 20.0, 100.0, 180.0],
        );
        for signal in signals.into_iter().flatten() {
            assert!((-1.0..=1.0).contains(&signal.signal));
            assert!((0.0..=1.0).contains(&signal.confidence));
        }
    }

    #[test]
    fn test_shutdown_clears_state() {
        let mut alpha = MeanReversionAlpha::new("mr-0", 3);
        alpha.initialize();
        feed(&mut alpha, &[10.0, 11.0, 12.0]);

        alpha.shutdown();
        assert!(!alpha.is_active());

        // Re-initialization starts the warmup over.
        alpha.initialize();
        assert!(alpha.on_tick(&tick("AAPL", 13.0, 10)).is_none());
    }

    #[test]
    fn test_last_update_tracks_emissions() {
        let mut alpha = MeanReversionAlpha::new("mr-0", 3);
        alpha.initialize();
        feed(&mut alpha, &[10.0, 10.0, 10.0, 13.0]);
        assert_eq!(alpha.last_update_ns(), 3);
    }
}
