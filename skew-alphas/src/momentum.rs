//! Momentum over a rolling window of simple returns.
//!
//! One tick seeds the previous price; each tick after that appends the
//! simple return and evicts past `lookback`. With a full window the signal
//! is `tanh(10 * cumulative_return)` and confidence is how one-sided the
//! returns were: all-up or all-down scores 1.0, an even split 0.0.

use std::collections::VecDeque;

use skew_core::core::AlphaSignal;
use skew_core::data::CanonicalTick;
use skew_core::engine::Alpha;

/// Default rolling return window length.
pub const DEFAULT_LOOKBACK: usize = 10;

/// Gain applied to the cumulative return before the tanh squash.
const SIGNAL_GAIN: f64 = 10.0;

pub struct MomentumAlpha {
    alpha_id: String,
    lookback: usize,
    returns: VecDeque<f64>,
    last_price: Option<f64>,
    last_update_ns: i64,
}

impl MomentumAlpha {
    pub fn new(alpha_id: impl Into<String>, lookback: usize) -> Self {
        let lookback = lookback.max(1);
        Self {
            alpha_id: alpha_id.into(),
            lookback,
            returns: VecDeque::with_capacity(lookback),
            last_price: None,
            last_update_ns: 0,
        }
    }

    pub fn with_default_lookback(alpha_id: impl Into<String>) -> Self {
        Self::new(alpha_id, DEFAULT_LOOKBACK)
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn last_update_ns(&self) -> i64 {
        self.last_update_ns
    }
}

impl Alpha for MomentumAlpha {
    fn alpha_id(&self) -> &str {
        &self.alpha_id
    }

    fn initialize(&mut self) {
        self.returns.clear();
        self.last_price = None;
    }

    fn shutdown(&mut self) {
        self.returns.clear();
        self.last_price = None;
    }

    fn on_tick(&mut self, tick: &CanonicalTick) -> Option<AlphaSignal> {
        if let Some(prev) = self.last_price {
            if prev != 0.0 {
                self.returns.push_back((tick.last - prev) / prev);
                if self.returns.len() > self.lookback {
                    self.returns.pop_front();
                }
            }
        }
        self.last_price = Some(tick.last);

        if self.returns.len() < self.lookback {
            return None;
        }

        let cumulative: f64 = self.returns.iter().sum();
        let signal = (SIGNAL_GAIN * cumulative).tanh();

        let positive = self.returns.iter().filter(|&&r| r > 0.0).count();
        let confidence = (positive as f64 / self.returns.len() as f64 - 0.5).abs() * 2.0;

        self.last_update_ns = tick.timestamp_ns;
        Some(AlphaSignal::new(
            &self.alpha_id,
            &tick.symbol,
            signal,
            confidence,
            tick.timestamp_ns,
        ))
    }
}
