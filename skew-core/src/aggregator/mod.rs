//! Per-symbol signal buffering and portfolio target generation.
//!
//! Signals accumulate per symbol in arrival order, capped at
//! [`MAX_SIGNALS_PER_SYMBOL`] with FIFO eviction, and age out via
//! [`SignalAggregator::clear_older_than`]. A pluggable
//! [`AggregationPolicy`] collapses each buffer into one score; scores scale
//! into target quantities. One mutex serializes everything; the maps are
//! small and the critical sections never touch I/O.

pub mod policy;

pub use policy::{AggregationPolicy, Median, WeightedAverage, MIN_CONFIDENCE_THRESHOLD};

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::debug;

use crate::core::{AlphaSignal, TargetPosition};

/// Per-symbol buffer capacity; the oldest signal is evicted on overflow.
pub const MAX_SIGNALS_PER_SYMBOL: usize = 1000;

/// Default age horizon for signal expiry (60 seconds).
pub const SIGNAL_EXPIRY_NS: i64 = 60_000_000_000;

/// Units of target quantity per unit of aggregated signal.
const TARGET_SCALE: f64 = 1000.0;

/// Buffers alpha signals and produces aggregated position targets.
pub struct SignalAggregator {
    policy: Box<dyn AggregationPolicy>,
    buffers: Mutex<HashMap<String, VecDeque<AlphaSignal>>>,
}

impl SignalAggregator {
    pub fn new(policy: Box<dyn AggregationPolicy>) -> Self {
        debug!("Signal aggregator using {} policy", policy.name());
        Self {
            policy,
            buffers: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Append a signal to its symbol's buffer, evicting the oldest entry
    /// past capacity.
    pub fn add_signal(&self, signal: AlphaSignal) {
        let mut buffers = self.buffers.lock();
        let buffer = buffers.entry(signal.symbol.clone()).or_default();
        buffer.push_back(signal);
        if buffer.len() > MAX_SIGNALS_PER_SYMBOL {
            buffer.pop_front();
        }
    }

    /// Aggregate the current buffer for a symbol. `None` when the symbol is
    /// unknown or its buffer is empty.
    pub fn aggregated_signal(&self, symbol: &str) -> Option<f64> {
        let mut buffers = self.buffers.lock();
        let buffer = buffers.get_mut(symbol)?;
        if buffer.is_empty() {
            return None;
        }
        Some(self.policy.aggregate(buffer.make_contiguous()))
    }

    /// Produce a target position for every symbol with buffered signals.
    pub fn target_portfolio(&self) -> Vec<TargetPosition> {
        let timestamp_ns = now_ns();
        let mut buffers = self.buffers.lock();

        let mut portfolio = Vec::with_capacity(buffers.len());
        for (symbol, buffer) in buffers.iter_mut() {
            if buffer.is_empty() {
                continue;
            }
            let score = self.policy.aggregate(buffer.make_contiguous());
            portfolio.push(TargetPosition {
                symbol: symbol.clone(),
                target_quantity: score * TARGET_SCALE,
                current_quantity: 0.0,
                timestamp_ns,
            });
        }
        portfolio
    }

    /// Evict every signal stamped strictly before `timestamp_ns`.
    pub fn clear_older_than(&self, timestamp_ns: i64) {
        let mut buffers = self.buffers.lock();
        for buffer in buffers.values_mut() {
            buffer.retain(|sig| sig.timestamp_ns >= timestamp_ns);
        }
    }

    /// `(symbols_tracked, signals_buffered)` snapshot.
    pub fn stats(&self) -> (usize, usize) {
        let buffers = self.buffers.lock();
        let signals = buffers.values().map(VecDeque::len).sum();
        (buffers.len(), signals)
    }
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
