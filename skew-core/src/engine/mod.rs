//! Alpha fan-out engine.
//!
//! Holds the strategy population and, for every canonical tick, runs each
//! active strategy on the worker pool. Scheduling keeps at most one
//! in-flight pool task per strategy: a tick lands in the strategy's pending
//! queue and a drain task is scheduled only if none is already running.
//! That gives two guarantees at once: a strategy's `on_tick` is never
//! entered concurrently, and a strategy sees ticks in `process_tick` order.
//! Distinct strategies still run fully in parallel across the pool.
//!
//! Signal fan-out duplicates: each registered callback receives its own
//! owned copy of the signal. Callbacks run on worker threads, outside every
//! engine lock.

pub mod pool;
pub mod traits;

pub use pool::{WorkerPool, DEFAULT_WORKERS};
pub use traits::Alpha;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::core::AlphaSignal;
use crate::data::CanonicalTick;

/// Signal consumer; receives an owned copy per emitted signal.
pub type SignalCallback = Box<dyn Fn(AlphaSignal) + Send + Sync>;

/// One registered strategy plus its serialization state.
struct AlphaSlot {
    alpha: Mutex<Box<dyn Alpha>>,
    pending: Mutex<VecDeque<CanonicalTick>>,
    /// True while a drain task for this slot is queued or running.
    scheduled: AtomicBool,
}

/// Engine over a population of independent strategies.
pub struct AlphaEngine {
    pool: WorkerPool,
    alphas: Mutex<Vec<Arc<AlphaSlot>>>,
    callbacks: Arc<Mutex<Vec<Arc<SignalCallback>>>>,
    signals_generated: Arc<AtomicU64>,
    running: AtomicBool,
    stopped: AtomicBool,
}

impl AlphaEngine {
    pub fn new(num_workers: usize) -> Self {
        Self {
            pool: WorkerPool::new(num_workers),
            alphas: Mutex::new(Vec::new()),
            callbacks: Arc::new(Mutex::new(Vec::new())),
            signals_generated: Arc::new(AtomicU64::new(0)),
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn with_default_workers() -> Self {
        Self::new(DEFAULT_WORKERS)
    }

    /// Initialize and register a strategy. Safe against concurrent
    /// `process_tick`.
    pub fn add_alpha(&self, mut alpha: Box<dyn Alpha>) {
        alpha.initialize();
        debug!("Registered alpha {}", alpha.alpha_id());
        self.alphas.lock().push(Arc::new(AlphaSlot {
            alpha: Mutex::new(alpha),
            pending: Mutex::new(VecDeque::new()),
            scheduled: AtomicBool::new(false),
        }));
    }

    /// Register an owned signal consumer.
    pub fn register_signal_callback(&self, callback: impl Fn(AlphaSignal) + Send + Sync + 'static) {
        self.callbacks.lock().push(Arc::new(Box::new(callback)));
    }

    /// Begin accepting ticks. Returns false when already running or after a
    /// terminal `stop`.
    pub fn start(&self) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return false;
        }
        let was_running = self.running.swap(true, Ordering::AcqRel);
        if !was_running {
            info!("Alpha engine started");
        }
        !was_running
    }

    /// Fan a tick out to every active strategy. No-op unless running.
    /// Returns without waiting for strategy execution.
    pub fn process_tick(&self, tick: &CanonicalTick) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }

        let slots: Vec<Arc<AlphaSlot>> = self.alphas.lock().iter().cloned().collect();

        for slot in slots {
            slot.pending.lock().push_back(tick.clone());
            if !slot.scheduled.swap(true, Ordering::AcqRel) {
                let slot = slot.clone();
                let callbacks = self.callbacks.clone();
                let counter = self.signals_generated.clone();
                self.pool.execute(move || drain_slot(&slot, &callbacks, &counter));
            }
        }
    }

    /// Flag shutdown, drain queued work, join the workers, then shut each
    /// strategy down. Idempotent; terminal.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.running.store(false, Ordering::Release);
        self.pool.shutdown();

        // Workers are joined. A producer that pushed a tick right as the
        // pool flag flipped may have had its drain task dropped; sweep the
        // pending queues inline so every accepted tick is still processed.
        let slots: Vec<Arc<AlphaSlot>> = self.alphas.lock().iter().cloned().collect();
        for slot in &slots {
            drain_slot(slot, &self.callbacks, &self.signals_generated);
        }

        for slot in slots {
            slot.alpha.lock().shutdown();
        }
        info!(
            "Alpha engine stopped after {} signals",
            self.signals_generated.load(Ordering::Relaxed)
        );
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// `(num_alphas, num_signals)` snapshot.
    pub fn stats(&self) -> (usize, u64) {
        (
            self.alphas.lock().len(),
            self.signals_generated.load(Ordering::Relaxed),
        )
    }

    /// Ticks accepted but not yet picked up by a worker.
    pub fn queued_tasks(&self) -> usize {
        self.pool.queued()
    }
}

impl Drop for AlphaEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drain one strategy's pending ticks. Only ever runs once per slot at a
/// time, which is what serializes `on_tick`.
fn drain_slot(
    slot: &Arc<AlphaSlot>,
    callbacks: &Arc<Mutex<Vec<Arc<SignalCallback>>>>,
    counter: &Arc<AtomicU64>,
) {
    loop {
        let tick = slot.pending.lock().pop_front();
        match tick {
            Some(tick) => {
                let signal = {
                    let mut alpha = slot.alpha.lock();
                    if alpha.is_active() {
                        alpha.on_tick(&tick)
                    } else {
                        None
                    }
                };
                if let Some(signal) = signal {
                    counter.fetch_add(1, Ordering::Relaxed);
                    let consumers: Vec<Arc<SignalCallback>> =
                        callbacks.lock().iter().cloned().collect();
                    for consumer in consumers {
                        consumer(signal.clone());
                    }
                }
            }
            None => {
                slot.scheduled.store(false, Ordering::Release);
                // A producer may have pushed between the pop and the flag
                // clear; reclaim the slot if so, otherwise we are done.
                if slot.pending.lock().is_empty() || slot.scheduled.swap(true, Ordering::AcqRel) {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AssetType, Exchange};

    fn tick(symbol: &str, last: f64, ts: i64) -> CanonicalTick {
        CanonicalTick {
            symbol: symbol.to_string(),
            bid: last - 0.01,
            ask: last + 0.01,
            last,
            bid_size: 100,
            ask_size: 100,
            volume: 1_000,
            timestamp_ns: ts,
            asset_type: AssetType::Equity,
            exchange: Exchange::Nyse,
        }
    }

    /// Emits a unit signal on every tick.
    struct EchoAlpha {
        id: String,
        active: bool,
    }

    impl EchoAlpha {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                active: false,
            }
        }
    }

    impl Alpha for EchoAlpha {
        fn alpha_id(&self) -> &str {
            &self.id
        }

        fn initialize(&mut self) {
            self.active = true;
        }

        fn shutdown(&mut self) {
            self.active = false;
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn on_tick(&mut self, tick: &CanonicalTick) -> Option<AlphaSignal> {
            Some(AlphaSignal::new(
                &self.id,
                &tick.symbol,
                1.0,
                1.0,
                tick.timestamp_ns,
            ))
        }
    }

    #[test]
    fn test_process_tick_before_start_is_noop() {
        let engine = AlphaEngine::new(2);
        engine.add_alpha(Box::new(EchoAlpha::new("echo")));
        engine.process_tick(&tick("AAPL", 100.0, 1));
        engine.stop();
        assert_eq!(engine.stats().1, 0);
    }

    #[test]
    fn test_signals_counted_and_delivered() {
        let engine = AlphaEngine::new(2);
        engine.add_alpha(Box::new(EchoAlpha::new("echo")));

        let (tx, rx) = std::sync::mpsc::channel();
        engine.register_signal_callback(move |signal| {
            tx.send(signal).ok();
        });

        assert!(engine.start());
        for i in 0..10 {
            engine.process_tick(&tick("AAPL", 100.0, i));
        }
        engine.stop();

        assert_eq!(engine.stats(), (1, 10));
        assert_eq!(rx.try_iter().count(), 10);
    }

    #[test]
    fn test_start_idempotent() {
        let engine = AlphaEngine::new(1);
        assert!(engine.start());
        assert!(!engine.start());
        engine.stop();
        assert!(!engine.start());
    }

    #[test]
    fn test_stop_idempotent() {
        let engine = AlphaEngine::new(1);
        engine.start();
        engine.stop();
        engine.stop();
        engine.stop();
        assert!(!engine.is_running());
    }

    #[test]
    fn test_inactive_alpha_skipped() {
        struct NeverActive;
        impl Alpha for NeverActive {
            fn alpha_id(&self) -> &str {
                "never"
            }
            fn initialize(&mut self) {}
            fn shutdown(&mut self) {}
            fn is_active(&self) -> bool {
                false
            }
            fn on_tick(&mut self, _tick: &CanonicalTick) -> Option<AlphaSignal> {
                panic!("inactive strategy must not be ticked");
            }
        }

        let engine = AlphaEngine::new(2);
        engine.add_alpha(Box::new(NeverActive));
        engine.start();
        engine.process_tick(&tick("AAPL", 100.0, 1));
        engine.stop();
        assert_eq!(engine.stats().1, 0);
    }
}
