//! Concurrency contract tests for the alpha engine.
//!
//! The load-bearing guarantees: one strategy is never entered concurrently,
//! a strategy sees ticks in submission order, accepted ticks survive
//! shutdown, and fan-out delivers one owned copy per callback.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use skew_core::core::{AlphaSignal, AssetType, Exchange};
use skew_core::data::CanonicalTick;
use skew_core::engine::{Alpha, AlphaEngine};

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

/// Records every tick it sees and detects overlapping `on_tick` entries.
struct ProbeAlpha {
    id: String,
    in_flight: Arc<AtomicUsize>,
    overlaps: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<i64>>>,
    work: Duration,
}

impl Alpha for ProbeAlpha {
    fn alpha_id(&self) -> &str {
        &self.id
    }

    fn initialize(&mut self) {}

    fn shutdown(&mut self) {}

    fn on_tick(&mut self, tick: &CanonicalTick) -> Option<AlphaSignal> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) != 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        thread::sleep(self.work);
        self.seen.lock().unwrap().push(tick.timestamp_ns);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Some(AlphaSignal::new(&self.id, &tick.symbol, 0.5, 1.0, tick.timestamp_ns))
    }
}

#[test]
fn test_same_strategy_never_interleaves() {
    let engine = Arc::new(AlphaEngine::new(8));
    let overlaps = Arc::new(AtomicUsize::new(0));

    for i in 0..4 {
        engine.add_alpha(Box::new(ProbeAlpha {
            id: format!("probe-{i}"),
            in_flight: Arc::new(AtomicUsize::new(0)),
            overlaps: overlaps.clone(),
            seen: Arc::new(Mutex::new(Vec::new())),
            work: Duration::from_micros(200),
        }));
    }
    engine.start();

    // Hammer from several producers at once.
    let producers: Vec<_> = (0..4)
        .map(|t| {
            let engine = engine.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    engine.process_tick(&tick("AAPL", 100.0, (t * 1000 + i) as i64));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    engine.stop();

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[test]
fn test_single_producer_order_preserved() {
    let engine = AlphaEngine::new(8);
    let seen = Arc::new(Mutex::new(Vec::new()));

    engine.add_alpha(Box::new(ProbeAlpha {
        id: "probe".to_string(),
        in_flight: Arc::new(AtomicUsize::new(0)),
        overlaps: Arc::new(AtomicUsize::new(0)),
        seen: seen.clone(),
        work: Duration::from_micros(50),
    }));
    engine.start();

    for i in 0..200 {
        engine.process_tick(&tick("AAPL", 100.0, i));
    }
    engine.stop();

    let observed = seen.lock().unwrap().clone();
    let expected: Vec<i64> = (0..200).collect();
    assert_eq!(observed, expected);
}

#[test]
fn test_stop_drains_accepted_ticks() {
    let engine = AlphaEngine::new(1);
    let seen = Arc::new(Mutex::new(Vec::new()));

    engine.add_alpha(Box::new(ProbeAlpha {
        id: "slow".to_string(),
        in_flight: Arc::new(AtomicUsize::new(0)),
        overlaps: Arc::new(AtomicUsize::new(0)),
        seen: seen.clone(),
        work: Duration::from_millis(2),
    }));
    engine.start();

    for i in 0..30 {
        engine.process_tick(&tick("AAPL", 100.0, i));
    }
    // Stop immediately: every accepted tick must still be processed.
    engine.stop();

    assert_eq!(seen.lock().unwrap().len(), 30);
    assert_eq!(engine.stats().1, 30);
}

#[test]
fn test_fanout_one_copy_per_callback() {
    let engine = AlphaEngine::new(2);
    engine.add_alpha(Box::new(ProbeAlpha {
        id: "probe".to_string(),
        in_flight: Arc::new(AtomicUsize::new(0)),
        overlaps: Arc::new(AtomicUsize::new(0)),
        seen: Arc::new(Mutex::new(Vec::new())),
        work: Duration::ZERO,
    }));

    let hits: Vec<Arc<Mutex<Vec<AlphaSignal>>>> =
        (0..3).map(|_| Arc::new(Mutex::new(Vec::new()))).collect();
    for sink in &hits {
        let sink = sink.clone();
        engine.register_signal_callback(move |signal| {
            sink.lock().unwrap().push(signal);
        });
    }

    engine.start();
    engine.process_tick(&tick("AAPL", 100.0, 7));
    engine.stop();

    // Exactly one invocation per callback, each with an equal owned copy.
    for sink in &hits {
        let received = sink.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].timestamp_ns, 7);
        assert_eq!(received[0].signal, 0.5);
    }
}

#[test]
fn test_parallelism_across_strategies() {
    // Two slow strategies on two workers should overlap in wall time:
    // sequential execution would need ~2x the budget.
    let engine = AlphaEngine::new(2);
    for i in 0..2 {
        engine.add_alpha(Box::new(ProbeAlpha {
            id: format!("slow-{i}"),
            in_flight: Arc::new(AtomicUsize::new(0)),
            overlaps: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
            work: Duration::from_millis(5),
        }));
    }
    engine.start();

    let started = std::time::Instant::now();
    for i in 0..20 {
        engine.process_tick(&tick("AAPL", 100.0, i));
    }
    engine.stop();
    let elapsed = started.elapsed();

    // Serial would be 2 strategies * 20 ticks * 5ms = 200ms.
    assert!(
        elapsed < Duration::from_millis(180),
        "strategies did not run in parallel: {elapsed:?}"
    );
}
