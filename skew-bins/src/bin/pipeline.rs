//! Full pipeline over loopback multicast.
//!
//! A generator thread publishes NYSE-layout frames to the multicast group;
//! the dispatcher decodes them and fans ticks into the alpha engine; signals
//! cross a channel into the aggregator; and on an interval the aggregated
//! portfolio is turned into orders and pushed through the risk battery.
//! One process, all four stages, real sockets.

use std::net::{Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel;
use rand::Rng;
use skew_alphas::{MeanReversionAlpha, MomentumAlpha};
use skew_bins::common::{init_logger, pin_to_core, shutdown_flag};
use skew_core::aggregator::{SignalAggregator, WeightedAverage, SIGNAL_EXPIRY_NS};
use skew_core::core::{AlphaSignal, Side};
use skew_core::data::{FeedDispatcher, NasdaqNormalizer, Normalizer, NyseNormalizer};
use skew_core::monitoring::PipelineMetrics;
use skew_core::risk::{Order, RiskGuardian};
use skew_core::{AlphaEngine, Exchange};

#[derive(Parser, Debug)]
#[command(author, version, about = "All four pipeline stages in one process")]
struct Args {
    /// Multicast group
    #[arg(short, long, default_value = "239.255.0.1")]
    group: Ipv4Addr,

    /// Multicast port
    #[arg(short, long, default_value_t = 12345)]
    port: u16,

    /// Worker threads in the strategy pool
    #[arg(short, long, default_value_t = 8)]
    workers: usize,

    /// Strategies of each flavor
    #[arg(long, default_value_t = 20)]
    alphas_per_kind: usize,

    /// Seconds between portfolio/risk passes
    #[arg(long, default_value_t = 5)]
    rebalance_secs: u64,

    /// CPU core to pin the main thread to
    #[arg(short = 'c', long)]
    cpu_core: Option<usize>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level, args.json_logs);

    tracing::info!("=== Skew Pipeline ===");
    pin_to_core(args.cpu_core);

    let metrics = PipelineMetrics::new().context("failed to build metrics registry")?;

    // Stage 4: risk guardian.
    let guardian = Arc::new(
        RiskGuardian::builder()
            .with_initial_nav(1_000_000.0)
            .with_fat_finger_check(0.05)
            .with_drawdown_check(0.05)
            .with_concentration_check(0.10)
            .build(),
    );
    for symbol in ["AAPL", "MSFT", "TSLA"] {
        guardian.set_adv(symbol, 1_000_000.0);
    }

    // Stage 3: aggregator fed over a channel from the engine's callbacks.
    let aggregator = Arc::new(SignalAggregator::new(Box::new(WeightedAverage)));
    let (signal_tx, signal_rx) = channel::unbounded::<AlphaSignal>();

    let sink = {
        let aggregator = aggregator.clone();
        std::thread::Builder::new()
            .name("signal-sink".to_string())
            .spawn(move || {
                for signal in signal_rx {
                    aggregator.add_signal(signal);
                }
            })?
    };

    // Stage 2: alpha engine.
    let engine = Arc::new(AlphaEngine::new(args.workers));
    for i in 0..args.alphas_per_kind {
        engine.add_alpha(Box::new(MeanReversionAlpha::with_default_window(format!(
            "mean-reversion-{i}"
        ))));
        engine.add_alpha(Box::new(MomentumAlpha::with_default_lookback(format!(
            "momentum-{i}"
        ))));
    }
    engine.register_signal_callback(move |signal| {
        // Best-effort: a closed sink means shutdown is in progress.
        let _ = signal_tx.send(signal);
    });
    engine.start();

    // Stage 1: dispatcher wired into the engine.
    let dispatcher = FeedDispatcher::new(args.group, args.port);
    let nyse: Arc<dyn Normalizer> = Arc::new(NyseNormalizer::new());
    let nasdaq: Arc<dyn Normalizer> = Arc::new(NasdaqNormalizer::new());
    dispatcher.register_normalizer(Exchange::Nyse, &nyse);
    dispatcher.register_normalizer(Exchange::Nasdaq, &nasdaq);
    {
        let engine = engine.clone();
        dispatcher.register_callback(move |tick| engine.process_tick(tick));
    }
    dispatcher.start()?;

    // Synthetic exchange: random-walk frames over loopback multicast.
    let feeding = Arc::new(AtomicBool::new(true));
    let generator = spawn_frame_generator(args.group, args.port, feeding.clone())?;

    tracing::info!(
        "Pipeline up: {} alphas, {} workers, group {}:{}",
        engine.stats().0,
        args.workers,
        args.group,
        args.port
    );

    let running = shutdown_flag()?;
    let interval = Duration::from_secs(args.rebalance_secs);

    while running.load(Ordering::Acquire) {
        std::thread::sleep(interval);

        aggregator.clear_older_than(now_ns() - SIGNAL_EXPIRY_NS);

        // Portfolio targets become orders; the battery has the last word.
        for target in aggregator.target_portfolio() {
            let delta = target.target_quantity - target.current_quantity;
            if delta.abs() < 1.0 {
                continue;
            }
            let side = if delta > 0.0 { Side::Buy } else { Side::Sell };
            let price = guardian.market_price(&target.symbol).unwrap_or(150.0);
            let order = Order {
                order_id: format!("target-{}-{}", target.symbol, target.timestamp_ns),
                symbol: target.symbol.clone(),
                quantity: delta.abs(),
                side,
                price,
                timestamp_ns: target.timestamp_ns,
            };

            let started = std::time::Instant::now();
            let result = guardian.validate_order(&order);
            metrics.validation_latency.observe(started.elapsed().as_secs_f64());

            if result.approved {
                guardian.update_position(&order.symbol, order.signed_quantity(), order.price);
                tracing::info!(
                    "Order approved: {} {} {:.0} @ {:.2}",
                    order.symbol,
                    order.side,
                    order.quantity,
                    order.price
                );
            } else {
                tracing::warn!("Order rejected: {} ({})", order.symbol, result.reason());
            }
        }

        publish_metrics(&metrics, &dispatcher, &engine, &aggregator, &guardian);
    }

    // Teardown in data-flow order. The sink drains until the last signal
    // sender drops with the engine, so the engine must go first.
    feeding.store(false, Ordering::Release);
    let _ = generator.join();

    dispatcher.stop();
    let (received, processed) = dispatcher.stats();
    drop(dispatcher);

    engine.stop();
    let (_, signals) = engine.stats();
    drop(engine);
    let _ = sink.join();

    tracing::info!(
        "Final: {} packets received, {} processed, {} signals, {} validations",
        received,
        processed,
        signals,
        guardian.validation_count()
    );
    Ok(())
}

/// Publish component counters into the Prometheus registry and log it.
fn publish_metrics(
    metrics: &PipelineMetrics,
    dispatcher: &FeedDispatcher,
    engine: &AlphaEngine,
    aggregator: &SignalAggregator,
    guardian: &RiskGuardian,
) {
    let (received, processed) = dispatcher.stats();
    metrics.packets_received.set(received as i64);
    metrics.packets_processed.set(processed as i64);

    let (alphas, signals) = engine.stats();
    metrics.active_alphas.set(alphas as i64);
    metrics.signals_generated.set(signals as i64);

    let (symbols, buffered) = aggregator.stats();
    metrics.symbols_tracked.set(symbols as i64);
    metrics.signals_buffered.set(buffered as i64);

    metrics.validations_total.set(guardian.validation_count() as i64);
    metrics.validations_approved.set(guardian.approved_count() as i64);
    metrics.validations_rejected.set(guardian.rejected_count() as i64);
    metrics.validations_slow.set(guardian.slow_validation_count() as i64);

    tracing::debug!("\n{}", metrics.render());
}

/// Random-walk NYSE frames published to the group with loopback enabled.
fn spawn_frame_generator(
    group: Ipv4Addr,
    port: u16,
    feeding: Arc<AtomicBool>,
) -> Result<std::thread::JoinHandle<()>> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).context("failed to bind sender")?;
    socket
        .set_multicast_loop_v4(true)
        .context("failed to enable multicast loopback")?;

    let handle = std::thread::Builder::new()
        .name("frame-generator".to_string())
        .spawn(move || {
            let mut rng = rand::thread_rng();
            let mut prices = [("AAPL", 150.0_f64), ("MSFT", 300.0), ("TSLA", 700.0)];

            while feeding.load(Ordering::Acquire) {
                for (symbol, price) in prices.iter_mut() {
                    *price = (*price + rng.gen_range(-0.2..0.2) * (*price / 150.0)).max(1.0);
                    let frame = encode_nyse_frame(symbol, *price);
                    let _ = socket.send_to(&frame, (group, port));
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        })?;
    Ok(handle)
}

/// NYSE layout: bid/ask/last at 0/8/16, sizes/volume/timestamp at 24..56,
/// NUL-terminated symbol at 56.
fn encode_nyse_frame(symbol: &str, last: f64) -> [u8; 72] {
    let mut frame = [0u8; 72];
    let half_spread = last * 0.0005;
    frame[0..8].copy_from_slice(&(last - half_spread).to_le_bytes());
    frame[8..16].copy_from_slice(&(last + half_spread).to_le_bytes());
    frame[16..24].copy_from_slice(&last.to_le_bytes());
    frame[24..32].copy_from_slice(&500i64.to_le_bytes());
    frame[32..40].copy_from_slice(&500i64.to_le_bytes());
    frame[40..48].copy_from_slice(&10_000i64.to_le_bytes());
    frame[48..56].copy_from_slice(&now_ns().to_le_bytes());
    let len = symbol.len().min(15);
    frame[56..56 + len].copy_from_slice(&symbol.as_bytes()[..len]);
    frame
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
