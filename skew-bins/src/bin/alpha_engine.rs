//! Alpha engine service.
//!
//! Populates the engine with mean-reversion and momentum strategies and
//! drives them with a synthetic random-walk feed, logging emitted signals
//! and periodic stats. In deployment the feed callback would be wired to
//! the dispatcher's canonical tick stream instead.

use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::Parser;
use rand::Rng;
use skew_alphas::{MeanReversionAlpha, MomentumAlpha};
use skew_bins::common::{init_logger, pin_to_core, shutdown_flag};
use skew_core::core::{AssetType, Exchange};
use skew_core::data::CanonicalTick;
use skew_core::engine::AlphaEngine;

#[derive(Parser, Debug)]
#[command(author, version, about = "Alpha strategy fan-out engine")]
struct Args {
    /// Worker threads in the strategy pool
    #[arg(short, long, default_value_t = 8)]
    workers: usize,

    /// Mean-reversion strategies to register
    #[arg(long, default_value_t = 100)]
    mean_reversion: usize,

    /// Momentum strategies to register
    #[arg(long, default_value_t = 100)]
    momentum: usize,

    /// CPU core to pin the feed thread to
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

    tracing::info!("=== Skew Alpha Engine ===");
    pin_to_core(args.cpu_core);

    let engine = AlphaEngine::new(args.workers);

    for i in 0..args.mean_reversion {
        engine.add_alpha(Box::new(MeanReversionAlpha::with_default_window(format!(
            "mean-reversion-{i}"
        ))));
    }
    for i in 0..args.momentum {
        engine.add_alpha(Box::new(MomentumAlpha::with_default_lookback(format!(
            "momentum-{i}"
        ))));
    }

    engine.register_signal_callback(|signal| {
        tracing::debug!(
            "signal {} {} value={:.4} confidence={:.4}",
            signal.alpha_id,
            signal.symbol,
            signal.signal,
            signal.confidence
        );
    });

    engine.start();
    let (num_alphas, _) = engine.stats();
    tracing::info!("Engine running with {} alphas on {} workers", num_alphas, args.workers);

    let running = shutdown_flag()?;
    let mut rng = rand::thread_rng();
    let mut price = 150.0_f64;
    let mut tick_count = 0u64;

    while running.load(Ordering::Acquire) {
        price = (price + rng.gen_range(-0.5..0.5)).max(1.0);
        engine.process_tick(&synthetic_tick("AAPL", price));

        tick_count += 1;
        if tick_count % 100 == 0 {
            let (alphas, signals) = engine.stats();
            tracing::info!(
                "Processed {} ticks, {} alphas, {} signals, {} queued",
                tick_count,
                alphas,
                signals,
                engine.queued_tasks()
            );
        }

        std::thread::sleep(Duration::from_millis(10));
    }

    engine.stop();
    tracing::info!("Service stopped");
    Ok(())
}

fn synthetic_tick(symbol: &str, last: f64) -> CanonicalTick {
    let spread = last * 0.0005;
    CanonicalTick {
        symbol: symbol.to_string(),
        bid: last - spread,
        ask: last + spread,
        last,
        bid_size: 500,
        ask_size: 500,
        volume: 10_000,
        timestamp_ns: now_ns(),
        asset_type: AssetType::Equity,
        exchange: Exchange::Nyse,
    }
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
