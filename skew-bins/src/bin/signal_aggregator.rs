//! Signal aggregator service.
//!
//! Reads `AlphaSignal` JSON lines from stdin (the inter-service channel is
//! an ordered best-effort stream, so a pipe models it faithfully), expires
//! stale signals, and prints the target portfolio as JSON on an interval.

use std::io::BufRead;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use skew_bins::common::{init_logger, shutdown_flag};
use skew_core::aggregator::{
    AggregationPolicy, Median, SignalAggregator, WeightedAverage, SIGNAL_EXPIRY_NS,
};
use skew_core::core::AlphaSignal;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    WeightedAverage,
    Median,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Alpha signal aggregation service")]
struct Args {
    /// Aggregation policy
    #[arg(long, value_enum, default_value = "weighted-average")]
    policy: Policy,

    /// Seconds between portfolio snapshots
    #[arg(long, default_value_t = 5)]
    portfolio_interval_secs: u64,

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

    tracing::info!("=== Skew Signal Aggregator ===");

    let policy: Box<dyn AggregationPolicy> = match args.policy {
        Policy::WeightedAverage => Box::new(WeightedAverage),
        Policy::Median => Box::new(Median),
    };
    let aggregator = Arc::new(SignalAggregator::new(policy));
    tracing::info!("Aggregating with {} policy", aggregator.policy_name());

    let running = shutdown_flag()?;

    // Signal intake off stdin; drops malformed lines the way the feed drops
    // malformed frames.
    let intake = {
        let aggregator = aggregator.clone();
        let running = running.clone();
        std::thread::Builder::new()
            .name("signal-intake".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    if !running.load(Ordering::Acquire) {
                        break;
                    }
                    let Ok(line) = line else { break };
                    match serde_json::from_str::<AlphaSignal>(&line) {
                        Ok(signal) => aggregator.add_signal(signal),
                        Err(e) => tracing::debug!("Dropping malformed signal line: {}", e),
                    }
                }
                tracing::info!("Signal intake closed");
            })?
    };

    let interval = Duration::from_secs(args.portfolio_interval_secs);
    while running.load(Ordering::Acquire) {
        std::thread::sleep(interval);

        aggregator.clear_older_than(now_ns() - SIGNAL_EXPIRY_NS);

        let portfolio = aggregator.target_portfolio();
        let (symbols, buffered) = aggregator.stats();
        tracing::info!("{} symbols, {} buffered signals", symbols, buffered);

        for target in &portfolio {
            match serde_json::to_string(target) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!("Failed to encode target: {}", e),
            }
        }
    }

    drop(intake);
    tracing::info!("Service stopped");
    Ok(())
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
