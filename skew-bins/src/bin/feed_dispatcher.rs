//! Feed dispatcher service.
//!
//! Joins the configured multicast group, normalizes NYSE and NASDAQ frames,
//! and logs every decoded tick. Bind failures exit non-zero; per-packet
//! failures are silent drops counted in the stats line.

use std::net::Ipv4Addr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use skew_bins::common::{init_logger, shutdown_flag};
use skew_core::data::{FeedDispatcher, NasdaqNormalizer, Normalizer, NyseNormalizer};
use skew_core::Exchange;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multicast market data dispatcher")]
struct Args {
    /// Multicast group to join
    #[arg(short, long, default_value = "239.255.0.1")]
    group: Ipv4Addr,

    /// Multicast port
    #[arg(short, long, default_value_t = 12345)]
    port: u16,

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

    tracing::info!("=== Skew Feed Dispatcher ===");

    let dispatcher = FeedDispatcher::new(args.group, args.port);

    // The dispatcher holds these weakly; keep them alive for the run.
    let nyse: Arc<dyn Normalizer> = Arc::new(NyseNormalizer::new());
    let nasdaq: Arc<dyn Normalizer> = Arc::new(NasdaqNormalizer::new());
    dispatcher.register_normalizer(Exchange::Nyse, &nyse);
    dispatcher.register_normalizer(Exchange::Nasdaq, &nasdaq);

    dispatcher.register_callback(|tick| {
        tracing::info!(
            "{} {} bid={:.4} ask={:.4} last={:.4}",
            tick.exchange,
            tick.symbol,
            tick.bid,
            tick.ask,
            tick.last
        );
    });

    dispatcher.start()?;
    let tags: Vec<String> = dispatcher
        .registered_exchanges()
        .iter()
        .map(|e| e.to_string())
        .collect();
    tracing::info!(
        "Listening on {}:{} with normalizers [{}]",
        args.group,
        args.port,
        tags.join(", ")
    );

    let running = shutdown_flag()?;
    while running.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_secs(1));
        let (received, processed) = dispatcher.stats();
        if received > 0 {
            tracing::info!("Stats: received={} processed={}", received, processed);
        }
    }

    dispatcher.stop();
    tracing::info!("Service stopped");
    Ok(())
}
