//! Risk guardian service.
//!
//! Builds the pre-trade battery from CLI thresholds and runs a synthetic
//! order flow through it: approved orders update positions, rejections are
//! logged with their violations, and counters print periodically.

use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::Parser;
use rand::Rng;
use skew_bins::common::{init_logger, shutdown_flag};
use skew_core::core::Side;
use skew_core::risk::{Order, RiskGuardian};

#[derive(Parser, Debug)]
#[command(author, version, about = "Pre-trade risk validation service")]
struct Args {
    /// Initial portfolio NAV
    #[arg(long, default_value_t = 1_000_000.0)]
    nav: f64,

    /// Fat-finger cap as a fraction of ADV
    #[arg(long, default_value_t = 0.05)]
    max_adv_pct: f64,

    /// Drawdown limit as a fraction of start-of-day NAV
    #[arg(long, default_value_t = 0.05)]
    max_drawdown_pct: f64,

    /// Concentration limit as a fraction of NAV
    #[arg(long, default_value_t = 0.10)]
    max_concentration_pct: f64,

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

    tracing::info!("=== Skew Risk Guardian ===");

    let guardian = RiskGuardian::builder()
        .with_initial_nav(args.nav)
        .with_fat_finger_check(args.max_adv_pct)
        .with_drawdown_check(args.max_drawdown_pct)
        .with_concentration_check(args.max_concentration_pct)
        .build();

    guardian.set_adv("AAPL", 1_000_000.0);

    tracing::info!(
        "Guardian armed: nav={} adv_cap={}% drawdown={}% concentration={}%",
        args.nav,
        args.max_adv_pct * 100.0,
        args.max_drawdown_pct * 100.0,
        args.max_concentration_pct * 100.0
    );

    let running = shutdown_flag()?;
    let mut rng = rand::thread_rng();
    let mut order_count = 0u64;

    while running.load(Ordering::Acquire) {
        let order = Order {
            order_id: format!("order-{order_count}"),
            symbol: "AAPL".to_string(),
            quantity: rng.gen_range(100.0..600.0),
            side: if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell },
            price: 150.0 + rng.gen_range(0.0..10.0),
            timestamp_ns: now_ns(),
        };
        order_count += 1;

        let result = guardian.validate_order(&order);
        if result.approved {
            tracing::info!(
                "APPROVED {} {} {:.0} @ {:.2}",
                order.order_id,
                order.side,
                order.quantity,
                order.price
            );
            guardian.update_position(&order.symbol, order.signed_quantity(), order.price);
            let position = guardian.position_manager().get_position(&order.symbol);
            guardian.update_position_value(&order.symbol, position.quantity * order.price);
        } else {
            for violation in &result.violations {
                tracing::warn!("REJECTED {}: {}", order.order_id, violation);
            }
        }

        if order_count % 10 == 0 {
            let (positions, exposure) = guardian.position_manager().stats();
            tracing::info!(
                "validations={} approved={} rejected={} slow={} positions={} exposure={:.0}",
                guardian.validation_count(),
                guardian.approved_count(),
                guardian.rejected_count(),
                guardian.slow_validation_count(),
                positions,
                exposure
            );
        }

        std::thread::sleep(Duration::from_millis(500));
    }

    tracing::info!("Service stopped");
    Ok(())
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
