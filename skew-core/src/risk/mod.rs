//! Pre-trade risk guardian.
//!
//! Every candidate order passes through the check battery under a
//! serializing mutex, so validation is atomic per order. The hot path has a
//! hard latency budget: exceeding [`MAX_VALIDATION_TIME_NS`] logs a warning
//! and bumps a counter but never fails the order. The budget is an
//! observability contract, not a correctness gate.

pub mod checks;
pub mod position;
pub mod types;

pub use checks::{
    CheckBattery, ConcentrationCheck, DrawdownCheck, FatFingerCheck, RiskCheck,
    DEFAULT_MAX_ADV_PCT, DEFAULT_MAX_CONCENTRATION_PCT, DEFAULT_MAX_DRAWDOWN_PCT,
};
pub use position::{Position, PositionManager};
pub use types::{Order, RiskCheckResult, Violation, ViolationKind};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::core::Side;

/// Per-order validation latency budget: 50 microseconds.
pub const MAX_VALIDATION_TIME_NS: u64 = 50_000;

/// Default portfolio NAV when the builder is not told otherwise.
pub const DEFAULT_INITIAL_NAV: f64 = 1_000_000.0;

/// Pre-trade gate and position authority.
pub struct RiskGuardian {
    positions: PositionManager,
    battery: CheckBattery,

    // Typed handles for feeding reference data into the battery members.
    fat_finger: Option<Arc<FatFingerCheck>>,
    drawdown: Option<Arc<DrawdownCheck>>,
    concentration: Option<Arc<ConcentrationCheck>>,

    validation_gate: Mutex<()>,
    validation_count: AtomicU64,
    approved_count: AtomicU64,
    rejected_count: AtomicU64,
    slow_validation_count: AtomicU64,

    market_prices: RwLock<HashMap<String, f64>>,
    initial_nav: f64,
}

impl RiskGuardian {
    pub fn builder() -> RiskGuardianBuilder {
        RiskGuardianBuilder::default()
    }

    /// Run the battery over one order. Counts every call, serializes the
    /// critical section, and measures the latency budget.
    pub fn validate_order(&self, order: &Order) -> RiskCheckResult {
        let started = Instant::now();
        self.validation_count.fetch_add(1, Ordering::Relaxed);

        let result = {
            let _gate = self.validation_gate.lock();
            self.battery.validate_all(order)
        };

        if result.approved {
            self.approved_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejected_count.fetch_add(1, Ordering::Relaxed);
            debug!("Order {} rejected: {}", order.order_id, result.reason());
        }

        let elapsed_ns = started.elapsed().as_nanos() as u64;
        if elapsed_ns > MAX_VALIDATION_TIME_NS {
            self.slow_validation_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Risk validation took {}ns, over the {}ns budget",
                elapsed_ns, MAX_VALIDATION_TIME_NS
            );
        }

        result
    }

    /// Convenience entry point when the caller has loose order parts.
    pub fn validate_order_parts(
        &self,
        symbol: &str,
        quantity: f64,
        side: Side,
        price: f64,
    ) -> RiskCheckResult {
        let timestamp_ns = now_ns();
        let order = Order {
            order_id: format!("adhoc-{timestamp_ns}"),
            symbol: symbol.to_string(),
            quantity,
            side,
            price,
            timestamp_ns,
        };
        self.validate_order(&order)
    }

    /// Apply an execution to the position book.
    pub fn update_position(&self, symbol: &str, executed_qty: f64, executed_price: f64) {
        self.positions.update_position(symbol, executed_qty, executed_price);
    }

    /// Record the latest mark for a symbol.
    pub fn update_market_price(&self, symbol: impl Into<String>, price: f64) {
        self.market_prices.write().insert(symbol.into(), price);
    }

    pub fn market_price(&self, symbol: &str) -> Option<f64> {
        self.market_prices.read().get(symbol).copied()
    }

    /// Feed ADV reference data to the fat-finger check, if armed.
    pub fn set_adv(&self, symbol: impl Into<String>, adv: f64) {
        if let Some(check) = &self.fat_finger {
            check.set_adv(symbol, adv);
        }
    }

    /// Feed the day's running PnL to the drawdown check, if armed.
    pub fn update_pnl(&self, current_pnl: f64) {
        if let Some(check) = &self.drawdown {
            check.update_pnl(current_pnl);
        }
    }

    pub fn update_start_of_day_nav(&self, nav: f64) {
        if let Some(check) = &self.drawdown {
            check.update_start_of_day_nav(nav);
        }
    }

    /// Feed NAV and held value to the concentration check, if armed.
    pub fn update_total_nav(&self, nav: f64) {
        if let Some(check) = &self.concentration {
            check.update_total_nav(nav);
        }
    }

    pub fn update_position_value(&self, symbol: impl Into<String>, value: f64) {
        if let Some(check) = &self.concentration {
            check.update_position_value(symbol, value);
        }
    }

    pub fn position_manager(&self) -> &PositionManager {
        &self.positions
    }

    pub fn initial_nav(&self) -> f64 {
        self.initial_nav
    }

    pub fn check_count(&self) -> usize {
        self.battery.len()
    }

    pub fn validation_count(&self) -> u64 {
        self.validation_count.load(Ordering::Relaxed)
    }

    pub fn approved_count(&self) -> u64 {
        self.approved_count.load(Ordering::Relaxed)
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }

    pub fn slow_validation_count(&self) -> u64 {
        self.slow_validation_count.load(Ordering::Relaxed)
    }
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// Assembles a guardian with a chosen subset of checks. A check that is not
/// added is absent from the battery, not merely disabled.
pub struct RiskGuardianBuilder {
    initial_nav: f64,
    fat_finger_pct: Option<f64>,
    drawdown_pct: Option<f64>,
    concentration_pct: Option<f64>,
}

impl Default for RiskGuardianBuilder {
    fn default() -> Self {
        Self {
            initial_nav: DEFAULT_INITIAL_NAV,
            fat_finger_pct: None,
            drawdown_pct: None,
            concentration_pct: None,
        }
    }
}

impl RiskGuardianBuilder {
    pub fn with_initial_nav(mut self, nav: f64) -> Self {
        self.initial_nav = nav;
        self
    }

    pub fn with_fat_finger_check(mut self, max_adv_pct: f64) -> Self {
        self.fat_finger_pct = Some(max_adv_pct);
        self
    }

    pub fn with_drawdown_check(mut self, max_drawdown_pct: f64) -> Self {
        self.drawdown_pct = Some(max_drawdown_pct);
        self
    }

    pub fn with_concentration_check(mut self, max_concentration_pct: f64) -> Self {
        self.concentration_pct = Some(max_concentration_pct);
        self
    }

    pub fn build(self) -> RiskGuardian {
        let mut battery = CheckBattery::new();

        let fat_finger = self.fat_finger_pct.map(|pct| {
            let check = Arc::new(FatFingerCheck::new(pct));
            battery.add_check(check.clone() as Arc<dyn RiskCheck>);
            check
        });

        let drawdown = self.drawdown_pct.map(|pct| {
            let check = Arc::new(DrawdownCheck::new(pct));
            check.update_start_of_day_nav(self.initial_nav);
            battery.add_check(check.clone() as Arc<dyn RiskCheck>);
            check
        });

        let concentration = self.concentration_pct.map(|pct| {
            let check = Arc::new(ConcentrationCheck::new(pct));
            check.update_total_nav(self.initial_nav);
            battery.add_check(check.clone() as Arc<dyn RiskCheck>);
            check
        });

        debug!(
            "Risk guardian built: nav={}, {} checks armed",
            self.initial_nav,
            battery.len()
        );

        RiskGuardian {
            positions: PositionManager::new(),
            battery,
            fat_finger,
            drawdown,
            concentration,
            validation_gate: Mutex::new(()),
            validation_count: AtomicU64::new(0),
            approved_count: AtomicU64::new(0),
            rejected_count: AtomicU64::new(0),
            slow_validation_count: AtomicU64::new(0),
            market_prices: RwLock::new(HashMap::new()),
            initial_nav: self.initial_nav,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(symbol: &str, quantity: f64, side: Side, price: f64) -> Order {
        Order {
            order_id: "o-1".to_string(),
            symbol: symbol.to_string(),
            quantity,
            side,
            price,
            timestamp_ns: 1,
        }
    }

    #[test]
    fn test_empty_battery_approves_everything() {
        let guardian = RiskGuardian::builder().build();
        assert_eq!(guardian.check_count(), 0);

        let result = guardian.validate_order(&order("AAPL", 1e9, Side::Buy, 150.0));
        assert!(result.approved);
        assert_eq!(guardian.validation_count(), 1);
        assert_eq!(guardian.approved_count(), 1);
        assert_eq!(guardian.rejected_count(), 0);
    }

    #[test]
    fn test_counters_track_outcomes() {
        let guardian = RiskGuardian::builder()
            .with_initial_nav(1_000_000.0)
            .with_fat_finger_check(0.05)
            .build();
        guardian.set_adv("AAPL", 1_000_000.0);

        guardian.validate_order(&order("AAPL", 40_000.0, Side::Buy, 1.0));
        guardian.validate_order(&order("AAPL", 60_000.0, Side::Buy, 1.0));

        assert_eq!(guardian.validation_count(), 2);
        assert_eq!(guardian.approved_count(), 1);
        assert_eq!(guardian.rejected_count(), 1);
    }

    #[test]
    fn test_builder_seeds_nav_into_checks() {
        let guardian = RiskGuardian::builder()
            .with_initial_nav(1_000_000.0)
            .with_concentration_check(0.10)
            .build();

        // 15% of the seeded NAV without any explicit update_total_nav call.
        let result = guardian.validate_order(&order("AAPL", 1_000.0, Side::Buy, 150.0));
        assert!(!result.approved);
        assert_eq!(result.violations[0].kind, ViolationKind::Concentration);
    }

    #[test]
    fn test_position_updates_flow_through() {
        let guardian = RiskGuardian::builder().build();
        guardian.update_position("AAPL", 100.0, 150.0);

        let position = guardian.position_manager().get_position("AAPL");
        assert_eq!(position.quantity, 100.0);
        assert_eq!(position.avg_cost, 150.0);
    }

    #[test]
    fn test_market_price_store() {
        let guardian = RiskGuardian::builder().build();
        assert_eq!(guardian.market_price("AAPL"), None);
        guardian.update_market_price("AAPL", 151.25);
        assert_eq!(guardian.market_price("AAPL"), Some(151.25));
    }

    #[test]
    fn test_validate_order_parts() {
        let guardian = RiskGuardian::builder()
            .with_initial_nav(1_000_000.0)
            .with_drawdown_check(0.05)
            .build();
        guardian.update_pnl(-60_000.0);

        assert!(!guardian.validate_order_parts("AAPL", 10.0, Side::Buy, 150.0).approved);
        assert!(guardian.validate_order_parts("AAPL", 10.0, Side::Sell, 150.0).approved);
    }
}
