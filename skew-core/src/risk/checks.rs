//! Pre-trade check battery.
//!
//! Each check holds its own reference data behind a short-held lock and can
//! be toggled at runtime. `validate` is read-only with respect to the order;
//! a rejection returns the violation as a value.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::core::Side;
use crate::risk::types::{Order, RiskCheckResult, Violation, ViolationKind};

/// Default fat-finger cap: 5% of a symbol's average daily volume.
pub const DEFAULT_MAX_ADV_PCT: f64 = 0.05;

/// Default drawdown limit: 5% of start-of-day NAV.
pub const DEFAULT_MAX_DRAWDOWN_PCT: f64 = 0.05;

/// Default concentration limit: 10% of NAV in one symbol.
pub const DEFAULT_MAX_CONCENTRATION_PCT: f64 = 0.10;

/// One member of the pre-trade battery.
pub trait RiskCheck: Send + Sync {
    fn name(&self) -> &'static str;

    /// Accept (`Ok`) or reject (`Err`) the order. Checks without the
    /// reference data they need accept: absence of data is not a violation.
    fn validate(&self, order: &Order) -> Result<(), Violation>;

    fn is_enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
}

/// Rejects orders larger than a fraction of the symbol's ADV.
pub struct FatFingerCheck {
    max_adv_pct: f64,
    adv: RwLock<HashMap<String, f64>>,
    enabled: AtomicBool,
}

impl FatFingerCheck {
    pub fn new(max_adv_pct: f64) -> Self {
        Self {
            max_adv_pct,
            adv: RwLock::new(HashMap::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Set the average daily volume used to cap order size for a symbol.
    pub fn set_adv(&self, symbol: impl Into<String>, adv: f64) {
        self.adv.write().insert(symbol.into(), adv);
    }
}

impl RiskCheck for FatFingerCheck {
    fn name(&self) -> &'static str {
        "FatFingerCheck"
    }

    fn validate(&self, order: &Order) -> Result<(), Violation> {
        let Some(adv) = self.adv.read().get(&order.symbol).copied() else {
            return Ok(());
        };

        let max_quantity = adv * self.max_adv_pct;
        if order.quantity.abs() > max_quantity {
            return Err(Violation::new(
                ViolationKind::FatFinger,
                format!(
                    "order quantity {} exceeds {:.1}% of ADV (max {})",
                    order.quantity,
                    self.max_adv_pct * 100.0,
                    max_quantity
                ),
            ));
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DrawdownState {
    start_of_day_nav: f64,
    current_pnl: f64,
}

/// Blocks new buys once the day's loss breaches the drawdown limit.
/// Sells stay permitted: reducing risk is always allowed.
pub struct DrawdownCheck {
    max_drawdown_pct: f64,
    state: RwLock<DrawdownState>,
    enabled: AtomicBool,
}

impl DrawdownCheck {
    pub fn new(max_drawdown_pct: f64) -> Self {
        Self {
            max_drawdown_pct,
            state: RwLock::new(DrawdownState::default()),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn update_pnl(&self, current_pnl: f64) {
        self.state.write().current_pnl = current_pnl;
    }

    pub fn update_start_of_day_nav(&self, nav: f64) {
        self.state.write().start_of_day_nav = nav;
    }
}

impl RiskCheck for DrawdownCheck {
    fn name(&self) -> &'static str {
        "DrawdownCheck"
    }

    fn validate(&self, order: &Order) -> Result<(), Violation> {
        let state = *self.state.read();
        if state.start_of_day_nav <= 0.0 {
            return Ok(());
        }

        let drawdown = -state.current_pnl / state.start_of_day_nav;
        if drawdown > self.max_drawdown_pct && order.side == Side::Buy {
            return Err(Violation::new(
                ViolationKind::Drawdown,
                format!(
                    "strategy is in {:.2}% drawdown, exceeds limit of {:.2}%",
                    drawdown * 100.0,
                    self.max_drawdown_pct * 100.0
                ),
            ));
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

#[derive(Debug, Default)]
struct ConcentrationState {
    position_values: HashMap<String, f64>,
    total_nav: f64,
}

/// Rejects orders that would concentrate too much NAV in one symbol.
pub struct ConcentrationCheck {
    max_concentration_pct: f64,
    state: RwLock<ConcentrationState>,
    enabled: AtomicBool,
}

impl ConcentrationCheck {
    pub fn new(max_concentration_pct: f64) -> Self {
        Self {
            max_concentration_pct,
            state: RwLock::new(ConcentrationState::default()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Record the current market value held in a symbol.
    pub fn update_position_value(&self, symbol: impl Into<String>, value: f64) {
        self.state.write().position_values.insert(symbol.into(), value);
    }

    pub fn update_total_nav(&self, nav: f64) {
        self.state.write().total_nav = nav;
    }
}

impl RiskCheck for ConcentrationCheck {
    fn name(&self) -> &'static str {
        "ConcentrationCheck"
    }

    fn validate(&self, order: &Order) -> Result<(), Violation> {
        let state = self.state.read();
        if state.total_nav <= 0.0 {
            return Ok(());
        }

        let current_value = state
            .position_values
            .get(&order.symbol)
            .copied()
            .unwrap_or(0.0);
        let new_value = current_value + order.signed_quantity() * order.price;
        let concentration = new_value.abs() / state.total_nav;

        if concentration > self.max_concentration_pct {
            return Err(Violation::new(
                ViolationKind::Concentration,
                format!(
                    "order would put {:.2}% of NAV in {}, exceeds limit of {:.2}%",
                    concentration * 100.0,
                    order.symbol,
                    self.max_concentration_pct * 100.0
                ),
            ));
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

/// Ordered battery of checks; a single rejection fails the order but every
/// enabled check still runs so all violations are reported.
#[derive(Default)]
pub struct CheckBattery {
    checks: Vec<Arc<dyn RiskCheck>>,
}

impl CheckBattery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_check(&mut self, check: Arc<dyn RiskCheck>) {
        debug!("Battery armed with {}", check.name());
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn validate_all(&self, order: &Order) -> RiskCheckResult {
        let mut result = RiskCheckResult::approved();
        for check in &self.checks {
            if !check.is_enabled() {
                continue;
            }
            if let Err(violation) = check.validate(order) {
                result.add_violation(violation);
            }
        }
        result
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
    fn test_fat_finger_without_adv_accepts() {
        let check = FatFingerCheck::new(DEFAULT_MAX_ADV_PCT);
        assert!(check.validate(&order("AAPL", 1e9, Side::Buy, 150.0)).is_ok());
    }

    #[test]
    fn test_fat_finger_cap() {
        let check = FatFingerCheck::new(0.05);
        check.set_adv("AAPL", 1_000_000.0);

        assert!(check.validate(&order("AAPL", 40_000.0, Side::Buy, 150.0)).is_ok());

        let err = check
            .validate(&order("AAPL", 60_000.0, Side::Buy, 150.0))
            .unwrap_err();
        assert_eq!(err.kind, ViolationKind::FatFinger);
        assert!(err.reason.contains("60000"));
        assert!(err.reason.contains("5.0%"));
        assert!(err.reason.contains("50000"));
    }

    #[test]
    fn test_drawdown_blocks_buys_only() {
        let check = DrawdownCheck::new(0.05);
        check.update_start_of_day_nav(1_000_000.0);
        check.update_pnl(-60_000.0);

        let err = check.validate(&order("AAPL", 10.0, Side::Buy, 150.0)).unwrap_err();
        assert_eq!(err.kind, ViolationKind::Drawdown);
        assert!(check.validate(&order("AAPL", 10.0, Side::Sell, 150.0)).is_ok());
    }

    #[test]
    fn test_drawdown_without_nav_accepts() {
        let check = DrawdownCheck::new(0.05);
        check.update_pnl(-1e12);
        assert!(check.validate(&order("AAPL", 10.0, Side::Buy, 150.0)).is_ok());
    }

    #[test]
    fn test_concentration_limit() {
        let check = ConcentrationCheck::new(0.10);
        check.update_total_nav(1_000_000.0);

        // 1000 * 150 = 150k = 15% of NAV
        let err = check
            .validate(&order("AAPL", 1_000.0, Side::Buy, 150.0))
            .unwrap_err();
        assert_eq!(err.kind, ViolationKind::Concentration);

        // 500 * 150 = 75k = 7.5%
        assert!(check.validate(&order("AAPL", 500.0, Side::Buy, 150.0)).is_ok());
    }

    #[test]
    fn test_concentration_counts_existing_position() {
        let check = ConcentrationCheck::new(0.10);
        check.update_total_nav(1_000_000.0);
        check.update_position_value("AAPL", 90_000.0);

        // 90k held + 100 * 150 = 105k = 10.5%
        assert!(check.validate(&order("AAPL", 100.0, Side::Buy, 150.0)).is_err());
        // A sell reduces the position value and passes.
        assert!(check.validate(&order("AAPL", 100.0, Side::Sell, 150.0)).is_ok());
    }

    #[test]
    fn test_disabled_check_skipped() {
        let fat_finger = Arc::new(FatFingerCheck::new(0.05));
        fat_finger.set_adv("AAPL", 1_000.0);
        fat_finger.set_enabled(false);

        let mut battery = CheckBattery::new();
        battery.add_check(fat_finger.clone());

        let result = battery.validate_all(&order("AAPL", 1e6, Side::Buy, 150.0));
        assert!(result.approved);

        fat_finger.set_enabled(true);
        let result = battery.validate_all(&order("AAPL", 1e6, Side::Buy, 150.0));
        assert!(!result.approved);
    }

    #[test]
    fn test_battery_accumulates_all_violations() {
        let fat_finger = Arc::new(FatFingerCheck::new(0.05));
        fat_finger.set_adv("AAPL", 1_000.0);
        let drawdown = Arc::new(DrawdownCheck::new(0.05));
        drawdown.update_start_of_day_nav(1_000_000.0);
        drawdown.update_pnl(-100_000.0);

        let mut battery = CheckBattery::new();
        battery.add_check(fat_finger);
        battery.add_check(drawdown);

        let result = battery.validate_all(&order("AAPL", 10_000.0, Side::Buy, 150.0));
        assert!(!result.approved);
        assert_eq!(result.violations.len(), 2);
        assert_eq!(result.violations[0].kind, ViolationKind::FatFinger);
        assert_eq!(result.violations[1].kind, ViolationKind::Drawdown);
    }
}
