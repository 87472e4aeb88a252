//! Order and risk-decision value types.
//!
//! Rejections are decisions, not errors: a failed check produces a
//! [`Violation`] value that rides back to the caller inside a
//! [`RiskCheckResult`]. Nothing in this module is an `Err`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Side;

/// Candidate order presented to the pre-trade battery.
///
/// Quantity is unsigned-in-spirit; the side carries the sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub symbol: String,
    pub quantity: f64,
    pub side: Side,
    pub price: f64,
    pub timestamp_ns: i64,
}

impl Order {
    /// Notional value of the order.
    #[inline]
    pub fn value(&self) -> f64 {
        (self.quantity * self.price).abs()
    }

    /// Quantity signed by side.
    #[inline]
    pub fn signed_quantity(&self) -> f64 {
        self.quantity * self.side.sign()
    }
}

/// Which check rejected an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    FatFinger,
    Drawdown,
    Concentration,
    PositionLimit,
}

impl ViolationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ViolationKind::FatFinger => "FAT_FINGER",
            ViolationKind::Drawdown => "DRAWDOWN",
            ViolationKind::Concentration => "CONCENTRATION",
            ViolationKind::PositionLimit => "POSITION_LIMIT",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single check's rejection, with its human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub reason: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

/// Outcome of running the full battery over one order.
///
/// Violations accumulate: several checks may reject the same order and
/// every reason is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCheckResult {
    pub approved: bool,
    pub violations: Vec<Violation>,
}

impl RiskCheckResult {
    pub fn approved() -> Self {
        Self {
            approved: true,
            violations: Vec::new(),
        }
    }

    pub fn add_violation(&mut self, violation: Violation) {
        self.approved = false;
        self.violations.push(violation);
    }

    /// All rejection reasons joined with `"; "`; empty when approved.
    pub fn reason(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.reason.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Default for RiskCheckResult {
    fn default() -> Self {
        Self::approved()
    }
}
