//! Authoritative position book.
//!
//! Positions live behind a reader-writer lock keyed by symbol. Readers get
//! value snapshots; the manager is the only writer. Average cost follows
//! the standard law: for an execution of `dq` at `p` onto quantity `q`,
//! `avg' = (q * avg + dq * p) / (q + dq)` unless the position flattens to
//! zero, which resets the average.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Holding in a single symbol, tracked at average cost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub avg_cost: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
}

impl Position {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    /// Notional exposure of this holding.
    #[inline]
    pub fn exposure(&self) -> f64 {
        (self.quantity * self.avg_cost).abs()
    }
}

/// Symbol-keyed position store.
#[derive(Default)]
pub struct PositionManager {
    positions: RwLock<HashMap<String, Position>>,
}

impl PositionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a symbol's position, creating an empty one on first
    /// access.
    pub fn get_position(&self, symbol: &str) -> Position {
        if let Some(position) = self.positions.read().get(symbol) {
            return position.clone();
        }
        self.positions
            .write()
            .entry(symbol.to_string())
            .or_insert_with(|| Position::new(symbol))
            .clone()
    }

    /// Apply an execution of `quantity` at `price`, updating average cost.
    pub fn update_position(&self, symbol: &str, quantity: f64, price: f64) {
        let mut positions = self.positions.write();
        let position = positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position::new(symbol));

        let old_quantity = position.quantity;
        let new_quantity = old_quantity + quantity;

        if new_quantity != 0.0 {
            position.avg_cost =
                (old_quantity * position.avg_cost + quantity * price) / new_quantity;
        } else {
            position.avg_cost = 0.0;
        }
        position.quantity = new_quantity;
    }

    /// Value snapshot of every tracked position.
    pub fn all_positions(&self) -> Vec<Position> {
        self.positions.read().values().cloned().collect()
    }

    /// Sum of `|quantity * avg_cost|` across the book.
    pub fn total_exposure(&self) -> f64 {
        self.positions.read().values().map(Position::exposure).sum()
    }

    /// `(num_positions, total_exposure)` snapshot.
    pub fn stats(&self) -> (usize, f64) {
        let positions = self.positions.read();
        let exposure = positions.values().map(Position::exposure).sum();
        (positions.len(), exposure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fill_sets_cost_basis() {
        let manager = PositionManager::new();
        manager.update_position("AAPL", 100.0, 150.0);

        let position = manager.get_position("AAPL");
        assert_eq!(position.quantity, 100.0);
        assert_eq!(position.avg_cost, 150.0);
    }

    #[test]
    fn test_average_cost_blends() {
        let manager = PositionManager::new();
        manager.update_position("AAPL", 100.0, 150.0);
        manager.update_position("AAPL", 100.0, 160.0);

        let position = manager.get_position("AAPL");
        assert_eq!(position.quantity, 200.0);
        assert_eq!(position.avg_cost, 155.0);
    }

    #[test]
    fn test_flatten_resets_cost() {
        let manager = PositionManager::new();
        manager.update_position("AAPL", 100.0, 150.0);
        manager.update_position("AAPL", -100.0, 170.0);

        let position = manager.get_position("AAPL");
        assert_eq!(position.quantity, 0.0);
        assert_eq!(position.avg_cost, 0.0);
    }

    #[test]
    fn test_lazy_creation() {
        let manager = PositionManager::new();
        let position = manager.get_position("TSLA");
        assert_eq!(position.symbol, "TSLA");
        assert_eq!(position.quantity, 0.0);
        assert_eq!(manager.stats().0, 1);
    }

    #[test]
    fn test_total_exposure_sums_absolutes() {
        let manager = PositionManager::new();
        manager.update_position("AAPL", 100.0, 150.0); // 15_000 long
        manager.update_position("TSLA", -50.0, 200.0); // 10_000 short

        assert!((manager.total_exposure() - 25_000.0).abs() < 1e-9);
        let (count, exposure) = manager.stats();
        assert_eq!(count, 2);
        assert!((exposure - 25_000.0).abs() < 1e-9);
    }
}
