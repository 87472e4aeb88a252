//! Canonical market update, independent of exchange wire format.

use serde::{Deserialize, Serialize};

use crate::core::{AssetType, Exchange};

/// Normalized top-of-book update.
///
/// Constructed inside a normalizer, owned briefly by the dispatcher, then
/// copied per consumer. Normalizers guarantee `bid > 0`, `ask > 0` and
/// `ask >= bid` on every tick they emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTick {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub bid_size: i64,
    pub ask_size: i64,
    pub volume: i64,
    pub timestamp_ns: i64,
    pub asset_type: AssetType,
    pub exchange: Exchange,
}

impl CanonicalTick {
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    #[inline]
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(bid: f64, ask: f64) -> CanonicalTick {
        CanonicalTick {
            symbol: "AAPL".to_string(),
            bid,
            ask,
            last: (bid + ask) / 2.0,
            bid_size: 100,
            ask_size: 100,
            volume: 1_000,
            timestamp_ns: 1,
            asset_type: AssetType::Equity,
            exchange: Exchange::Nyse,
        }
    }

    #[test]
    fn test_mid_and_spread() {
        let t = tick(99.0, 101.0);
        assert_eq!(t.mid(), 100.0);
        assert_eq!(t.spread(), 2.0);
    }
}
