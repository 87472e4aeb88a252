//! Shared constructors for strategy tests.

use skew_core::core::{AssetType, Exchange};
use skew_core::data::CanonicalTick;

/// A valid canonical tick around `last` with a one-cent half-spread.
pub fn tick(symbol: &str, last: f64, timestamp_ns: i64) -> CanonicalTick {
    CanonicalTick {
        symbol: symbol.to_string(),
        bid: last - 0.01,
        ask: last + 0.01,
        last,
        bid_size: 100,
        ask_size: 100,
        volume: 10_000,
        timestamp_ns,
        asset_type: AssetType::Equity,
        exchange: Exchange::Nyse,
    }
}
