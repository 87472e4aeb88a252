//! Exchange-specific frame decoders.
//!
//! Every exchange publishes a fixed binary layout: little-endian `f64` and
//! `i64` fields at known offsets, then a NUL-terminated symbol at offset 56.
//! A normalizer copies the fields out, stamps the exchange metadata, and
//! validates the result. Anything that fails to parse or validate is
//! reported as `None` and dropped by the caller.

use crate::core::{AssetType, Exchange};
use crate::data::constants::{MAX_SYMBOL_LEN, MIN_FRAME_LEN, SYMBOL_OFFSET};
use crate::data::types::CanonicalTick;

/// NYSE spread sanity cap: spread must not exceed 10% of the mid.
const NYSE_MAX_SPREAD_RATIO: f64 = 0.1;

/// Decodes one exchange's wire layout into [`CanonicalTick`]s.
pub trait Normalizer: Send + Sync {
    /// Exchange this normalizer decodes. Advisory metadata: dispatch is
    /// first-success-wins over the registration order, not tag-keyed.
    fn exchange(&self) -> Exchange;

    /// Decode a raw frame, or `None` when it is short, malformed, or fails
    /// validation.
    fn normalize(&self, frame: &[u8]) -> Option<CanonicalTick>;

    /// Structural and economic sanity shared by every layout.
    fn validate(&self, tick: &CanonicalTick) -> bool {
        tick.bid > 0.0 && tick.ask > 0.0 && tick.ask >= tick.bid
    }
}

#[inline]
fn read_f64(frame: &[u8], offset: usize) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&frame[offset..offset + 8]);
    f64::from_le_bytes(buf)
}

#[inline]
fn read_i64(frame: &[u8], offset: usize) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&frame[offset..offset + 8]);
    i64::from_le_bytes(buf)
}

/// Symbol field: NUL-terminated, truncated to [`MAX_SYMBOL_LEN`] bytes.
fn read_symbol(frame: &[u8]) -> String {
    let end = frame.len().min(SYMBOL_OFFSET + MAX_SYMBOL_LEN);
    let raw = &frame[SYMBOL_OFFSET..end];
    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..len]).into_owned()
}

/// NYSE layout: bid/ask/last doubles at 0/8/16, bid_size/ask_size/volume/
/// timestamp at 24/32/40/48.
#[derive(Debug, Default)]
pub struct NyseNormalizer;

impl NyseNormalizer {
    pub fn new() -> Self {
        Self
    }
}

impl Normalizer for NyseNormalizer {
    fn exchange(&self) -> Exchange {
        Exchange::Nyse
    }

    fn normalize(&self, frame: &[u8]) -> Option<CanonicalTick> {
        if frame.len() < MIN_FRAME_LEN {
            return None;
        }

        let tick = CanonicalTick {
            bid: read_f64(frame, 0),
            ask: read_f64(frame, 8),
            last: read_f64(frame, 16),
            bid_size: read_i64(frame, 24),
            ask_size: read_i64(frame, 32),
            volume: read_i64(frame, 40),
            timestamp_ns: read_i64(frame, 48),
            symbol: read_symbol(frame),
            asset_type: AssetType::Equity,
            exchange: Exchange::Nyse,
        };

        self.validate(&tick).then_some(tick)
    }

    fn validate(&self, tick: &CanonicalTick) -> bool {
        if !(tick.bid > 0.0 && tick.ask > 0.0 && tick.ask >= tick.bid) {
            return false;
        }
        // A spread past 10% of mid is bad data, not a market.
        tick.spread() <= tick.mid() * NYSE_MAX_SPREAD_RATIO
    }
}

/// NASDAQ layout: last/bid/ask doubles at 0/8/16, volume/bid_size/ask_size/
/// timestamp at 24/32/40/48. Base validation only.
#[derive(Debug, Default)]
pub struct NasdaqNormalizer;

impl NasdaqNormalizer {
    pub fn new() -> Self {
        Self
    }
}

impl Normalizer for NasdaqNormalizer {
    fn exchange(&self) -> Exchange {
        Exchange::Nasdaq
    }

    fn normalize(&self, frame: &[u8]) -> Option<CanonicalTick> {
        if frame.len() < MIN_FRAME_LEN {
            return None;
        }

        let tick = CanonicalTick {
            last: read_f64(frame, 0),
            bid: read_f64(frame, 8),
            ask: read_f64(frame, 16),
            volume: read_i64(frame, 24),
            bid_size: read_i64(frame, 32),
            ask_size: read_i64(frame, 40),
            timestamp_ns: read_i64(frame, 48),
            symbol: read_symbol(frame),
            asset_type: AssetType::Equity,
            exchange: Exchange::Nasdaq,
        };

        self.validate(&tick).then_some(tick)
    }
}
