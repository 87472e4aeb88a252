//! Small shared enums used across the pipeline stages.
//!
//! All of these are single-byte enums: they travel inside every tick and
//! order, so size matters more than extensibility.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    /// Sign applied to an executed quantity for this side.
    #[inline]
    pub const fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Asset class of a tick's instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AssetType {
    Equity = 0,
    Future = 1,
    Option = 2,
    Unknown = 3,
}

impl AssetType {
    pub const fn as_str(self) -> &'static str {
        match self {
            AssetType::Equity => "EQUITY",
            AssetType::Future => "FUTURE",
            AssetType::Option => "OPTION",
            AssetType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source exchange of a market update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Exchange {
    Nyse = 0,
    Nasdaq = 1,
    Cme = 2,
    Unknown = 3,
}

impl Exchange {
    pub const fn as_str(self) -> &'static str {
        match self {
            Exchange::Nyse => "NYSE",
            Exchange::Nasdaq => "NASDAQ",
            Exchange::Cme => "CME",
            Exchange::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enums_are_single_byte() {
        assert_eq!(std::mem::size_of::<Side>(), 1);
        assert_eq!(std::mem::size_of::<AssetType>(), 1);
        assert_eq!(std::mem::size_of::<Exchange>(), 1);
    }

    #[test]
    fn test_side_sign() {
        assert_eq!(Side::Buy.sign(), 1.0);
        assert_eq!(Side::Sell.sign(), -1.0);
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(Exchange::Nyse.to_string(), "NYSE");
        assert_eq!(Exchange::Unknown.to_string(), "UNKNOWN");
        assert_eq!(AssetType::Equity.to_string(), "EQUITY");
        assert_eq!(Side::Sell.to_string(), "SELL");
    }
}
