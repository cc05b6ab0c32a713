//! Shared newtypes and utilities used across all domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize
//! identically to the raw format the venues send.

pub mod buffer;

pub use buffer::BoundedBuffer;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ─── Coin ────────────────────────────────────────────────────────────────────

/// Asset symbol as the venue names it (e.g. `"HYPE"`, `"BTC"`, `"@107"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coin(String);

impl Coin {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Coin {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Coin {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Serialize for Coin {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Coin {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Coin(s))
    }
}

// ─── Side ────────────────────────────────────────────────────────────────────

/// Trade side as sent on the wire: `"B"` (buy/bid) or `"A"` (sell/ask).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "B")]
    Bid,
    #[serde(rename = "A")]
    Ask,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Side::Bid => write!(f, "Buy"),
            Side::Ask => write!(f, "Sell"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_serde_transparent() {
        let coin: Coin = serde_json::from_str("\"HYPE\"").unwrap();
        assert_eq!(coin.as_str(), "HYPE");
        assert_eq!(serde_json::to_string(&coin).unwrap(), "\"HYPE\"");
    }

    #[test]
    fn test_side_wire_codes() {
        let side: Side = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(side, Side::Ask);
        assert_eq!(serde_json::to_string(&Side::Bid).unwrap(), "\"B\"");
    }
}
