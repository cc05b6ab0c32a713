//! Wire types for trades (REST `recentTrades` + WS `trades` channel).

use crate::shared::{Coin, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One trade as sent by the venue. Prices and sizes arrive as strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WsTrade {
    pub coin: Coin,
    pub side: Side,
    pub px: Decimal,
    pub sz: Decimal,
    /// Milliseconds since epoch.
    pub time: i64,
    pub hash: String,
    pub tid: u64,
}

/// Info-endpoint query body.
#[derive(Debug, Clone, Serialize)]
pub struct RecentTradesRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coin: &'a Coin,
}
