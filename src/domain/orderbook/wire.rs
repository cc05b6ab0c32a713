//! Wire types for L2 order books (REST `l2Book` + WS `l2Book` channel).

use crate::shared::Coin;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WsLevel {
    pub px: Decimal,
    pub sz: Decimal,
    /// Number of resting orders at this level.
    pub n: u32,
}

/// Full book snapshot. `levels` is `[bids, asks]`, each best-first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WsBook {
    pub coin: Coin,
    pub time: i64,
    pub levels: (Vec<WsLevel>, Vec<WsLevel>),
}

#[derive(Debug, Clone, Serialize)]
pub struct L2BookRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coin: &'a Coin,
    #[serde(rename = "nSigFigs", skip_serializing_if = "Option::is_none")]
    pub n_sig_figs: Option<u32>,
}
