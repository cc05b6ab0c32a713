//! Wire types for explorer blocks and transactions (WS `explorerBlock` /
//! `explorerTxs`, and the backend's REST mirrors of the same records).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WsBlock {
    pub height: u64,
    /// Milliseconds since epoch.
    pub block_time: i64,
    pub hash: String,
    pub proposer: String,
    pub num_txs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WsTx {
    /// Action payload; its `type` field names the action.
    pub action: Value,
    pub block: u64,
    #[serde(default)]
    pub error: Option<String>,
    pub hash: String,
    pub time: i64,
    pub user: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchWalletRequest<'a> {
    pub address: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedWallet {
    pub address: String,
    #[serde(default)]
    pub label: Option<String>,
}
