//! Explorer domain: blocks and transactions streamed from the explorer
//! socket on a single connection.

pub mod client;
pub mod state;
pub mod wire;

use crate::ws::feed::decode;
use crate::ws::{Envelope, Feed, Subscription};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use state::ExplorerView;
use wire::{WsBlock, WsTx};

pub const DEFAULT_BLOCK_CAPACITY: usize = 50;
pub const DEFAULT_TX_CAPACITY: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub height: u64,
    pub time: DateTime<Utc>,
    pub hash: String,
    pub proposer: String,
    pub tx_count: u32,
}

impl From<WsBlock> for Block {
    fn from(b: WsBlock) -> Self {
        Self {
            height: b.height,
            time: super::millis_to_datetime(b.block_time).unwrap_or_default(),
            hash: b.hash,
            proposer: b.proposer,
            tx_count: b.num_txs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub hash: String,
    pub block: u64,
    pub time: DateTime<Utc>,
    pub user: String,
    /// Action `type` tag, e.g. `"order"` or `"cancel"`.
    pub action_type: String,
    pub action: Value,
    pub error: Option<String>,
}

impl Transaction {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

impl From<WsTx> for Transaction {
    fn from(t: WsTx) -> Self {
        let action_type = t
            .action
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        Self {
            hash: t.hash,
            block: t.block,
            time: super::millis_to_datetime(t.time).unwrap_or_default(),
            user: t.user,
            action_type,
            action: t.action,
            error: t.error,
        }
    }
}

/// Blocks and transactions on one explorer socket.
#[derive(Debug, Clone, Copy)]
pub struct ExplorerFeed {
    block_capacity: usize,
    tx_capacity: usize,
}

impl ExplorerFeed {
    pub fn new(block_capacity: usize, tx_capacity: usize) -> Self {
        Self {
            block_capacity,
            tx_capacity,
        }
    }
}

impl Default for ExplorerFeed {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_CAPACITY, DEFAULT_TX_CAPACITY)
    }
}

impl Feed for ExplorerFeed {
    type Params = ();
    type View = ExplorerView;

    fn name(&self) -> &'static str {
        "explorer"
    }

    fn subscriptions(&self, _: &()) -> Vec<Subscription> {
        vec![Subscription::ExplorerBlock, Subscription::ExplorerTxs]
    }

    fn initial_view(&self, _: &()) -> ExplorerView {
        ExplorerView::new(self.block_capacity, self.tx_capacity)
    }

    fn route(&self, _: &(), envelope: &Envelope, view: &mut ExplorerView) -> bool {
        match envelope.channel.as_str() {
            "explorerBlock" => decode::<Vec<WsBlock>>(self.name(), envelope)
                .map(|blocks| view.apply_blocks(blocks.into_iter().map(Block::from).collect()) > 0)
                .unwrap_or(false),
            "explorerTxs" => decode::<Vec<WsTx>>(self.name(), envelope)
                .map(|txs| view.apply_txs(txs.into_iter().map(Transaction::from).collect()) > 0)
                .unwrap_or(false),
            _ => false,
        }
    }
}
