//! Explorer sub-client: block and transaction lookups, watched wallets.

use super::wire::{WatchWalletRequest, WatchedWallet, WsBlock, WsTx};
use super::{Block, ExplorerFeed, Transaction};
use crate::cache::RequestDescriptor;
use crate::client::SyncClient;
use crate::error::SyncError;
use crate::http::{RequestConfig, RequestOptions};
use crate::ws::StreamChannel;
use std::sync::Arc;

pub const EXPLORER_CHANNEL: &str = "explorer";

const WALLETS_PATH: &str = "/api/wallets";

pub struct Explorer<'a> {
    pub(crate) client: &'a SyncClient,
}

impl<'a> Explorer<'a> {
    pub async fn recent_blocks(&self, limit: u32) -> Result<Vec<Block>, SyncError> {
        let limit = limit.to_string();
        let blocks: Vec<WsBlock> = self
            .client
            .http()
            .get("/api/blocks", &[("limit", limit.as_str())])
            .await?;
        Ok(blocks.into_iter().map(Block::from).collect())
    }

    pub async fn block(&self, height: u64) -> Result<Block, SyncError> {
        let path = format!("/api/blocks/{height}");
        let block: WsBlock = self.client.http().get(&path, &[]).await?;
        Ok(block.into())
    }

    pub async fn transaction(&self, hash: &str) -> Result<Transaction, SyncError> {
        let path = format!("/api/txs/{}", urlencoding::encode(hash));
        let tx: WsTx = self.client.http().get(&path, &[]).await?;
        Ok(tx.into())
    }

    pub async fn user_transactions(&self, address: &str) -> Result<Vec<Transaction>, SyncError> {
        let path = format!("/api/users/{}/txs", urlencoding::encode(address));
        let txs: Vec<WsTx> = self.client.http().get(&path, &[]).await?;
        Ok(txs.into_iter().map(Transaction::from).collect())
    }

    // ── Watched wallets (authenticated) ──────────────────────────────────

    pub async fn watched_wallets(&self) -> Result<Vec<WatchedWallet>, SyncError> {
        Ok(self.client.http().get(WALLETS_PATH, &[]).await?)
    }

    /// Add a wallet to the watch list. A full list fails with a validation
    /// error whose `is_wallet_limit()` is true.
    pub async fn watch_wallet(&self, address: &str) -> Result<WatchedWallet, SyncError> {
        let config = RequestConfig::post(WALLETS_PATH).json(&WatchWalletRequest { address })?;
        let wallet = self
            .client
            .http()
            .request(config, RequestOptions::uncached().no_retry())
            .await?;
        self.invalidate_wallets().await;
        Ok(wallet)
    }

    pub async fn unwatch_wallet(&self, address: &str) -> Result<(), SyncError> {
        let path = format!("{WALLETS_PATH}/{}", urlencoding::encode(address));
        let _: serde_json::Value = self.client.http().delete(&path).await?;
        self.invalidate_wallets().await;
        Ok(())
    }

    /// Live blocks and transactions.
    pub async fn subscribe(&self) -> Arc<StreamChannel<ExplorerFeed>> {
        let feeds = &self.client.config().feeds;
        let feed = ExplorerFeed::new(feeds.block_capacity, feeds.tx_capacity);
        self.client
            .registry()
            .connect(EXPLORER_CHANNEL, self.client.explorer_ws_url(), feed, ())
            .await
    }

    async fn invalidate_wallets(&self) {
        let key = RequestDescriptor::new("GET", WALLETS_PATH, [], None);
        self.client.cache().clear(Some(key.cache_key())).await;
    }
}
