//! Trades sub-client.

use super::wire::{RecentTradesRequest, WsTrade};
use super::{Trade, TradeFeed};
use crate::client::SyncClient;
use crate::error::SyncError;
use crate::shared::Coin;
use crate::ws::StreamChannel;
use std::sync::Arc;

/// Registry key of the trades channel. One coin at a time.
pub const TRADES_CHANNEL: &str = "trades";

pub struct Trades<'a> {
    pub(crate) client: &'a SyncClient,
}

impl<'a> Trades<'a> {
    /// Most recent trades for `coin`, newest first.
    pub async fn recent(&self, coin: &Coin) -> Result<Vec<Trade>, SyncError> {
        let body = RecentTradesRequest {
            kind: "recentTrades",
            coin,
        };
        let trades: Vec<WsTrade> = self.client.http().post_info(&body).await?;
        let mut trades: Vec<Trade> = trades.into_iter().map(Trade::from).collect();
        trades.sort_by(|a, b| b.time.cmp(&a.time));
        Ok(trades)
    }

    /// Live trades for `coin`, seeded from [`recent`](Self::recent) when a
    /// new channel is opened. Switching coin closes the previous socket.
    pub async fn subscribe(&self, coin: impl Into<Coin>) -> Arc<StreamChannel<TradeFeed>> {
        let coin = coin.into();
        let registry = self.client.registry();
        let url = self.client.ws_url();
        if let Some(existing) = registry.reuse(TRADES_CHANNEL, url, &coin) {
            return existing;
        }

        let mut feed = TradeFeed::new(self.client.config().feeds.trade_capacity);
        match self.recent(&coin).await {
            Ok(trades) => feed = feed.with_seed(trades),
            Err(e) => {
                tracing::warn!(coin = %coin, "recent trades unavailable, view starts empty: {}", e)
            }
        }
        registry.connect(TRADES_CHANNEL, url, feed, coin).await
    }
}
