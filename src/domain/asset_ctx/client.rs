//! Markets sub-client: asset contexts for the main venue and the live
//! multi-venue feed.

use super::wire::{InfoRequest, MetaAndAssetCtxs};
use super::{AssetCtx, AssetCtxFeed, AssetCtxParams};
use crate::client::SyncClient;
use crate::error::SyncError;
use crate::shared::Coin;
use crate::ws::StreamChannel;
use std::sync::Arc;

pub const ASSET_CTX_CHANNEL: &str = "assetCtxs";

/// Name of the main venue in multi-venue payloads.
pub const MAIN_VENUE: &str = "";

pub struct Markets<'a> {
    pub(crate) client: &'a SyncClient,
}

impl<'a> Markets<'a> {
    /// Contexts for every asset on the main venue, named.
    pub async fn asset_contexts(&self) -> Result<Vec<AssetCtx>, SyncError> {
        let (meta, ctxs): MetaAndAssetCtxs = self
            .client
            .http()
            .post_info(&InfoRequest {
                kind: "metaAndAssetCtxs",
            })
            .await?;
        Ok(meta
            .universe
            .into_iter()
            .zip(ctxs)
            .map(|(asset, ctx)| AssetCtx::from_wire(ctx, Some(Coin::new(asset.name))))
            .collect())
    }

    /// Live contexts. The main venue's universe is fetched first so its
    /// entries carry coin names; if that lookup fails they stay unnamed.
    pub async fn subscribe(&self, params: AssetCtxParams) -> Arc<StreamChannel<AssetCtxFeed>> {
        let registry = self.client.registry();
        if let Some(existing) = registry.reuse(ASSET_CTX_CHANNEL, self.client.ws_url(), &params) {
            return existing;
        }

        let mut feed = AssetCtxFeed::new();
        match self.universe().await {
            Ok(coins) => feed = feed.with_universe(MAIN_VENUE, coins),
            Err(e) => tracing::warn!("asset universe unavailable, contexts stay unnamed: {}", e),
        }
        registry
            .connect(ASSET_CTX_CHANNEL, self.client.ws_url(), feed, params)
            .await
    }

    async fn universe(&self) -> Result<Vec<Coin>, SyncError> {
        let (meta, _): MetaAndAssetCtxs = self
            .client
            .http()
            .post_info(&InfoRequest {
                kind: "metaAndAssetCtxs",
            })
            .await?;
        Ok(meta.universe.into_iter().map(|a| Coin::new(a.name)).collect())
    }
}
