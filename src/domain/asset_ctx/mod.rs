//! Asset context domain: funding, open interest and prices for every asset
//! on every venue, streamed as whole-venue snapshots.

pub mod client;
pub mod state;
pub mod wire;

use crate::shared::Coin;
use crate::ws::feed::decode;
use crate::ws::{Envelope, Feed, Subscription};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use state::AssetCtxView;
use wire::{WsAllDexsAssetCtxs, WsAssetCtx};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetCtx {
    /// Set when the venue's universe is known.
    pub coin: Option<Coin>,
    pub funding: Decimal,
    pub open_interest: Decimal,
    pub prev_day_px: Decimal,
    pub day_volume: Decimal,
    pub oracle_px: Decimal,
    pub mark_px: Decimal,
    pub mid_px: Option<Decimal>,
    pub premium: Option<Decimal>,
}

impl AssetCtx {
    pub fn from_wire(ctx: WsAssetCtx, coin: Option<Coin>) -> Self {
        Self {
            coin,
            funding: ctx.funding,
            open_interest: ctx.open_interest,
            prev_day_px: ctx.prev_day_px,
            day_volume: ctx.day_ntl_vlm,
            oracle_px: ctx.oracle_px,
            mark_px: ctx.mark_px,
            mid_px: ctx.mid_px,
            premium: ctx.premium,
        }
    }

    /// 24h mark price change in percent.
    pub fn change_24h_pct(&self) -> Option<Decimal> {
        if self.prev_day_px.is_zero() {
            return None;
        }
        Some((self.mark_px - self.prev_day_px) / self.prev_day_px * Decimal::ONE_HUNDRED)
    }
}

/// Venue filter. Empty means every venue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCtxParams {
    pub venues: Vec<String>,
}

impl AssetCtxParams {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn venues<I, S>(venues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            venues: venues.into_iter().map(Into::into).collect(),
        }
    }

    fn accepts(&self, venue: &str) -> bool {
        self.venues.is_empty() || self.venues.iter().any(|v| v == venue)
    }
}

/// `allDexsAssetCtxs` channel.
#[derive(Debug, Clone, Default)]
pub struct AssetCtxFeed {
    /// Coin names per venue, in universe order.
    universe: BTreeMap<String, Vec<Coin>>,
}

impl AssetCtxFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_universe(mut self, venue: impl Into<String>, coins: Vec<Coin>) -> Self {
        self.universe.insert(venue.into(), coins);
        self
    }

    fn name_ctxs(&self, venue: &str, ctxs: Vec<WsAssetCtx>) -> Vec<AssetCtx> {
        let names = self.universe.get(venue);
        ctxs.into_iter()
            .enumerate()
            .map(|(i, ctx)| {
                let coin = names.and_then(|n| n.get(i)).cloned();
                AssetCtx::from_wire(ctx, coin)
            })
            .collect()
    }
}

impl Feed for AssetCtxFeed {
    type Params = AssetCtxParams;
    type View = AssetCtxView;

    fn name(&self) -> &'static str {
        "assetCtxs"
    }

    fn subscriptions(&self, _: &AssetCtxParams) -> Vec<Subscription> {
        vec![Subscription::AllDexsAssetCtxs]
    }

    fn initial_view(&self, _: &AssetCtxParams) -> AssetCtxView {
        AssetCtxView::new()
    }

    fn route(&self, params: &AssetCtxParams, envelope: &Envelope, view: &mut AssetCtxView) -> bool {
        if envelope.channel != "allDexsAssetCtxs" {
            return false;
        }
        let Some(msg) = decode::<WsAllDexsAssetCtxs>(self.name(), envelope) else {
            return false;
        };
        let mut changed = false;
        for (venue, ctxs) in msg.ctxs {
            if !params.accepts(&venue) {
                continue;
            }
            let named = self.name_ctxs(&venue, ctxs);
            view.replace_venue(venue, named);
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(mark: &str, prev: &str) -> serde_json::Value {
        json!({
            "funding": "0.0000125", "openInterest": "1000", "prevDayPx": prev,
            "dayNtlVlm": "5000000", "premium": "0.0001", "oraclePx": mark,
            "markPx": mark, "midPx": null, "impactPxs": ["1", "2"]
        })
    }

    fn envelope() -> Envelope {
        Envelope {
            channel: "allDexsAssetCtxs".into(),
            data: json!({"ctxs": [
                ["", [ctx("110", "100"), ctx("50", "50")]],
                ["xyz", [ctx("7", "0")]]
            ]}),
        }
    }

    #[test]
    fn test_route_names_contexts_from_universe() {
        let feed = AssetCtxFeed::new().with_universe("", vec![Coin::new("BTC"), Coin::new("ETH")]);
        let params = AssetCtxParams::all();
        let mut view = feed.initial_view(&params);

        assert!(feed.route(&params, &envelope(), &mut view));
        assert_eq!(view.venues().collect::<Vec<_>>(), vec!["", "xyz"]);

        let btc = view.get("", &Coin::new("BTC")).unwrap();
        assert_eq!(btc.mark_px, Decimal::from(110));
        assert_eq!(btc.change_24h_pct(), Some(Decimal::from(10)));
        assert_eq!(btc.mid_px, None);

        let unnamed = &view.venue("xyz").unwrap()[0];
        assert_eq!(unnamed.coin, None);
        assert_eq!(unnamed.change_24h_pct(), None);
    }

    #[test]
    fn test_venue_filter() {
        let feed = AssetCtxFeed::new();
        let params = AssetCtxParams::venues(["xyz"]);
        let mut view = feed.initial_view(&params);

        assert!(feed.route(&params, &envelope(), &mut view));
        assert!(view.venue("").is_none());
        assert_eq!(view.venue("xyz").unwrap().len(), 1);
        assert_eq!(view.updates(), 1);

        let other = AssetCtxParams::venues(["abc"]);
        assert!(!feed.route(&other, &envelope(), &mut view));
    }

    #[test]
    fn test_malformed_dropped() {
        let feed = AssetCtxFeed::new();
        let params = AssetCtxParams::all();
        let mut view = feed.initial_view(&params);
        let bad = Envelope {
            channel: "allDexsAssetCtxs".into(),
            data: json!({"ctxs": "nope"}),
        };
        assert!(!feed.route(&params, &bad, &mut view));
        assert!(view.is_empty());
    }
}
