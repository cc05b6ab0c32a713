//! Multi-venue asset context view.

use super::AssetCtx;
use crate::shared::Coin;
use std::collections::BTreeMap;

/// Latest contexts per venue, in universe order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetCtxView {
    venues: BTreeMap<String, Vec<AssetCtx>>,
    updates: u64,
}

impl AssetCtxView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_venue(&mut self, venue: impl Into<String>, ctxs: Vec<AssetCtx>) {
        self.venues.insert(venue.into(), ctxs);
        self.updates += 1;
    }

    pub fn venue(&self, venue: &str) -> Option<&[AssetCtx]> {
        self.venues.get(venue).map(Vec::as_slice)
    }

    pub fn venues(&self) -> impl Iterator<Item = &str> {
        self.venues.keys().map(String::as_str)
    }

    /// Context for a named coin on `venue`. Needs the venue's universe.
    pub fn get(&self, venue: &str, coin: &Coin) -> Option<&AssetCtx> {
        self.venues
            .get(venue)?
            .iter()
            .find(|c| c.coin.as_ref() == Some(coin))
    }

    /// Venue updates applied so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}
