//! Subscription payloads and tracking.

use crate::shared::Coin;
use serde::{Deserialize, Serialize};

/// Feed parameters sent inside `{"method":"subscribe","subscription":{..}}`.
///
/// The wire `type` tag names the feed; market feeds also carry the coin.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Subscription {
    Trades {
        coin: Coin,
    },
    L2Book {
        coin: Coin,
        #[serde(rename = "nSigFigs", default, skip_serializing_if = "Option::is_none")]
        n_sig_figs: Option<u32>,
    },
    ExplorerBlock,
    ExplorerTxs,
    AllDexsAssetCtxs,
}

impl Subscription {
    pub fn trades(coin: impl Into<Coin>) -> Self {
        Subscription::Trades { coin: coin.into() }
    }

    pub fn l2_book(coin: impl Into<Coin>) -> Self {
        Subscription::L2Book {
            coin: coin.into(),
            n_sig_figs: None,
        }
    }

    /// Inbound `channel` tag carrying this feed's data.
    pub fn channel(&self) -> &'static str {
        match self {
            Subscription::Trades { .. } => "trades",
            Subscription::L2Book { .. } => "l2Book",
            Subscription::ExplorerBlock => "explorerBlock",
            Subscription::ExplorerTxs => "explorerTxs",
            Subscription::AllDexsAssetCtxs => "allDexsAssetCtxs",
        }
    }

    pub fn coin(&self) -> Option<&Coin> {
        match self {
            Subscription::Trades { coin } | Subscription::L2Book { coin, .. } => Some(coin),
            _ => None,
        }
    }
}

/// Add `sub` unless an equal subscription is already tracked.
pub(crate) fn track(subs: &mut Vec<Subscription>, sub: Subscription) -> bool {
    if subs.contains(&sub) {
        return false;
    }
    tracing::debug!("tracking subscription: {:?}", sub);
    subs.push(sub);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscription_wire_format() {
        assert_eq!(
            serde_json::to_value(Subscription::trades("HYPE")).unwrap(),
            json!({"type": "trades", "coin": "HYPE"})
        );
        assert_eq!(
            serde_json::to_value(Subscription::l2_book("BTC")).unwrap(),
            json!({"type": "l2Book", "coin": "BTC"})
        );
        assert_eq!(
            serde_json::to_value(Subscription::L2Book {
                coin: Coin::new("BTC"),
                n_sig_figs: Some(5)
            })
            .unwrap(),
            json!({"type": "l2Book", "coin": "BTC", "nSigFigs": 5})
        );
        assert_eq!(
            serde_json::to_value(Subscription::ExplorerBlock).unwrap(),
            json!({"type": "explorerBlock"})
        );
        assert_eq!(
            serde_json::to_value(Subscription::AllDexsAssetCtxs).unwrap(),
            json!({"type": "allDexsAssetCtxs"})
        );
    }

    #[test]
    fn test_channel_tags() {
        assert_eq!(Subscription::trades("X").channel(), "trades");
        assert_eq!(Subscription::l2_book("X").channel(), "l2Book");
        assert_eq!(Subscription::ExplorerTxs.channel(), "explorerTxs");
        assert_eq!(Subscription::ExplorerBlock.coin(), None);
        assert_eq!(Subscription::trades("X").coin(), Some(&Coin::new("X")));
    }

    #[test]
    fn test_track_deduplicates() {
        let mut subs = Vec::new();
        assert!(track(&mut subs, Subscription::trades("HYPE")));
        assert!(!track(&mut subs, Subscription::trades("HYPE")));
        assert!(track(&mut subs, Subscription::trades("BTC")));
        assert_eq!(subs.len(), 2);
    }
}
