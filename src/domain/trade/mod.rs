//! Trade domain: executed trades for one coin.

pub mod client;
pub mod state;
pub mod wire;

use crate::shared::{Coin, Side};
use crate::ws::feed::decode;
use crate::ws::{Envelope, Feed, Subscription};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use state::TradeView;
use wire::WsTrade;

/// Default number of trades kept per view.
pub const DEFAULT_TRADE_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub coin: Coin,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub time: DateTime<Utc>,
    pub hash: String,
    pub tid: u64,
}

impl Trade {
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

impl From<WsTrade> for Trade {
    fn from(t: WsTrade) -> Self {
        Self {
            coin: t.coin,
            side: t.side,
            price: t.px,
            size: t.sz,
            time: super::millis_to_datetime(t.time).unwrap_or_default(),
            hash: t.hash,
            tid: t.tid,
        }
    }
}

/// `trades` channel for one coin.
#[derive(Debug, Clone)]
pub struct TradeFeed {
    capacity: usize,
    seed: Vec<Trade>,
}

impl TradeFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seed: Vec::new(),
        }
    }

    /// Start the view from a REST snapshot (newest first). Live trades with
    /// a `tid` already in the snapshot are skipped.
    pub fn with_seed(mut self, trades: Vec<Trade>) -> Self {
        self.seed = trades;
        self
    }
}

impl Default for TradeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_TRADE_CAPACITY)
    }
}

impl Feed for TradeFeed {
    type Params = Coin;
    type View = TradeView;

    fn name(&self) -> &'static str {
        "trades"
    }

    fn subscriptions(&self, coin: &Coin) -> Vec<Subscription> {
        vec![Subscription::trades(coin.clone())]
    }

    fn initial_view(&self, coin: &Coin) -> TradeView {
        let mut view = TradeView::new(coin.clone(), self.capacity);
        if !self.seed.is_empty() {
            view.seed(self.seed.clone());
        }
        view
    }

    fn route(&self, _: &Coin, envelope: &Envelope, view: &mut TradeView) -> bool {
        if envelope.channel != "trades" {
            return false;
        }
        let Some(batch) = decode::<Vec<WsTrade>>(self.name(), envelope) else {
            return false;
        };
        view.apply(batch.into_iter().map(Trade::from)) > 0
    }
}
