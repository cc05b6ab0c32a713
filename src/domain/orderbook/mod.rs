//! Order book domain: L2 snapshots for one coin.

pub mod client;
pub mod state;
pub mod wire;

use crate::shared::Coin;
use crate::ws::feed::decode;
use crate::ws::{Envelope, Feed, Subscription};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use state::BookView;
use wire::{WsBook, WsLevel};

pub const DEFAULT_BOOK_DEPTH: usize = 20;
pub const DEFAULT_BOOK_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Level {
    pub price: Decimal,
    pub size: Decimal,
    pub orders: u32,
}

impl From<WsLevel> for Level {
    fn from(l: WsLevel) -> Self {
        Self {
            price: l.px,
            size: l.sz,
            orders: l.n,
        }
    }
}

/// L2 book, best level first on each side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct L2Book {
    pub coin: Coin,
    pub time: DateTime<Utc>,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

impl L2Book {
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    /// Mid price (average of best bid and best ask).
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            _ => None,
        }
    }

    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    pub fn truncate(&mut self, depth: usize) {
        self.bids.truncate(depth);
        self.asks.truncate(depth);
    }

    pub fn top(&self) -> BookTop {
        BookTop {
            time: self.time,
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
            mid: self.mid_price(),
        }
    }
}

impl From<WsBook> for L2Book {
    fn from(b: WsBook) -> Self {
        let (bids, asks) = b.levels;
        Self {
            coin: b.coin,
            time: super::millis_to_datetime(b.time).unwrap_or_default(),
            bids: bids.into_iter().map(Level::from).collect(),
            asks: asks.into_iter().map(Level::from).collect(),
        }
    }
}

/// Top-of-book summary kept in the view's history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookTop {
    pub time: DateTime<Utc>,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub mid: Option<Decimal>,
}

/// Book target: coin plus optional price aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookParams {
    pub coin: Coin,
    pub n_sig_figs: Option<u32>,
}

impl BookParams {
    pub fn new(coin: impl Into<Coin>) -> Self {
        Self {
            coin: coin.into(),
            n_sig_figs: None,
        }
    }

    pub fn sig_figs(mut self, n: u32) -> Self {
        self.n_sig_figs = Some(n);
        self
    }
}

impl From<Coin> for BookParams {
    fn from(coin: Coin) -> Self {
        Self::new(coin)
    }
}

impl From<&str> for BookParams {
    fn from(coin: &str) -> Self {
        Self::new(coin)
    }
}

/// `l2Book` channel for one coin.
#[derive(Debug, Clone, Copy)]
pub struct BookFeed {
    depth: usize,
    history: usize,
}

impl BookFeed {
    pub fn new(depth: usize, history: usize) -> Self {
        Self { depth, history }
    }
}

impl Default for BookFeed {
    fn default() -> Self {
        Self::new(DEFAULT_BOOK_DEPTH, DEFAULT_BOOK_HISTORY)
    }
}

impl Feed for BookFeed {
    type Params = BookParams;
    type View = BookView;

    fn name(&self) -> &'static str {
        "l2Book"
    }

    fn subscriptions(&self, params: &BookParams) -> Vec<Subscription> {
        vec![Subscription::L2Book {
            coin: params.coin.clone(),
            n_sig_figs: params.n_sig_figs,
        }]
    }

    fn initial_view(&self, params: &BookParams) -> BookView {
        BookView::new(params.coin.clone(), self.depth, self.history)
    }

    fn route(&self, _: &BookParams, envelope: &Envelope, view: &mut BookView) -> bool {
        if envelope.channel != "l2Book" {
            return false;
        }
        match decode::<WsBook>(self.name(), envelope) {
            Some(book) => view.apply(L2Book::from(book)),
            None => false,
        }
    }
}
