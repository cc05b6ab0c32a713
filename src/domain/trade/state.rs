//! Bounded trade view: latest price plus the last N trades.

use super::Trade;
use crate::shared::{BoundedBuffer, Coin, Side};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct TradeView {
    pub coin: Coin,
    trades: BoundedBuffer<Trade>,
}

impl TradeView {
    pub fn new(coin: Coin, capacity: usize) -> Self {
        Self {
            coin,
            trades: BoundedBuffer::new(capacity),
        }
    }

    /// Apply a batch (oldest first). Trades for other coins and trades
    /// already seen (same `tid`) are skipped. Returns how many were added.
    pub fn apply(&mut self, batch: impl IntoIterator<Item = Trade>) -> usize {
        let mut added = 0;
        for trade in batch {
            if trade.coin != self.coin || self.contains(trade.tid) {
                continue;
            }
            self.trades.push(trade);
            added += 1;
        }
        added
    }

    /// Replace the buffer from a REST snapshot (newest first).
    pub fn seed(&mut self, trades: Vec<Trade>) {
        let own: Vec<Trade> = trades.into_iter().filter(|t| t.coin == self.coin).collect();
        self.trades.replace(own);
    }

    pub fn latest(&self) -> Option<&Trade> {
        self.trades.latest()
    }

    pub fn last_price(&self) -> Option<Decimal> {
        self.latest().map(|t| t.price)
    }

    pub fn last_side(&self) -> Option<Side> {
        self.latest().map(|t| t.side)
    }

    /// Trades newest first.
    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Buy minus sell size over the buffered trades.
    pub fn net_flow(&self) -> Decimal {
        self.trades.iter().fold(Decimal::ZERO, |acc, t| match t.side {
            Side::Bid => acc + t.size,
            Side::Ask => acc - t.size,
        })
    }

    fn contains(&self, tid: u64) -> bool {
        self.trades.iter().any(|t| t.tid == tid)
    }
}
