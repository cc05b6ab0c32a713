//! Order book view: the latest book truncated to a fixed depth, plus a
//! rolling history of top-of-book summaries.

use super::{BookTop, L2Book};
use crate::shared::{BoundedBuffer, Coin};

#[derive(Debug, Clone, PartialEq)]
pub struct BookView {
    pub coin: Coin,
    depth: usize,
    latest: Option<L2Book>,
    tops: BoundedBuffer<BookTop>,
}

impl BookView {
    pub fn new(coin: Coin, depth: usize, history: usize) -> Self {
        Self {
            coin,
            depth,
            latest: None,
            tops: BoundedBuffer::new(history),
        }
    }

    /// Replace the book. Snapshots for another coin, or older than the
    /// current one, are ignored. Returns whether the view changed.
    pub fn apply(&mut self, mut book: L2Book) -> bool {
        if book.coin != self.coin {
            return false;
        }
        if let Some(current) = &self.latest {
            if book.time < current.time {
                return false;
            }
        }
        book.truncate(self.depth);
        self.tops.push(book.top());
        self.latest = Some(book);
        true
    }

    pub fn book(&self) -> Option<&L2Book> {
        self.latest.as_ref()
    }

    /// Top-of-book history, newest first.
    pub fn tops(&self) -> impl Iterator<Item = &BookTop> {
        self.tops.iter()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn clear(&mut self) {
        self.latest = None;
        self.tops.clear();
    }
}
