//! Explorer view: rolling buffers of recent blocks and transactions.

use super::{Block, Transaction};
use crate::shared::BoundedBuffer;

#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerView {
    blocks: BoundedBuffer<Block>,
    txs: BoundedBuffer<Transaction>,
}

impl ExplorerView {
    pub fn new(block_capacity: usize, tx_capacity: usize) -> Self {
        Self {
            blocks: BoundedBuffer::new(block_capacity),
            txs: BoundedBuffer::new(tx_capacity),
        }
    }

    /// Append blocks, skipping any at or below the current tip.
    pub fn apply_blocks(&mut self, mut blocks: Vec<Block>) -> usize {
        blocks.sort_by_key(|b| b.height);
        let mut added = 0;
        for block in blocks {
            if self.latest_height().is_some_and(|tip| block.height <= tip) {
                continue;
            }
            self.blocks.push(block);
            added += 1;
        }
        added
    }

    /// Append transactions (oldest first), skipping hashes already buffered.
    pub fn apply_txs(&mut self, txs: Vec<Transaction>) -> usize {
        let mut added = 0;
        for tx in txs {
            if self.txs.iter().any(|t| t.hash == tx.hash) {
                continue;
            }
            self.txs.push(tx);
            added += 1;
        }
        added
    }

    pub fn latest_block(&self) -> Option<&Block> {
        self.blocks.latest()
    }

    pub fn latest_height(&self) -> Option<u64> {
        self.blocks.latest().map(|b| b.height)
    }

    /// Newest first.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Newest first.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.txs.iter()
    }

    pub fn transactions_for<'a>(&'a self, user: &'a str) -> impl Iterator<Item = &'a Transaction> {
        self.txs
            .iter()
            .filter(move |t| t.user.eq_ignore_ascii_case(user))
    }
}
