//! Order book sub-client.

use super::wire::{L2BookRequest, WsBook};
use super::{BookFeed, BookParams, L2Book};
use crate::client::SyncClient;
use crate::error::SyncError;
use crate::ws::StreamChannel;
use std::sync::Arc;

pub const BOOK_CHANNEL: &str = "l2Book";

pub struct Orderbooks<'a> {
    pub(crate) client: &'a SyncClient,
}

impl<'a> Orderbooks<'a> {
    /// One-off L2 snapshot.
    pub async fn snapshot(&self, params: impl Into<BookParams>) -> Result<L2Book, SyncError> {
        let params = params.into();
        let body = L2BookRequest {
            kind: "l2Book",
            coin: &params.coin,
            n_sig_figs: params.n_sig_figs,
        };
        let book: WsBook = self.client.http().post_info(&body).await?;
        let mut book = L2Book::from(book);
        book.truncate(self.client.config().feeds.book_depth);
        Ok(book)
    }

    /// Live book. A different coin or aggregation closes the previous socket.
    pub async fn subscribe(&self, params: impl Into<BookParams>) -> Arc<StreamChannel<BookFeed>> {
        let feeds = &self.client.config().feeds;
        let feed = BookFeed::new(feeds.book_depth, feeds.book_history);
        self.client
            .registry()
            .connect(BOOK_CHANNEL, self.client.ws_url(), feed, params.into())
            .await
    }
}
