//! The per-feed configuration a [`StreamChannel`](super::StreamChannel) is
//! parameterized by.

use super::{Envelope, Subscription};
use std::fmt::Debug;

/// What a channel subscribes to and how inbound envelopes update its view.
///
/// Implementations never fail: envelopes that do not belong to the feed or
/// do not decode are ignored by returning `false`.
pub trait Feed: Send + Sync + 'static {
    /// Feed target (coin, venue, ...). Two connects with equal params on
    /// the same key share one socket.
    type Params: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Bounded in-memory view published to consumers.
    type View: Clone + Send + Sync + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Sent, in order, each time the socket opens.
    fn subscriptions(&self, params: &Self::Params) -> Vec<Subscription>;

    fn initial_view(&self, params: &Self::Params) -> Self::View;

    /// Apply `envelope` to `view`. Returns whether the view changed.
    fn route(&self, params: &Self::Params, envelope: &Envelope, view: &mut Self::View) -> bool;
}

/// Decode `envelope.data` as `T`, logging and discarding on failure.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(feed: &str, envelope: &Envelope) -> Option<T> {
    match serde_json::from_value(envelope.data.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(
                feed,
                channel = %envelope.channel,
                "dropping malformed message: {}",
                e
            );
            None
        }
    }
}
