//! Domain feeds. Each module pairs wire types with a bounded in-memory view
//! and a [`Feed`](crate::ws::Feed) that keeps the view current from its
//! WebSocket channel, plus a sub-client for the REST side.

pub mod asset_ctx;
pub mod explorer;
pub mod orderbook;
pub mod trade;

use chrono::{DateTime, TimeZone, Utc};

/// Millisecond epoch timestamp as sent by the venues.
pub(crate) fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}
