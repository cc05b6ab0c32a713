//! End-to-end flows through the public API with in-memory transports.
//!
//! Every test here runs offline against scripted fakes. The single live
//! test at the bottom is `#[ignore]`; run it with:
//! ```bash
//! cargo test --test sync_flows -- --ignored
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

use explorer_sync::http::{PreparedRequest, RawResponse};
use explorer_sync::prelude::*;
use explorer_sync::ws::{Connection, Frame, FrameSink};

// ─── Fakes ───────────────────────────────────────────────────────────────────

/// Replays queued responses; repeats the last one once the queue is down
/// to a single entry.
struct CountingTransport {
    script: Mutex<VecDeque<RawResponse>>,
    accept_token: Option<String>,
    sent: AtomicU32,
}

impl CountingTransport {
    fn new(script: Vec<RawResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            accept_token: None,
            sent: AtomicU32::new(0),
        })
    }

    /// 401 unless the request carries `Bearer <token>`.
    fn requiring(token: &str, body: Value) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(vec![RawResponse::ok_json(&body)].into()),
            accept_token: Some(format!("Bearer {token}")),
            sent: AtomicU32::new(0),
        })
    }

    fn sent(&self) -> u32 {
        self.sent.load(Ordering::SeqCst)
    }
}

impl Transport for CountingTransport {
    fn send(&self, request: PreparedRequest) -> BoxFuture<'_, Result<RawResponse, HttpError>> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        let response = match &self.accept_token {
            Some(expected) if request.header("Authorization") != Some(expected.as_str()) => {
                RawResponse::new(401, r#"{"message":"unauthorized"}"#)
            }
            _ => {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front().unwrap()
                } else {
                    script.front().cloned().unwrap()
                }
            }
        };
        Box::pin(futures_util::future::ready(Ok(response)))
    }
}

/// Starts with a stale token; `refresh` swaps in `fresh` after a short
/// delay, or fails when `fresh` is `None`.
struct RotatingProvider {
    current: Mutex<String>,
    fresh: Option<String>,
    refreshes: AtomicU32,
    expired: AtomicBool,
}

impl RotatingProvider {
    fn new(fresh: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new("stale".to_string()),
            fresh: fresh.map(str::to_string),
            refreshes: AtomicU32::new(0),
            expired: AtomicBool::new(false),
        })
    }
}

impl TokenProvider for RotatingProvider {
    fn token(&self) -> BoxFuture<'_, Option<String>> {
        let token = self.current.lock().unwrap().clone();
        Box::pin(futures_util::future::ready(Some(token)))
    }

    fn refresh(&self) -> BoxFuture<'_, Result<String, AuthError>> {
        Box::pin(async move {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            match &self.fresh {
                Some(fresh) => {
                    *self.current.lock().unwrap() = fresh.clone();
                    Ok(fresh.clone())
                }
                None => Err(AuthError::RefreshFailed("provider offline".into())),
            }
        })
    }

    fn on_session_expired(&self) {
        self.expired.store(true, Ordering::SeqCst);
    }
}

/// Server end of a socket opened by [`LoopbackConnector`].
struct Peer {
    to_client: mpsc::UnboundedSender<Result<Frame, WsError>>,
    from_client: mpsc::UnboundedReceiver<Frame>,
}

impl Peer {
    fn send(&self, value: Value) {
        let _ = self.to_client.send(Ok(Frame::Text(value.to_string())));
    }

    fn close(&self, code: u16) {
        let _ = self
            .to_client
            .send(Ok(Frame::Close(Some((code, "going away".into())))));
    }

    async fn next_json(&mut self) -> Value {
        loop {
            match self.from_client.recv().await {
                Some(Frame::Text(text)) => return serde_json::from_str(&text).unwrap(),
                Some(_) => continue,
                None => panic!("client hung up"),
            }
        }
    }
}

struct LoopbackSink(mpsc::UnboundedSender<Frame>);

impl FrameSink for LoopbackSink {
    fn send(&mut self, frame: Frame) -> BoxFuture<'_, Result<(), WsError>> {
        let result = self
            .0
            .send(frame)
            .map_err(|_| WsError::SendFailed("peer gone".into()));
        Box::pin(futures_util::future::ready(result))
    }
}

/// Accepts every connect and hands the server end to the test.
struct LoopbackConnector {
    peers: mpsc::UnboundedSender<Peer>,
}

impl LoopbackConnector {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Peer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { peers }), rx)
    }
}

impl Connector for LoopbackConnector {
    fn connect<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Connection, WsError>> {
        let (c2s_tx, c2s_rx) = mpsc::unbounded_channel();
        let (s2c_tx, s2c_rx) = mpsc::unbounded_channel();
        let _ = self.peers.send(Peer {
            to_client: s2c_tx,
            from_client: c2s_rx,
        });
        let stream = futures_util::stream::unfold(s2c_rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        })
        .boxed();
        Box::pin(futures_util::future::ready(Ok(Connection {
            sink: Box::new(LoopbackSink(c2s_tx)),
            stream,
        })))
    }
}

fn build(transport: Arc<dyn Transport>, provider: Option<Arc<dyn TokenProvider>>) -> SyncClient {
    let (connector, _peers) = LoopbackConnector::new();
    let mut builder = SyncClient::builder()
        .base_url("http://explorer.test")
        .retry_config(RetryConfig::none())
        .transport(transport)
        .connector(connector);
    if let Some(provider) = provider {
        builder = builder.token_provider(provider);
    }
    builder.build().unwrap()
}

async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<ChannelEvent>) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(60), rx.recv())
        .await
        .expect("timed out waiting for channel event")
        .expect("event channel closed")
}

// ─── Cache ───────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_seeded_cache_entry_serves_gets_until_ttl() {
    let transport = CountingTransport::new(vec![RawResponse::ok_json(&json!({ "v": 2 }))]);
    let client = build(transport.clone(), None);

    client.cache().set("GET:/foo:{}:{}", json!({ "v": 1 })).await;

    let first: Value = assert_ok!(client.http().get("/foo", &[]).await);
    let second: Value = assert_ok!(client.http().get("/foo", &[]).await);
    assert_eq!(first, json!({ "v": 1 }));
    assert_eq!(second, json!({ "v": 1 }));
    assert_eq!(transport.sent(), 0);

    tokio::time::advance(Duration::from_millis(30_000)).await;

    let third: Value = assert_ok!(client.http().get("/foo", &[]).await);
    assert_eq!(third, json!({ "v": 2 }));
    assert_eq!(transport.sent(), 1);
}

// ─── Auth ────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_concurrent_401s_share_one_refresh() {
    let transport = CountingTransport::requiring("fresh", json!([]));
    let provider = RotatingProvider::new(Some("fresh"));
    let client = build(transport.clone(), Some(provider.clone() as Arc<dyn TokenProvider>));
    let http = client.http();

    let (a, b, c) = tokio::join!(
        http.get::<Value>("/api/a", &[]),
        http.get::<Value>("/api/b", &[]),
        http.get::<Value>("/api/c", &[]),
    );
    assert_ok!(a);
    assert_ok!(b);
    assert_ok!(c);

    assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
    assert!(!provider.expired.load(Ordering::SeqCst));
    // Three rejected, three replayed.
    assert_eq!(transport.sent(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_expires_session() {
    let transport = CountingTransport::requiring("fresh", json!([]));
    let provider = RotatingProvider::new(None);
    let client = build(transport.clone(), Some(provider.clone() as Arc<dyn TokenProvider>));

    let err = assert_err!(client.explorer().watched_wallets().await);
    assert_eq!(err, SyncError::Http(HttpError::Unauthorized));
    assert!(provider.expired.load(Ordering::SeqCst));
    assert_eq!(transport.sent(), 1);
}

// ─── Fetch ───────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_fetch_recovers_after_transient_failures() {
    let block = json!({
        "height": 9, "blockTime": 1_700_000_000_000i64, "hash": "0x9",
        "proposer": "0xval", "numTxs": 0
    });
    let transport = CountingTransport::new(vec![
        RawResponse::new(503, "unavailable"),
        RawResponse::new(503, "unavailable"),
        RawResponse::ok_json(&block),
    ]);
    let client = build(transport.clone(), None);

    let source = client.clone();
    let orchestrator = client.fetch(
        move |height: u64| {
            let client = source.clone();
            async move { client.explorer().block(height).await }
        },
        9,
    );

    let mut rx = orchestrator.subscribe();
    let state = rx
        .wait_for(|s| s.data.is_some())
        .await
        .unwrap()
        .clone();

    assert_eq!(state.data.map(|b| b.height), Some(9));
    assert_eq!(state.error, None);
    assert_eq!(state.retry_count, 0);
    assert_eq!(state.phase, Phase::Idle);
    assert_eq!(transport.sent(), 3);
    orchestrator.teardown();
}

// ─── WebSocket ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_trades_feed_survives_abnormal_close() {
    let (connector, mut peers) = LoopbackConnector::new();
    let client = SyncClient::builder()
        .transport(CountingTransport::new(vec![RawResponse::ok_json(&json!([]))]))
        .connector(connector)
        .build()
        .unwrap();

    let channel = client.trades().subscribe("HYPE").await;
    let mut events = channel.events();

    let mut peer = peers.recv().await.unwrap();
    assert_eq!(
        peer.next_json().await,
        json!({ "method": "subscribe", "subscription": { "type": "trades", "coin": "HYPE" } })
    );
    assert_eq!(next_event(&mut events).await, ChannelEvent::Connected);

    peer.send(json!({
        "channel": "trades",
        "data": [{
            "coin": "HYPE", "side": "A", "px": "20.1", "sz": "1.5",
            "time": 1_700_000_000_000i64, "hash": "0xa", "tid": 1
        }]
    }));
    channel.watch_view().wait_for(|v| v.len() == 1).await.unwrap();

    peer.close(1006);
    assert!(matches!(
        next_event(&mut events).await,
        ChannelEvent::Disconnected { code: Some(1006), .. }
    ));
    assert_eq!(
        next_event(&mut events).await,
        ChannelEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_millis(1000)
        }
    );

    let mut peer = peers.recv().await.unwrap();
    assert_eq!(peer.next_json().await["subscription"]["coin"], "HYPE");
    assert_eq!(next_event(&mut events).await, ChannelEvent::Connected);
    assert_eq!(channel.status().attempts, 0);
    // The view outlives the socket.
    assert_eq!(channel.view().len(), 1);

    client.disconnect_all().await;
    assert_eq!(channel.state(), ConnectionState::Idle);
}

// ─── Live ────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn test_live_asset_contexts() {
    dotenvy::dotenv().ok();
    let info_url =
        std::env::var("EXPLORER_INFO_URL").unwrap_or_else(|_| DEFAULT_INFO_URL.to_string());

    let client = SyncClient::builder().info_url(&info_url).build().unwrap();
    let ctxs = assert_ok!(client.markets().asset_contexts().await);
    assert!(!ctxs.is_empty());
}
