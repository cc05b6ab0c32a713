//! `StreamChannel`: one reconnecting WebSocket connection carrying one feed.
//!
//! A background tokio task owns the socket. The public handle talks to it
//! over an mpsc command channel and observes it through two watch channels
//! (the feed's view and the connection status) plus a broadcast of
//! lifecycle events.
//!
//! Lifecycle: `Idle → Connecting → Open → {Reconnecting → Connecting → Open | Failed}`,
//! with `Open → Idle` on manual disconnect. The reconnect attempt counter is
//! reset only when a socket opens, or by a manual disconnect or restart.

use super::connector::{Connection, Connector, Frame, FrameSink};
use super::{
    subscriptions, ChannelEvent, ChannelStatus, ConnectionState, Envelope, Feed, MessageOut,
    WsConfig, NORMAL_CLOSE,
};
use crate::error::WsError;

use futures_util::{Stream, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

// ─── Commands from public API to background task ─────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Close gracefully and stay idle.
    Disconnect,
    /// Reset attempts and (re)connect now.
    Restart,
    /// Close gracefully and end the task.
    Shutdown,
}

// ─── Public handle ───────────────────────────────────────────────────────────

pub struct StreamChannel<F: Feed> {
    key: String,
    url: String,
    params: F::Params,
    view: watch::Receiver<F::View>,
    status: watch::Receiver<ChannelStatus>,
    events: broadcast::Sender<ChannelEvent>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<F: Feed> StreamChannel<F> {
    /// Spawn the channel task and start connecting. Must be called inside a
    /// tokio runtime.
    pub fn connect(
        key: impl Into<String>,
        url: impl Into<String>,
        feed: F,
        params: F::Params,
        connector: Arc<dyn Connector>,
        config: WsConfig,
    ) -> Self {
        let key = key.into();
        let url = url.into();
        let (view_tx, view) = watch::channel(feed.initial_view(&params));
        let (status_tx, status) = watch::channel(ChannelStatus {
            state: ConnectionState::Connecting,
            ..ChannelStatus::default()
        });
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let task = TaskState {
            key: key.clone(),
            url: url.clone(),
            feed,
            params: params.clone(),
            connector,
            config,
            view_tx,
            status_tx,
            event_tx: events.clone(),
            cmd_rx,
            attempts: 0,
        };
        let handle = tokio::spawn(run_task(task));

        Self {
            key,
            url,
            params,
            view,
            status,
            events,
            cmd_tx,
            task: Mutex::new(Some(handle)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &F::Params {
        &self.params
    }

    /// Snapshot of the feed's view.
    pub fn view(&self) -> F::View {
        self.view.borrow().clone()
    }

    pub fn watch_view(&self) -> watch::Receiver<F::View> {
        self.view.clone()
    }

    /// View snapshots, starting with the current one.
    pub fn updates(&self) -> impl Stream<Item = F::View> + Send + 'static {
        let mut rx = self.view.clone();
        async_stream::stream! {
            loop {
                let snapshot = rx.borrow_and_update().clone();
                yield snapshot;
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    pub fn status(&self) -> ChannelStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    /// Cause of the last disconnect, or the terminal error once `Failed`.
    pub fn error(&self) -> Option<WsError> {
        self.status.borrow().error.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    /// Close the socket and cancel any scheduled reconnect. Idempotent.
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Reset the attempt counter and connect now, from any state.
    pub fn restart(&self) {
        self.command(Command::Restart);
    }

    /// Close gracefully and wait for the task to finish.
    pub async fn shutdown(&self) {
        self.command(Command::Shutdown);
        let handle = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
                tracing::warn!(channel = %self.key, "channel task did not stop within 5s");
            }
        }
    }

    fn command(&self, cmd: Command) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::trace!(channel = %self.key, ?cmd, "channel task already stopped");
        }
    }
}

// ─── Background task state ───────────────────────────────────────────────────

/// What the task does next.
enum Next {
    Connect,
    /// Idle or Failed: wait for a command.
    Park,
    Exit,
}

/// How an open connection ended.
enum Ended {
    Command(Command),
    Remote { code: Option<u16>, reason: String },
    Dropped(WsError),
}

struct TaskState<F: Feed> {
    key: String,
    url: String,
    feed: F,
    params: F::Params,
    connector: Arc<dyn Connector>,
    config: WsConfig,
    view_tx: watch::Sender<F::View>,
    status_tx: watch::Sender<ChannelStatus>,
    event_tx: broadcast::Sender<ChannelEvent>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    attempts: u32,
}

impl<F: Feed> TaskState<F> {
    fn emit(&self, event: ChannelEvent) {
        let _ = self.event_tx.send(event);
    }

    fn publish(&self, update: impl FnOnce(&mut ChannelStatus)) {
        self.status_tx.send_modify(update);
    }

    fn go_idle(&mut self) {
        self.attempts = 0;
        self.publish(|s| {
            s.state = ConnectionState::Idle;
            s.attempts = 0;
            s.error = None;
        });
    }

    /// Handle a command received while no socket is open.
    fn on_command_while_down(&mut self, cmd: Option<Command>) -> Next {
        match cmd {
            Some(Command::Disconnect) => {
                self.go_idle();
                Next::Park
            }
            Some(Command::Restart) => {
                self.attempts = 0;
                Next::Connect
            }
            Some(Command::Shutdown) | None => {
                self.go_idle();
                Next::Exit
            }
        }
    }

    fn handle_text(&self, text: &str) {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(channel = %self.key, "dropping unparseable message: {}", e);
                return;
            }
        };
        if envelope.is_control() {
            return;
        }

        let (feed, params) = (&self.feed, &self.params);
        let changed = self
            .view_tx
            .send_if_modified(|view| feed.route(params, &envelope, view));
        if !changed {
            tracing::trace!(channel = %self.key, tag = %envelope.channel, "message not routed");
        }
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_task<F: Feed>(mut state: TaskState<F>) {
    let mut next = Next::Connect;
    loop {
        next = match next {
            Next::Connect => connect_once(&mut state).await,
            Next::Park => {
                let cmd = state.cmd_rx.recv().await;
                state.on_command_while_down(cmd)
            }
            Next::Exit => return,
        };
    }
}

async fn connect_once<F: Feed>(state: &mut TaskState<F>) -> Next {
    state.publish(|s| s.state = ConnectionState::Connecting);

    let connector = Arc::clone(&state.connector);
    let url = state.url.clone();
    let timeout = Duration::from_millis(state.config.connect_timeout_ms);

    let result = tokio::select! {
        r = tokio::time::timeout(timeout, connector.connect(&url)) => {
            r.unwrap_or_else(|_| Err(WsError::ConnectionFailed("connect timeout".into())))
        }
        cmd = state.cmd_rx.recv() => return state.on_command_while_down(cmd),
    };

    let conn = match result {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(channel = %state.key, "WebSocket connection failed: {}", e);
            return schedule_reconnect(state, e).await;
        }
    };

    state.attempts = 0;
    state.publish(|s| {
        s.state = ConnectionState::Open;
        s.attempts = 0;
        s.error = None;
    });
    state.emit(ChannelEvent::Connected);
    tracing::info!(channel = %state.key, feed = state.feed.name(), "WebSocket connected");

    match run_connected(state, conn).await {
        Ended::Command(cmd) => {
            state.emit(ChannelEvent::Disconnected {
                code: Some(NORMAL_CLOSE),
                reason: "client disconnect".into(),
            });
            match cmd {
                Command::Disconnect => {
                    state.go_idle();
                    Next::Park
                }
                Command::Restart => {
                    state.attempts = 0;
                    Next::Connect
                }
                Command::Shutdown => {
                    state.go_idle();
                    Next::Exit
                }
            }
        }
        Ended::Remote { code, reason } => {
            state.emit(ChannelEvent::Disconnected {
                code,
                reason: reason.clone(),
            });
            if code == Some(NORMAL_CLOSE) {
                tracing::info!(channel = %state.key, "server closed normally");
                state.go_idle();
                Next::Park
            } else {
                schedule_reconnect(state, WsError::Closed { code, reason }).await
            }
        }
        Ended::Dropped(e) => {
            tracing::warn!(channel = %state.key, "WebSocket error: {}", e);
            state.emit(ChannelEvent::Disconnected {
                code: None,
                reason: e.to_string(),
            });
            schedule_reconnect(state, e).await
        }
    }
}

/// The connected loop. Runs until the socket closes or a command arrives.
async fn run_connected<F: Feed>(state: &mut TaskState<F>, conn: Connection) -> Ended {
    let Connection {
        mut sink,
        mut stream,
    } = conn;

    let mut subs = Vec::new();
    for subscription in state.feed.subscriptions(&state.params) {
        subscriptions::track(&mut subs, subscription);
    }
    for subscription in subs {
        let msg = MessageOut::Subscribe { subscription };
        if let Err(e) = send_msg(sink.as_mut(), &msg).await {
            return Ended::Dropped(e);
        }
    }

    let mut ping = ping_interval(state.config.ping_interval_ms);

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Frame::Text(text))) => state.handle_text(&text),
                Some(Ok(Frame::Ping(data))) => {
                    let _ = sink.send(Frame::Pong(data)).await;
                }
                Some(Ok(Frame::Close(close))) => {
                    let (code, reason) = match close {
                        Some((code, reason)) => (Some(code), reason),
                        None => (None, "no close frame".to_string()),
                    };
                    return Ended::Remote { code, reason };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Ended::Dropped(e),
                None => {
                    return Ended::Dropped(WsError::Closed {
                        code: None,
                        reason: "stream ended".into(),
                    })
                }
            },

            cmd = state.cmd_rx.recv() => {
                let cmd = cmd.unwrap_or(Command::Shutdown);
                let close = Frame::Close(Some((NORMAL_CLOSE, "client disconnect".into())));
                let _ = sink.send(close).await;
                return Ended::Command(cmd);
            }

            _ = next_tick(&mut ping) => {
                if let Err(e) = send_msg(sink.as_mut(), &MessageOut::Ping).await {
                    tracing::warn!(channel = %state.key, "failed to send ping: {}", e);
                }
            }
        }
    }
}

// ─── Reconnection backoff ────────────────────────────────────────────────────

async fn schedule_reconnect<F: Feed>(state: &mut TaskState<F>, cause: WsError) -> Next {
    let max = state.config.max_reconnect_attempts;
    if state.attempts >= max {
        let attempts = state.attempts;
        tracing::error!(channel = %state.key, attempts, "giving up on WebSocket reconnect");
        state.publish(|s| {
            s.state = ConnectionState::Failed;
            s.attempts = attempts;
            s.error = Some(WsError::ReconnectExhausted { attempts });
        });
        state.emit(ChannelEvent::Failed { attempts });
        return Next::Park;
    }

    state.attempts += 1;
    let attempt = state.attempts;
    let delay = state.config.reconnect_delay(attempt);
    state.publish(|s| {
        s.state = ConnectionState::Reconnecting;
        s.attempts = attempt;
        s.error = Some(cause);
    });
    state.emit(ChannelEvent::ReconnectScheduled { attempt, delay });
    tracing::info!(
        channel = %state.key,
        attempt,
        max,
        delay_ms = delay.as_millis() as u64,
        "reconnect scheduled"
    );

    tokio::select! {
        _ = tokio::time::sleep(delay) => Next::Connect,
        cmd = state.cmd_rx.recv() => state.on_command_while_down(cmd),
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn send_msg(sink: &mut dyn FrameSink, msg: &MessageOut) -> Result<(), WsError> {
    let json = msg.to_json()?;
    sink.send(Frame::Text(json)).await
}

fn ping_interval(ms: u64) -> Option<Interval> {
    if ms == 0 {
        return None;
    }
    let period = Duration::from_millis(ms);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(interval)
}

async fn next_tick(ping: &mut Option<Interval>) {
    match ping {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
