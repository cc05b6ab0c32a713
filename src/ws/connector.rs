//! Transport seam for WebSocket connections.
//!
//! A [`Connector`] opens a socket and splits it into a [`FrameSink`] and a
//! [`FrameStream`], mirroring `StreamExt::split` on a tungstenite stream.
//! Channels only ever see [`Frame`]s, so tests drive them with in-memory
//! connectors.

use crate::error::WsError;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;

/// Transport-agnostic WebSocket frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<(u16, String)>),
}

/// Inbound half. An `Err` item or the end of the stream means the socket
/// is gone.
pub type FrameStream = BoxStream<'static, Result<Frame, WsError>>;

/// Outbound half.
pub trait FrameSink: Send {
    fn send(&mut self, frame: Frame) -> BoxFuture<'_, Result<(), WsError>>;
}

pub struct Connection {
    pub sink: Box<dyn FrameSink>,
    pub stream: FrameStream,
}

pub trait Connector: Send + Sync {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Connection, WsError>>;
}

// ─── tokio-tungstenite ───────────────────────────────────────────────────────

#[cfg(feature = "ws-native")]
pub use native::TungsteniteConnector;

#[cfg(feature = "ws-native")]
mod native {
    use super::*;
    use futures_util::stream::SplitSink;
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

    /// Default connector backed by `tokio-tungstenite`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct TungsteniteConnector;

    struct TungsteniteSink(SplitSink<WsStream, Message>);

    impl FrameSink for TungsteniteSink {
        fn send(&mut self, frame: Frame) -> BoxFuture<'_, Result<(), WsError>> {
            Box::pin(async move {
                let msg = match frame {
                    Frame::Text(text) => Message::Text(text.into()),
                    Frame::Binary(data) => Message::Binary(data.into()),
                    Frame::Ping(data) => Message::Ping(data.into()),
                    Frame::Pong(data) => Message::Pong(data.into()),
                    Frame::Close(close) => Message::Close(close.map(|(code, reason)| CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    })),
                };
                self.0
                    .send(msg)
                    .await
                    .map_err(|e| WsError::SendFailed(e.to_string()))
            })
        }
    }

    fn to_frame(msg: Message) -> Option<Frame> {
        match msg {
            Message::Text(text) => {
                let text_str: &str = text.as_ref();
                Some(Frame::Text(text_str.to_owned()))
            }
            Message::Binary(data) => Some(Frame::Binary(data.to_vec())),
            Message::Ping(data) => Some(Frame::Ping(data.to_vec())),
            Message::Pong(data) => Some(Frame::Pong(data.to_vec())),
            Message::Close(frame) => Some(Frame::Close(extract_close(frame.as_ref()))),
            Message::Frame(_) => None,
        }
    }

    fn extract_close(frame: Option<&CloseFrame>) -> Option<(u16, String)> {
        frame.map(|f| (f.code.into(), f.reason.as_str().to_owned()))
    }

    impl Connector for TungsteniteConnector {
        fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Connection, WsError>> {
            Box::pin(async move {
                let (ws_stream, _) = connect_async(url)
                    .await
                    .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;
                let (sink, stream) = ws_stream.split();
                let stream = stream
                    .filter_map(|item| async move {
                        match item {
                            Ok(msg) => to_frame(msg).map(Ok),
                            Err(e) => Some(Err(WsError::Closed {
                                code: None,
                                reason: e.to_string(),
                            })),
                        }
                    })
                    .boxed();
                Ok(Connection {
                    sink: Box::new(TungsteniteSink(sink)),
                    stream,
                })
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_extract_close_with_frame() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "goodbye".into(),
            };
            assert_eq!(extract_close(Some(&frame)), Some((1000, "goodbye".to_string())));
        }

        #[test]
        fn test_extract_close_no_frame() {
            assert_eq!(extract_close(None), None);
        }

        #[test]
        fn test_text_message_to_frame() {
            let frame = to_frame(Message::Text("{}".into()));
            assert_eq!(frame, Some(Frame::Text("{}".into())));
        }
    }
}
