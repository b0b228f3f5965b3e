//! Status channel transport.
//!
//! One [`Connector::open`] call yields one server-push channel: a stream of
//! raw [`Frame`]s that ends exactly once (close frame, error, idle timeout,
//! or end of stream). There is no retry logic here; reconnection is the
//! caller's job.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//! use relay_api::{Connector, WsConnector};
//! use url::Url;
//!
//! let url = Url::parse("ws://localhost:8000/api/v1/ws/status")?;
//! let mut frames = WsConnector::default().open(&url).await?;
//! while let Some(frame) = frames.next().await {
//!     println!("{:?}", frame?);
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::Error;

// ── Frame ────────────────────────────────────────────────────────────

/// One raw message delivered by the status channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// The frame sequence of one open channel. An `Err` item is terminal.
pub type FrameStream = BoxStream<'static, Result<Frame, Error>>;

// ── Connector ────────────────────────────────────────────────────────

/// Opens one push channel to a fixed endpoint.
///
/// Implementations must not retry: a failed open returns `Err`, and an
/// open channel terminates exactly once.
pub trait Connector: Send + Sync + 'static {
    fn open(&self, endpoint: &Url) -> impl Future<Output = Result<FrameStream, Error>> + Send;
}

// ── WsConnector ──────────────────────────────────────────────────────

/// [`Connector`] backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    /// End the channel if no frame (of any kind) arrives within this window.
    pub idle_timeout: Option<Duration>,
}

impl WsConnector {
    pub fn with_idle_timeout(idle_timeout: Option<Duration>) -> Self {
        Self { idle_timeout }
    }
}

impl Connector for WsConnector {
    async fn open(&self, endpoint: &Url) -> Result<FrameStream, Error> {
        tracing::info!(url = %endpoint, "Connecting to status channel");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(endpoint.as_str())
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        tracing::info!("Status channel connected");

        // Server-to-client only; the write half is never used.
        let (_write, mut read) = ws_stream.split();
        let idle = self.idle_timeout;

        let frames = async_stream::stream! {
            loop {
                let next = match idle {
                    Some(window) => {
                        if let Ok(next) = tokio::time::timeout(window, read.next()).await {
                            next
                        } else {
                            yield Err(Error::IdleTimeout { idle_secs: window.as_secs() });
                            break;
                        }
                    }
                    None => read.next().await,
                };

                match next {
                    Some(Ok(Message::Text(text))) => {
                        yield Ok(Frame::Text(text.as_str().to_owned()));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        yield Ok(Frame::Binary(data.to_vec()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "Status channel close frame received"
                            );
                        } else {
                            tracing::info!("Status channel close frame received (no payload)");
                        }
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong/raw frames; tungstenite answers pings itself
                        tracing::trace!("Status channel control frame");
                    }
                    Some(Err(e)) => {
                        yield Err(Error::WebSocketConnect(e.to_string()));
                        break;
                    }
                    None => {
                        tracing::info!("Status channel stream ended");
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(frames))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use futures_util::SinkExt;
    use tokio::net::TcpListener;

    /// Accept exactly one WebSocket client and run `script` against it.
    async fn one_shot_server<F, Fut>(script: F) -> Url
    where
        F: FnOnce(
                tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
            ) -> Fut
            + Send
            + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            script(ws).await;
        });
        Url::parse(&format!("ws://{addr}/api/v1/ws/status")).unwrap()
    }

    #[tokio::test]
    async fn delivers_text_and_binary_then_ends_on_close() {
        let url = one_shot_server(|mut ws| async move {
            ws.send(Message::text("{\"a\":1}")).await.unwrap();
            ws.send(Message::binary(b"raw".to_vec())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut frames = WsConnector::default().open(&url).await.unwrap();

        assert_eq!(
            frames.next().await.unwrap().unwrap(),
            Frame::Text("{\"a\":1}".into())
        );
        assert_eq!(
            frames.next().await.unwrap().unwrap(),
            Frame::Binary(b"raw".to_vec())
        );
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn idle_window_terminates_channel() {
        let url = one_shot_server(|ws| async move {
            // Hold the connection open without sending anything.
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(ws);
        })
        .await;

        let connector = WsConnector::with_idle_timeout(Some(Duration::from_millis(50)));
        let mut frames = connector.open(&url).await.unwrap();

        let err = frames.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::IdleTimeout { .. }));
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn refused_connection_is_an_open_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("ws://{addr}/api/v1/ws/status")).unwrap();
        let result = WsConnector::default().open(&url).await;
        assert!(matches!(result, Err(Error::WebSocketConnect(_))));
    }
}
