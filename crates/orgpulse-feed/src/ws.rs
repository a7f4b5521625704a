use crate::channel::{ChannelConnector, ChannelFrame, ChannelLink};
use futures_util::StreamExt;
use orgpulse_core::FeedError;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};
use url::Url;

const HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Opens the push channel over a websocket.
#[derive(Debug, Clone)]
pub struct WsConnector {
    handshake_timeout: Duration,
}

impl WsConnector {
    pub fn new(handshake_timeout: Duration) -> Self {
        Self { handshake_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(HANDSHAKE_TIMEOUT_SECS))
    }
}

impl ChannelConnector for WsConnector {
    type Link = WsLink;

    async fn open(&self, url: Url) -> Result<WsLink, FeedError> {
        let handshake = tokio::time::timeout(self.handshake_timeout, connect_async(url.as_str()));
        let (stream, response) = match handshake.await {
            Ok(Ok(connected)) => connected,
            Ok(Err(err)) => return Err(FeedError::Transport(format!("handshake failed: {err}"))),
            Err(_) => return Err(FeedError::Transport("handshake timed out".to_string())),
        };
        debug!(status = response.status().as_u16(), "ws_handshake_complete");
        Ok(WsLink { stream })
    }
}

pub struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ChannelLink for WsLink {
    async fn next_frame(&mut self) -> Option<Result<ChannelFrame, FeedError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(err) => return Some(Err(FeedError::Transport(err.to_string()))),
            };
            let frame = match message {
                Message::Text(text) => ChannelFrame::Text(text),
                Message::Binary(bytes) => ChannelFrame::Binary(bytes),
                Message::Close(frame) => ChannelFrame::Close(frame.map(|close| close.reason.to_string())),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    trace!("ws_control_frame");
                    continue;
                }
            };
            return Some(Ok(frame));
        }
    }

    async fn close(&mut self) {
        if let Err(err) = self.stream.close(None).await {
            debug!("ws_close_error: {err}");
        }
    }
}
