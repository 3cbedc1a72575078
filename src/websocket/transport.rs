//! Frame-level transport abstraction.
//!
//! The read loop and the control writer only ever see [`FrameReader`] and
//! [`FrameWriter`], so a real tokio-tungstenite connection and an in-memory
//! fake are interchangeable.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use tungstenite::Message;

use crate::error::TransportError;

/// Write half of a websocket connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a websocket connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Source of complete inbound frames.
#[async_trait]
pub trait FrameReader: Send + 'static {
    /// Waits for the next data frame.
    async fn read_frame(&mut self) -> Result<Vec<u8>, TransportError>;
}

/// Sink for complete outbound frames.
#[async_trait]
pub trait FrameWriter: Send + 'static {
    async fn write_frame(&mut self, frame: String) -> Result<(), TransportError>;

    /// Performs the closing handshake and releases the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Establishes a websocket connection to the given URL.
///
/// # Errors
///
/// Returns [`TransportError::Connect`] if the TCP, TLS or websocket
/// handshake fails.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader), TransportError> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(TransportError::Connect)?;
    info!(url, "WebSocket handshake completed");

    Ok(ws_stream.split())
}

#[async_trait]
impl FrameReader for WsReader {
    async fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_bytes().to_vec()),
                Some(Ok(Message::Binary(bytes))) => return Ok(bytes.to_vec()),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Received close frame");
                    return Err(TransportError::Closed);
                }
                // Ping/Pong/raw frames are handled by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::Read(e)),
                None => return Err(TransportError::Closed),
            }
        }
    }
}

#[async_trait]
impl FrameWriter for WsWriter {
    async fn write_frame(&mut self, frame: String) -> Result<(), TransportError> {
        self.send(Message::Text(frame.into()))
            .await
            .map_err(TransportError::Write)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        SinkExt::close(self).await.map_err(TransportError::Write)
    }
}
