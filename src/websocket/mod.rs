//! Async websocket client for the Bitstamp streaming API.
//!
//! This module is organized by layer:
//! - [`transport`] - Frame reader/writer traits over tokio-tungstenite
//! - [`protocol`] - Wire dialects (native `bts:` and push-service `pusher:`)
//! - [`connection`] - [`WsClient`], the read loop and the control writer

pub mod connection;
pub mod protocol;
pub mod transport;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{StreamError, TransportError};
use crate::models::Envelope;

pub use connection::{READ_RETRY_DELAY, WsClient};
pub use protocol::{BitstampProtocol, Control, Protocol, PusherProtocol};
pub use transport::{FrameReader, FrameWriter, WsReader, WsWriter, connect};

/// Queues a stream client delivers into.
pub struct Inbound {
    /// Decoded envelopes. The read loop waits until each one is taken.
    pub stream: mpsc::Receiver<Envelope>,
    /// Transport and decode errors. Holds at most one; later errors are
    /// dropped while it is full.
    pub errors: mpsc::Receiver<StreamError>,
}

/// A persistent streaming connection.
///
/// Implementations own their connection and a background reader; callers
/// drive them through control requests and drain [`Inbound`].
#[async_trait]
pub trait StreamClient: Send + Sync {
    /// Subscribes to each channel in turn.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if a control frame cannot be written or
    /// the connection has already been released.
    async fn subscribe(&self, channels: &[&str]) -> Result<(), TransportError>;

    /// Unsubscribes from each channel in turn.
    ///
    /// # Errors
    ///
    /// Same as [`StreamClient::subscribe`].
    async fn unsubscribe(&self, channels: &[&str]) -> Result<(), TransportError>;

    /// Requests shutdown. Safe to call any number of times.
    fn close(&self);

    fn inbound(&mut self) -> &mut Inbound;

    /// Name of the order-book channel for `symbol` in this client's dialect.
    fn order_book_channel(&self, symbol: &str) -> String;
}
