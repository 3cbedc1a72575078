//! Wire dialects spoken over a [`WsClient`](super::WsClient).
//!
//! Bitstamp serves the same order-book data through two endpoints: its
//! native websocket API (`bts:` control events) and the older push-service
//! endpoint (`pusher:` control events, payloads double-encoded as JSON
//! strings). Each dialect is a separate [`Protocol`] so their channel naming
//! never gets mixed up.

use serde_json::{Value, json};

use crate::error::DecodeError;
use crate::models::{ControlRequest, Envelope};

/// Native Bitstamp websocket endpoint.
pub const BITSTAMP_WS_URL: &str = "wss://ws.bitstamp.net";

/// Application key Bitstamp publishes for its push-service channels.
pub const PUSHER_APP_KEY: &str = "de504dc5763aeef9ff52";

/// Push-service endpoint for [`PUSHER_APP_KEY`].
///
/// `concat!` only accepts literals, so the key is spelled out again here.
pub const PUSHER_WS_URL: &str = concat!(
    "wss://ws.pusherapp.com/app/de504dc5763aeef9ff52?protocol=7&client=stampede&version=",
    env!("CARGO_PKG_VERSION")
);

/// Market whose push-service order-book channel has no symbol suffix.
pub const DEFAULT_SYMBOL: &str = "btcusd";

/// Control action carried by a subscribe/unsubscribe frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Subscribe,
    Unsubscribe,
}

impl Control {
    pub fn as_str(&self) -> &'static str {
        match self {
            Control::Subscribe => "subscribe",
            Control::Unsubscribe => "unsubscribe",
        }
    }
}

/// A websocket dialect: how control frames look, how inbound frames decode,
/// and how channels are named.
pub trait Protocol: Send + Sync + 'static {
    /// Builds the control frame for one channel.
    fn control_frame(&self, control: Control, channel: &str) -> String;

    /// Decodes one inbound frame into an [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the frame is not a valid envelope.
    fn decode_envelope(&self, frame: &[u8]) -> Result<Envelope, DecodeError>;

    /// Name of the order-book channel for `symbol`.
    fn order_book_channel(&self, symbol: &str) -> String;

    /// Frame to send back immediately in response to `envelope`, if any.
    fn auto_reply(&self, _envelope: &Envelope) -> Option<String> {
        None
    }
}

/// Bitstamp's native websocket API.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitstampProtocol;

impl Protocol for BitstampProtocol {
    fn control_frame(&self, control: Control, channel: &str) -> String {
        let request = ControlRequest::new(format!("bts:{}", control.as_str()), channel);
        json!(request).to_string()
    }

    fn decode_envelope(&self, frame: &[u8]) -> Result<Envelope, DecodeError> {
        Ok(serde_json::from_slice(frame)?)
    }

    fn order_book_channel(&self, symbol: &str) -> String {
        format!("order_book_{symbol}")
    }
}

/// The push-service dialect.
#[derive(Debug, Clone)]
pub struct PusherProtocol {
    default_symbol: String,
}

impl PusherProtocol {
    /// Creates a dialect whose bare `order_book` channel belongs to `default_symbol`.
    pub fn new(default_symbol: impl Into<String>) -> Self {
        Self {
            default_symbol: default_symbol.into(),
        }
    }
}

impl Default for PusherProtocol {
    fn default() -> Self {
        Self::new(DEFAULT_SYMBOL)
    }
}

impl Protocol for PusherProtocol {
    fn control_frame(&self, control: Control, channel: &str) -> String {
        let request = ControlRequest::new(format!("pusher:{}", control.as_str()), channel);
        json!(request).to_string()
    }

    fn decode_envelope(&self, frame: &[u8]) -> Result<Envelope, DecodeError> {
        let mut envelope: Envelope = serde_json::from_slice(frame)?;
        // Payloads arrive as JSON text inside a string.
        if let Value::String(text) = &envelope.data
            && let Ok(inner) = serde_json::from_str::<Value>(text)
        {
            envelope.data = inner;
        }
        Ok(envelope)
    }

    fn order_book_channel(&self, symbol: &str) -> String {
        if symbol == self.default_symbol {
            "order_book".to_string()
        } else {
            format!("order_book_{symbol}")
        }
    }

    fn auto_reply(&self, envelope: &Envelope) -> Option<String> {
        (envelope.event == "pusher:ping")
            .then(|| json!({ "event": "pusher:pong", "data": {} }).to_string())
    }
}
