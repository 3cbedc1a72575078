//! Shared models for Bitstamp market data.
//!
//! Contains the websocket envelope types and the field-parsing helpers used
//! by every record decoder. Bitstamp encodes every number as a string, so all
//! decoders go through [`parse_field`] and report failures with the name of
//! the offending field.

pub mod book;
pub mod ticker;
pub mod trade;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

pub use book::{Order, OrderBook, Side, WireOrderBook, decode_order_book, decode_order_book_value};
pub use ticker::{Ticker, decode_ticker};
pub use trade::{PartialTrades, Trade, decode_trades, decode_trades_partial};

/// Event name carried by envelopes holding a market-data payload.
pub const DATA_EVENT: &str = "data";

/// An inbound websocket message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Returns `true` if this envelope carries a market-data payload.
    pub fn is_data(&self) -> bool {
        self.event == DATA_EVENT
    }
}

/// A subscribe/unsubscribe request sent over the websocket.
#[derive(Debug, Serialize)]
pub struct ControlRequest {
    pub event: String,
    pub data: ControlData,
}

#[derive(Debug, Serialize)]
pub struct ControlData {
    pub channel: String,
}

impl ControlRequest {
    pub fn new(event: impl Into<String>, channel: &str) -> Self {
        Self {
            event: event.into(),
            data: ControlData {
                channel: channel.to_string(),
            },
        }
    }
}

/// Parses a numeric string field, naming `field` in the error.
///
/// # Errors
///
/// Returns [`ValidationError::Number`] wrapping the parser's own error.
pub fn parse_field<T>(field: &'static str, raw: &str) -> Result<T, ValidationError>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>().map_err(|source| ValidationError::Number {
        field,
        value: raw.to_string(),
        source: Box::new(source),
    })
}

/// Parses a unix-seconds string into a UTC instant.
///
/// # Errors
///
/// Returns a [`ValidationError`] if `raw` is not a base-10 integer or lies
/// outside the range chrono can represent.
pub fn parse_unix_seconds(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let secs: i64 = parse_field(field, raw)?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| ValidationError::OutOfRange {
        field,
        value: raw.to_string(),
    })
}

/// Extracts a mandatory string field from a loosely-typed value.
pub(crate) fn require_str<'a>(
    field: &'static str,
    value: Option<&'a Value>,
) -> Result<&'a str, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::Missing { field }),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ValidationError::WrongType {
            field,
            expected: "string",
        }),
    }
}
