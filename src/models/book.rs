//! Order book models and decoding.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{parse_field, require_str};
use crate::error::{DecodeError, ValidationError};

/// Which half of the book a price level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bids,
    Asks,
}

impl Side {
    /// Returns the wire-format field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bids => "bids",
            Side::Asks => "asks",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(price, amount)` level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    pub price: f64,
    pub amount: f64,
}

/// A complete order book snapshot.
///
/// Levels keep the order the exchange sent them in; nothing here sorts.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBook {
    pub timestamp: DateTime<Utc>,
    pub bids: Vec<Order>,
    pub asks: Vec<Order>,
}

impl OrderBook {
    /// Best bid, i.e. the first level on the bid side.
    pub fn best_bid(&self) -> Option<&Order> {
        self.bids.first()
    }

    /// Best ask, i.e. the first level on the ask side.
    pub fn best_ask(&self) -> Option<&Order> {
        self.asks.first()
    }

    /// Re-encodes the snapshot in the shape Bitstamp sends it.
    ///
    /// Decoding the serialized result yields a book equal to `self`.
    pub fn to_wire(&self) -> WireOrderBook {
        let levels = |orders: &[Order]| -> Vec<[String; 2]> {
            orders
                .iter()
                .map(|o| [o.price.to_string(), o.amount.to_string()])
                .collect()
        };

        WireOrderBook {
            timestamp: self.timestamp.timestamp().to_string(),
            bids: levels(&self.bids),
            asks: levels(&self.asks),
        }
    }
}

/// Wire representation of an order book: every number as a string.
#[derive(Debug, Clone, Serialize)]
pub struct WireOrderBook {
    pub timestamp: String,
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
}

/// Schema-tolerant first stage; every field is checked in [`RawOrderBook::validate`].
#[derive(Deserialize)]
struct RawOrderBook {
    /// `None` only when the key is absent; an explicit `null` is `Some`.
    #[serde(default, deserialize_with = "present")]
    timestamp: Option<Value>,
    bids: Option<Value>,
    asks: Option<Value>,
}

impl RawOrderBook {
    fn validate(self) -> Result<OrderBook, DecodeError> {
        let timestamp = match self.timestamp {
            None => Utc::now().trunc_subsecs(0),
            Some(Value::String(raw)) => raw
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .ok_or(DecodeError::InvalidTimestamp(raw))?,
            Some(other) => return Err(DecodeError::InvalidTimestamp(other.to_string())),
        };

        Ok(OrderBook {
            timestamp,
            bids: parse_side(Side::Bids, self.bids)?,
            asks: parse_side(Side::Asks, self.asks)?,
        })
    }
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

fn parse_side(side: Side, levels: Option<Value>) -> Result<Vec<Order>, DecodeError> {
    parse_levels(side, levels).map_err(|source| DecodeError::Side { side, source })
}

fn parse_levels(side: Side, levels: Option<Value>) -> Result<Vec<Order>, ValidationError> {
    let levels = match levels {
        None | Some(Value::Null) => {
            return Err(ValidationError::Missing {
                field: side.as_str(),
            });
        }
        Some(Value::Array(levels)) => levels,
        Some(_) => {
            return Err(ValidationError::WrongType {
                field: side.as_str(),
                expected: "array",
            });
        }
    };

    levels.iter().map(parse_level).collect()
}

fn parse_level(level: &Value) -> Result<Order, ValidationError> {
    let pair = level.as_array().ok_or(ValidationError::WrongType {
        field: "level",
        expected: "array",
    })?;
    let [price, amount] = pair.as_slice() else {
        return Err(ValidationError::Arity { found: pair.len() });
    };

    Ok(Order {
        price: parse_field("price", require_str("price", Some(price))?)?,
        amount: parse_field("amount", require_str("amount", Some(amount))?)?,
    })
}

/// Decodes an order book from raw JSON bytes.
///
/// A missing `timestamp` defaults to the current time (second resolution).
///
/// # Errors
///
/// Returns [`DecodeError::Json`] for malformed JSON,
/// [`DecodeError::InvalidTimestamp`] for a bad timestamp, and
/// [`DecodeError::Side`] naming `bids` or `asks` for any level violation.
pub fn decode_order_book(bytes: &[u8]) -> Result<OrderBook, DecodeError> {
    let raw: RawOrderBook = serde_json::from_slice(bytes)?;
    raw.validate()
}

/// Decodes an order book from an already-parsed JSON payload.
///
/// # Errors
///
/// Same as [`decode_order_book`].
pub fn decode_order_book_value(value: Value) -> Result<OrderBook, DecodeError> {
    let raw: RawOrderBook = serde_json::from_value(value)?;
    raw.validate()
}
