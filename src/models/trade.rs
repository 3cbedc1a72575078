//! Trade (transaction) models and decoding.
//!
//! Bitstamp returns recent transactions newest first; the decoders keep
//! whatever order the response had.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{parse_field, parse_unix_seconds, require_str};
use crate::error::{DecodeError, ValidationError};

/// A single executed trade.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub time: DateTime<Utc>,
    pub id: String,
    pub price: f64,
    pub amount: f64,
}

/// A trade list that failed part-way through decoding.
///
/// `decoded` holds every trade that preceded the failing element.
#[derive(Debug, thiserror::Error)]
#[error("decoded {} trade(s) before failure: {error}", .decoded.len())]
pub struct PartialTrades {
    pub decoded: Vec<Trade>,
    #[source]
    pub error: DecodeError,
}

#[derive(Deserialize)]
struct RawTrade {
    price: Option<Value>,
    amount: Option<Value>,
    date: Option<Value>,
    tid: Option<Value>,
}

impl RawTrade {
    fn validate(self) -> Result<Trade, ValidationError> {
        Ok(Trade {
            time: parse_unix_seconds("date", require_str("date", self.date.as_ref())?)?,
            id: require_str("tid", self.tid.as_ref())?.to_string(),
            price: parse_field("price", require_str("price", self.price.as_ref())?)?,
            amount: parse_field("amount", require_str("amount", self.amount.as_ref())?)?,
        })
    }
}

fn parse_trade(value: Value) -> Result<Trade, ValidationError> {
    if !value.is_object() {
        return Err(ValidationError::WrongType {
            field: "trade",
            expected: "object",
        });
    }
    // Every field is optional at this stage, so an object always deserializes.
    let raw = RawTrade::deserialize(value).map_err(|_| ValidationError::WrongType {
        field: "trade",
        expected: "object",
    })?;
    raw.validate()
}

/// Decodes a trade list, keeping the trades that preceded a failure.
///
/// # Errors
///
/// Returns [`PartialTrades`] carrying the decoded prefix and the
/// [`DecodeError`] that stopped decoding.
pub fn decode_trades_partial(bytes: &[u8]) -> Result<Vec<Trade>, PartialTrades> {
    let items: Vec<Value> = serde_json::from_slice(bytes).map_err(|e| PartialTrades {
        decoded: Vec::new(),
        error: e.into(),
    })?;

    let mut decoded = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match parse_trade(item) {
            Ok(trade) => decoded.push(trade),
            Err(source) => {
                return Err(PartialTrades {
                    decoded,
                    error: DecodeError::Trade { index, source },
                });
            }
        }
    }

    Ok(decoded)
}

/// Decodes a trade list atomically: any invalid element fails the whole
/// batch and nothing is returned.
///
/// # Errors
///
/// Returns a [`DecodeError`] identifying the failing element.
pub fn decode_trades(bytes: &[u8]) -> Result<Vec<Trade>, DecodeError> {
    decode_trades_partial(bytes).map_err(|partial| partial.error)
}
