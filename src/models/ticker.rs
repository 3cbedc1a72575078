use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::{parse_field, require_str};
use crate::error::DecodeError;

/// Last-24h ticker for a currency pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub last: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub ask: Decimal,
    pub bid: Decimal,
}

#[derive(Deserialize)]
struct RawTicker {
    last: Option<Value>,
    high: Option<Value>,
    low: Option<Value>,
    ask: Option<Value>,
    bid: Option<Value>,
}

/// Decodes a `/ticker/{symbol}` response.
///
/// # Errors
///
/// Returns a [`DecodeError`] for malformed JSON or any missing, wrongly
/// typed or non-decimal field.
pub fn decode_ticker(bytes: &[u8]) -> Result<Ticker, DecodeError> {
    let raw: RawTicker = serde_json::from_slice(bytes)?;

    Ok(Ticker {
        last: parse_field("last", require_str("last", raw.last.as_ref())?)?,
        high: parse_field("high", require_str("high", raw.high.as_ref())?)?,
        low: parse_field("low", require_str("low", raw.low.as_ref())?)?,
        ask: parse_field("ask", require_str("ask", raw.ask.as_ref())?)?,
        bid: parse_field("bid", require_str("bid", raw.bid.as_ref())?)?,
    })
}
