//! Point-in-time queries against the Bitstamp REST API.
//!
//! Every call is a single unauthenticated `GET`; response bodies go through
//! the same decoders as the streaming path, and any decode failure fails the
//! call.

use std::fmt;

use tracing::debug;

use crate::Result;
use crate::models::{OrderBook, Ticker, Trade, decode_order_book, decode_ticker, decode_trades};

/// Bitstamp REST API v2 base URL.
pub const BITSTAMP_API_URL: &str = "https://www.bitstamp.net/api/v2";

/// Look-back window for [`RestClient::trades_in`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradeInterval {
    Minute,
    /// The server-side default.
    #[default]
    Hour,
    Day,
}

impl TradeInterval {
    /// Returns the value of the `time` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeInterval::Minute => "minute",
            TradeInterval::Hour => "hour",
            TradeInterval::Day => "day",
        }
    }
}

impl fmt::Display for TradeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP client for the public market-data endpoints.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    /// Creates a client rooted at `base_url` (e.g. [`BITSTAMP_API_URL`]).
    ///
    /// # Errors
    ///
    /// Returns [`StampedeError::Http`](crate::StampedeError::Http) if the
    /// HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("stampede/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<u8>> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, ?query, "GET");

        let mut request = self.http.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?.error_for_status()?;

        Ok(response.bytes().await?.to_vec())
    }

    /// Fetches the ticker for `symbol` (e.g. `"btcusd"`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-success status, or the body does not decode.
    pub async fn ticker(&self, symbol: &str) -> Result<Ticker> {
        let body = self.get(&format!("/ticker/{symbol}"), &[]).await?;
        Ok(decode_ticker(&body)?)
    }

    /// Fetches a full order book snapshot for `symbol`.
    ///
    /// # Errors
    ///
    /// Same as [`RestClient::ticker`].
    pub async fn order_book(&self, symbol: &str) -> Result<OrderBook> {
        let body = self.get(&format!("/order_book/{symbol}"), &[]).await?;
        Ok(decode_order_book(&body)?)
    }

    /// Fetches recent trades for `symbol` using the server's default window.
    ///
    /// # Errors
    ///
    /// Same as [`RestClient::ticker`]. A single invalid trade fails the call.
    pub async fn trades(&self, symbol: &str) -> Result<Vec<Trade>> {
        let body = self.get(&format!("/transactions/{symbol}"), &[]).await?;
        Ok(decode_trades(&body)?)
    }

    /// Fetches trades for `symbol` from the given look-back window.
    ///
    /// # Errors
    ///
    /// Same as [`RestClient::trades`].
    pub async fn trades_in(&self, symbol: &str, interval: TradeInterval) -> Result<Vec<Trade>> {
        let body = self
            .get(
                &format!("/transactions/{symbol}"),
                &[("time", interval.as_str())],
            )
            .await?;
        Ok(decode_trades(&body)?)
    }
}
