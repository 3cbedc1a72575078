//! Entry point bundling configuration, REST queries and the order book feed.

use tokio::sync::{mpsc, oneshot};

use crate::Result;
use crate::config::ApiConfig;
use crate::feed::run_order_book_feed;
use crate::models::{OrderBook, Ticker, Trade};
use crate::rest::{RestClient, TradeInterval};
use crate::websocket::{BitstampProtocol, PusherProtocol, WsClient};

/// Bitstamp public market-data client.
#[derive(Debug, Clone)]
pub struct Bitstamp {
    config: ApiConfig,
    rest: RestClient,
}

impl Bitstamp {
    /// Creates a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let rest = RestClient::new(config.rest_url.clone())?;
        Ok(Self { config, rest })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// See [`RestClient::ticker`].
    pub async fn ticker(&self, symbol: &str) -> Result<Ticker> {
        self.rest.ticker(symbol).await
    }

    /// See [`RestClient::order_book`].
    pub async fn order_book(&self, symbol: &str) -> Result<OrderBook> {
        self.rest.order_book(symbol).await
    }

    /// See [`RestClient::trades`].
    pub async fn trades(&self, symbol: &str) -> Result<Vec<Trade>> {
        self.rest.trades(symbol).await
    }

    /// See [`RestClient::trades_in`].
    pub async fn trades_in(&self, symbol: &str, interval: TradeInterval) -> Result<Vec<Trade>> {
        self.rest.trades_in(symbol, interval).await
    }

    /// Streams order book snapshots for `symbol` over the native websocket
    /// API until `stop` resolves. See [`run_order_book_feed`].
    ///
    /// # Errors
    ///
    /// Returns an error if connecting or subscribing fails, or when the
    /// connection reports an error while streaming.
    pub async fn subscribe_order_book(
        &self,
        symbol: &str,
        sink: mpsc::Sender<OrderBook>,
        stop: oneshot::Receiver<()>,
    ) -> Result<()> {
        let connect = WsClient::connect(&self.config.websocket_url, BitstampProtocol);
        run_order_book_feed(connect, symbol, sink, stop).await
    }

    /// Same as [`Bitstamp::subscribe_order_book`], over the push-service
    /// endpoint.
    ///
    /// # Errors
    ///
    /// Same as [`Bitstamp::subscribe_order_book`].
    pub async fn subscribe_order_book_pusher(
        &self,
        symbol: &str,
        sink: mpsc::Sender<OrderBook>,
        stop: oneshot::Receiver<()>,
    ) -> Result<()> {
        let connect = WsClient::connect(&self.config.pusher_url, PusherProtocol::default());
        run_order_book_feed(connect, symbol, sink, stop).await
    }
}
