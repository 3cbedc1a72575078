//! Order book feed: subscribe to one symbol and forward decoded snapshots.
//!
//! [`run_order_book_feed`] walks through connecting, subscribing, delivering
//! and terminating. Undecodable events are dropped; anything arriving on the
//! client's error queue ends the feed.

use std::future::Future;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::error::TransportError;
use crate::models::{OrderBook, decode_order_book_value};
use crate::websocket::StreamClient;

/// Why the delivery loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stopped {
    /// The stop signal fired or its sender was dropped.
    Requested,
    /// The caller dropped the delivery receiver.
    ReceiverGone,
}

/// Streams order book snapshots for `symbol` into `sink` until `stop`
/// resolves (by send or by dropping its sender).
///
/// `connect` is awaited once; there is no retry.
///
/// # Errors
///
/// Returns the connect or subscribe failure, or the first error the client
/// reports while delivering. A requested stop, or `sink`'s receiver being
/// dropped, returns `Ok(())`.
pub async fn run_order_book_feed<C, F>(
    connect: F,
    symbol: &str,
    sink: mpsc::Sender<OrderBook>,
    stop: oneshot::Receiver<()>,
) -> Result<()>
where
    C: StreamClient,
    F: Future<Output = std::result::Result<C, TransportError>>,
{
    let mut client = connect.await?;

    let channel = client.order_book_channel(symbol);
    if let Err(e) = client.subscribe(&[channel.as_str()]).await {
        error!(symbol, %channel, error = %e, "Order book subscription failed");
        client.close();
        return Err(e.into());
    }
    info!(symbol, %channel, "Order book feed started");

    let outcome = deliver(&mut client, &sink, stop).await;

    if let Err(e) = client.unsubscribe(&[channel.as_str()]).await {
        debug!(%channel, error = %e, "Unsubscribe failed during shutdown");
    }
    client.close();

    match outcome {
        Ok(reason) => {
            info!(symbol, ?reason, "Order book feed stopped");
            Ok(())
        }
        Err(e) => {
            error!(symbol, error = %e, "Order book feed failed");
            Err(e)
        }
    }
}

async fn deliver<C: StreamClient>(
    client: &mut C,
    sink: &mpsc::Sender<OrderBook>,
    mut stop: oneshot::Receiver<()>,
) -> Result<Stopped> {
    let inbound = client.inbound();

    loop {
        tokio::select! {
            envelope = inbound.stream.recv() => {
                let Some(envelope) = envelope else {
                    // The reader queues its fatal error before closing the stream.
                    return Err(match inbound.errors.try_recv() {
                        Ok(e) => e.into(),
                        Err(_) => {
                            warn!("Stream closed by reader");
                            TransportError::Closed.into()
                        }
                    });
                };

                if !envelope.is_data() {
                    debug!(
                        event = %envelope.event,
                        channel = %envelope.channel,
                        "Ignoring non-data event"
                    );
                    continue;
                }

                let book = match decode_order_book_value(envelope.data) {
                    Ok(book) => book,
                    Err(e) => {
                        debug!(error = %e, "Dropping undecodable order book");
                        continue;
                    }
                };
                debug!(
                    timestamp = %book.timestamp,
                    bids = book.bids.len(),
                    asks = book.asks.len(),
                    "Order book snapshot"
                );

                tokio::select! {
                    sent = sink.send(book) => {
                        if sent.is_err() {
                            return Ok(Stopped::ReceiverGone);
                        }
                    }
                    _ = &mut stop => return Ok(Stopped::Requested),
                }
            }
            err = inbound.errors.recv() => {
                return Err(match err {
                    Some(e) => e.into(),
                    None => TransportError::Closed.into(),
                });
            }
            _ = &mut stop => return Ok(Stopped::Requested),
        }
    }
}
