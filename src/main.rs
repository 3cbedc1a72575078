use stampede::config::fetch_config;
use stampede::websocket::protocol::DEFAULT_SYMBOL;
use stampede::{Bitstamp, StampedeError};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), StampedeError> {
    // Initialize tracing subscriber for logging output.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = fetch_config()?;
    let symbol = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SYMBOL.to_string());

    let api = Bitstamp::new(config)?;

    let ticker = api.ticker(&symbol).await?;
    info!(
        %symbol,
        last = %ticker.last,
        bid = %ticker.bid,
        ask = %ticker.ask,
        high = %ticker.high,
        low = %ticker.low,
        "Ticker"
    );

    let (book_tx, mut book_rx) = mpsc::channel(16);
    let (stop_tx, stop_rx) = oneshot::channel();
    let feed =
        tokio::spawn(async move { api.subscribe_order_book(&symbol, book_tx, stop_rx).await });

    let print_books = async {
        while let Some(book) = book_rx.recv().await {
            info!(
                timestamp = %book.timestamp,
                best_bid = book.best_bid().map(|o| o.price),
                best_ask = book.best_ask().map(|o| o.price),
                levels = book.bids.len() + book.asks.len(),
                "Order book"
            );
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping feed");
            let _ = stop_tx.send(());
        }
        () = print_books => {}
    }

    match feed.await {
        Ok(result) => result,
        Err(e) => {
            error!("Feed task failed: {e}");
            Ok(())
        }
    }
}
