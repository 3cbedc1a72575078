//! Order book feed tests over in-memory transports.

mod common;

use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use stampede::StampedeError;
use stampede::error::{StreamError, TransportError};
use stampede::feed::run_order_book_feed;
use stampede::websocket::{BitstampProtocol, Protocol, PusherProtocol, WsClient};

use common::{RecordingWriter, reset_error, scripted_reader, text};

const BOOK_FRAME: &str = r#"{"event":"data","channel":"order_book_btcusd","data":{"timestamp":"1700000000","bids":[["100.5","1"]],"asks":[["101","2"]]}}"#;
const BAD_BOOK_FRAME: &str = r#"{"event":"data","channel":"order_book_btcusd","data":{"timestamp":"1700000000","bids":[["x","1"]],"asks":[]}}"#;

/// Connect future that hands back a client over the given fakes.
async fn fake_connect<P: Protocol>(
    reader: common::ScriptedReader,
    writer: RecordingWriter,
    protocol: P,
) -> Result<WsClient<P>, TransportError> {
    Ok(WsClient::with_transport(reader, writer, protocol))
}

fn control_events(writer: &RecordingWriter) -> Vec<(String, String)> {
    writer
        .frames()
        .iter()
        .map(|frame| {
            let value: Value = serde_json::from_str(frame).unwrap();
            (
                value["event"].as_str().unwrap().to_string(),
                value["data"]["channel"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_feed_forwards_decodable_snapshots_only() {
    let (script, reader) = scripted_reader();
    let writer = RecordingWriter::new();
    let (sink, mut books) = mpsc::channel(8);
    let (stop_tx, stop) = oneshot::channel();

    let feed = tokio::spawn(run_order_book_feed(
        fake_connect(reader, writer.clone(), BitstampProtocol),
        "btcusd",
        sink,
        stop,
    ));

    script
        .send(text(r#"{"event":"bts:subscription_succeeded","channel":"order_book_btcusd","data":{}}"#))
        .unwrap();
    script.send(text(BAD_BOOK_FRAME)).unwrap();
    script.send(text(BOOK_FRAME)).unwrap();

    let book = books.recv().await.unwrap();
    assert_eq!(book.timestamp.timestamp(), 1_700_000_000);
    assert_eq!(book.bids.len(), 1);
    assert_eq!(book.bids[0].price, 100.5);
    assert_eq!(book.asks[0].amount, 2.0);

    stop_tx.send(()).unwrap();
    let result = feed.await.unwrap();
    assert!(result.is_ok(), "stop should end the feed cleanly: {result:?}");
    assert!(books.try_recv().is_err());

    writer.wait_closed(Duration::from_secs(1)).await;
    assert_eq!(
        control_events(&writer),
        vec![
            ("bts:subscribe".to_string(), "order_book_btcusd".to_string()),
            ("bts:unsubscribe".to_string(), "order_book_btcusd".to_string()),
        ]
    );
    assert_eq!(writer.close_count(), 1);
}

#[tokio::test]
async fn test_feed_preserves_arrival_order() {
    let (script, reader) = scripted_reader();
    let (sink, mut books) = mpsc::channel(1);
    let (stop_tx, stop) = oneshot::channel();

    let feed = tokio::spawn(run_order_book_feed(
        fake_connect(reader, RecordingWriter::new(), BitstampProtocol),
        "btcusd",
        sink,
        stop,
    ));

    for ts in 1..=5 {
        let frame = format!(
            r#"{{"event":"data","channel":"order_book_btcusd","data":{{"timestamp":"{ts}","bids":[],"asks":[]}}}}"#
        );
        script.send(text(&frame)).unwrap();
    }

    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(books.recv().await.unwrap().timestamp.timestamp());
    }
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);

    stop_tx.send(()).unwrap();
    assert!(feed.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_dropped_stop_sender_stops_feed() {
    let (_script, reader) = scripted_reader();
    let writer = RecordingWriter::new();
    let (sink, _books) = mpsc::channel(1);
    let (stop_tx, stop) = oneshot::channel::<()>();

    let feed = tokio::spawn(run_order_book_feed(
        fake_connect(reader, writer.clone(), BitstampProtocol),
        "btcusd",
        sink,
        stop,
    ));

    drop(stop_tx);
    let result = tokio::time::timeout(Duration::from_secs(1), feed)
        .await
        .expect("feed ignored stop")
        .unwrap();
    assert!(result.is_ok());
    writer.wait_closed(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_dropped_receiver_ends_feed() {
    let (script, reader) = scripted_reader();
    let (sink, books) = mpsc::channel(1);
    let (_stop_tx, stop) = oneshot::channel();

    let feed = tokio::spawn(run_order_book_feed(
        fake_connect(reader, RecordingWriter::new(), BitstampProtocol),
        "btcusd",
        sink,
        stop,
    ));

    drop(books);
    script.send(text(BOOK_FRAME)).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), feed)
        .await
        .expect("feed kept running without a receiver")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_stream_error_ends_feed() {
    let (script, reader) = scripted_reader();
    let writer = RecordingWriter::new();
    let (sink, _books) = mpsc::channel(1);
    let (_stop_tx, stop) = oneshot::channel();

    let feed = tokio::spawn(run_order_book_feed(
        fake_connect(reader, writer.clone(), BitstampProtocol),
        "btcusd",
        sink,
        stop,
    ));

    script.send(Err(TransportError::Closed)).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), feed)
        .await
        .expect("feed did not observe the error")
        .unwrap();
    assert!(matches!(
        result,
        Err(StampedeError::Transport(TransportError::Closed))
    ));
    writer.wait_closed(Duration::from_secs(1)).await;
    assert_eq!(writer.close_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fatal_read_error_is_returned_not_closed() {
    for _ in 0..50 {
        let (script, reader) = scripted_reader();
        let (sink, _books) = mpsc::channel(1);
        let (_stop_tx, stop) = oneshot::channel();

        let feed = tokio::spawn(run_order_book_feed(
            fake_connect(reader, RecordingWriter::new(), BitstampProtocol),
            "btcusd",
            sink,
            stop,
        ));

        script.send(Err(reset_error())).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), feed)
            .await
            .expect("feed did not observe the error")
            .unwrap();
        match result {
            Err(StampedeError::Transport(TransportError::Read(tungstenite::Error::Io(e)))) => {
                assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset);
            }
            other => panic!("expected the read error, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_decode_error_on_error_queue_ends_feed() {
    let (script, reader) = scripted_reader();
    let (sink, _books) = mpsc::channel(1);
    let (_stop_tx, stop) = oneshot::channel();

    let feed = tokio::spawn(run_order_book_feed(
        fake_connect(reader, RecordingWriter::new(), BitstampProtocol),
        "btcusd",
        sink,
        stop,
    ));

    script.send(text("not json")).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), feed)
        .await
        .expect("feed did not observe the error")
        .unwrap();
    assert!(matches!(result, Err(StampedeError::Decode(_))));
}

#[tokio::test]
async fn test_connect_failure_is_returned() {
    let (sink, _books) = mpsc::channel(1);
    let (_stop_tx, stop) = oneshot::channel();

    let connect = async { Err::<WsClient<BitstampProtocol>, _>(TransportError::Closed) };
    let result = run_order_book_feed(connect, "btcusd", sink, stop).await;

    assert!(matches!(
        result,
        Err(StampedeError::Transport(TransportError::Closed))
    ));
}

#[tokio::test]
async fn test_subscribe_failure_is_returned() {
    let (_script, reader) = scripted_reader();
    let writer = RecordingWriter::failing();
    let (sink, _books) = mpsc::channel(1);
    let (_stop_tx, stop) = oneshot::channel();

    let result = run_order_book_feed(
        fake_connect(reader, writer.clone(), BitstampProtocol),
        "btcusd",
        sink,
        stop,
    )
    .await;

    assert!(matches!(
        result,
        Err(StampedeError::Transport(TransportError::Write(_)))
    ));
    writer.wait_closed(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_pusher_feed_uses_bare_default_channel() {
    let (script, reader) = scripted_reader();
    let writer = RecordingWriter::new();
    let (sink, mut books) = mpsc::channel(1);
    let (stop_tx, stop) = oneshot::channel();

    let feed = tokio::spawn(run_order_book_feed(
        fake_connect(reader, writer.clone(), PusherProtocol::default()),
        "btcusd",
        sink,
        stop,
    ));

    script
        .send(text(
            r#"{"event":"data","channel":"order_book","data":"{\"timestamp\":\"1700000000\",\"bids\":[[\"1\",\"2\"]],\"asks\":[]}"}"#,
        ))
        .unwrap();

    let book = books.recv().await.unwrap();
    assert_eq!(book.bids[0].amount, 2.0);

    stop_tx.send(()).unwrap();
    assert!(feed.await.unwrap().is_ok());

    assert_eq!(
        control_events(&writer),
        vec![
            ("pusher:subscribe".to_string(), "order_book".to_string()),
            ("pusher:unsubscribe".to_string(), "order_book".to_string()),
        ]
    );
}

#[test]
fn test_stream_error_converts_into_crate_error() {
    let err: StampedeError = StreamError::Transport(TransportError::Closed).into();
    assert!(matches!(err, StampedeError::Transport(TransportError::Closed)));
}
