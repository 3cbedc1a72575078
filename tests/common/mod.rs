//! Shared test utilities: in-memory transports and endpoint constants.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use stampede::error::TransportError;
use stampede::websocket::{FrameReader, FrameWriter};

/// Bitstamp websocket public endpoint URL.
pub const BITSTAMP_WS_URL: &str = "wss://ws.bitstamp.net";

/// Bitstamp REST API public base URL.
pub const BITSTAMP_API_URL: &str = "https://www.bitstamp.net/api/v2";

pub type Scripted = Result<Vec<u8>, TransportError>;

/// Reader fed from a channel. Once the script sender is dropped every read
/// stays pending, like an idle connection.
pub struct ScriptedReader {
    frames: mpsc::UnboundedReceiver<Scripted>,
}

#[async_trait]
impl FrameReader for ScriptedReader {
    async fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        match self.frames.recv().await {
            Some(frame) => frame,
            None => std::future::pending().await,
        }
    }
}

/// Creates a scripted reader and the sender used to feed it.
pub fn scripted_reader() -> (mpsc::UnboundedSender<Scripted>, ScriptedReader) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, ScriptedReader { frames: rx })
}

/// Text frame helper.
pub fn text(frame: &str) -> Scripted {
    Ok(frame.as_bytes().to_vec())
}

/// A read error the read loop should retry.
pub fn timeout_error() -> TransportError {
    TransportError::Read(tungstenite::Error::Io(io::Error::from(
        io::ErrorKind::TimedOut,
    )))
}

/// A read error that ends the read loop.
pub fn reset_error() -> TransportError {
    TransportError::Read(tungstenite::Error::Io(io::Error::from(
        io::ErrorKind::ConnectionReset,
    )))
}

/// What a [`RecordingWriter`] observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    Begin(String),
    End(String),
}

/// Writer that records every frame, yields in the middle of each write and
/// counts close calls.
#[derive(Clone, Default)]
pub struct RecordingWriter {
    pub events: Arc<Mutex<Vec<WireEvent>>>,
    pub closes: Arc<AtomicUsize>,
    pub fail_writes: Arc<AtomicBool>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let writer = Self::default();
        writer.fail_writes.store(true, Ordering::SeqCst);
        writer
    }

    /// Frames whose write completed.
    pub fn frames(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                WireEvent::End(frame) => Some(frame.clone()),
                WireEvent::Begin(_) => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<WireEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Polls until the connection has been closed at least once.
    pub async fn wait_closed(&self, limit: Duration) {
        tokio::time::timeout(limit, async {
            while self.close_count() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("connection was not closed in time");
    }
}

#[async_trait]
impl FrameWriter for RecordingWriter {
    async fn write_frame(&mut self, frame: String) -> Result<(), TransportError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Write(tungstenite::Error::AlreadyClosed));
        }
        self.events
            .lock()
            .unwrap()
            .push(WireEvent::Begin(frame.clone()));
        tokio::task::yield_now().await;
        self.events.lock().unwrap().push(WireEvent::End(frame));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
