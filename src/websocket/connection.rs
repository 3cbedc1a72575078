//! WebSocket connection lifecycle management.
//!
//! [`WsClient`] owns one connection. A dedicated read loop task decodes
//! inbound frames into [`Envelope`]s and pushes them onto the client's
//! stream queue; control frames are written from the caller's task through
//! a single write lock. Only the read loop ever closes the connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::protocol::{Control, Protocol};
use super::transport::{self, FrameReader, FrameWriter};
use super::{Inbound, StreamClient};
use crate::error::{StreamError, TransportError};
use crate::models::Envelope;

/// Pause before reading again after a retryable read error.
pub const READ_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Tokio channels need at least one slot; a single slot keeps the reader at
/// most one envelope ahead of its consumer.
const STREAM_CAPACITY: usize = 1;

/// Errors beyond the one waiting to be picked up are dropped.
const ERRORS_CAPACITY: usize = 1;

/// Writer shared between control calls and the read loop. `None` once the
/// read loop has released the connection.
type SharedWriter = Arc<Mutex<Option<Box<dyn FrameWriter>>>>;

/// A persistent websocket connection speaking protocol `P`.
pub struct WsClient<P: Protocol> {
    protocol: Arc<P>,
    writer: SharedWriter,
    shutdown: watch::Sender<bool>,
    inbound: Inbound,
    reader: Option<JoinHandle<()>>,
}

impl<P: Protocol> WsClient<P> {
    /// Dials `url` and starts the read loop.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if the handshake fails. No retry
    /// or timeout is applied here.
    pub async fn connect(url: &str, protocol: P) -> Result<Self, TransportError> {
        info!(url, "Connecting to WebSocket");
        let (writer, reader) = transport::connect(url).await?;

        Ok(Self::with_transport(reader, writer, protocol))
    }

    /// Starts a client over an already-established transport.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_transport<R, W>(reader: R, writer: W, protocol: P) -> Self
    where
        R: FrameReader,
        W: FrameWriter,
    {
        let (stream_tx, stream_rx) = mpsc::channel(STREAM_CAPACITY);
        let (errors_tx, errors_rx) = mpsc::channel(ERRORS_CAPACITY);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let protocol = Arc::new(protocol);
        let writer: SharedWriter = Arc::new(Mutex::new(Some(Box::new(writer))));

        let read_loop = ReadLoop {
            reader,
            protocol: Arc::clone(&protocol),
            writer: Arc::clone(&writer),
            stream: stream_tx,
            errors: errors_tx,
            shutdown: shutdown_rx,
        };
        let reader = tokio::spawn(read_loop.run());

        Self {
            protocol,
            writer,
            shutdown,
            inbound: Inbound {
                stream: stream_rx,
                errors: errors_rx,
            },
            reader: Some(reader),
        }
    }

    /// Waits for the read loop to finish and release the connection.
    pub async fn join(mut self) {
        if let Some(reader) = self.reader.take()
            && let Err(e) = reader.await
        {
            warn!("Read loop task failed: {e}");
        }
    }

    /// Writes one control frame per channel while holding the write lock,
    /// so concurrent callers never interleave.
    async fn send_control(&self, control: Control, channels: &[&str]) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::Closed)?;

        for channel in channels {
            let frame = self.protocol.control_frame(control, channel);
            debug!("Sending control frame: {}", frame);
            writer.write_frame(frame).await?;
            info!(
                action = control.as_str(),
                channel = *channel,
                "Control request sent"
            );
        }

        Ok(())
    }
}

#[async_trait]
impl<P: Protocol> StreamClient for WsClient<P> {
    async fn subscribe(&self, channels: &[&str]) -> Result<(), TransportError> {
        self.send_control(Control::Subscribe, channels).await
    }

    async fn unsubscribe(&self, channels: &[&str]) -> Result<(), TransportError> {
        self.send_control(Control::Unsubscribe, channels).await
    }

    fn close(&self) {
        let signalled = self.shutdown.send_if_modified(|stop| {
            if *stop {
                false
            } else {
                *stop = true;
                true
            }
        });
        if signalled {
            info!("WebSocket shutdown requested");
        }
    }

    fn inbound(&mut self) -> &mut Inbound {
        &mut self.inbound
    }

    fn order_book_channel(&self, symbol: &str) -> String {
        self.protocol.order_book_channel(symbol)
    }
}

impl<P: Protocol> Drop for WsClient<P> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Resolves once shutdown has been requested or the client is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// State owned by the read loop task.
struct ReadLoop<R, P> {
    reader: R,
    protocol: Arc<P>,
    writer: SharedWriter,
    stream: mpsc::Sender<Envelope>,
    errors: mpsc::Sender<StreamError>,
    shutdown: watch::Receiver<bool>,
}

impl<R: FrameReader, P: Protocol> ReadLoop<R, P> {
    async fn run(mut self) {
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let frame = tokio::select! {
                biased;
                () = shutdown_requested(&mut self.shutdown) => break,
                frame = self.reader.read_frame() => frame,
            };

            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    let retryable = e.is_retryable();
                    warn!(error = %e, retryable, "WebSocket read failed");
                    report(&self.errors, e.into());
                    if !retryable {
                        break;
                    }
                    tokio::select! {
                        biased;
                        () = shutdown_requested(&mut self.shutdown) => break,
                        () = tokio::time::sleep(READ_RETRY_DELAY) => continue,
                    }
                }
            };

            let envelope = match self.protocol.decode_envelope(&frame) {
                Ok(envelope) => envelope,
                Err(e) => {
                    debug!(error = %e, "Dropping undecodable frame");
                    report(&self.errors, e.into());
                    continue;
                }
            };

            if let Some(response) = self.protocol.auto_reply(&envelope) {
                reply(&self.writer, &self.errors, response).await;
            }

            tokio::select! {
                biased;
                () = shutdown_requested(&mut self.shutdown) => break,
                sent = self.stream.send(envelope) => {
                    if sent.is_err() {
                        debug!("Stream consumer dropped");
                        break;
                    }
                }
            }
        }

        self.release().await;
    }

    /// Closes the connection. Runs once, when the loop exits.
    async fn release(self) {
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.close().await {
                debug!(error = %e, "Close handshake failed");
            }
            info!("WebSocket connection released");
        }
    }
}

/// Pushes an error without ever blocking the loop.
fn report(errors: &mpsc::Sender<StreamError>, err: StreamError) {
    match errors.try_send(err) {
        Ok(()) => {}
        Err(TrySendError::Full(dropped)) => {
            warn!(error = %dropped, "Error queue full, dropping error");
        }
        Err(TrySendError::Closed(dropped)) => {
            debug!(error = %dropped, "Error queue closed, dropping error");
        }
    }
}

/// Writes a protocol-level reply through the shared writer.
///
/// Borrows only the writer and the error queue, so the read loop's future
/// stays `Send` for readers that are not `Sync`.
async fn reply(writer: &SharedWriter, errors: &mpsc::Sender<StreamError>, frame: String) {
    let mut guard = writer.lock().await;
    let result = match guard.as_mut() {
        Some(writer) => writer.write_frame(frame).await,
        None => Err(TransportError::Closed),
    };
    drop(guard);

    if let Err(e) = result {
        warn!(error = %e, "Failed to send keep-alive reply");
        report(errors, e.into());
    }
}
