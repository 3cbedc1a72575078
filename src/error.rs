//! Crate-level error types.
//!
//! [`StampedeError`] unifies every error source (configuration, transport,
//! decoding, HTTP) behind a single enum so callers can match on the variant
//! they care about while still using the `?` operator for easy propagation.
//! The finer-grained enums below are what the streaming and decoding layers
//! produce on their own.

use std::io::ErrorKind;

use crate::models::book::Side;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StampedeError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum StampedeError {
    /// Configuration could not be read or was inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Dialing, reading from, or writing to the websocket failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A payload did not match the expected schema.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An HTTP request failed or returned a non-success status.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StreamError> for StampedeError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Transport(err) => Self::Transport(err),
            StreamError::Decode(err) => Self::Decode(err),
        }
    }
}

/// Failure of the underlying websocket connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(#[source] tungstenite::Error),

    #[error("read failed: {0}")]
    Read(#[source] tungstenite::Error),

    #[error("write failed: {0}")]
    Write(#[source] tungstenite::Error),

    /// The peer closed the connection or it was already released locally.
    #[error("connection closed")]
    Closed,
}

impl TransportError {
    /// Returns `true` if the read loop should wait and try again rather than
    /// give up on the connection.
    ///
    /// Only read-side I/O hiccups (timeouts, would-block, interrupted system
    /// calls) qualify. Closed connections, protocol violations and TLS
    /// failures are fatal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Read(tungstenite::Error::Io(err)) => matches!(
                err.kind(),
                ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

/// A frame or response body could not be turned into a typed record.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    /// `timestamp` was present but not a base-10 integer string.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// One side of an order book failed validation.
    #[error("{side} parsing error: {source}")]
    Side {
        side: Side,
        #[source]
        source: ValidationError,
    },

    /// The trade at `index` failed validation.
    #[error("trade {index} parsing error: {source}")]
    Trade {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Field(#[from] ValidationError),
}

/// A single field inside a record violated its schema.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("missing field `{field}`")]
    Missing { field: &'static str },

    #[error("field `{field}` must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("expected [price, amount] pair, found {found} element(s)")]
    Arity { found: usize },

    #[error("invalid {field} `{value}`: {source}")]
    Number {
        field: &'static str,
        value: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{field} `{value}` is out of range")]
    OutOfRange { field: &'static str, value: String },
}

/// Item type of a stream client's error queue.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
