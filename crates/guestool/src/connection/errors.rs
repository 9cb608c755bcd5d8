//! Error types for the management host connection.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors surfaced while connecting to or talking with the management host.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Nothing is listening at the endpoint.
    #[error("connection refused by {endpoint}")]
    Refused { endpoint: String },

    /// The greeting was not echoed in time.
    #[error("handshake not echoed within {timeout:?}")]
    HandshakeTimeout { timeout: Duration },

    /// The first frame back was not the greeting.
    #[error("handshake mismatch: received {received}")]
    HandshakeMismatch { received: String },

    /// The WebSocket transport failed.
    #[error("transport error: {source}")]
    Transport {
        #[source]
        source: Box<tungstenite::Error>,
    },

    /// The peer closed the connection before the handshake completed.
    #[error("connection closed by peer")]
    Closed,

    /// An outbound frame could not be encoded.
    #[error("invalid frame: {message}")]
    InvalidFrame {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

impl ConnectionError {
    /// Maps a failed connection attempt, singling out refusals.
    pub(crate) fn from_connect(endpoint: &str, error: tungstenite::Error) -> Self {
        match &error {
            tungstenite::Error::Io(io_error)
                if io_error.kind() == io::ErrorKind::ConnectionRefused =>
            {
                Self::Refused {
                    endpoint: endpoint.to_owned(),
                }
            }
            _ => Self::transport(error),
        }
    }

    pub(crate) fn transport(error: tungstenite::Error) -> Self {
        Self::Transport {
            source: Box::new(error),
        }
    }

    pub(crate) fn invalid_frame(source: serde_json::Error) -> Self {
        Self::InvalidFrame {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Whether the supervisor should schedule another attempt.
    ///
    /// Only refusals before the handshake are retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Refused { .. })
    }
}
