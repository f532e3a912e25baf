//! Error types for the client runtime.

use remodel_endpoint::EndpointError;
use std::fmt;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// A failed exchange with the remote source.
///
/// Carries whatever the transport could recover: the HTTP status when
/// one was received, and the raw response body so user-facing messages
/// can still be mined from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportFailure {
    /// HTTP status code, when a response was received at all.
    pub status: Option<u16>,
    /// Raw response body, when one was received.
    pub body: Option<String>,
}

impl TransportFailure {
    /// Creates a failure for a non-2xx response.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: Some(body.into()),
        }
    }

    /// Creates a failure for a network-level error with no response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: Some(message.into()),
        }
    }

    /// Parses the response body as JSON, best effort.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        let body = self.body.as_deref()?;
        serde_json::from_str(body).ok()
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "status {status}"),
            None => f.write_str("no response"),
        }
    }
}

/// Errors surfaced by record and collection operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Endpoint misconfiguration; the operation was aborted before any
    /// request was issued.
    #[error("endpoint configuration: {0}")]
    Endpoint(#[from] EndpointError),

    /// The exchange with the remote source failed.
    #[error("transport failure: {0}")]
    Transport(TransportFailure),

    /// A save was rejected because another write is still in flight.
    #[error("save rejected, another request is still in progress")]
    Busy,

    /// A success response could not be interpreted.
    #[error("malformed response: {0}")]
    Parse(String),
}

impl ClientError {
    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// True if this is the busy rejection of an overlapping save.
    pub fn is_busy(&self) -> bool {
        matches!(self, ClientError::Busy)
    }

    /// True if the exchange with the remote source failed.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
