//! Error types shared between the router and the decision pipeline

use std::time::Duration;
use thiserror::Error;

/// Well-known error URIs reported back to clients
pub mod uri {
    pub const NOT_AUTHORIZED: &str = "wamp.error.not_authorized";
    pub const PROTOCOL_VIOLATION: &str = "wamp.error.protocol_violation";
    pub const INVALID_ARGUMENT: &str = "wamp.error.invalid_argument";
    pub const INTERNAL_ERROR: &str = "wamp.error.internal-error";
    pub const NO_SUCH_PROCEDURE: &str = "wamp.error.no_such_procedure";
    pub const EMPTY_AUTH_ID: &str = "wamp.error.empty-auth-id";
    pub const WRONG_AUTH_ID: &str = "wamp.error.wrong-auth-id";
    pub const INVALID_TOKEN: &str = "wamp.error.invalid-token";
}

/// Failures of the peer connection during a handshake
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    /// The peer closed the connection
    #[error("Peer closed the connection")]
    Closed,

    /// No frame arrived within the allotted time
    #[error("Timed out after {0:?} waiting for peer")]
    Timeout(Duration),

    /// Underlying transport failure
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Error returned by a remote procedure call
///
/// Mirrors an ERROR reply: an error URI plus a human readable message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{uri}: {message}")]
pub struct CallError {
    pub uri: String,
    pub message: String,
}

impl CallError {
    /// Create an error with an explicit URI
    pub fn new(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Router-internal failure (no usable error URI from upstream)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(uri::INTERNAL_ERROR, message)
    }

    /// Invalid arguments passed to a procedure
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(uri::INVALID_ARGUMENT, message)
    }

    /// True when the error was produced by the router itself rather than
    /// reported by the remote callee
    pub fn is_internal(&self) -> bool {
        self.uri == uri::INTERNAL_ERROR
    }
}
