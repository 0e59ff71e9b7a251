//! Error types for the authentication and authorization pipeline

use relaygate_core::error::uri;
use relaygate_core::{CallError, PeerError};
use thiserror::Error;

/// Tagged failure of an authentication attempt
///
/// Every variant is a rejection of the handshake; `uri()` gives the error
/// URI reported to the client.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Handshake carried no authid
    #[error("Empty authid")]
    EmptyAuthId,

    /// Handshake carried an authid the authenticator does not accept
    #[error("Unexpected authid: {0}")]
    WrongAuthId(String),

    /// Client answered the challenge with the wrong frame
    #[error("Protocol violation: expected AUTHENTICATE, got {0}")]
    ProtocolViolation(String),

    /// Client did not answer the challenge in time, reported as a
    /// protocol violation
    #[error("Timed out waiting for AUTHENTICATE")]
    Timeout,

    /// Resume token unknown, reused or expired
    #[error("Invalid token")]
    InvalidToken,

    /// Credentials or identity data could not be established
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Upstream verification rejected the credentials
    #[error("Upstream rejected credentials: {0}")]
    Upstream(CallError),

    /// Connection failure during the exchange
    #[error("Peer error: {0}")]
    Peer(PeerError),

    /// Malformed input to a pipeline procedure
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Router-side failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Error URI sent to the client
    pub fn uri(&self) -> &str {
        match self {
            AuthError::EmptyAuthId => uri::EMPTY_AUTH_ID,
            AuthError::WrongAuthId(_) => uri::WRONG_AUTH_ID,
            AuthError::ProtocolViolation(_) => uri::PROTOCOL_VIOLATION,
            AuthError::Timeout => uri::PROTOCOL_VIOLATION,
            AuthError::InvalidToken => uri::INVALID_TOKEN,
            AuthError::Unauthorized(_) => uri::NOT_AUTHORIZED,
            AuthError::Upstream(err) => &err.uri,
            AuthError::Peer(_) => uri::NOT_AUTHORIZED,
            AuthError::InvalidArgument(_) => uri::INVALID_ARGUMENT,
            AuthError::Internal(_) => uri::INTERNAL_ERROR,
        }
    }
}

impl From<PeerError> for AuthError {
    fn from(err: PeerError) -> Self {
        match err {
            PeerError::Timeout(_) => AuthError::Timeout,
            other => AuthError::Peer(other),
        }
    }
}

impl From<AuthError> for CallError {
    fn from(err: AuthError) -> Self {
        CallError::new(err.uri(), err.to_string())
    }
}

/// Authorization and policy refresh errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Session `authrole` detail is neither a string nor a list
    #[error("Unable to extract roles from authrole detail")]
    RoleExtraction,

    /// Upstream procedure call failed
    #[error("Call to `{procedure}` failed: {source}")]
    Upstream {
        procedure: String,
        #[source]
        source: CallError,
    },

    /// Upstream reply had an unexpected shape
    #[error("Invalid reply from `{procedure}`: {reason}")]
    InvalidReply { procedure: String, reason: String },
}

impl AuthzError {
    pub(crate) fn invalid_reply(procedure: &str, reason: impl Into<String>) -> Self {
        AuthzError::InvalidReply {
            procedure: procedure.to_string(),
            reason: reason.into(),
        }
    }
}

/// Certificate loading errors
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid PEM data: {0}")]
    Pem(String),

    #[error("Invalid certificate: {0}")]
    Der(String),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
