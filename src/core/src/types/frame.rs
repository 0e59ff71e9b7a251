//! Handshake frames and connection details

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::value::{option_str, Dict};

/// Frames exchanged with a peer while a session is being established
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    /// Server asks the client to prove its identity
    Challenge { auth_method: String, extra: Dict },

    /// Client answer to a challenge
    Authenticate { signature: String, extra: Dict },

    /// Either side aborts the handshake
    Abort { reason: String, details: Dict },

    /// Any regular protocol message arriving out of turn
    Message(Message),
}

impl Frame {
    pub fn challenge(auth_method: impl Into<String>) -> Self {
        Frame::Challenge {
            auth_method: auth_method.into(),
            extra: Dict::new(),
        }
    }

    pub fn authenticate(signature: impl Into<String>, extra: Dict) -> Self {
        Frame::Authenticate {
            signature: signature.into(),
            extra,
        }
    }

    /// Upper-case frame type name, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Challenge { .. } => "CHALLENGE",
            Frame::Authenticate { .. } => "AUTHENTICATE",
            Frame::Abort { .. } => "ABORT",
            Frame::Message(message) => message.kind(),
        }
    }
}

/// Transport-level facts about the connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportInfo {
    /// DER encoded certificates presented by the client, leaf first
    #[serde(default)]
    pub peer_certificates: Vec<Vec<u8>>,
}

/// Everything the router knows about a client when the handshake starts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Handshake {
    /// HELLO details sent by the client (`authid`, `authmethods`, ...)
    #[serde(default)]
    pub details: Dict,

    /// Present only for TLS connections
    #[serde(default)]
    pub transport: Option<TransportInfo>,
}

impl Handshake {
    pub fn new(details: Dict) -> Self {
        Self {
            details,
            transport: None,
        }
    }

    pub fn with_peer_certificates(mut self, certificates: Vec<Vec<u8>>) -> Self {
        self.transport = Some(TransportInfo {
            peer_certificates: certificates,
        });
        self
    }

    /// Client supplied `authid`, empty when absent
    pub fn authid(&self) -> &str {
        option_str(&self.details, "authid")
    }
}
