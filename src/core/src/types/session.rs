//! Session identity as seen by the pipeline

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::{Dict, Value};
use super::welcome::Welcome;

/// Largest identifier in the global id scope (2^53)
pub const MAX_ID: u64 = 1 << 53;

/// Generate a random identifier in the global scope `[1, 2^53]`
pub fn global_id() -> u64 {
    rand::thread_rng().gen_range(1..=MAX_ID)
}

/// Numeric session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Draw a fresh random session id
    pub fn random() -> Self {
        SessionId(global_id())
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        SessionId(id)
    }
}

/// A client session owned by the router
///
/// `details` carries `authid`, `authrole`, `authprovider`, `authmethod` and
/// `authextra` once the handshake completed, plus any attributes the router
/// attaches on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(default)]
    pub details: Dict,
}

impl Session {
    /// Create a session with the given details
    pub fn new(id: u64, details: Dict) -> Self {
        Self {
            id: SessionId(id),
            details,
        }
    }

    /// Set a detail attribute
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Look up a raw detail value
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    pub fn authid(&self) -> Option<&str> {
        self.detail(Welcome::AUTHID).and_then(Value::as_str)
    }

    /// Raw `authrole` detail, either a string or a list of strings
    pub fn authrole(&self) -> Option<&Value> {
        self.detail(Welcome::AUTHROLE)
    }

    /// Attach the identity produced by a successful handshake
    pub fn apply_welcome(&mut self, welcome: &Welcome) {
        for (key, value) in welcome.details() {
            self.details.insert(key.clone(), value.clone());
        }
    }
}
