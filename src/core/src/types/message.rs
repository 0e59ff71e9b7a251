//! Protocol action messages subject to authorization

use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::{Dict, Value};

/// The four action kinds covered by authorization policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Call,
    Register,
    Subscribe,
    Publish,
}

impl Action {
    /// Wire name passed to upstream authorizers
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Call => "call",
            Action::Register => "register",
            Action::Subscribe => "subscribe",
            Action::Publish => "publish",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messages a client sends after the handshake
///
/// Only the variants carrying a procedure or topic are subject to policy;
/// the rest are router-internal bookkeeping and pass through authorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    Call {
        request: u64,
        procedure: String,
        #[serde(default)]
        arguments: Vec<Value>,
    },
    Register {
        request: u64,
        procedure: String,
    },
    Subscribe {
        request: u64,
        topic: String,
    },
    Publish {
        request: u64,
        topic: String,
        #[serde(default)]
        options: Dict,
        #[serde(default)]
        arguments: Vec<Value>,
    },
    Unsubscribe {
        request: u64,
        subscription: u64,
    },
    Unregister {
        request: u64,
        registration: u64,
    },
    Yield {
        request: u64,
        #[serde(default)]
        arguments: Vec<Value>,
    },
    Goodbye {
        reason: String,
    },
}

impl Message {
    pub fn call(procedure: impl Into<String>) -> Self {
        Message::Call {
            request: 1,
            procedure: procedure.into(),
            arguments: Vec::new(),
        }
    }

    pub fn register(procedure: impl Into<String>) -> Self {
        Message::Register {
            request: 1,
            procedure: procedure.into(),
        }
    }

    pub fn subscribe(topic: impl Into<String>) -> Self {
        Message::Subscribe {
            request: 1,
            topic: topic.into(),
        }
    }

    pub fn publish(topic: impl Into<String>, options: Dict) -> Self {
        Message::Publish {
            request: 1,
            topic: topic.into(),
            options,
            arguments: Vec::new(),
        }
    }

    /// Upper-case message type name, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Call { .. } => "CALL",
            Message::Register { .. } => "REGISTER",
            Message::Subscribe { .. } => "SUBSCRIBE",
            Message::Publish { .. } => "PUBLISH",
            Message::Unsubscribe { .. } => "UNSUBSCRIBE",
            Message::Unregister { .. } => "UNREGISTER",
            Message::Yield { .. } => "YIELD",
            Message::Goodbye { .. } => "GOODBYE",
        }
    }

    /// Classify the message into its action kind and target URI
    ///
    /// Returns `None` for message kinds outside the four policy actions.
    pub fn action_target(&self) -> Option<(Action, &str)> {
        match self {
            Message::Call { procedure, .. } => Some((Action::Call, procedure)),
            Message::Register { procedure, .. } => Some((Action::Register, procedure)),
            Message::Subscribe { topic, .. } => Some((Action::Subscribe, topic)),
            Message::Publish { topic, .. } => Some((Action::Publish, topic)),
            _ => None,
        }
    }

    /// Options of a PUBLISH message
    pub fn publish_options(&self) -> Option<&Dict> {
        match self {
            Message::Publish { options, .. } => Some(options),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_target() {
        assert_eq!(
            Message::call("com.app.add").action_target(),
            Some((Action::Call, "com.app.add"))
        );
        assert_eq!(
            Message::subscribe("com.app.news").action_target(),
            Some((Action::Subscribe, "com.app.news"))
        );
        assert_eq!(
            Message::Goodbye {
                reason: "wamp.close.normal".into()
            }
            .action_target(),
            None
        );
    }

    #[test]
    fn test_action_names() {
        assert_eq!(Action::Call.as_str(), "call");
        assert_eq!(Action::Register.to_string(), "register");
        assert_eq!(Action::Subscribe.as_str(), "subscribe");
        assert_eq!(Action::Publish.as_str(), "publish");
    }
}
