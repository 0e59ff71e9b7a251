//! Authorization delegated to an upstream procedure

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use relaygate_core::{Dict, Message, Session, Value};
use tracing::{debug, warn};

use super::{Authorizer, FailurePolicy};
use crate::env::RuntimeEnv;
use crate::error::{AuthzError, Result};
use crate::roles::{RoleSet, TrustedRoles};

/// Default upstream authorization procedure
pub const DEFAULT_AUTHORIZE_PROCEDURE: &str = "ee.auth.authorize";

/// What to do when the upstream call itself fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamFailure {
    /// Return the failure policy outcome
    #[default]
    Fallback,
    /// Return the error to the caller
    Propagate,
}

/// Asks upstream for every non-trusted decision
///
/// The procedure is called with `[context, uri, action]` where `context`
/// carries realm, authprovider, authid, session id, authmethod and roles.
/// It may reply with a boolean or a dict holding an `allow` boolean.
pub struct DynamicAuthorizer {
    env: RuntimeEnv,
    procedure: String,
    trusted: TrustedRoles,
    on_failure: FailurePolicy,
    on_upstream_error: UpstreamFailure,
}

impl DynamicAuthorizer {
    pub fn new(
        env: RuntimeEnv,
        procedure: impl Into<String>,
        trusted: TrustedRoles,
        on_failure: FailurePolicy,
    ) -> Self {
        Self {
            env,
            procedure: procedure.into(),
            trusted,
            on_failure,
            on_upstream_error: UpstreamFailure::default(),
        }
    }

    pub fn with_upstream_failure(mut self, on_upstream_error: UpstreamFailure) -> Self {
        self.on_upstream_error = on_upstream_error;
        self
    }

    fn session_context(&self, session: &Session, roles: &RoleSet) -> Value {
        let mut context = Dict::new();
        context.insert("realm".into(), Value::String(self.env.realm.clone()));
        for key in ["authprovider", "authid", "authmethod"] {
            context.insert(
                key.into(),
                session.detail(key).cloned().unwrap_or(Value::Null),
            );
        }
        context.insert("session".into(), Value::from(session.id.as_u64()));
        context.insert("authrole".into(), roles.to_value());
        Value::Object(context)
    }

    fn decide(&self, permit: bool) -> bool {
        self.env.metrics.record_authorization(permit);
        permit
    }
}

/// Read a decision from the first reply argument
fn parse_decision(reply: Option<&Value>) -> Option<bool> {
    match reply? {
        Value::Bool(allow) => Some(*allow),
        Value::Object(dict) => dict.get("allow").and_then(Value::as_bool),
        _ => None,
    }
}

#[async_trait]
impl Authorizer for DynamicAuthorizer {
    async fn authorize(&self, session: &Session, message: &Message) -> Result<bool> {
        let Some((action, uri)) = message.action_target() else {
            return Ok(true);
        };
        let fallback = self.on_failure.permits();

        let roles = match RoleSet::from_session(session) {
            Ok(roles) => roles,
            Err(err) => {
                warn!(session = %session.id, error = %err, "Falling back to default decision");
                return Ok(self.decide(fallback));
            }
        };
        if roles.is_trusted(&self.trusted) {
            return Ok(self.decide(true));
        }

        let args = vec![
            self.session_context(session, &roles),
            Value::String(uri.to_string()),
            Value::String(action.as_str().to_string()),
        ];
        let reply = match self.env.call(&self.procedure, args).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(
                    session = %session.id,
                    procedure = %self.procedure,
                    error = %err,
                    "Authorization call failed"
                );
                return match self.on_upstream_error {
                    UpstreamFailure::Fallback => Ok(self.decide(fallback)),
                    UpstreamFailure::Propagate => Err(AuthzError::Upstream {
                        procedure: self.procedure.clone(),
                        source: err,
                    }),
                };
            }
        };

        let permit = match parse_decision(reply.first()) {
            Some(permit) => permit,
            None => {
                warn!(session = %session.id, reply = ?reply.args, "Unrecognized authorization reply");
                fallback
            }
        };
        debug!(session = %session.id, %action, uri, permit, "Dynamic authorization");
        Ok(self.decide(permit))
    }
}
