//! Anonymous authentication

use async_trait::async_trait;
use std::sync::Arc;

use relaygate_core::types::session::global_id;
use relaygate_core::{Handshake, Peer, SessionId, Welcome};

use super::{method, record_outcome, Authenticator, STATIC_PROVIDER};
use crate::error::AuthError;
use crate::metrics::Metrics;

/// Default role for anonymous clients
pub const DEFAULT_ANONYMOUS_ROLE: &str = "anonymous";

/// Admits every client with a random authid and one fixed role
pub struct AnonymousAuth {
    role: String,
    metrics: Arc<Metrics>,
}

impl AnonymousAuth {
    pub fn new(role: impl Into<String>, metrics: Arc<Metrics>) -> Self {
        Self {
            role: role.into(),
            metrics,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

#[async_trait]
impl Authenticator for AnonymousAuth {
    fn auth_method(&self) -> &str {
        method::ANONYMOUS
    }

    async fn authenticate(
        &self,
        session_id: SessionId,
        _handshake: &Handshake,
        _peer: &dyn Peer,
    ) -> Result<Welcome, AuthError> {
        let welcome = Welcome::new(
            global_id().to_string(),
            vec![self.role.clone()],
            STATIC_PROVIDER,
            method::ANONYMOUS,
        );
        record_outcome(&self.metrics, method::ANONYMOUS, session_id, Ok(welcome))
    }
}
