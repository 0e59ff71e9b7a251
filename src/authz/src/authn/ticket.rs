//! Ticket authentication verified by an upstream procedure

use async_trait::async_trait;

use relaygate_core::types::value::option_flag;
use relaygate_core::{Dict, Handshake, Peer, SessionId, Value, Welcome};
use tracing::{debug, warn};

use super::challenge::ChallengeExchange;
use super::resolver::SharedSecretResolver;
use super::{method, record_outcome, Authenticator};
use crate::error::AuthError;

/// Default upstream procedure that verifies tickets
pub const DEFAULT_VERIFY_PROCEDURE: &str = "ee.auth.verify-ticket";

/// Extra key a client sets to request a resume token
pub const GENERATE_TOKEN_KEY: &str = "generate-token";

/// Extra key carrying an issued resume token
pub const RESUME_TOKEN_KEY: &str = "resume-token";

/// Challenges the client for a ticket and has upstream verify it
///
/// Verification is a call to `[realm, authid, {"ticket": secret}]`; an error
/// reply or a `false` first argument rejects. Identity then comes from the
/// shared resolver. When resume tokens are enabled and the client set
/// `generate-token` in its AUTHENTICATE extra, a token is requested through
/// the create-token procedure and returned in `authextra`.
pub struct DynamicTicketAuth {
    resolver: SharedSecretResolver,
    verify_procedure: String,
    create_token_procedure: Option<String>,
}

impl DynamicTicketAuth {
    pub fn new(resolver: SharedSecretResolver, verify_procedure: impl Into<String>) -> Self {
        Self {
            resolver: resolver.for_method(method::TICKET),
            verify_procedure: verify_procedure.into(),
            create_token_procedure: None,
        }
    }

    /// Allow clients to request resume tokens
    pub fn with_resume(mut self, create_token_procedure: impl Into<String>) -> Self {
        self.create_token_procedure = Some(create_token_procedure.into());
        self
    }

    async fn run(&self, handshake: &Handshake, peer: &dyn Peer) -> Result<Welcome, AuthError> {
        let authid = handshake.authid();
        if authid.is_empty() {
            return Err(AuthError::EmptyAuthId);
        }

        let mut exchange = ChallengeExchange::new(method::TICKET);
        let response = exchange.run(peer).await?;
        let result = self.verify(authid, &response.signature).await;
        exchange.settle(result)?;

        let mut welcome = self.resolver.resolve(authid).await?;
        if option_flag(&response.extra, GENERATE_TOKEN_KEY) {
            if let Some(token) = self.request_token(authid).await {
                welcome.insert_extra(RESUME_TOKEN_KEY, Value::String(token));
            }
        }
        Ok(welcome)
    }

    async fn verify(&self, authid: &str, ticket: &str) -> Result<(), AuthError> {
        let env = self.resolver.env();
        let mut credentials = Dict::new();
        credentials.insert("ticket".to_string(), Value::String(ticket.to_string()));

        let reply = env
            .call(
                &self.verify_procedure,
                vec![
                    Value::String(env.realm.clone()),
                    Value::String(authid.to_string()),
                    Value::Object(credentials),
                ],
            )
            .await
            .map_err(|err| {
                debug!(authid, error = %err, "Ticket verification failed");
                if err.is_internal() {
                    AuthError::Internal(err.message)
                } else {
                    AuthError::Upstream(err)
                }
            })?;

        if reply.first() == Some(&Value::Bool(false)) {
            return Err(AuthError::Unauthorized("ticket rejected".to_string()));
        }
        Ok(())
    }

    async fn request_token(&self, authid: &str) -> Option<String> {
        let procedure = self.create_token_procedure.as_deref()?;
        let env = self.resolver.env();
        match env.call(procedure, vec![Value::String(authid.to_string())]).await {
            Ok(reply) => match reply.first() {
                Some(Value::String(token)) => Some(token.clone()),
                _ => {
                    warn!(authid, "Create-token reply carried no token");
                    None
                }
            },
            Err(err) => {
                warn!(authid, error = %err, "Unable to create resume token");
                None
            }
        }
    }
}

#[async_trait]
impl Authenticator for DynamicTicketAuth {
    fn auth_method(&self) -> &str {
        method::TICKET
    }

    async fn authenticate(
        &self,
        session_id: SessionId,
        handshake: &Handshake,
        peer: &dyn Peer,
    ) -> Result<Welcome, AuthError> {
        let result = self.run(handshake, peer).await;
        record_outcome(&self.resolver.env().metrics, method::TICKET, session_id, result)
    }
}
