//! Resume-token authentication

use async_trait::async_trait;
use std::sync::Arc;

use relaygate_core::{CallError, CallResult, Dict, Handshake, Peer, Procedure, SessionId, Value, Welcome};
use tracing::info;

use super::challenge::ChallengeExchange;
use super::resolver::SharedSecretResolver;
use super::ticket::RESUME_TOKEN_KEY;
use super::token::TokenStore;
use super::{method, record_outcome, Authenticator};
use crate::error::AuthError;

/// Authid a client must present to resume with a token
pub const RESUME_AUTHID: &str = "resume";

/// Default URI of the token-minting procedure
pub const DEFAULT_CREATE_TOKEN_PROCEDURE: &str = "ee.auth.create-token";

/// Authenticates with a single-use token and rotates it
///
/// The client sends authid `resume` and answers the challenge with the token
/// secret. A valid token is consumed, identity is re-resolved for its owner,
/// and a replacement token is returned in `authextra.resume-token`.
pub struct ResumeAuth {
    resolver: SharedSecretResolver,
    tokens: Arc<TokenStore>,
}

impl ResumeAuth {
    pub fn new(resolver: SharedSecretResolver, tokens: Arc<TokenStore>) -> Self {
        Self {
            resolver: resolver.for_method(method::RESUME),
            tokens,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Procedure that mints tokens, to be registered on the router
    pub fn create_token_procedure(&self) -> Arc<dyn Procedure> {
        Arc::new(CreateTokenProcedure::new(Arc::clone(&self.tokens)))
    }

    async fn run(&self, handshake: &Handshake, peer: &dyn Peer) -> Result<Welcome, AuthError> {
        let authid = handshake.authid();
        if authid != RESUME_AUTHID {
            return Err(AuthError::WrongAuthId(authid.to_string()));
        }

        let mut exchange = ChallengeExchange::new(method::RESUME);
        let response = exchange.run(peer).await?;
        let token = exchange.settle(
            self.tokens
                .redeem(&response.signature)
                .ok_or(AuthError::InvalidToken),
        )?;
        info!(authid = %token.authid, "Token login");

        let mut welcome = self.resolver.resolve(&token.authid).await?;
        let replacement = self.tokens.issue(&token.authid)?;
        welcome.insert_extra(RESUME_TOKEN_KEY, Value::String(replacement));
        Ok(welcome)
    }
}

#[async_trait]
impl Authenticator for ResumeAuth {
    fn auth_method(&self) -> &str {
        method::RESUME
    }

    async fn authenticate(
        &self,
        session_id: SessionId,
        handshake: &Handshake,
        peer: &dyn Peer,
    ) -> Result<Welcome, AuthError> {
        let result = self.run(handshake, peer).await;
        record_outcome(&self.resolver.env().metrics, method::RESUME, session_id, result)
    }
}

/// Mints a token for the authid given as first argument
pub struct CreateTokenProcedure {
    tokens: Arc<TokenStore>,
}

impl CreateTokenProcedure {
    pub fn new(tokens: Arc<TokenStore>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Procedure for CreateTokenProcedure {
    async fn invoke(&self, args: Vec<Value>, _kwargs: Dict) -> Result<CallResult, CallError> {
        let authid = match args.first() {
            Some(Value::String(authid)) if !authid.is_empty() => authid,
            _ => return Err(CallError::invalid_argument("expected a non-empty authid")),
        };
        let token = self.tokens.issue(authid)?;
        Ok(CallResult::with_args(vec![Value::String(token)]))
    }
}
