//! Authenticators
//!
//! Each authenticator turns a client handshake into a [`Welcome`] or an
//! [`AuthError`]. Challenge-based methods drive one CHALLENGE/AUTHENTICATE
//! round trip over the [`Peer`] before resolving identity.

pub mod anonymous;
pub mod challenge;
pub mod resolver;
pub mod resume;
pub mod ticket;
pub mod tls;
pub mod token;

pub use anonymous::AnonymousAuth;
pub use challenge::{ChallengeExchange, ChallengeResponse, ChallengeState, CHALLENGE_TIMEOUT};
pub use resolver::SharedSecretResolver;
pub use resume::{CreateTokenProcedure, ResumeAuth, RESUME_AUTHID};
pub use ticket::DynamicTicketAuth;
pub use tls::{ClientCa, TlsAuth};
pub use token::{Token, TokenStore, DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS};

use async_trait::async_trait;
use relaygate_core::{Handshake, Peer, SessionId, Welcome};
use tracing::{info, warn};

use crate::error::AuthError;
use crate::metrics::Metrics;

/// Provider name for identities fixed by configuration
pub const STATIC_PROVIDER: &str = "static";

/// Provider name for identities resolved through the upstream client
pub const DYNAMIC_PROVIDER: &str = "dynamic";

/// Authentication method names
pub mod method {
    pub const ANONYMOUS: &str = "anonymous";
    pub const TLS: &str = "tls";
    pub const TICKET: &str = "ticket";
    pub const RESUME: &str = "resume";
}

/// Pluggable authentication method
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Method name the client selects in HELLO
    fn auth_method(&self) -> &str;

    /// Authenticate one handshake
    ///
    /// `peer` is only used by challenge-based methods.
    async fn authenticate(
        &self,
        session_id: SessionId,
        handshake: &Handshake,
        peer: &dyn Peer,
    ) -> Result<Welcome, AuthError>;
}

/// Log and count the outcome of an attempt
pub(crate) fn record_outcome(
    metrics: &Metrics,
    method: &str,
    session_id: SessionId,
    result: Result<Welcome, AuthError>,
) -> Result<Welcome, AuthError> {
    match &result {
        Ok(welcome) => {
            let roles = welcome.authroles();
            info!(
                session = %session_id,
                method,
                authid = welcome.authid(),
                roles = ?roles,
                "Authentication succeeded"
            );
            metrics.record_authentication(method, true);
            metrics.record_roles(&roles);
        }
        Err(err) => {
            warn!(session = %session_id, method, error = %err, "Authentication rejected");
            metrics.record_authentication(method, false);
        }
    }
    result
}
