//! One CHALLENGE/AUTHENTICATE round trip

use std::time::Duration;

use relaygate_core::{Dict, Frame, Peer, PeerError};
use tracing::debug;

use crate::error::AuthError;

/// How long a client has to answer a challenge
pub const CHALLENGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a challenge exchange currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    AwaitingChallengeSend,
    ChallengeSent,
    AwaitingClientResponse,
    Verified,
    Rejected,
    TimedOut,
    ProtocolViolation,
}

impl ChallengeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChallengeState::Verified
                | ChallengeState::Rejected
                | ChallengeState::TimedOut
                | ChallengeState::ProtocolViolation
        )
    }
}

/// Signature and extra details from the client's AUTHENTICATE frame
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeResponse {
    pub signature: String,
    pub extra: Dict,
}

/// Drives the exchange and tracks its state
///
/// The caller marks the outcome with [`verified`](Self::verified) or
/// [`rejected`](Self::rejected) after checking the response.
#[derive(Debug)]
pub struct ChallengeExchange {
    auth_method: String,
    timeout: Duration,
    state: ChallengeState,
}

impl ChallengeExchange {
    pub fn new(auth_method: impl Into<String>) -> Self {
        Self {
            auth_method: auth_method.into(),
            timeout: CHALLENGE_TIMEOUT,
            state: ChallengeState::AwaitingChallengeSend,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    /// Send CHALLENGE and wait for AUTHENTICATE
    pub async fn run(&mut self, peer: &dyn Peer) -> Result<ChallengeResponse, AuthError> {
        if let Err(err) = peer.send(Frame::challenge(self.auth_method.clone())).await {
            self.state = ChallengeState::Rejected;
            return Err(err.into());
        }
        self.state = ChallengeState::ChallengeSent;
        debug!(method = %self.auth_method, "Challenge sent");

        self.state = ChallengeState::AwaitingClientResponse;
        match peer.recv_timeout(self.timeout).await {
            Ok(Frame::Authenticate { signature, extra }) => Ok(ChallengeResponse { signature, extra }),
            Ok(other) => {
                self.state = ChallengeState::ProtocolViolation;
                Err(AuthError::ProtocolViolation(other.kind().to_string()))
            }
            Err(PeerError::Timeout(_)) => {
                self.state = ChallengeState::TimedOut;
                Err(AuthError::Timeout)
            }
            Err(err) => {
                self.state = ChallengeState::Rejected;
                Err(err.into())
            }
        }
    }

    pub fn verified(&mut self) {
        self.state = ChallengeState::Verified;
    }

    pub fn rejected(&mut self) {
        self.state = ChallengeState::Rejected;
    }

    /// Mark the exchange as rejected unless it already ended
    pub(crate) fn settle<T>(&mut self, result: Result<T, AuthError>) -> Result<T, AuthError> {
        match &result {
            Ok(_) => self.verified(),
            Err(_) if !self.state.is_terminal() => self.rejected(),
            Err(_) => {}
        }
        result
    }
}
