//! Per-message authorizers
//!
//! An [`Authorizer`] decides whether a session may perform one CALL,
//! REGISTER, SUBSCRIBE or PUBLISH. Message kinds outside those four are
//! passed through.

pub mod dynamic;
pub mod feature;
pub mod multi;
pub mod trusted;

pub use dynamic::{DynamicAuthorizer, UpstreamFailure};
pub use feature::{FeatureAuthorizer, FeatureMapping, FeatureMatrix, FeatureSnapshot, UpdateProcedure};
pub use multi::{ConsentMode, MultiAuthorizer};
pub use trusted::TrustedRoleAuthorizer;

use async_trait::async_trait;
use relaygate_core::{Message, Session};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Decides whether a session may perform an action
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// `Ok(true)` permits, `Ok(false)` denies
    async fn authorize(&self, session: &Session, message: &Message) -> Result<bool>;
}

/// Outcome used when an authorizer cannot reach a decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[serde(alias = "accept")]
    Permit,
    #[default]
    Reject,
}

impl FailurePolicy {
    pub fn permits(self) -> bool {
        matches!(self, FailurePolicy::Permit)
    }
}

impl From<bool> for FailurePolicy {
    fn from(permit: bool) -> Self {
        if permit {
            FailurePolicy::Permit
        } else {
            FailurePolicy::Reject
        }
    }
}
