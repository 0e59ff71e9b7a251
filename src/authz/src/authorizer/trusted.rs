//! Trusted-role fast path as a standalone authorizer

use async_trait::async_trait;
use relaygate_core::{Message, Session};

use super::Authorizer;
use crate::error::Result;
use crate::roles::{RoleSet, TrustedRoles};

/// Permits sessions holding a trusted role and denies everyone else
///
/// Useful as the only authorizer of an internal realm, or as the first
/// member of a [`MultiAuthorizer`](super::MultiAuthorizer) in `one` mode.
#[derive(Debug, Clone, Default)]
pub struct TrustedRoleAuthorizer {
    trusted: TrustedRoles,
}

impl TrustedRoleAuthorizer {
    pub fn new(trusted: TrustedRoles) -> Self {
        Self { trusted }
    }
}

#[async_trait]
impl Authorizer for TrustedRoleAuthorizer {
    async fn authorize(&self, session: &Session, message: &Message) -> Result<bool> {
        if message.action_target().is_none() {
            return Ok(true);
        }
        Ok(RoleSet::from_session(session)
            .map(|roles| roles.is_trusted(&self.trusted))
            .unwrap_or(false))
    }
}
